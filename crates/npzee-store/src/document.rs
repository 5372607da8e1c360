//! Structural encoding of composite values.
//!
//! A mapping or sequence is encoded into a JSON document of the same shape
//! in which every array leaf is replaced by a reference key. Two reserved
//! entries are appended to the top-level object:
//!
//! ```json
//! {
//!   "n": [1, 2, 3],
//!   "a": "5f0c…e1",
//!   "__npzee_arrays__": {
//!     "5f0c…e1": { "file": "5f0c…e1.npy", "shape": [2, 2], "dtype": "int64", "digest": "…" }
//!   },
//!   "__npzee_meta__": { "workspace": "/path/to/ws", "pool": "t.data" }
//! }
//! ```
//!
//! A root sequence is wrapped as `{"list": [...]}` first so that the
//! reserved entries always have an object to live in.

use std::collections::BTreeMap;

use npzee_codec::FILE_EXTENSION;
use npzee_crypto::{content_digest, slot_key};
use npzee_types::{DType, NdArray, Scalar, Value, VariableKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobPool;

/// Reserved top-level key holding the array side-table.
pub const ARRAYS_KEY: &str = "__npzee_arrays__";
/// Reserved top-level key holding the metadata block.
pub const META_KEY: &str = "__npzee_meta__";
/// Key a root sequence is wrapped under.
pub const LIST_KEY: &str = "list";

/// Side-table entry describing one array blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayMeta {
    /// Blob file name inside the pool.
    pub file: String,
    pub shape: Vec<usize>,
    pub dtype: DType,
    /// Fingerprint of the blob; informational only.
    pub digest: String,
}

/// Metadata block of a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Workspace directory the document was written into.
    pub workspace: String,
    /// Name of the pool directory, relative to the workspace.
    pub pool: String,
}

/// Output of [`encode_document`]: the document plus the blobs it refers to.
#[derive(Clone, Debug)]
pub struct EncodedDocument {
    /// Complete document, reserved entries included.
    pub document: Json,
    /// `(file name, blob bytes)` in encounter order.
    pub blobs: Vec<(String, Vec<u8>)>,
}

impl EncodedDocument {
    pub fn to_pretty_bytes(&self) -> StoreResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.document)?)
    }
}

/// Encode a composite value.
///
/// Nothing is written anywhere: the caller decides where the document and
/// the blobs go. An error therefore never leaves partial output behind.
pub fn encode_document(root: &Value, meta: &DocumentMeta) -> StoreResult<EncodedDocument> {
    let mut encoder = Encoder::default();
    let mut body = match root {
        Value::Null => return Err(StoreError::EmptyValue),
        Value::Mapping(entries) => {
            if let Some((key, _)) = entries
                .iter()
                .find(|(k, _)| k == ARRAYS_KEY || k == META_KEY)
            {
                return Err(StoreError::ReservedKey(key.clone()));
            }
            encoder.mapping(entries)?
        }
        Value::Sequence(items) => {
            let mut wrapper = Map::new();
            wrapper.insert(LIST_KEY.to_string(), encoder.sequence(items)?);
            wrapper
        }
        other => {
            return Err(StoreError::UnsupportedValueKind(format!(
                "a document root must be a mapping or sequence, got {}",
                describe(other)
            )))
        }
    };

    body.insert(ARRAYS_KEY.to_string(), Json::Object(encoder.side_table));
    body.insert(META_KEY.to_string(), serde_json::to_value(meta)?);
    Ok(EncodedDocument {
        document: Json::Object(body),
        blobs: encoder.blobs,
    })
}

/// Decode a stored document of the given kind, loading arrays from `pool`.
pub fn decode_document(
    document: Json,
    kind: VariableKind,
    pool: &dyn BlobPool,
) -> StoreResult<Value> {
    CompositeDocument::from_json(document)?.decode(kind, pool)
}

fn describe(value: &Value) -> String {
    value
        .kind()
        .map(|k| k.to_string())
        .unwrap_or_else(|| "null".to_string())
}

/// Per-pass encoder state.
#[derive(Default)]
struct Encoder {
    /// Array leaves emitted so far in this pass.
    counter: usize,
    side_table: Map<String, Json>,
    blobs: Vec<(String, Vec<u8>)>,
}

impl Encoder {
    fn value(&mut self, value: &Value) -> StoreResult<Json> {
        match value {
            Value::Null => Ok(Json::Null),
            Value::Text(s) => Ok(Json::String(s.clone())),
            Value::Scalar(Scalar::Int(i)) => Ok(Json::Number((*i).into())),
            Value::Scalar(Scalar::Float(x)) => {
                Number::from_f64(*x).map(Json::Number).ok_or_else(|| {
                    StoreError::UnsupportedValueKind(format!(
                        "non-finite float {x} cannot be stored inside a document"
                    ))
                })
            }
            Value::Array(array) => self.array(array),
            Value::Sequence(items) => self.sequence(items),
            Value::Mapping(entries) => self.mapping(entries).map(Json::Object),
        }
    }

    fn array(&mut self, array: &NdArray) -> StoreResult<Json> {
        let key = slot_key(self.counter);
        if !self.side_table.contains_key(&key) {
            let file = format!("{key}.{FILE_EXTENSION}");
            let bytes = npzee_codec::encode(array).map_err(|e| StoreError::from_codec(&file, e))?;
            let meta = ArrayMeta {
                file: file.clone(),
                shape: array.shape.clone(),
                dtype: array.dtype,
                digest: content_digest(&bytes, &array.shape, array.dtype),
            };
            self.side_table.insert(key.clone(), serde_json::to_value(meta)?);
            self.blobs.push((file, bytes));
        }
        self.counter += 1;
        Ok(Json::String(key))
    }

    fn sequence(&mut self, items: &[Value]) -> StoreResult<Json> {
        items
            .iter()
            .map(|item| self.value(item))
            .collect::<StoreResult<Vec<_>>>()
            .map(Json::Array)
    }

    fn mapping(&mut self, entries: &[(String, Value)]) -> StoreResult<Map<String, Json>> {
        let mut map = Map::new();
        for (key, value) in entries {
            if map.contains_key(key) {
                return Err(StoreError::DuplicateKey(key.clone()));
            }
            let encoded = self.value(value)?;
            map.insert(key.clone(), encoded);
        }
        Ok(map)
    }
}

/// Result of [`CompositeDocument::check_blobs`]. Each list is sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlobCheck {
    /// Side-table keys whose blob no longer matches its digest.
    pub mismatched: Vec<String>,
    /// Side-table keys whose blob is absent.
    pub missing: Vec<String>,
    /// Pool files no side-table entry refers to.
    pub orphaned: Vec<String>,
}

impl BlobCheck {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty() && self.orphaned.is_empty()
    }
}

/// A parsed document with its reserved entries split off.
#[derive(Clone, Debug)]
pub struct CompositeDocument {
    /// The value tree, reserved entries removed.
    pub body: Map<String, Json>,
    pub arrays: BTreeMap<String, ArrayMeta>,
    pub meta: DocumentMeta,
}

impl CompositeDocument {
    /// Parse document bytes as read from a `.dict`/`.list` file.
    pub fn parse(bytes: &[u8]) -> StoreResult<Self> {
        let json: Json = serde_json::from_slice(bytes)
            .map_err(|e| StoreError::InvalidDocument(format!("not valid JSON: {e}")))?;
        Self::from_json(json)
    }

    /// Split the reserved entries off a document.
    pub fn from_json(document: Json) -> StoreResult<Self> {
        let Json::Object(mut body) = document else {
            return Err(StoreError::InvalidDocument(
                "document root is not an object".into(),
            ));
        };
        let meta = body
            .shift_remove(META_KEY)
            .ok_or_else(|| StoreError::InvalidDocument("missing metadata block".into()))?;
        let meta: DocumentMeta = serde_json::from_value(meta)
            .map_err(|e| StoreError::InvalidDocument(format!("bad metadata block: {e}")))?;
        let arrays = body
            .shift_remove(ARRAYS_KEY)
            .ok_or_else(|| StoreError::InvalidDocument("missing array side-table".into()))?;
        let arrays: BTreeMap<String, ArrayMeta> = serde_json::from_value(arrays)
            .map_err(|e| StoreError::InvalidDocument(format!("bad array side-table: {e}")))?;
        Ok(Self { body, arrays, meta })
    }

    /// Rebuild the value, loading every referenced array from `pool`.
    pub fn decode(&self, kind: VariableKind, pool: &dyn BlobPool) -> StoreResult<Value> {
        match kind {
            VariableKind::Mapping => self.object(&self.body, pool),
            VariableKind::Sequence => match (self.body.len(), self.body.get(LIST_KEY)) {
                (1, Some(Json::Array(items))) => self.array_items(items, pool),
                _ => Err(StoreError::InvalidDocument(format!(
                    "sequence document must hold exactly one {LIST_KEY:?} array"
                ))),
            },
            other => Err(StoreError::InvalidDocument(format!(
                "{other} variables are not stored as documents"
            ))),
        }
    }

    /// Compare the pool against the side-table.
    ///
    /// Every referenced blob is re-fingerprinted; pool files that no entry
    /// refers to are reported as orphans.
    pub fn check_blobs(&self, pool: &dyn BlobPool) -> StoreResult<BlobCheck> {
        let mut check = BlobCheck::default();
        for (key, meta) in &self.arrays {
            match pool.read(&meta.file)? {
                Some(bytes) if content_digest(&bytes, &meta.shape, meta.dtype) == meta.digest => {}
                Some(_) => check.mismatched.push(key.clone()),
                None => check.missing.push(key.clone()),
            }
        }
        check.orphaned = pool
            .list()?
            .into_iter()
            .filter(|file| !self.arrays.values().any(|meta| &meta.file == file))
            .collect();
        Ok(check)
    }

    fn resolve(&self, json: &Json, pool: &dyn BlobPool) -> StoreResult<Value> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Err(StoreError::InvalidDocument(format!(
                "boolean leaf {b} has no value representation"
            ))),
            Json::Number(n) => Ok(Value::Scalar(number(n))),
            // A string that names a side-table entry is a reference, even if
            // it was stored as text.
            Json::String(s) => match self.arrays.get(s) {
                Some(meta) => self.load_array(s, meta, pool).map(Value::Array),
                None => Ok(Value::Text(s.clone())),
            },
            Json::Array(items) => self.array_items(items, pool),
            Json::Object(map) => self.object(map, pool),
        }
    }

    fn array_items(&self, items: &[Json], pool: &dyn BlobPool) -> StoreResult<Value> {
        items
            .iter()
            .map(|item| self.resolve(item, pool))
            .collect::<StoreResult<Vec<_>>>()
            .map(Value::Sequence)
    }

    fn object(&self, map: &Map<String, Json>, pool: &dyn BlobPool) -> StoreResult<Value> {
        map.iter()
            .map(|(k, v)| self.resolve(v, pool).map(|v| (k.clone(), v)))
            .collect::<StoreResult<Vec<_>>>()
            .map(Value::Mapping)
    }

    fn load_array(&self, key: &str, meta: &ArrayMeta, pool: &dyn BlobPool) -> StoreResult<NdArray> {
        let bytes = pool
            .read(&meta.file)?
            .ok_or_else(|| StoreError::MissingArrayBlob {
                key: key.to_string(),
                file: meta.file.clone(),
            })?;
        let array =
            npzee_codec::decode(&bytes).map_err(|e| StoreError::from_codec(&meta.file, e))?;
        if array.shape != meta.shape || array.dtype != meta.dtype {
            return Err(StoreError::InvalidDocument(format!(
                "blob {} holds {}{:?} but the side-table records {}{:?}",
                meta.file, array.dtype, array.shape, meta.dtype, meta.shape
            )));
        }
        Ok(array)
    }
}

fn number(n: &Number) -> Scalar {
    match n.as_i64() {
        Some(i) => Scalar::Int(i),
        // Only floats and integers beyond i64 reach here.
        None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}
