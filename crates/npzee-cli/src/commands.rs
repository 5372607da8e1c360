use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use npzee_bundle::{BundleReader, BundleWriter, ExportOptions};
use npzee_registry::{Registry, RegistryConfig};
use npzee_store::Workspace;
use npzee_types::{Scalar, Value};
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => RegistryConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => RegistryConfig::default(),
    };
    let format = cli.format;
    match cli.command {
        Command::Workspace(args) => cmd_workspace(config, args.action, format),
        Command::Vars(args) => cmd_vars(&open(config, &args.workspace)?, format),
        Command::Show(args) => cmd_show(&open(config, &args.workspace)?, &args.name, format),
        Command::Set(args) => cmd_set(&open(config, &args.workspace)?, args),
        Command::Verify(args) => cmd_verify(&open(config, &args.workspace)?, &args.name, format),
        Command::Rm(args) => cmd_rm(&open(config, &args.workspace)?, &args.name),
        Command::Clear(args) => cmd_clear(&open(config, &args.workspace)?),
        Command::Export(args) => cmd_export(&open(config, &args.workspace)?, args, format),
        Command::Import(args) => cmd_import(&open(config, &args.workspace)?, &args.bundle),
    }
}

/// Resolve a registered name, falling back to a directory path.
fn open(config: RegistryConfig, workspace: &str) -> anyhow::Result<Workspace> {
    let registry = Registry::open_existing(config)?;
    if let Ok(path) = registry.resolve(workspace) {
        return Ok(Workspace::open(path)?);
    }
    let path = Path::new(workspace);
    if path.is_dir() {
        return Ok(Workspace::open(path)?);
    }
    bail!("no workspace named or located at {workspace:?}")
}

fn cmd_workspace(
    config: RegistryConfig,
    action: WorkspaceAction,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut registry = Registry::open(config)?;
    match action {
        WorkspaceAction::Create { name } => {
            let ws = registry.create(&name)?;
            println!(
                "{} Created workspace {} at {}",
                "✓".green().bold(),
                name.bold(),
                ws.path().display()
            );
        }
        WorkspaceAction::Register { name, path } => {
            registry.register(&name, &path)?;
            println!("{} Registered {} → {}", "✓".green().bold(), name.bold(), path.display());
        }
        WorkspaceAction::List => {
            if format == OutputFormat::Json {
                let entries: Vec<_> = registry
                    .list()
                    .map(|(name, e)| {
                        json!({
                            "name": name,
                            "path": e.path.display().to_string(),
                            "created_at": e.created_at.to_rfc3339(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if registry.is_empty() {
                println!("No workspaces registered.");
            } else {
                for (name, e) in registry.list() {
                    println!(
                        "{:<20} {}  {}",
                        name.bold(),
                        e.path.display(),
                        e.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
                    );
                }
            }
        }
        WorkspaceAction::Remove { name, delete } => {
            let entry = registry.unregister(&name, delete)?;
            let note = if delete { " (files deleted)" } else { "" };
            println!("Removed workspace {} ({}){note}", name.bold(), entry.path.display());
        }
    }
    Ok(())
}

fn cmd_vars(ws: &Workspace, format: OutputFormat) -> anyhow::Result<()> {
    let vars = ws.list()?;
    if format == OutputFormat::Json {
        let vars: Vec<_> = vars
            .iter()
            .map(|(name, kind)| json!({ "name": name, "kind": kind.to_string() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&vars)?);
        return Ok(());
    }
    if vars.is_empty() {
        println!("No variables.");
    }
    for (name, kind) in vars {
        println!("{:<24} {}", name.bold(), kind.to_string().cyan());
    }
    Ok(())
}

fn cmd_show(ws: &Workspace, name: &str, format: OutputFormat) -> anyhow::Result<()> {
    let Some(value) = ws.load(name)? else {
        bail!("no variable named {name:?}");
    };
    let rendered = serde_json::to_string_pretty(&value_to_json(&value))?;
    match (format, value.kind()) {
        (OutputFormat::Text, Some(kind)) => {
            println!("{} ({})", name.bold(), kind.to_string().cyan());
            println!("{rendered}");
        }
        _ => println!("{rendered}"),
    }
    Ok(())
}

fn cmd_set(ws: &Workspace, args: SetArgs) -> anyhow::Result<()> {
    let value = parse_value(&args.value, args.text);
    ws.store(&args.name, &value)?;
    println!(
        "{} {} = {}",
        "✓".green().bold(),
        args.name.bold(),
        args.value
    );
    Ok(())
}

fn cmd_verify(ws: &Workspace, name: &str, format: OutputFormat) -> anyhow::Result<()> {
    let Some(check) = ws.verify(name)? else {
        bail!("no variable named {name:?}");
    };
    if format == OutputFormat::Json {
        let out = json!({
            "name": name,
            "clean": check.is_clean(),
            "mismatched": check.mismatched,
            "missing": check.missing,
            "orphaned": check.orphaned,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if check.is_clean() {
        println!("{} {} blobs match their digests", "✓".green().bold(), name.bold());
    } else {
        for key in &check.mismatched {
            println!("  {} {key}", "digest mismatch:".red());
        }
        for key in &check.missing {
            println!("  {} {key}", "missing blob:".red());
        }
        for file in &check.orphaned {
            println!("  {} {file}", "unreferenced:".yellow());
        }
    }
    if !check.is_clean() {
        bail!("{name:?} failed verification");
    }
    Ok(())
}

fn cmd_rm(ws: &Workspace, name: &str) -> anyhow::Result<()> {
    if ws.remove(name)? {
        println!("Removed {}", name.bold());
    } else {
        println!("No variable named {}", name.yellow());
    }
    Ok(())
}

fn cmd_clear(ws: &Workspace) -> anyhow::Result<()> {
    let count = ws.clear()?;
    println!("{} Cleared {count} entries", "✓".green().bold());
    Ok(())
}

fn cmd_export(ws: &Workspace, args: ExportArgs, format: OutputFormat) -> anyhow::Result<()> {
    let writer = BundleWriter::new(&ExportOptions {
        compression_level: args.level,
    });
    let info = writer.export(ws.path(), &args.out)?;
    if format == OutputFormat::Json {
        let out = json!({
            "path": args.out.display().to_string(),
            "files": info.file_count,
            "bytes": info.size_bytes,
            "checksum": info.checksum,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!(
            "{} Exported {} files ({} bytes) to {}",
            "✓".green().bold(),
            info.file_count,
            info.size_bytes,
            args.out.display()
        );
        println!("  Checksum: {}", info.checksum.dimmed());
    }
    Ok(())
}

fn cmd_import(ws: &Workspace, bundle: &Path) -> anyhow::Result<()> {
    let count = BundleReader::import(bundle, ws.path())
        .with_context(|| format!("importing {}", bundle.display()))?;
    println!("{} Imported {count} files into {}", "✓".green().bold(), ws.path().display());
    Ok(())
}

/// A number becomes a scalar unless `as_text` is set; anything else is text.
fn parse_value(raw: &str, as_text: bool) -> Value {
    if as_text {
        return Value::from(raw);
    }
    match Scalar::parse(raw) {
        Ok(scalar) => Value::Scalar(scalar),
        Err(_) => Value::from(raw),
    }
}

/// JSON rendering for display. Arrays are summarized, not dumped.
fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Scalar(Scalar::Int(i)) => json!(i),
        Value::Scalar(Scalar::Float(f)) => match serde_json::Number::from_f64(*f) {
            Some(n) => serde_json::Value::Number(n),
            None => json!(f.to_string()),
        },
        Value::Text(s) => json!(s),
        Value::Array(a) => json!({
            "array": { "dtype": a.dtype.name(), "shape": a.shape }
        }),
        Value::Sequence(items) => items.iter().map(value_to_json).collect(),
        Value::Mapping(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use npzee_types::NdArray;

    #[test]
    fn numbers_become_scalars() {
        assert_eq!(parse_value("42", false), Value::from(42i64));
        assert_eq!(parse_value("2.5", false), Value::from(2.5f64));
        assert_eq!(parse_value("42", true), Value::from("42"));
        assert_eq!(parse_value("hello", false), Value::from("hello"));
    }

    #[test]
    fn arrays_are_summarized() {
        let v = Value::mapping(vec![
            ("w", Value::from(NdArray::zeros(npzee_types::DType::F32, vec![2, 3]).unwrap())),
            ("n", Value::from(1i64)),
            ("bad", Value::from(f64::NAN)),
        ]);
        let j = value_to_json(&v);
        assert_eq!(j["w"]["array"]["dtype"], "float32");
        assert_eq!(j["w"]["array"]["shape"], json!([2, 3]));
        assert_eq!(j["n"], 1);
        assert_eq!(j["bad"], "NaN");
        let keys: Vec<&String> = j.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["w", "n", "bad"]);
    }

    fn run(config: &Path, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["npzee", "--config", config.to_str().unwrap()];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv)?)
    }

    #[test]
    fn workspace_lifecycle() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("npzee.toml");
        let root = tmp.path().join("root");
        std::fs::write(&config, format!("root = {:?}\n", root.to_str().unwrap())).unwrap();

        run(&config, &["workspace", "create", "lab"]).unwrap();
        run(&config, &["set", "lab", "x", "3"]).unwrap();
        run(&config, &["set", "lab", "greeting", "hi there"]).unwrap();
        run(&config, &["show", "lab", "x"]).unwrap();
        run(&config, &["--format", "json", "vars", "lab"]).unwrap();

        let ws = Workspace::open(root.join("lab")).unwrap();
        assert_eq!(ws.load("x").unwrap(), Some(Value::from(3i64)));
        assert_eq!(ws.load("greeting").unwrap(), Some(Value::from("hi there")));

        let bundle = tmp.path().join("lab.npzee.tar.zst");
        run(&config, &["export", "lab", bundle.to_str().unwrap()]).unwrap();
        let copy = tmp.path().join("copy");
        std::fs::create_dir(&copy).unwrap();
        run(&config, &["import", bundle.to_str().unwrap(), copy.to_str().unwrap()]).unwrap();
        assert_eq!(
            Workspace::open(&copy).unwrap().load("x").unwrap(),
            Some(Value::from(3i64))
        );

        ws.store("doc", &Value::mapping(vec![("w", Value::from(NdArray::vector(&[1.0f64])))]))
            .unwrap();
        run(&config, &["verify", "lab", "doc"]).unwrap();
        std::fs::write(root.join("lab").join("doc.data").join("stray.npy"), b"x").unwrap();
        assert!(run(&config, &["--format", "json", "verify", "lab", "doc"]).is_err());
        assert!(run(&config, &["verify", "lab", "absent"]).is_err());

        run(&config, &["rm", "lab", "x"]).unwrap();
        assert!(!ws.contains("x").unwrap());
        run(&config, &["clear", "lab"]).unwrap();
        assert!(ws.list().unwrap().is_empty());

        assert!(run(&config, &["show", "lab", "missing"]).is_err());
        assert!(run(&config, &["vars", "nowhere"]).is_err());

        run(&config, &["workspace", "remove", "lab", "--delete"]).unwrap();
        assert!(!root.join("lab").exists());
    }

    #[test]
    fn path_lookup_does_not_create_registry_root() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("npzee.toml");
        let root = tmp.path().join("never-created");
        std::fs::write(&config, format!("root = {:?}\n", root.to_str().unwrap())).unwrap();
        let dir = tmp.path().join("plain");
        std::fs::create_dir(&dir).unwrap();

        run(&config, &["set", dir.to_str().unwrap(), "x", "2.5"]).unwrap();
        run(&config, &["vars", dir.to_str().unwrap()]).unwrap();
        assert!(!root.exists());
        assert_eq!(
            Workspace::open(&dir).unwrap().load("x").unwrap(),
            Some(Value::from(2.5f64))
        );
    }
}
