use std::fs::File;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use colored::Colorize;
use depot_catalog::{ArtifactRecord, ReleaseRecord};
use depot_ingest::{IngestKind, IngestOutcome, IngestRequest};
use depot_server::{open_storage, DepotServer, ServerConfig};
use depot_types::{CollectionId, RelativePath, Version};
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Ingest(args) => cmd_ingest(&config, format, args),
        Command::Manifest(args) => cmd_manifest(&config, format, args),
        Command::Collections => cmd_collections(&config, format),
        Command::Release(args) => cmd_release(&config, format, args.action),
        Command::CheckUpdate(args) => cmd_check_update(&config, format, args),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.storage_root = root.clone();
    }
    config.validate()?;
    tracing::debug!(
        root = %config.storage_root.display(),
        catalog = %config.catalog_path().display(),
        "configuration loaded"
    );
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid listen address {bind:?}"))?;
    }
    let server = DepotServer::open(config)?;
    println!(
        "{} depot server on {} (root: {})",
        "✓".green().bold(),
        server.config().bind_addr.to_string().bold(),
        server.config().storage_root.display()
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn file_mtime(path: &Path) -> Option<DateTime<Utc>> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}

fn cmd_ingest(config: &ServerConfig, format: OutputFormat, args: IngestArgs) -> anyhow::Result<()> {
    let (engine, _) = open_storage(config)?;
    let mut request = IngestRequest::new(
        CollectionId::new(args.collection)?,
        RelativePath::new(args.path)?,
    );
    let modified = match args.modified {
        Some(text) => Some(
            DateTime::parse_from_rfc3339(&text)
                .with_context(|| format!("invalid --modified {text:?}"))?
                .with_timezone(&Utc),
        ),
        None => file_mtime(&args.file),
    };
    if let Some(at) = modified {
        request = request.modified_at(at);
    }

    let mut file =
        File::open(&args.file).with_context(|| format!("opening {}", args.file.display()))?;
    let outcome = engine.ingest(&request, &mut file)?;

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "outcome": outcome.kind(),
            "record": outcome.record(),
        }));
    }
    let record = outcome.record();
    let label = match outcome.kind() {
        IngestKind::Created => "created".green().bold(),
        IngestKind::Updated => "updated".yellow().bold(),
        IngestKind::Unchanged => "unchanged".dimmed(),
    };
    println!(
        "{} {}/{} ({} bytes, {})",
        label,
        record.collection,
        record.path,
        record.size,
        record.hash.short_hex().cyan()
    );
    if let IngestOutcome::Updated { archived, .. } = &outcome {
        println!("  previous version archived to {}", archived.path.display());
    }
    Ok(())
}

fn print_artifact(record: &ArtifactRecord) {
    println!(
        "  {}  {:>10}  {}  {}",
        record.hash.short_hex().cyan(),
        record.size,
        record.uploaded_at.format("%Y-%m-%d %H:%M:%S"),
        record.path
    );
}

fn cmd_manifest(config: &ServerConfig, format: OutputFormat, args: ManifestArgs) -> anyhow::Result<()> {
    let (engine, _) = open_storage(config)?;
    let collection = CollectionId::new(args.collection)?;
    let files = engine.manifest(&collection)?;
    if format == OutputFormat::Json {
        return print_json(&files);
    }
    if files.is_empty() {
        println!("Collection {} is empty.", collection.to_string().yellow());
        return Ok(());
    }
    println!("Collection {} ({} files)", collection.to_string().yellow().bold(), files.len());
    for record in &files {
        print_artifact(record);
    }
    Ok(())
}

fn cmd_collections(config: &ServerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let (engine, _) = open_storage(config)?;
    let collections = engine.collections()?;
    if format == OutputFormat::Json {
        return print_json(&collections);
    }
    for c in &collections {
        println!("{}", c.to_string().yellow());
    }
    Ok(())
}

fn print_release(record: &ReleaseRecord) {
    println!(
        "{}  {}  {}  {} bytes  {}",
        record.version.to_string().green().bold(),
        record.hash.short_hex().cyan(),
        record.uploaded_at.format("%Y-%m-%d %H:%M:%S"),
        record.size,
        record.name
    );
}

fn cmd_release(config: &ServerConfig, format: OutputFormat, action: ReleaseAction) -> anyhow::Result<()> {
    let (_, registry) = open_storage(config)?;
    match action {
        ReleaseAction::Publish { version, file, name } => {
            let version = Version::new(version)?;
            let name = match name {
                Some(n) => n,
                None => file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .with_context(|| format!("{} has no usable file name", file.display()))?,
            };
            let file_name = RelativePath::new(name)?;
            let mut reader =
                File::open(&file).with_context(|| format!("opening {}", file.display()))?;
            let record = registry.publish(&version, &file_name, &mut reader)?;
            if format == OutputFormat::Json {
                return print_json(&record);
            }
            println!("{} Published", "✓".green().bold());
            print_release(&record);
        }
        ReleaseAction::Notes { version, set } => {
            let version = Version::new(version)?;
            if let Some(notes) = set {
                if !registry.set_release_notes(&version, &notes)? {
                    anyhow::bail!("no release {version}");
                }
            }
            let (notes, hash) = registry.release_notes_and_hash(&version)?;
            if format == OutputFormat::Json {
                return print_json(&serde_json::json!({
                    "version": version,
                    "release_notes": notes,
                    "hash": hash,
                }));
            }
            println!("{} ({})", version.to_string().green().bold(), hash.short_hex().cyan());
            println!("{notes}");
        }
        ReleaseAction::Latest => {
            let record = registry.latest()?;
            if format == OutputFormat::Json {
                return print_json(&record);
            }
            print_release(&record);
        }
        ReleaseAction::List => {
            let releases = registry.releases()?;
            if format == OutputFormat::Json {
                return print_json(&releases);
            }
            if releases.is_empty() {
                println!("No releases published.");
            }
            for record in &releases {
                print_release(record);
            }
        }
    }
    Ok(())
}

fn cmd_check_update(config: &ServerConfig, format: OutputFormat, args: CheckUpdateArgs) -> anyhow::Result<()> {
    let (_, registry) = open_storage(config)?;
    let info = registry.client_update_info(&args.current);
    if format == OutputFormat::Json {
        return print_json(&info);
    }
    match &info.latest_version {
        None => println!("{}", info.release_notes.dimmed()),
        Some(latest) => {
            let status = if info.is_mandatory {
                "update required".red().bold()
            } else {
                "up to date".green().bold()
            };
            println!("Latest: {}  ({})", latest.to_string().bold(), status);
            println!("Download: {}", config.release_download_url(latest.as_str()));
            println!("{}", info.release_notes);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(root: &Path, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["depot", "--root", root.to_str().unwrap()];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn ingest_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let file = dir.path().join("level1.pak");
        std::fs::write(&file, b"map data").unwrap();
        let file = file.to_str().unwrap();

        run(&root, &["ingest", "space-race", "maps/level1.pak", file]).unwrap();
        run(&root, &["ingest", "space-race", "maps/level1.pak", file]).unwrap();
        run(&root, &["manifest", "space-race"]).unwrap();
        run(&root, &["--format", "json", "collections"]).unwrap();

        assert_eq!(
            std::fs::read(root.join("games/space-race/maps/level1.pak")).unwrap(),
            b"map data"
        );
    }

    #[test]
    fn release_commands() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let file = dir.path().join("client.exe");
        std::fs::write(&file, b"build").unwrap();
        let file = file.to_str().unwrap();

        run(&root, &["release", "publish", "1.0.0", file]).unwrap();
        assert!(run(&root, &["release", "publish", "1.0.0", file]).is_err());
        run(&root, &["release", "notes", "1.0.0", "--set", "First build"]).unwrap();
        assert!(run(&root, &["release", "notes", "2.0.0", "--set", "nope"]).is_err());
        run(&root, &["release", "latest"]).unwrap();
        run(&root, &["check-update", "0.9.0"]).unwrap();

        assert!(root.join("client/1.0.0/client.exe").is_file());
    }

    #[test]
    fn bad_collection_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"x").unwrap();
        assert!(run(dir.path(), &["ingest", "deprecated", "a", file.to_str().unwrap()]).is_err());
    }
}
