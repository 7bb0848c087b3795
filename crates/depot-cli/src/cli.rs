use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "depot",
    about = "Depot: content-addressed game file and client release server",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML config file.
    #[arg(short, long, global = true, env = "DEPOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Storage root; overrides the config file.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Ingest a game file into a collection
    Ingest(IngestArgs),
    /// List the files of a collection
    Manifest(ManifestArgs),
    /// List collections
    Collections,
    /// Publish and inspect client releases
    Release(ReleaseArgs),
    /// Show what a client on the given version would be told
    CheckUpdate(CheckUpdateArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address; overrides the config file.
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args)]
pub struct IngestArgs {
    pub collection: String,
    /// Path inside the collection, e.g. `maps/level1.pak`.
    pub path: String,
    /// Local file to upload.
    pub file: PathBuf,
    /// Source modification time (RFC 3339). Defaults to the file's mtime.
    #[arg(long)]
    pub modified: Option<String>,
}

#[derive(Args)]
pub struct ManifestArgs {
    pub collection: String,
}

#[derive(Args)]
pub struct ReleaseArgs {
    #[command(subcommand)]
    pub action: ReleaseAction,
}

#[derive(Subcommand)]
pub enum ReleaseAction {
    /// Publish a new client build
    Publish {
        version: String,
        file: PathBuf,
        /// Stored file name. Defaults to the local file's name.
        #[arg(long)]
        name: Option<String>,
    },
    /// Show or replace release notes
    Notes {
        version: String,
        #[arg(long)]
        set: Option<String>,
    },
    /// Show the latest release
    Latest,
    /// List releases, newest first
    List,
}

#[derive(Args)]
pub struct CheckUpdateArgs {
    pub current: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ingest() {
        let cli = Cli::try_parse_from(["depot", "ingest", "g", "maps/a.pak", "./a.pak"]).unwrap();
        if let Command::Ingest(args) = cli.command {
            assert_eq!(args.collection, "g");
            assert_eq!(args.path, "maps/a.pak");
            assert_eq!(args.file, PathBuf::from("./a.pak"));
            assert!(args.modified.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_release_notes() {
        let cli = Cli::try_parse_from(["depot", "release", "notes", "1.2.0", "--set", "Fixes"]).unwrap();
        match cli.command {
            Command::Release(ReleaseArgs { action: ReleaseAction::Notes { version, set } }) => {
                assert_eq!(version, "1.2.0");
                assert_eq!(set.as_deref(), Some("Fixes"));
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "depot", "check-update", "1.0", "--root", "/srv/depot", "--format", "json", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.root, Some(PathBuf::from("/srv/depot")));
        assert!(matches!(cli.command, Command::CheckUpdate(_)));
    }

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["depot", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind.as_deref(), Some("0.0.0.0:9000"));
        } else {
            panic!("wrong command");
        }
    }
}
