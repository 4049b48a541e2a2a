use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gdsave_core::{
    build_pretty_for, decrypt_container, encrypt_container, parse, DocumentStore, ExportFormat,
    FieldChanges, Generation, SongRef, StoreConfig,
};
use serde_json::json;
use tracing::{info, Level};

#[derive(Parser)]
#[command(author, version, about = "Local-levels save editor")]
struct Cli {
    /// Directory holding one sub-directory per game instance.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Instance directory name under the root.
    #[arg(short, long, global = true)]
    instance: Option<String>,
    /// TOML settings file; defaults apply when it does not exist.
    #[arg(long, global = true, default_value = "gdsave.toml")]
    config: PathBuf,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the entries of an instance as JSON.
    List,
    /// Print the decoded payload of an entry.
    Payload { id: String },
    /// Decode a container file into indented markup.
    Decode {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Encode a markup file into the on-disk container layout.
    Encode {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Import a packaged entry or raw payload file.
    Import {
        file: PathBuf,
        /// Entry id to merge into, or "new".
        #[arg(long, default_value = "new")]
        target: String,
    },
    /// Export an entry next to the given directory.
    Export {
        id: String,
        #[arg(long, value_enum, default_value_t = Format::Packaged)]
        format: Format,
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
    Rename { id: String, name: String },
    Describe { id: String, description: String },
    /// Set the requested star rating; unparseable values store 0.
    Stars { id: String, stars: String },
    Song {
        id: String,
        song_id: i64,
        #[arg(long, default_value_t = false)]
        custom: bool,
    },
    /// Replace an entry payload with the contents of a file.
    SetPayload { id: String, file: PathBuf },
    /// Print the whole container as markup, or replace it from a file.
    Markup {
        #[arg(long)]
        replace: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Raw,
    Packaged,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Raw => ExportFormat::Raw,
            Format::Packaged => ExportFormat::Packaged,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Where a session command finds its instance.
struct Target {
    root: PathBuf,
    instance: Option<String>,
    config: PathBuf,
}

impl Target {
    fn open(&self) -> Result<DocumentStore> {
        let config = StoreConfig::load_from(&self.config)
            .with_context(|| format!("load config {}", self.config.display()))?;
        let instance = self.instance()?;
        let mut store = DocumentStore::new(config);
        store
            .open(&self.root, instance)
            .with_context(|| format!("open instance '{instance}'"))?;
        Ok(store)
    }

    fn instance(&self) -> Result<&str> {
        self.instance
            .as_deref()
            .context("--instance is required for this command")
    }

    /// Opens the instance, applies `change` and saves the result.
    fn edit(&self, change: impl FnOnce(&mut DocumentStore) -> Result<()>) -> Result<()> {
        let mut store = self.open()?;
        change(&mut store)?;
        let instance = self.instance()?;
        store
            .persist(&self.root)
            .with_context(|| format!("persist instance '{instance}'"))?;
        info!(instance, "changes saved");
        Ok(())
    }
}

fn run(cli: Cli) -> Result<()> {
    let target = Target {
        root: cli.root,
        instance: cli.instance,
        config: cli.config,
    };
    match cli.command {
        Command::Decode { file, output } => decode_file(&file, output.as_deref()),
        Command::Encode { file, output } => encode_file(&file, &output),
        Command::List => {
            let entries = target.open()?.list_entries()?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
            Ok(())
        }
        Command::Payload { id } => {
            println!("{}", target.open()?.read_payload(&id)?);
            Ok(())
        }
        Command::Export {
            id,
            format,
            output_dir,
        } => export_entry(&target.open()?, &id, format.into(), &output_dir),
        Command::Markup { replace: None } => {
            println!("{}", target.open()?.document_markup()?);
            Ok(())
        }
        Command::Markup {
            replace: Some(file),
        } => {
            let text = read_text(&file)?;
            target.edit(|store| store.replace_document(&text).context("replace document"))
        }
        Command::Import { file, target: into } => {
            let payload = read_text(&file)?;
            target.edit(|store| {
                let id = store
                    .import_external(&payload, into.as_str())
                    .with_context(|| format!("import {}", file.display()))?;
                println!("{}", json!({ "id": id }));
                Ok(())
            })
        }
        Command::Rename { id, name } => target.edit(|store| Ok(store.rename(&id, &name)?)),
        Command::Describe { id, description } => {
            target.edit(|store| Ok(store.set_description(&id, &description)?))
        }
        Command::Stars { id, stars } => {
            target.edit(|store| Ok(store.set_star_request(&id, &stars)?))
        }
        Command::Song {
            id,
            song_id,
            custom,
        } => target.edit(|store| Ok(store.set_song(&id, SongRef::new(song_id, custom))?)),
        Command::SetPayload { id, file } => {
            let payload = read_text(&file)?;
            target.edit(|store| {
                let changes = FieldChanges {
                    payload: Some(payload),
                    ..FieldChanges::default()
                };
                Ok(store.write_fields(&id, changes)?)
            })
        }
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn decode_file(path: &Path, output: Option<&Path>) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let text = decrypt_container(&bytes).context("decode container")?;
    let root = parse(&text).context("parse container markup")?;
    let pretty = build_pretty_for(&root, Generation::from_container_text(&text));
    match output {
        Some(output) => {
            fs::write(output, pretty).with_context(|| format!("write {}", output.display()))?
        }
        None => println!("{pretty}"),
    }
    Ok(())
}

fn encode_file(path: &Path, output: &Path) -> Result<()> {
    let text = read_text(path)?;
    parse(&text).context("input is not container markup")?;
    let bytes = encrypt_container(&text)?;
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, bytes).with_context(|| format!("write {}", output.display()))?;
    Ok(())
}

fn export_entry(store: &DocumentStore, id: &str, format: ExportFormat, dir: &Path) -> Result<()> {
    let contents = store.export_entry(id, format)?;
    let target = dir.join(store.export_file_name(id, format)?);
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    fs::write(&target, contents).with_context(|| format!("write {}", target.display()))?;
    println!("{}", target.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use gdsave_core::{build, Dict, Node};

    fn write_empty_instance(root: &Path) {
        let table: Dict = [("_isArr", Node::Bool(true))].into_iter().collect();
        let container: Dict = [
            ("LLM_01", Node::Dict(table)),
            ("LLM_02", Node::Integer(45)),
        ]
        .into_iter()
        .collect();
        let dir = root.join("main");
        fs::create_dir_all(&dir).expect("mkdir");
        let bytes = encrypt_container(&build(&container)).expect("encrypt");
        fs::write(dir.join("CCLocalLevels.dat"), bytes).expect("write");
    }

    fn cli(root: &Path, args: &[&str]) -> Cli {
        let root = root.to_string_lossy().into_owned();
        let mut argv = vec!["gdsave", "--root", root.as_str(), "--instance", "main"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments parse")
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn import_and_rename_are_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_empty_instance(dir.path());
        let payload = dir.path().join("level.txt");
        fs::write(&payload, "1,1,2,15;").expect("write payload");

        run(cli(dir.path(), &["import", payload.to_str().expect("utf-8 path")])).expect("import");
        run(cli(dir.path(), &["rename", "k_1", "From CLI"])).expect("rename");

        let mut store = DocumentStore::default();
        store.open(dir.path(), "main").expect("open");
        let entries = store.list_entries().expect("list");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "From CLI");
        assert_eq!(store.read_payload("k_1").expect("payload"), "1,1,2,15;");
    }

    #[test]
    fn session_commands_need_an_instance() {
        let cli = Cli::try_parse_from(["gdsave", "list"]).expect("arguments parse");
        let err = run(cli).expect_err("missing instance");
        assert!(err.to_string().contains("--instance"));
    }
}
