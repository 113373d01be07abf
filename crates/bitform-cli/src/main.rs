//! `bitform` — sniff a file against the built-in format registry, dump its
//! field tree, and report a parse/validate failure with a non-zero exit
//! code.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use bitform_core::endian::Endian;
use bitform_core::fieldset::Node;
use bitform_core::settings::Settings;
use bitform_core::stream::InputStream;
use clap::Parser;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "bitform",
    about = "Sniffs a binary file and dumps its field tree",
    version
)]
struct Cli {
    /// File to sniff and parse.
    path: PathBuf,

    /// Suppress non-essential warnings.
    #[arg(short, long, env = "BITFORM_QUIET")]
    quiet: bool,

    /// Maximum number of bytes a raw-bytes field will render before
    /// truncating.
    #[arg(long, env = "BITFORM_MAX_BYTES", default_value_t = Settings::default().max_byte_length)]
    max_bytes: usize,

    /// File extension or MIME type hint, passed to the registry to
    /// reorder candidates before sniffing (does not skip validation).
    #[arg(long, env = "BITFORM_HINT")]
    hint: Option<String>,

    /// Set the logging level.
    #[arg(long, value_enum, default_value = "warn", env = "BITFORM_LOG")]
    log_level: LogLevel,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .init();

    let settings = Settings {
        max_byte_length: cli.max_bytes,
        quiet: cli.quiet,
        ..Settings::default()
    };

    if let Err(err) = run(&cli.path, cli.hint.as_deref(), settings) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }

    Ok(())
}

fn run(path: &PathBuf, hint: Option<&str>, settings: Settings) -> anyhow::Result<()> {
    let stream = InputStream::from_path(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let stream = Rc::new(stream);

    let registry = bitform_formats::default_registry();
    let parser = registry
        .identify(Rc::clone(&stream), Endian::Little, settings, hint)
        .context("no registered parser recognized this file")?;

    tracing::info!(format = parser.tags().id, "identified file format");

    parser.validate().context("parser rejected the input")?;

    let root = parser.root();
    dump_node(&Node::Set(Rc::clone(root)), 0)?;

    for warning in root.warnings() {
        if !settings.quiet {
            tracing::warn!("{warning}");
        }
    }

    Ok(())
}

fn dump_node(node: &Node, depth: usize) -> anyhow::Result<()> {
    let indent = "  ".repeat(depth);
    match node {
        Node::Leaf(_) => {
            println!("{indent}{} = {}", node.name(), node.human_display());
        }
        Node::Set(set) => {
            println!("{indent}{} {{", node.name());
            set.drive_to_completion()
                .with_context(|| format!("failed to materialize field set {}", node.name()))?;
            for index in 0..set.materialized_len() {
                if let Some(child) = set.child_at(index)? {
                    dump_node(&child, depth + 1)?;
                }
            }
            println!("{indent}}}");
        }
    }
    Ok(())
}
