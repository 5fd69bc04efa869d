//! sbin CLI - inspect cached script binaries.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scriptcache::ast::dump;
use scriptcache::sbin::{read_header_file, ScriptReader};

#[derive(Parser)]
#[command(name = "sbin", about = "Inspect cached script binaries", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Show header fields and block/string counts
    Info { file: PathBuf },
    /// Print the decoded tree
    Tree { file: PathBuf },
    /// List the string table in ID order
    Strings { file: PathBuf },
}

#[derive(Serialize)]
struct InfoReport {
    file: String,
    size: u64,
    string_table_offset: u64,
    last_modified: u64,
    blocks: u32,
    strings: usize,
    nodes: usize,
    roots: usize,
}

#[derive(Serialize)]
struct StringEntry<'a> {
    id: u32,
    value: &'a str,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Info { file } => cmd_info(file, cli.format),
        Command::Tree { file } => cmd_tree(file),
        Command::Strings { file } => cmd_strings(file, cli.format),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_info(path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    info!("Opening cache file: {}", path.display());
    let header = read_header_file(path)
        .with_context(|| format!("reading header of {}", path.display()))?;
    let size = std::fs::metadata(path)?.len();

    let mut reader = ScriptReader::new();
    let ast = reader
        .read_file(path)
        .with_context(|| format!("decoding {}", path.display()))?;

    let report = InfoReport {
        file: path.display().to_string(),
        size,
        string_table_offset: header.string_table_offset,
        last_modified: header.last_modified,
        blocks: reader.block_count(),
        strings: reader.strings().len(),
        nodes: ast.len(),
        roots: ast.roots().len(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("File:                {}", report.file);
            println!("Size:                {} bytes", report.size);
            println!("String table offset: {}", report.string_table_offset);
            println!("Source modified:     {}", report.last_modified);
            println!("Blocks:              {}", report.blocks);
            println!("Strings:             {}", report.strings);
            println!("Nodes:               {} ({} top-level)", report.nodes, report.roots);
        }
    }
    Ok(())
}

fn cmd_tree(path: &Path) -> anyhow::Result<()> {
    info!("Opening cache file: {}", path.display());
    let ast = ScriptReader::new()
        .read_file(path)
        .with_context(|| format!("decoding {}", path.display()))?;

    let stdout = std::io::stdout();
    dump::dump(&ast, &mut stdout.lock())?;
    Ok(())
}

fn cmd_strings(path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    info!("Opening cache file: {}", path.display());
    let mut reader = ScriptReader::new();
    reader
        .read_file(path)
        .with_context(|| format!("decoding {}", path.display()))?;

    match format {
        OutputFormat::Json => {
            let entries: Vec<StringEntry> = reader
                .strings()
                .iter()
                .map(|(id, value)| StringEntry { id, value })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            for (id, value) in reader.strings().iter() {
                println!("{:>6}  {:?}", id, value);
            }
        }
    }
    Ok(())
}
