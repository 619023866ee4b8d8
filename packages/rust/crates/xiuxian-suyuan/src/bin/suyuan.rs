#![allow(missing_docs)]

//! suyuan CLI: link sets and inlink/outlink hierarchies for a notes vault.
//!
//! Logging: set `RUST_LOG=xiuxian_suyuan=debug` to see cache and traversal
//! events on stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use xiuxian_suyuan::{DocumentId, LinkHierarchyEngine, VaultStore, resolve_link_hierarchy_config};

#[derive(Parser, Debug)]
#[command(
    name = "suyuan",
    about = "Suyuan link hierarchy CLI for local notes and canvas boards",
    arg_required_else_help = true
)]
struct Cli {
    /// Vault root directory.
    #[arg(
        long,
        short = 'r',
        value_name = "DIR",
        default_value = ".",
        global = true
    )]
    root: PathBuf,

    /// Explicit config file, deep-merged over `<root>/.config/suyuan.yaml`.
    #[arg(long = "conf", short = 'c', value_name = "FILE", global = true)]
    config_file: Option<PathBuf>,

    /// Output format.
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Json, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Return the link set of a note.
    Links {
        note: String,
        /// Drop any cached entry first.
        #[arg(long, default_value_t = false)]
        refresh: bool,
    },
    /// Return inlinks, farthest-first.
    Inlinks {
        note: String,
        #[arg(short, long)]
        depth: Option<usize>,
    },
    /// Return the outlink tree.
    Outlinks {
        note: String,
        #[arg(short, long)]
        depth: Option<usize>,
    },
    /// Return the combined hierarchy (inlinks, outlinks, canvas links, attachments, tags).
    Tree {
        note: String,
        #[arg(short, long)]
        depth: Option<usize>,
    },
    /// Warm the cache for every document and return counters.
    Stats,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

fn emit<T: Serialize>(value: &T, output: OutputFormat) -> Result<()> {
    let rendered = match output {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Pretty => serde_json::to_string_pretty(value),
    }
    .context("failed to serialize CLI output as JSON")?;
    println!("{rendered}");
    Ok(())
}

fn resolve_note(engine: &LinkHierarchyEngine, note: &str) -> Result<DocumentId> {
    engine
        .open_target(note, &DocumentId::new(""))
        .with_context(|| format!("note not found in vault: {note}"))
}

async fn execute(cli: &Cli, engine: &LinkHierarchyEngine) -> Result<()> {
    match &cli.command {
        Command::Links { note, refresh } => {
            let doc = resolve_note(engine, note)?;
            let links = engine
                .links(&doc, *refresh)
                .await
                .with_context(|| format!("failed to extract links for {doc}"))?;
            emit(&json!({"document": doc, "links": links.as_ref()}), cli.output)
        }
        Command::Inlinks { note, depth } => {
            let doc = resolve_note(engine, note)?;
            let hierarchy = engine
                .inlink_hierarchy(&doc, *depth)
                .await
                .with_context(|| format!("failed to walk inlinks of {doc}"))?;
            emit(
                &json!({
                    "document": doc,
                    "max_depth": hierarchy.max_depth,
                    "total": hierarchy.nodes.len(),
                    "nodes": hierarchy.nodes,
                }),
                cli.output,
            )
        }
        Command::Outlinks { note, depth } => {
            let doc = resolve_note(engine, note)?;
            let tree = engine
                .outlink_hierarchy(&doc, *depth)
                .await
                .with_context(|| format!("failed to walk outlinks of {doc}"))?;
            emit(
                &json!({
                    "document": doc,
                    "max_depth": tree.max_depth,
                    "total": tree.descendants().count(),
                    "tree": tree.to_branch(),
                }),
                cli.output,
            )
        }
        Command::Tree { note, depth } => {
            let doc = resolve_note(engine, note)?;
            if let Some(depth) = depth {
                engine.set_max_depth(*depth);
            }
            let view = engine
                .build_hierarchy(&doc)
                .await
                .with_context(|| format!("failed to build hierarchy of {doc}"))?;
            emit(
                &json!({
                    "document": view.start,
                    "name": view.name,
                    "max_depth": engine.max_depth(),
                    "inlinks": view.inlinks,
                    "outlinks": view.outlinks.to_branch(),
                    "outlink_depth": view.outlinks.max_depth,
                    "canvas_links": view.canvas_links,
                    "attachments": view.attachments,
                    "tags": view.tags,
                }),
                cli.output,
            )
        }
        Command::Stats => {
            let canvas_boards = engine
                .store()
                .list_canvas_boards()
                .await
                .context("failed to list canvas boards")?;
            let report = engine
                .rebuild_all()
                .await
                .context("failed to rebuild link cache")?;
            emit(
                &json!({
                    "documents": report.total,
                    "canvas_boards": canvas_boards.len(),
                    "rebuild": report,
                    "cache": engine.cache_stats(),
                    "config": engine.config(),
                }),
                cli.output,
            )
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("xiuxian_suyuan=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = resolve_link_hierarchy_config(&cli.root, cli.config_file.as_deref())
        .context("failed to resolve link hierarchy config")?;
    let store = VaultStore::open(&cli.root)
        .with_context(|| format!("failed to open vault at {}", cli.root.display()))?;
    let engine = LinkHierarchyEngine::new(Arc::new(store), config);
    let outcome = execute(&cli, &engine).await;
    engine.shutdown();
    outcome
}
