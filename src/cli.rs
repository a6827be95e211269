//! Command-line interface.

use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::index::ToolIndex;
use crate::pipeline::{discover_entries, BatchReport, Pipeline, ToolEntry};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "toolpack", version, about = "Bundle tools, embed their metadata and package them")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Entry source file of a single tool
    #[arg(long, requires = "output_folder")]
    pub entry: Option<PathBuf>,

    /// Folder receiving the bundled code and definition.json
    #[arg(long = "outputFolder", alias = "output-folder", requires = "entry")]
    pub output_folder: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Package every tool project found under a directory
    Batch {
        /// Directory with one tool project per sub-folder (each with src/index.ts)
        #[arg(long)]
        apps_dir: PathBuf,
        /// Directory receiving one output folder per tool
        #[arg(long)]
        output_dir: PathBuf,
    },
    /// Recompute embeddings of already packaged tools in place
    Refresh {
        #[arg(long)]
        tools_dir: Option<PathBuf>,
    },
    /// List packaged tools
    List {
        #[arg(long)]
        tools_dir: Option<PathBuf>,
    },
    /// Find the packaged tools closest to a query
    Search {
        query: String,
        #[arg(long, default_value_t = 3)]
        top_k: usize,
        #[arg(long)]
        tools_dir: Option<PathBuf>,
    },
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let embedder = EmbeddingClient::new(config.embedding_endpoint.clone(), config.embedding_timeout)?;

    match cli.command {
        None => {
            let (Some(entry), Some(output_folder)) = (cli.entry, cli.output_folder) else {
                bail!("--entry and --outputFolder are required (or use a subcommand, see --help)");
            };
            let pipeline = Pipeline::new(embedder);
            let artifact = pipeline.package_tool(&ToolEntry::new(entry, &output_folder)).await?;
            tracing::info!(
                tool_id = %artifact.id(),
                output = %output_folder.display(),
                "Tool packaged"
            );
        }
        Some(Command::Batch { apps_dir, output_dir }) => {
            let entries = discover_entries(&apps_dir, &output_dir)
                .await
                .with_context(|| format!("cannot scan {}", apps_dir.display()))?;
            let pipeline = Pipeline::new(embedder);
            let report = BatchReport::from_results(pipeline.run(&entries).await);
            report.log();
            if report.has_failures() {
                bail!("{} of {} tools failed", report.failures.len(), report.total());
            }
        }
        Some(Command::Refresh { tools_dir }) => {
            let tools_dir = tools_dir.unwrap_or(config.tools_dir);
            let pipeline = Pipeline::new(embedder);
            let results = pipeline
                .refresh(&tools_dir)
                .await
                .with_context(|| format!("cannot scan {}", tools_dir.display()))?;
            let report = BatchReport::from_results(results);
            report.log();
            if report.has_failures() {
                bail!("{} of {} tools failed", report.failures.len(), report.total());
            }
        }
        Some(Command::List { tools_dir }) => {
            let tools_dir = tools_dir.unwrap_or(config.tools_dir);
            let index = ToolIndex::load(&tools_dir).await?;
            for tool in index.list() {
                println!("{}\t{}\t{}", tool.id, tool.name, tool.keywords.join(","));
            }
        }
        Some(Command::Search { query, top_k, tools_dir }) => {
            let tools_dir = tools_dir.unwrap_or(config.tools_dir);
            let index = ToolIndex::load(&tools_dir).await?;
            let query_embedding = embedder.get_embeddings(&query).await?;
            for hit in index.search(&query_embedding, top_k)? {
                println!("{:.4}\t{}\t{}", hit.score, hit.id, hit.name);
            }
        }
    }
    Ok(())
}
