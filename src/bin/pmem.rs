//! CLI entry point for the `pmem` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use process_memory::cli::commands;
use process_memory::engine::{ContextOptions, ImportFormat};
use process_memory::{EntryBuilder, EntryStore, PmemError, SearchFilter, StoreConfig};

#[derive(Parser)]
#[command(
    name = "pmem",
    about = "Process memory CLI: append-only knowledge log with a link graph"
)]
struct Cli {
    /// Path to the JSONL log (overrides PMEM_LOG and the config file)
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format: "text" (default) or "json"
    #[arg(long, global = true, default_value = "text")]
    format: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a new entry
    Add {
        /// Entry id
        id: String,
        /// Entry type, e.g. decision, milestone, learning
        #[arg(value_name = "TYPE")]
        entry_type: String,
        /// Title
        #[arg(long, default_value = "")]
        title: String,
        /// Summary
        #[arg(long, default_value = "")]
        summary: String,
        /// Category
        #[arg(long, default_value = "")]
        category: String,
        /// Linked entry id (repeatable)
        #[arg(long = "link")]
        links: Vec<String>,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Append a raw JSON object as an entry
    AddJson {
        /// The JSON object
        json: String,
    },
    /// Get the latest record for an entry
    Get {
        /// Entry id
        id: String,
    },
    /// Show every record for an entry, oldest first
    History {
        /// Entry id
        id: String,
    },
    /// Search entries
    Search {
        /// Case-insensitive keyword in title or summary
        #[arg(long)]
        keyword: Option<String>,
        /// Exact category
        #[arg(long)]
        category: Option<String>,
        /// Exact type
        #[arg(long = "type")]
        entry_type: Option<String>,
        /// Required tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Include deprecated entries
        #[arg(long)]
        include_deprecated: bool,
    },
    /// Deprecate an entry by appending a new record
    Deprecate {
        /// Entry id
        id: String,
        /// Reason
        #[arg(long)]
        reason: Option<String>,
    },
    /// Raw traversal, dangling references included
    Related {
        /// Entry id
        id: String,
        /// Maximum hops
        #[arg(long)]
        depth: Option<u32>,
        /// Also follow incoming links
        #[arg(long)]
        reverse: bool,
    },
    /// Related entries resolved for display
    Context {
        /// Entry id
        id: String,
        /// Maximum hops
        #[arg(long)]
        depth: Option<u32>,
        /// Also follow incoming links
        #[arg(long)]
        reverse: bool,
        /// Keep link targets with no record
        #[arg(long)]
        include_dangling: bool,
        /// Keep deprecated entries
        #[arg(long)]
        include_deprecated: bool,
    },
    /// Nodes and edges around an entry
    Network {
        /// Entry id
        id: String,
        /// Maximum hops
        #[arg(long, default_value = "2")]
        depth: u32,
    },
    /// Store and graph statistics
    Stats,
    /// Import entries from a JSON or JSONL file
    Import {
        /// File to import
        file: PathBuf,
        /// Input format: json or jsonl (detected from extension if omitted)
        #[arg(long = "input-format")]
        input_format: Option<String>,
        /// Validate without appending
        #[arg(long)]
        validate_only: bool,
    },
    /// Export the latest entries as JSON
    Export {
        /// Exact category
        #[arg(long)]
        category: Option<String>,
        /// Include deprecated entries
        #[arg(long)]
        include_deprecated: bool,
        /// Pretty-print JSON
        #[arg(long)]
        pretty: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let json = cli.format == "json";

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let result = run(cli, json);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let code = match &e {
            PmemError::Io(_) | PmemError::StoreUnavailable { .. } => 1,
            PmemError::MalformedEntry(_) | PmemError::Json(_) | PmemError::Config(_) => 2,
            PmemError::EntryNotFound(_) => 4,
        };
        process::exit(code);
    }
}

fn run(cli: Cli, json: bool) -> Result<(), PmemError> {
    let config = StoreConfig::resolve(cli.log.as_deref(), cli.config.as_deref())?;
    let store = EntryStore::open(config.log_path())?;

    let result = match cli.command {
        Commands::Add {
            id,
            entry_type,
            title,
            summary,
            category,
            links,
            tags,
        } => {
            let entry = EntryBuilder::new(id, entry_type)
                .title(title)
                .summary(summary)
                .category(category)
                .links(links)
                .tags(tags)
                .build();
            commands::cmd_add(&store, entry, json)
        }
        Commands::AddJson { json: raw } => commands::cmd_add_json(&store, &raw, json),
        Commands::Get { id } => commands::cmd_get(&store, &id, json),
        Commands::History { id } => commands::cmd_history(&store, &id, json),
        Commands::Search {
            keyword,
            category,
            entry_type,
            tags,
            include_deprecated,
        } => {
            let mut filter = SearchFilter::new()
                .tags(tags)
                .include_deprecated(include_deprecated);
            if let Some(k) = keyword {
                filter = filter.keyword(k);
            }
            if let Some(c) = category {
                filter = filter.category(c);
            }
            if let Some(t) = entry_type {
                filter = filter.entry_type(t);
            }
            commands::cmd_search(&store, &filter, json)
        }
        Commands::Deprecate { id, reason } => {
            commands::cmd_deprecate(&store, &id, reason.as_deref(), json)
        }
        Commands::Related { id, depth, reverse } => commands::cmd_related(
            &store,
            &id,
            depth.unwrap_or(config.default_depth),
            reverse,
            json,
        ),
        Commands::Context {
            id,
            depth,
            reverse,
            include_dangling,
            include_deprecated,
        } => {
            let defaults = ContextOptions::from_config(&config);
            let options = defaults
                .depth(depth.unwrap_or(defaults.depth))
                .include_reverse(reverse)
                .include_dangling(include_dangling || defaults.include_dangling)
                .include_deprecated(include_deprecated || defaults.include_deprecated);
            commands::cmd_context(&store, &id, &options, json)
        }
        Commands::Network { id, depth } => commands::cmd_network(&store, &id, depth, json),
        Commands::Stats => commands::cmd_stats(&store, json),
        Commands::Import {
            file,
            input_format,
            validate_only,
        } => {
            let format = match input_format {
                Some(name) => Some(ImportFormat::from_name(&name).ok_or_else(|| {
                    PmemError::MalformedEntry(format!("unknown import format: {name}"))
                })?),
                None => None,
            };
            commands::cmd_import(&store, &file, format, validate_only, json)
        }
        Commands::Export {
            category,
            include_deprecated,
            pretty,
        } => {
            let mut filter = SearchFilter::new().include_deprecated(include_deprecated);
            if let Some(c) = category {
                filter = filter.category(c);
            }
            commands::cmd_export(&store, &filter, pretty)
        }
    };

    store.close();
    result
}
