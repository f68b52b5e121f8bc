use anyhow::Context;
use clap::Parser;
use ollama_chat::config::toml_config::{AppConfig, DEFAULT_CONFIG_FILE};
use ollama_chat::utils::{logger, validation::Validate};
use ollama_chat::{LocalStorage, OllamaClient, Reembedder};

#[derive(Parser)]
#[command(name = "reembed")]
#[command(about = "Recompute dataset embeddings with the local Ollama embedding model")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Only run jobs whose input file name contains this text
    #[arg(long)]
    only: Option<String>,

    /// Show the jobs without calling the backend
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting re-embedding");
    let config = AppConfig::load_or_default(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let jobs: Vec<_> = config
        .reembed
        .jobs
        .iter()
        .filter(|job| {
            args.only
                .as_deref()
                .map(|only| job.input.contains(only))
                .unwrap_or(true)
        })
        .cloned()
        .collect();

    println!("📋 Re-embedding with {} into {}", config.assistant.embedding_model, config.reembed.base_dir);
    for (index, job) in jobs.iter().enumerate() {
        println!(
            "  {}. {} -> {} (field: {})",
            index + 1,
            job.input,
            job.output,
            job.text_field
        );
    }

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No embeddings will be requested");
        return Ok(());
    }

    let client = OllamaClient::from_config(&config);
    let storage = LocalStorage::new(&config.reembed.base_dir);
    let reembedder = Reembedder::new(client, storage, &config.assistant.embedding_model);

    match reembedder.run_all(&jobs).await {
        Ok(reports) => {
            let embedded: usize = reports.iter().map(|r| r.embedded).sum();
            let skipped: usize = reports.iter().map(|r| r.skipped).sum();
            println!("✅ Re-embedded {} entries across {} files ({} skipped)", embedded, reports.len(), skipped);
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ Error during re-embedding: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}
