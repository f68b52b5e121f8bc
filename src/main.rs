use clap::Parser;
use ollama_chat::config::toml_config::AppConfig;
use ollama_chat::core::assistant::load_conversation;
use ollama_chat::core::ChatModel;
use ollama_chat::utils::monitor::StreamMonitor;
use ollama_chat::utils::{logger, validation::Validate};
use ollama_chat::{
    stream_prompt, stream_to_writer, Assistant, CliConfig, Command, KnowledgeBase,
    LocalStorage, OllamaClient, Result,
};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    // 初始化日誌
    logger::init_logger(cli.verbose, config.monitoring.json_logs);
    tracing::debug!("CLI config: {:?}", cli);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    if let Err(e) = run(cli.command(), &config).await {
        // 串流輸出可能停在行中，先換行再輸出錯誤
        eprintln!();
        tracing::error!(
            "❌ Request failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        std::process::exit(e.exit_code());
    }
}

async fn run(command: Command, config: &AppConfig) -> Result<()> {
    let client = OllamaClient::from_config(config);
    tracing::debug!("Using Ollama backend at {}", client.base_url());

    match command {
        Command::Stream { .. } => run_stream(&client, config).await,
        Command::Ask {
            question,
            roles,
            history,
            stream,
        } => run_ask(client, config, question, roles, history, stream).await,
        Command::Health => run_health(&client, config).await,
    }
}

async fn run_stream(client: &OllamaClient, config: &AppConfig) -> Result<()> {
    let monitor = StreamMonitor::new(config.monitoring.enabled);
    let mut stdout = std::io::stdout();

    let summary = stream_prompt(
        client,
        &config.stream.model,
        &config.stream.prompt,
        &mut stdout,
        Some(&monitor),
    )
    .await?;

    if let Some(usage) = summary.usage {
        tracing::debug!(
            "Token usage - prompt: {}, completion: {}",
            usage.prompt_tokens,
            usage.completion_tokens
        );
    }
    monitor.log_final_stats();
    Ok(())
}

async fn run_ask(
    client: OllamaClient,
    config: &AppConfig,
    question: String,
    roles: Vec<i64>,
    history: Option<String>,
    stream: bool,
) -> Result<()> {
    let messages = load_conversation(&LocalStorage::new("."), history.as_deref(), question).await?;

    let storage = LocalStorage::new(&config.knowledge.base_dir);
    let knowledge = KnowledgeBase::load(&storage, &config.knowledge).await?;
    let assistant = Assistant::new(client.clone(), client, knowledge, config.assistant.clone());

    if stream {
        let prepared = assistant.prepare(&messages, &roles).await?;
        let monitor = StreamMonitor::new(config.monitoring.enabled);
        let chunks = assistant.chat_model().stream_chat(&prepared.request).await?;
        stream_to_writer(chunks, &mut std::io::stdout(), Some(&monitor)).await?;
        println!();
        monitor.log_final_stats();
    } else {
        let answer = assistant.answer(&messages, &roles).await?;
        println!("{}", answer.text);
    }

    Ok(())
}

async fn run_health(client: &OllamaClient, config: &AppConfig) -> Result<()> {
    let version = client.version().await?;
    tracing::info!("✅ Ollama {} reachable at {}", version, client.base_url());

    let storage = LocalStorage::new(&config.knowledge.base_dir);
    let (policies, faqs) = match KnowledgeBase::load(&storage, &config.knowledge).await {
        Ok(kb) => (kb.policies.len(), kb.faq_count()),
        Err(e) => {
            tracing::warn!("⚠️ Knowledge base unavailable: {}", e);
            (0, 0)
        }
    };

    let status = serde_json::json!({
        "status": "healthy",
        "ollama_version": version,
        "policies": policies,
        "faqs": faqs,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
