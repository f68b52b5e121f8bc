pub mod toml_config;

pub use toml_config::AppConfig;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};

#[cfg(feature = "cli")]
mod cli {
    use super::toml_config::{AppConfig, DEFAULT_CONFIG_FILE};
    use crate::utils::error::Result;
    use clap::{Parser, Subcommand};

    #[derive(Debug, Clone, Parser)]
    #[command(name = "ollama-chat")]
    #[command(about = "Stream chat completions from a local Ollama backend")]
    pub struct CliConfig {
        /// Path to TOML configuration file
        #[arg(short, long, global = true)]
        pub config: Option<String>,

        /// Override the Ollama base URL
        #[arg(long, global = true)]
        pub base_url: Option<String>,

        #[arg(short, long, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        /// Log latency and memory while streaming
        #[arg(long, global = true)]
        pub monitor: bool,

        /// Emit logs as JSON
        #[arg(long, global = true)]
        pub json_logs: bool,

        #[command(subcommand)]
        pub command: Option<Command>,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Send one prompt and print the reply as it streams (default)
        Stream {
            #[arg(long)]
            model: Option<String>,

            #[arg(long)]
            prompt: Option<String>,
        },
        /// Answer a question from the policy and FAQ knowledge base
        Ask {
            question: String,

            /// Role ids deciding which FAQ sets apply
            #[arg(long, value_delimiter = ',')]
            roles: Vec<i64>,

            /// JSON file with earlier turns: [{"role": "...", "content": "..."}]
            #[arg(long)]
            history: Option<String>,

            /// Print the answer as it streams
            #[arg(long)]
            stream: bool,
        },
        /// Check the backend and the knowledge base
        Health,
    }

    impl CliConfig {
        /// 載入 TOML 配置並套用命令列覆蓋設定
        pub fn resolve(&self) -> Result<AppConfig> {
            let mut config = match &self.config {
                Some(path) => AppConfig::from_file(path)?,
                None => AppConfig::load_or_default(DEFAULT_CONFIG_FILE)?,
            };

            if let Some(base_url) = &self.base_url {
                config.ollama.base_url = base_url.clone();
            }
            if self.monitor {
                config.monitoring.enabled = true;
            }
            if self.json_logs {
                config.monitoring.json_logs = true;
            }

            if let Some(Command::Stream { model, prompt }) = &self.command {
                if let Some(model) = model {
                    config.stream.model = model.clone();
                }
                if let Some(prompt) = prompt {
                    config.stream.prompt = prompt.clone();
                }
            }

            Ok(config)
        }

        pub fn command(&self) -> Command {
            self.command.clone().unwrap_or(Command::Stream {
                model: None,
                prompt: None,
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_no_subcommand_defaults_to_stream() {
            let cli = CliConfig::parse_from(["ollama-chat"]);
            assert!(matches!(
                cli.command(),
                Command::Stream {
                    model: None,
                    prompt: None
                }
            ));
        }

        #[test]
        fn test_stream_overrides_apply() {
            let cli = CliConfig::parse_from([
                "ollama-chat",
                "--base-url",
                "http://gpu-box:11434",
                "stream",
                "--model",
                "llama3.2",
                "--prompt",
                "Tell me a joke",
            ]);
            let config = cli.resolve().unwrap();
            assert_eq!(config.ollama.base_url, "http://gpu-box:11434");
            assert_eq!(config.stream.model, "llama3.2");
            assert_eq!(config.stream.prompt, "Tell me a joke");
        }

        #[test]
        fn test_ask_parses_roles() {
            let cli = CliConfig::parse_from(["ollama-chat", "ask", "How many leaves?", "--roles", "2,7"]);
            match cli.command() {
                Command::Ask { question, roles, .. } => {
                    assert_eq!(question, "How many leaves?");
                    assert_eq!(roles, vec![2, 7]);
                }
                other => panic!("expected ask, got {:?}", other),
            }
        }
    }
}
