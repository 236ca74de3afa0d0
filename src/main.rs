use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing::info;

use nutrilog::chart::format_amount;
use nutrilog::constants;
use nutrilog::extractor;
use nutrilog::gemini::GeminiClient;
use nutrilog::web_server::{self, WebConfig};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Gemini API key. When absent the key is asked for interactively.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the web UI.
    Serve {
        #[arg(long, default_value_t = 8501, help = "Port for the web server.")]
        port: u16,
        #[arg(long, help = "Directory holding the page templates.")]
        templates: Option<PathBuf>,
    },
    /// Analyse dishes and keep a meal log in the terminal.
    Chat,
    /// Analyse a single dish and print the result.
    Analyze {
        /// Name of the dish, e.g. "カレーライス".
        dish: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for GEMINI_API_KEY and friends)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g., RUST_LOG=info,nutrilog=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let client = GeminiClient::from_env();
    info!(model = client.model(), "nutrilog starting");

    match cli.command {
        Commands::Serve { port, templates } => {
            let config = WebConfig {
                port,
                templates_dir: templates.unwrap_or_else(|| PathBuf::from(constants::TEMPLATES_DIR.as_str())),
                static_dir: PathBuf::from(constants::STATIC_DIR.as_str()),
                api_key: cli.api_key,
            };

            tokio::select! {
                res = web_server::start_web_server(config, client) => {
                    res.context("Web server failed")?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl-C received, shutting down");
                }
            }
        }
        Commands::Chat => {
            let stdin = io::stdin();
            nutrilog::chat::run_chat_session(&client, cli.api_key, stdin.lock(), io::stdout())
                .await
                .context("Chat session failed")?;
        }
        Commands::Analyze { dish } => {
            let api_key = cli
                .api_key
                .context("APIキーを入力してください。(--api-key or GEMINI_API_KEY)")?;
            let text = client
                .describe_dish(&dish, &api_key)
                .await
                .context("AIによる解析に失敗しました")?;

            println!("AI解析結果\n{}\n", text.trim_end());
            let reading = extractor::extract(&text);
            if reading.is_empty() {
                println!("解析データがありません。");
            } else {
                println!("解析データ");
                for (nutrient, amount) in reading.iter() {
                    println!("  {}: {} {}", nutrient, format_amount(amount), nutrient.unit());
                }
            }
        }
    }

    Ok(())
}
