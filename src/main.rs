use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use juriscore::{AppState, Config, DocumentFile};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "juriscore", about = "Legal document analysis and live voice consultation")]
struct Cli {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/juriscore")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server
    Serve,

    /// Analyze a single PDF and print the structured result
    Analyze {
        /// Path to the PDF file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve => {
            let state = AppState::new(cfg.gemini, cfg.audio);
            let router = juriscore::create_router(state);

            let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
            info!("HTTP server listening on {}", addr);

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {}", addr))?;
            axum::serve(listener, router).await?;
        }

        Command::Analyze { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "document.pdf".to_string());

            let document = DocumentFile::from_bytes(name, "application/pdf", &bytes)?;

            let client = juriscore::GeminiClient::new(cfg.gemini);
            let result = client
                .analyze_document(&document)
                .await
                .context("analysis failed")?;

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
