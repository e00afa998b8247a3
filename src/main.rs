use anyhow::Context;
use clap::{Parser, Subcommand};
use focus_assistant::client::{AssistantClient, ChatOutcome, ChatSession, GatewayClient, Notice};
use focus_assistant::config::AppConfig;
use focus_assistant::handler::{AppState, router};
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "focus-assistant", version, about = "Always Focused AI assistant")]
struct Cli {
    /// TOML configuration file; environment variables are used when absent
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the AI functions
    Serve {
        /// Address to listen on
        #[arg(long)]
        listen: Option<String>,
    },
    /// Chat with the assistant in the terminal
    Chat {
        /// Base URL of the functions service
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };

    match cli.command {
        Command::Serve { listen } => serve(config, listen).await,
        Command::Chat { url } => chat(config, url).await,
    }
}

async fn serve(mut config: AppConfig, listen: Option<String>) -> anyhow::Result<()> {
    if let Some(listen) = listen {
        config.server.listen_addr = listen;
    }
    config.validate_server()?;

    let temperature = config.gateway.temperature;
    let gateway = GatewayClient::new(config.gateway.clone())?;
    let state = Arc::new(AppState::new(Arc::new(gateway), temperature));
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;

    info!("Starting focus assistant functions...");
    info!("  Listen: {}", config.server.listen_addr);
    info!("  Gateway: {}", config.gateway.endpoint);
    info!("  Model: {}", config.gateway.model);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    info!("{}", state.metrics.snapshot());
    Ok(())
}

async fn chat(mut config: AppConfig, url: Option<String>) -> anyhow::Result<()> {
    if let Some(url) = url {
        config.assistant.functions_url = url;
    }
    config.validate_client()?;

    let client = AssistantClient::new(config.assistant.clone())?;
    let mut session = ChatSession::new(client);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("Ask anything. Ctrl-C cancels a reply; at the prompt, Ctrl-C or Ctrl-D quits.");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let interrupt = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        let Some(line) = next_input(&mut lines, interrupt).await? else {
            println!();
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let ask = session.ask(&line, |delta| {
            print!("{}", delta);
            let _ = std::io::stdout().flush();
        });

        tokio::select! {
            result = ask => match result {
                Ok(ChatOutcome::Replied(_)) => println!(),
                Ok(outcome) => {
                    if let Some(notice) = outcome.notice() {
                        print_notice(notice);
                    }
                }
                Err(e) => {
                    println!();
                    tracing::error!("Chat error: {}", e);
                    print_notice(&Notice::FAILED);
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                eprintln!("(cancelled)");
            }
        }
    }

    Ok(())
}

/// Next prompt line, or `None` on end of input or when `interrupt` fires first.
async fn next_input<R, F>(lines: &mut Lines<R>, interrupt: F) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = interrupt => Ok(None),
    }
}

fn print_notice(notice: &Notice) {
    eprintln!("{}: {}", notice.title, notice.description);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_next_input_reads_line() {
        let mut lines = BufReader::new(&b"hello\n"[..]).lines();
        let line = next_input(&mut lines, std::future::pending()).await.unwrap();
        assert_eq!(line.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_next_input_end_of_input() {
        let mut lines = BufReader::new(&b""[..]).lines();
        let line = next_input(&mut lines, std::future::pending()).await.unwrap();
        assert!(line.is_none());
    }

    #[tokio::test]
    async fn test_next_input_interrupted_while_waiting() {
        // Writer stays open so the read would block forever
        let (reader, _writer) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();
        let line = next_input(&mut lines, async {}).await.unwrap();
        assert!(line.is_none());
    }
}
