//! Reason Relay CLI
//!
//! Runs one composed request from the command line and writes the framed
//! SSE event stream to stdout. Logs go to stderr so the data stream stays
//! clean for piping.

use clap::Parser;
use futures_util::StreamExt;
use std::io::Write;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reason_relay::{ComposeRequest, RelayConfig, StreamComposer};
use reason_relay_llm::{GenerationParams, Message};

#[derive(Parser, Debug)]
#[command(
    name = "reason-relay",
    version,
    about = "Stream a reasoner model's chain-of-thought into a summarizer model"
)]
struct Cli {
    /// The question to ask
    #[arg(required = true, trailing_var_arg = true)]
    prompt: Vec<String>,

    /// Optional system prompt prepended to the conversation
    #[arg(long)]
    system: Option<String>,

    /// Reasoner model override (defaults to RELAY_REASONER_MODEL)
    #[arg(long)]
    reasoner_model: Option<String>,

    /// Summarizer model override (defaults to RELAY_SUMMARIZER_MODEL)
    #[arg(long)]
    summarizer_model: Option<String>,

    /// Sampling temperature for both stages
    #[arg(long, default_value_t = 0.7)]
    temperature: f32,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reason_relay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = RelayConfig::from_env().map_err(|e| e.to_string())?;
    let reasoner = config.reasoner.build(config.proxy.as_ref());
    let summarizer = config.summarizer.build(config.proxy.as_ref());

    let mut messages = Vec::new();
    if let Some(system) = cli.system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(cli.prompt.join(" ")));

    let request = ComposeRequest {
        messages,
        params: GenerationParams {
            temperature: cli.temperature,
            ..GenerationParams::default()
        },
        reasoner_model: cli
            .reasoner_model
            .unwrap_or_else(|| config.reasoner.model.clone()),
        summarizer_model: cli
            .summarizer_model
            .unwrap_or_else(|| config.summarizer.model.clone()),
    };

    let composer = StreamComposer::new(reasoner, summarizer);
    let mut stream = composer.run(request);

    let mut stdout = std::io::stdout();
    while let Some(event) = stream.next().await {
        stdout
            .write_all(event.to_sse().as_bytes())
            .map_err(|e| e.to_string())?;
        stdout.flush().map_err(|e| e.to_string())?;
    }

    info!(
        session = %stream.session_id(),
        reasoner_tokens = stream.reasoner_tokens(),
        summarizer_tokens = stream.summarizer_tokens(),
        "relay finished"
    );
    Ok(())
}
