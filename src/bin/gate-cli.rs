use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, USER_AGENT};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Command-line client for the gated resource API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Origin header to declare (must be allow-listed in hardened mode).
    #[arg(short, long)]
    origin: Option<String>,

    #[arg(long, default_value = "Mozilla/5.0 (gate-cli)")]
    user_agent: String,

    /// Internal secret, only honored for requests from loopback.
    #[arg(long, env = "INTERNAL_SECRET", hide_env_values = true)]
    internal_secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all resources
    List,
    /// Create a resource
    Create { text: String },
    /// Replace the text of a resource
    Update { id: u64, text: String },
    /// Delete a resource
    Delete { id: u64 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(&cli.user_agent)?);
    if let Some(origin) = &cli.origin {
        headers.insert(ORIGIN, HeaderValue::from_str(origin)?);
    }
    if let Some(secret) = &cli.internal_secret {
        headers.insert("x-internal-secret", HeaderValue::from_str(secret)?);
    }

    let collection = format!("{}/resource", cli.url.trim_end_matches('/'));

    let request = match cli.command {
        Commands::List => client.get(&collection),
        Commands::Create { text } => client.post(&collection).json(&json!({ "text": text })),
        Commands::Update { id, text } => client
            .put(format!("{collection}/{id}"))
            .json(&json!({ "text": text })),
        Commands::Delete { id } => client.delete(format!("{collection}/{id}")),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Some(retry) = res.headers().get(reqwest::header::RETRY_AFTER) {
            eprintln!("Retry after: {}s", retry.to_str().unwrap_or("?"));
        }
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
