use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "appraisal-cli")]
#[command(about = "Management CLI for the appraisal server", long_about = None)]
struct Cli {
    /// Management listener base URL.
    #[arg(short, long, default_value = "http://127.0.0.1:8090")]
    url: String,

    /// Public listener base URL, used by `appraise`.
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    public_url: String,

    /// Management API key; omit when auth is disabled.
    #[arg(short, long, env = "APPRAISAL_API_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show catalog generation, refresh phase and retiring generations
    Status,
    /// List running listeners
    Listeners,
    /// Ask the server to rebuild its catalog now
    Refresh,
    /// Submit a file for appraisal
    Appraise {
        /// File holding the text to classify ("-" for stdin)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))?,
        );
    }

    let admin = cli.url.trim_end_matches('/');
    let res = match cli.command {
        Commands::Status => {
            client.get(format!("{}/admin/status", admin))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Listeners => {
            client.get(format!("{}/admin/listeners", admin))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Refresh => {
            client.post(format!("{}/admin/catalog/refresh", admin))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Appraise { file } => {
            let text = if file.as_os_str() == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                std::fs::read_to_string(&file)?
            };
            client.post(format!("{}/appraisal", cli.public_url.trim_end_matches('/')))
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(text)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
