use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Inspect a running API gateway", long_about = None)]
struct Cli {
    /// Gateway listener, serves the aggregate health endpoint.
    #[arg(short, long, default_value = "http://localhost:8000")]
    gateway: String,

    /// Admin listener.
    #[arg(short, long, default_value = "http://localhost:8081")]
    admin: String,

    /// Path of the aggregate health endpoint.
    #[arg(long, default_value = "/health")]
    health_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate gateway health
    Health,
    /// Gateway status summary
    Status,
    /// Per-endpoint health, load and latency
    Backends,
    /// Route table in match order
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let url = match cli.command {
        Commands::Health => format!("{}{}", cli.gateway.trim_end_matches('/'), cli.health_path),
        Commands::Status => format!("{}/admin/status", cli.admin.trim_end_matches('/')),
        Commands::Backends => format!("{}/admin/backends", cli.admin.trim_end_matches('/')),
        Commands::Routes => format!("{}/admin/routes", cli.admin.trim_end_matches('/')),
    };

    let res = client.get(url).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let body = res.text().await?;

    // The health endpoint answers 503 with a JSON report when everything is down.
    match serde_json::from_str::<Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", body),
    }

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        std::process::exit(1);
    }
    Ok(())
}
