use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the API Gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "GATEWAY_URL")]
    url: String,

    /// Correlation ID to send with the request.
    #[arg(long)]
    correlation_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gateway health with cached per-service status
    Health,
    /// List registered services and circuit state
    Services,
    /// Reset the circuit breaker of a service
    Reset {
        /// Service name, e.g. "ehr-proxy"
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match &cli.command {
        Commands::Health => client.get(format!("{base}/gateway/health")),
        Commands::Services => client.get(format!("{base}/gateway/services")),
        Commands::Reset { name } => client.post(format!("{base}/gateway/services/{name}/circuit/reset")),
    };
    let request = match &cli.correlation_id {
        Some(id) => request.header("x-correlation-id", id),
        None => request,
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let correlation_id = res
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    if !status.is_success() {
        eprintln!("Error: gateway returned status {} (correlation id {})", status, correlation_id);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
