use clap::Parser;
use reqwest::header::USER_AGENT;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "healthcheck")]
#[command(about = "Probe a service's health endpoint", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080/")]
    url: String,

    /// Must match one of the service's health-check user agents.
    #[arg(short = 'a', long, default_value = "GoogleHC/1.0")]
    user_agent: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = client
        .get(&cli.url)
        .header(USER_AGENT, &cli.user_agent)
        .send()
        .await?;
    let status = res.status();

    match res.json::<Value>().await {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(e) => eprintln!("Response was not a health report: {}", e),
    }

    if status.is_success() {
        Ok(())
    } else {
        eprintln!("Error: service reported status {}", status);
        std::process::exit(1);
    }
}
