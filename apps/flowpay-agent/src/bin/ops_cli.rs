use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};

#[derive(Parser)]
#[command(name = "flowpay-ops")]
#[command(about = "Operator commands for a running FlowPay agent service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Checks health and runs one command per action against the service.
    Smoke(ApiArgs),
    /// Sends a JSON command to /api/agent/execute.
    Execute(ExecuteArgs),
    /// Sends a natural-language prompt to /api/agent/command.
    Prompt(PromptArgs),
    /// Lists the actions the service accepts.
    Actions(ApiArgs),
    Health(ApiArgs),
}

#[derive(Args)]
struct ApiArgs {
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    api_base: String,
}

#[derive(Args)]
struct ExecuteArgs {
    #[command(flatten)]
    api: ApiArgs,
    /// Command object, e.g. '{"action":"show_pending_payments","data":{"filter":"all"}}'.
    command: String,
}

#[derive(Args)]
struct PromptArgs {
    #[command(flatten)]
    api: ApiArgs,
    #[arg(required = true, num_args = 1..)]
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Smoke(args) => run_smoke(args).await,
        Commands::Execute(args) => run_execute(args).await,
        Commands::Prompt(args) => run_prompt(args).await,
        Commands::Actions(args) => run_get(args, "/api/agent/actions").await,
        Commands::Health(args) => run_get(args, "/health").await,
    }
}

fn smoke_commands() -> Vec<Value> {
    vec![
        json!({
            "action": "create_payment",
            "data": {
                "vendor": "Test Vendor",
                "amount": 5000,
                "currency": "INR",
                "due_date": "2025-12-10",
                "description": "Test payment"
            }
        }),
        json!({"action": "show_pending_payments", "data": {"filter": "all"}}),
        json!({"action": "export_report", "data": {"period": "November", "format": "csv"}}),
        json!({
            "action": "set_reminder",
            "data": {"message": "Test reminder", "date": "2025-12-01", "time": "10:00"}
        }),
        json!({
            "action": "add_client",
            "data": {"name": "Test Client Inc", "email": "test@testclient.com"}
        }),
    ]
}

async fn run_smoke(args: ApiArgs) -> Result<()> {
    let api_base = normalized_api_base(&args.api_base)?;
    let client = http_client()?;

    let health = send_json(client.get(format!("{api_base}/health")))
        .await
        .context("health check failed")?;

    let mut results = Vec::new();
    let mut failures = 0_usize;
    for command in smoke_commands() {
        let action = command
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match send_json(
            client
                .post(format!("{api_base}/api/agent/execute"))
                .json(&command),
        )
        .await
        {
            Ok(response) => results.push(json!({"action": action, "ok": true, "response": response})),
            Err(error) => {
                failures += 1;
                results.push(json!({"action": action, "ok": false, "error": error.to_string()}));
            }
        }
    }

    print_json(&json!({
        "health": health.get("status").cloned().unwrap_or(Value::Null),
        "records": health.get("records").cloned().unwrap_or(Value::Null),
        "results": results,
    }))?;

    if failures > 0 {
        bail!("{failures} smoke command(s) failed");
    }
    Ok(())
}

async fn run_execute(args: ExecuteArgs) -> Result<()> {
    let api_base = normalized_api_base(&args.api.api_base)?;
    let raw = non_empty(&args.command).context("command JSON is required")?;
    let command: Value = serde_json::from_str(&raw).context("command is not valid JSON")?;

    let response = send_json(
        http_client()?
            .post(format!("{api_base}/api/agent/execute"))
            .json(&command),
    )
    .await
    .context("failed to execute command")?;
    print_json(&response)
}

async fn run_prompt(args: PromptArgs) -> Result<()> {
    let api_base = normalized_api_base(&args.api.api_base)?;
    let prompt = non_empty(&args.prompt.join(" ")).context("prompt is required")?;

    let response = send_json(
        http_client()?
            .post(format!("{api_base}/api/agent/command"))
            .json(&json!({"prompt": prompt})),
    )
    .await
    .context("failed to run prompt")?;
    print_json(&response)
}

async fn run_get(args: ApiArgs, path: &str) -> Result<()> {
    let api_base = normalized_api_base(&args.api_base)?;
    let response = send_json(
        http_client()?
            .get(format!("{api_base}{path}"))
            .header("accept", "application/json"),
    )
    .await
    .with_context(|| format!("failed to fetch {path}"))?;
    print_json(&response)
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")
}

fn normalized_api_base(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("--api-base must be a valid URL");
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn non_empty(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

async fn send_json(builder: reqwest::RequestBuilder) -> Result<Value> {
    let response = builder.send().await.context("request execution failed")?;
    let status = response.status();
    let body = response
        .text()
        .await
        .context("failed to read response body")?;

    let parsed: Value = serde_json::from_str(&body).unwrap_or_else(|_| Value::String(body.clone()));
    if !status.is_success() {
        let preview = match parsed {
            Value::String(_) => body,
            _ => serde_json::to_string(&parsed)
                .unwrap_or_else(|_| "<non-serializable body>".to_string()),
        };
        bail!("request failed with status {}: {}", status.as_u16(), preview);
    }
    Ok(parsed)
}

fn print_json(value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}
