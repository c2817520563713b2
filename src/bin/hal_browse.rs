//! hal-browse - Browse a HAL+JSON API from the command line
//!
//! Usage:
//!   cargo run --bin hal-browse --features cli -- http://api.example.com/
//!   cargo run --bin hal-browse --features cli -- http://api.example.com/ --rel orders --rel ex:customer
//!   cargo run --bin hal-browse --features cli -- http://api.example.com/ --rel search --param q=bob

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use hal_client::{HalClient, HttpTransportConfig, Representation, TemplateParams};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "hal-browse")]
#[command(about = "Fetch a HAL resource and follow its relations")]
struct Cli {
    /// Entry point URL
    url: String,

    /// Relation to follow from the current resource (repeatable, followed in order)
    #[arg(short, long)]
    rel: Vec<String>,

    /// Template variable for templated links, as name=value (repeatable)
    #[arg(short, long, value_parser = parse_param)]
    param: Vec<(String, String)>,

    /// Which member to follow when a relation has several (default: first)
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Request timeout in seconds
    #[arg(long, env = "HAL_CLIENT_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Output format: text, json
    #[arg(long, default_value = "text")]
    format: String,
}

fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = HttpTransportConfig::from_env()?;
    if let Some(secs) = cli.timeout {
        config.timeout = std::time::Duration::from_secs(secs);
    }
    let client = HalClient::http(config)?;

    let params: TemplateParams = cli
        .param
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();

    let mut current = client
        .get(&cli.url)
        .await
        .with_context(|| format!("Failed to fetch {}", cli.url))?;

    for rel in &cli.rel {
        let related = current
            .related_with(rel, &params)
            .await
            .with_context(|| format!("Failed to follow '{rel}' from {current}"))?;
        let count = related.len();
        current = related
            .into_iter()
            .nth(cli.index)
            .ok_or_else(|| anyhow!("'{rel}' has {count} member(s), no index {}", cli.index))?;
    }

    match cli.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&current.to_json()?)?),
        "text" => print_text(&current)?,
        other => bail!("unknown format '{other}' (expected text or json)"),
    }
    Ok(())
}

fn print_text(repr: &Representation) -> Result<()> {
    println!("=== {} ===", repr);
    println!();

    println!("Properties:");
    for (name, value) in repr.properties()? {
        println!("  {:<20} {}", name, value);
    }
    println!();

    println!("Relations:");
    for name in repr.relation_names()? {
        let hrefs = match repr.related_hrefs(name) {
            Ok(hrefs) => json!(hrefs),
            Err(e) => json!(format!("<{e}>")),
        };
        println!("  {:<20} {}", name, hrefs);
    }

    let namespaces = repr.namespaces()?;
    if !namespaces.is_empty() {
        println!();
        println!("CURIEs:");
        for prefix in namespaces.prefixes() {
            if let Some(template) = namespaces.template(prefix) {
                println!("  {:<20} {}", prefix, template);
            }
        }
    }
    Ok(())
}
