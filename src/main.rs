use anyhow::{Context, Result};
use clap::Parser;
use paypal_connector::{
    auth::{Credentials, Environment},
    config::Config,
    dispatch::ErrorMode,
    operations::{Operation, Resource},
    params::ItemParameters,
};
use std::path::PathBuf;

/// paypal-connector - run PayPal transaction and invoicing operations
///
/// Reads parameter bags from a JSON file (an array, or a single object) and
/// prints the produced records as a JSON array.
///
/// Examples:
///   paypal-connector --resource transaction --operation getTransactions --input search.json
///   paypal-connector --resource invoice --operation createInvoice --input invoices.json
#[derive(Parser, Debug)]
#[command(author, version = env!("PAYPAL_CONNECTOR_VERSION"), about)]
struct Cli {
    /// REST app client ID
    #[arg(long, env = "PAYPAL_CLIENT_ID", value_name = "ID")]
    pub client_id: String,

    /// REST app client secret
    #[arg(long, env = "PAYPAL_CLIENT_SECRET", value_name = "SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// sandbox or production
    #[arg(long, env = "PAYPAL_ENVIRONMENT", default_value_t = Environment::Sandbox)]
    pub environment: Environment,

    /// Base URL override for the PayPal API
    #[arg(long = "api-url", value_name = "URL")]
    pub api_url: Option<String>,

    /// transaction or invoice
    #[arg(long, default_value_t = Resource::Transaction)]
    pub resource: Resource,

    /// e.g. getTransactions, createInvoice, listInvoices
    #[arg(long)]
    pub operation: String,

    /// JSON file with the parameter bags; one empty bag when omitted
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Emit an error record for a failing item instead of stopping
    #[arg(long)]
    pub continue_on_fail: bool,
}

fn read_items(input: Option<&PathBuf>) -> Result<Vec<ItemParameters>> {
    match input {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input file {:?}", path))?;
            ItemParameters::parse_items(&content)
                .with_context(|| format!("Failed to parse input file {:?}", path))
        }
        None => Ok(vec![ItemParameters::default()]),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let operation = Operation::resolve(cli.resource, &cli.operation)?;
    let items = read_items(cli.input.as_ref())?;
    let mode = ErrorMode::from_continue_on_fail(cli.continue_on_fail);

    let credentials = Credentials {
        client_id: cli.client_id,
        client_secret: cli.client_secret,
        environment: cli.environment,
    };
    let dispatcher = Config::new(credentials, cli.api_url)?.into_dispatcher();

    let records = dispatcher.run(operation, &items, mode).await?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
