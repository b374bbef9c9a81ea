mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::snapshot::ValidateArgs;
use commands::MetricArgs;

const LOG_ENV: &str = "REVDASH_LOG";

/// Revenue and customer-health dashboard metrics
#[derive(Parser)]
#[command(
    name = "revdash",
    version,
    about = "Revenue and customer-health dashboard metrics",
    long_about = "Computes monthly dashboard metrics (new customers, MRR per customer, \
                  gross revenue retention, ARR breakdown, revenue at risk, retention \
                  rate, customer map, onboarding completion and time to onboard) from \
                  a tenant snapshot with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// YAML or JSON settings file (window_months, as_of, tenant)
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Organizations that started a contract, per month
    NewCustomers(MetricArgs),
    /// Monthly recurring revenue per customer
    MrrPerCustomer(MetricArgs),
    /// Gross revenue retention
    Grr(MetricArgs),
    /// ARR movements per month and ARR at the end of the period
    ArrBreakdown(MetricArgs),
    /// Open renewal value split by likelihood
    RevenueAtRisk(MetricArgs),
    /// Renewals versus churned contracts, per month
    RetentionRate(MetricArgs),
    /// Health state and ARR per customer
    CustomerMap(MetricArgs),
    /// Share of onboarding attempts completed, per month
    OnboardingCompletion(MetricArgs),
    /// Average days to finish onboarding, per month
    TimeToOnboard(MetricArgs),
    /// Every metric for one tenant and period
    Dashboard(MetricArgs),
    /// Check a snapshot's references and report entity counts
    Validate(ValidateArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let config_path = cli.config;
    let settings = || config::load(config_path.as_deref());

    match cli.command {
        Commands::NewCustomers(args) => commands::customers::run_new_customers(args, &settings()?),
        Commands::MrrPerCustomer(args) => {
            commands::revenue::run_mrr_per_customer(args, &settings()?)
        }
        Commands::Grr(args) => commands::revenue::run_grr(args, &settings()?),
        Commands::ArrBreakdown(args) => commands::revenue::run_arr_breakdown(args, &settings()?),
        Commands::RevenueAtRisk(args) => commands::revenue::run_revenue_at_risk(args, &settings()?),
        Commands::RetentionRate(args) => commands::revenue::run_retention_rate(args, &settings()?),
        Commands::CustomerMap(args) => commands::customers::run_customer_map(args, &settings()?),
        Commands::OnboardingCompletion(args) => {
            commands::onboarding::run_onboarding_completion(args, &settings()?)
        }
        Commands::TimeToOnboard(args) => {
            commands::onboarding::run_time_to_onboard(args, &settings()?)
        }
        Commands::Dashboard(args) => commands::dashboard::run_dashboard(args, &settings()?),
        Commands::Validate(args) => commands::snapshot::run_validate(args),
        Commands::Version => Ok(serde_json::json!({
            "result": { "name": "revdash", "version": env!("CARGO_PKG_VERSION") }
        })),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let format = cli.output.clone();
    match run(cli) {
        Ok(value) => {
            output::format_output(&format, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
