use anyhow::Context;
use clap::Parser;
use etl::{Pipeline, PipelineConfig, config, sinks::QueryReport};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bank-etl")]
#[command(about = "Scrapes the largest banks by market cap, converts currencies and loads the result", long_about = None)]
#[command(version)]
struct Cli {
    /// Page holding the table: an HTTP(S) URL or a local HTML file
    #[arg(long, env = "ETL_SOURCE_URL", default_value = config::DEFAULT_SOURCE_URL)]
    source_url: String,

    #[arg(long, env = "ETL_RATES_PATH", default_value = config::DEFAULT_RATES_PATH)]
    rates: PathBuf,

    #[arg(long, env = "ETL_OUTPUT_PATH", default_value = config::DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    #[arg(long, env = "ETL_DATABASE_PATH", default_value = config::DEFAULT_DATABASE_PATH)]
    database: PathBuf,

    #[arg(long, env = "ETL_TABLE_NAME", default_value = config::DEFAULT_TABLE_NAME)]
    table: String,

    #[arg(long, env = "ETL_LOG_PATH", default_value = config::DEFAULT_LOG_PATH)]
    log: PathBuf,

    /// Currencies to convert into, in column order. Pass an empty value to use
    /// every currency in the rate file.
    #[arg(
        long,
        env = "ETL_CURRENCIES",
        value_delimiter = ',',
        default_values = config::DEFAULT_CURRENCIES
    )]
    currencies: Vec<String>,

    #[arg(long, env = "ETL_AVERAGE_CURRENCY", default_value = config::DEFAULT_AVERAGE_CURRENCY)]
    average_currency: String,

    /// Print the query results as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            source_url: self.source_url.clone(),
            rates_path: self.rates.clone(),
            output_path: self.output.clone(),
            database_path: self.database.clone(),
            table_name: self.table.clone(),
            log_path: self.log.clone(),
            currencies: self
                .currencies
                .iter()
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty())
                .collect(),
            average_currency: self.average_currency.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = cli.pipeline_config();

    etl::logging::init(&config.log_path, cli.verbose)
        .with_context(|| format!("Cannot open log file {}", config.log_path.display()))?;

    let pipeline = Pipeline::from_config(config).context("Invalid configuration")?;
    let outcome = pipeline.run().await.map_err(|e| {
        if e.is_fetch() {
            tracing::error!("Could not download {}", pipeline.config().source_url);
        }
        e
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.queries)?);
    } else {
        print_report(&outcome.queries, pipeline.config());
    }

    Ok(())
}

fn print_report(report: &QueryReport, config: &PipelineConfig) {
    println!("SELECT * FROM {}", config.table_name);
    println!("{}", report.columns.join("\t"));
    for row in &report.rows {
        let values: Vec<String> = row.values.iter().map(|v| format_cell(*v)).collect();
        println!("{}\t{}", row.key, values.join("\t"));
    }

    println!();
    println!("SELECT AVG({}) FROM {}", report.average_column, config.table_name);
    println!("{}", format_cell(report.average));

    println!();
    println!("SELECT Name FROM {} LIMIT 5", config.table_name);
    for name in &report.first_names {
        println!("{}", name);
    }
}

fn format_cell(value: Option<f64>) -> String {
    value.map_or_else(|| "NULL".to_string(), |v| v.to_string())
}
