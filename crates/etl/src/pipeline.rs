use storage::Database;
use tracing::{error, info};

use crate::Result;
use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::extractors::TableExtractor;
use crate::logging::PROGRESS_TARGET;
use crate::rates::RateLoader;
use crate::sinks::{CsvSink, QueryReport, QueryRunner, TableSink};
use crate::sources::source_for;
use crate::traits::HtmlSource;
use crate::transformer::{TransformReport, Transformer};

/// What a successful run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub dataset: Dataset,
    pub report: TransformReport,
    pub queries: QueryReport,
}

/// Fetch → extract → transform → load → query, in that order, once.
pub struct Pipeline {
    config: PipelineConfig,
    source: Box<dyn HtmlSource>,
}

impl Pipeline {
    /// Validates `config` and picks the HTML source from `config.source_url`.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.check()?;
        let source = source_for(&config.source_url);
        Ok(Self { config, source })
    }

    pub fn with_source(config: PipelineConfig, source: Box<dyn HtmlSource>) -> Result<Self> {
        config.check()?;
        Ok(Self { config, source })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<PipelineOutcome> {
        info!(target: PROGRESS_TARGET, "Preliminaries complete. Initiating ETL process");

        let outcome = self.execute().await;

        match &outcome {
            Ok(_) => info!(target: PROGRESS_TARGET, "Process Complete."),
            Err(e) => error!(target: PROGRESS_TARGET, "Process failed: {}", e),
        }
        outcome
    }

    async fn execute(&self) -> Result<PipelineOutcome> {
        info!("Extracting from {}", self.source.describe());
        let html = self.source.fetch().await?;
        let rows = TableExtractor::new().extract(&html)?;
        info!(
            target: PROGRESS_TARGET,
            "Data extraction complete. Initiating Transformation process"
        );

        let rates = RateLoader::new(self.config.currencies.clone()).load(&self.config.rates_path)?;
        let (dataset, report) = Transformer::new(&rates).transform(rows);
        report.log_warnings();
        info!(
            target: PROGRESS_TARGET,
            "Data transformation complete. Initiating Loading process"
        );

        CsvSink::new(&self.config.output_path).write(&dataset)?;
        info!(target: PROGRESS_TARGET, "Data saved to CSV file");

        let db = Database::connect(&self.config.database_path).await?;
        info!(target: PROGRESS_TARGET, "SQL Connection initiated.");

        let queries = self.load_and_query(&db, &dataset).await;
        db.close().await;

        Ok(PipelineOutcome {
            dataset,
            report,
            queries: queries?,
        })
    }

    async fn load_and_query(&self, db: &Database, dataset: &Dataset) -> Result<QueryReport> {
        let layout = TableSink::new(db.pool(), &self.config.table_name)
            .load(dataset)
            .await?;
        info!(target: PROGRESS_TARGET, "Data loaded to Database as table.");

        QueryRunner::new(db.pool(), &layout)
            .run(&self.config.average_currency)
            .await
    }
}
