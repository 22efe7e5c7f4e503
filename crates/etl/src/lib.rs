pub mod config;
pub mod dataset;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod pipeline;
pub mod rates;
pub mod sinks;
pub mod sources;
pub mod traits;
pub mod transformer;

pub use config::PipelineConfig;
pub use dataset::{Dataset, RawRow, Record};
pub use error::{EtlError, Result};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use traits::HtmlSource;
