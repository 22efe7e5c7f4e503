use crate::Result;

/// Somewhere an HTML document can be read from.
#[async_trait::async_trait]
pub trait HtmlSource: Send + Sync {
    async fn fetch(&self) -> Result<String>;

    /// Human readable location, for logs.
    fn describe(&self) -> String;
}
