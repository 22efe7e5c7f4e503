use std::path::PathBuf;

use tracing::info;

use crate::Result;
use crate::traits::HtmlSource;

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl HtmlSource for FileSource {
    async fn fetch(&self) -> Result<String> {
        let html = tokio::fs::read_to_string(&self.path).await?;
        info!("Read {} bytes of HTML from {}", html.len(), self.path.display());
        Ok(html)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EtlError;

    #[tokio::test]
    async fn test_reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banks.html");
        std::fs::write(&path, "<table><tbody></tbody></table>").unwrap();

        let html = FileSource::new(&path).fetch().await.unwrap();
        assert_eq!(html, "<table><tbody></tbody></table>");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileSource::new(dir.path().join("missing.html")).fetch().await;
        assert!(matches!(result, Err(EtlError::Io(_))));
    }
}
