mod file;
mod http;

pub use file::FileSource;
pub use http::HttpSource;

use crate::traits::HtmlSource;

/// Picks the source implementation for `location`: HTTP(S) URLs are fetched
/// over the network, anything else is read as a local file path.
pub fn source_for(location: &str) -> Box<dyn HtmlSource> {
    if is_http_url(location) {
        Box::new(HttpSource::new(location))
    } else {
        Box::new(FileSource::new(location))
    }
}

fn is_http_url(location: &str) -> bool {
    reqwest::Url::parse(location)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}
