mod https;
mod normalize;
mod reader;
mod resolver;

pub use https::HttpsProber;
pub use normalize::normalize_host;
pub use reader::{parse_status_code, HeaderReader};
pub use resolver::{resolve, Resolved};

use crate::error::ProbeError;
use crate::model::ProbeResult;
use async_trait::async_trait;
use url::Url;

/// A single capability check against one URL.
#[async_trait]
pub trait Prober: Send + Sync {
    fn name(&self) -> &'static str;

    async fn probe(&self, url: &Url) -> Result<ProbeResult, ProbeError>;
}

/// `https://<domain>/` for a supplied domain name, with the host already in
/// its ASCII form.
pub fn target_url(domain: &str) -> Result<Url, ProbeError> {
    let host = normalize_host(domain.trim_end_matches('.'))?;
    Url::parse(&format!("https://{host}/")).map_err(|err| ProbeError::Encoding {
        host: domain.to_string(),
        reason: err.to_string(),
    })
}
