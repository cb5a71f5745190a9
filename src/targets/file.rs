use super::{host_network, TargetSet, TargetSupplier};
use crate::model::TargetQuery;
use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Reads domains from a file, one per line. The subnet is the queried range,
/// or the single-address network of a queried IP.
#[derive(Debug, Clone)]
pub struct FileSupplier {
    path: PathBuf,
}

impl FileSupplier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TargetSupplier for FileSupplier {
    async fn resolve_targets(&self, query: TargetQuery) -> anyhow::Result<TargetSet> {
        let subnet = match query {
            TargetQuery::Address(ip) => host_network(ip),
            TargetQuery::Range(net) => net,
        };
        let domains = read_domains(&self.path).await?;
        Ok(TargetSet { subnet, domains })
    }
}

async fn read_domains(path: &Path) -> anyhow::Result<Vec<String>> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("cannot open input {}", path.display()))?;
    let mut reader = BufReader::new(file).lines();
    let mut seen = HashSet::new();
    let mut domains = Vec::new();
    while let Some(line) = reader.next_line().await? {
        if let Some(domain) = parse_domain(&line) {
            if seen.insert(domain.clone()) {
                domains.push(domain);
            }
        } else if !is_skippable(&line) {
            tracing::warn!(line = %line.trim(), "skipping invalid domain");
        }
    }
    Ok(domains)
}

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

fn parse_domain(line: &str) -> Option<String> {
    if is_skippable(line) {
        return None;
    }
    let domain = line.trim().trim_end_matches('.');
    if domain.is_empty() || domain.contains(char::is_whitespace) || domain.contains('/') {
        return None;
    }
    Some(domain.to_string())
}
