use super::{TargetSet, TargetSupplier};
use crate::model::TargetQuery;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use ipnetwork::IpNetwork;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;
use url::Url;

const HE_BASE_URL: &str = "https://bgp.he.net/";
const PREFIX_LINK: &str = "td.nowrap > a";
const DNS_RECORD_LINK: &str = "#dnsrecords > table > tbody > tr > td:nth-child(3) > a";

/// Looks up the announced prefix of an address and the DNS names hosted in
/// it on bgp.he.net.
pub struct HeNetSupplier {
    client: reqwest::Client,
    base: Url,
}

impl HeNetSupplier {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_base(Url::parse(HE_BASE_URL)?)
    }

    pub fn with_base(base: Url) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sni-fetch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build lookup client")?;
        Ok(Self { client, base })
    }

    async fn fetch(&self, path: &str) -> anyhow::Result<String> {
        let url = self
            .base
            .join(path)
            .with_context(|| format!("cannot build lookup URL for {path}"))?;
        tracing::debug!(url = %url, "querying lookup service");
        let res = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("lookup request to {url} failed"))?;
        if res.status() != StatusCode::OK {
            anyhow::bail!("non-200 status code from {url}: {}", res.status());
        }
        res.text()
            .await
            .with_context(|| format!("cannot read lookup response from {url}"))
    }

    async fn subnet_of(&self, ip: IpAddr) -> anyhow::Result<IpNetwork> {
        let html = self.fetch(&format!("ip/{ip}")).await?;
        parse_subnet(&html).with_context(|| format!("cannot find owning prefix of {ip}"))
    }

    async fn domains_in(&self, subnet: IpNetwork) -> anyhow::Result<Vec<String>> {
        let html = self.fetch(&format!("net/{subnet}")).await?;
        parse_domains(&html)
    }
}

#[async_trait]
impl TargetSupplier for HeNetSupplier {
    async fn resolve_targets(&self, query: TargetQuery) -> anyhow::Result<TargetSet> {
        let subnet = match query {
            TargetQuery::Address(ip) => self.subnet_of(ip).await?,
            TargetQuery::Range(net) => net,
        };
        let domains = self.domains_in(subnet).await?;
        tracing::info!(subnet = %subnet, domains = domains.len(), "targets resolved");
        Ok(TargetSet { subnet, domains })
    }
}

fn selector(css: &'static str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow!("invalid selector {css}: {err:?}"))
}

fn parse_subnet(html: &str) -> anyhow::Result<IpNetwork> {
    let doc = Html::parse_document(html);
    let href = doc
        .select(&selector(PREFIX_LINK)?)
        .next()
        .and_then(|link| link.value().attr("href"))
        .ok_or_else(|| anyhow!("lookup page has no prefix link"))?;

    let cidr = href.replace("/net/", "");
    let cidr = cidr.trim_matches('/');
    let net: IpNetwork = cidr
        .parse()
        .map_err(|err| anyhow!("invalid prefix {cidr}: {err}"))?;
    Ok(IpNetwork::new(net.network(), net.prefix())?)
}

fn parse_domains(html: &str) -> anyhow::Result<Vec<String>> {
    let doc = Html::parse_document(html);
    // A name served from several addresses is listed once per row.
    let mut seen = HashSet::new();
    let domains = doc
        .select(&selector(DNS_RECORD_LINK)?)
        .map(|link| link.text().collect::<String>().trim().to_string())
        .filter(|domain| !domain.is_empty() && seen.insert(domain.clone()))
        .collect();
    Ok(domains)
}
