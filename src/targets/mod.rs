//! Where domains come from. The prober only sees the resulting
//! [`TargetSet`]; how it was discovered stays behind [`TargetSupplier`].

#[cfg(feature = "bgp")]
mod bgp;
mod file;

#[cfg(feature = "bgp")]
pub use bgp::HeNetSupplier;
pub use file::FileSupplier;

use crate::model::{ProbeTarget, TargetQuery};
use async_trait::async_trait;
use ipnetwork::IpNetwork;
use std::net::IpAddr;

/// The owning subnet of a query and the domains hosted in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    pub subnet: IpNetwork,
    pub domains: Vec<String>,
}

impl TargetSet {
    pub fn into_targets(self) -> Vec<ProbeTarget> {
        let subnet = self.subnet;
        self.domains
            .into_iter()
            .map(|domain| ProbeTarget {
                domain,
                owning_subnet: subnet,
            })
            .collect()
    }
}

#[async_trait]
pub trait TargetSupplier: Send + Sync {
    /// Any error here is fatal to the run.
    async fn resolve_targets(&self, query: TargetQuery) -> anyhow::Result<TargetSet>;
}

/// Hands out a fixed list regardless of the query.
#[derive(Debug, Clone)]
pub struct StaticSupplier {
    set: TargetSet,
}

impl StaticSupplier {
    pub fn new(subnet: IpNetwork, domains: Vec<String>) -> Self {
        Self {
            set: TargetSet { subnet, domains },
        }
    }
}

#[async_trait]
impl TargetSupplier for StaticSupplier {
    async fn resolve_targets(&self, _query: TargetQuery) -> anyhow::Result<TargetSet> {
        Ok(self.set.clone())
    }
}

/// The network a single address stands for when no prefix lookup happens.
pub fn host_network(ip: IpAddr) -> IpNetwork {
    IpNetwork::from(ip)
}
