use crate::error::ProbeError;
use std::collections::BTreeSet;
use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::lookup_host;
use tokio::time::timeout;

/// Lookup answer: socket addresses in resolver order for connecting, plus
/// the distinct IPs for reporting.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub addrs: Vec<SocketAddr>,
    pub ips: BTreeSet<IpAddr>,
}

pub async fn resolve(host: &str, port: u16, deadline: Duration) -> Result<Resolved, ProbeError> {
    resolve_with(host, deadline, lookup_host((host, port))).await
}

async fn resolve_with<F, I>(
    host: &str,
    deadline: Duration,
    lookup: F,
) -> Result<Resolved, ProbeError>
where
    F: Future<Output = io::Result<I>>,
    I: IntoIterator<Item = SocketAddr>,
{
    let lookup = match timeout(deadline, lookup).await {
        Ok(Ok(lookup)) => lookup,
        Ok(Err(err)) => {
            return Err(ProbeError::Resolution {
                host: host.to_string(),
                reason: err.to_string(),
            })
        }
        Err(_) => return Err(ProbeError::ResolutionTimeout(host.to_string())),
    };

    let mut addrs = Vec::new();
    let mut ips = BTreeSet::new();
    for addr in lookup {
        if ips.insert(addr.ip()) {
            addrs.push(addr);
        }
    }

    if addrs.is_empty() {
        return Err(ProbeError::Resolution {
            host: host.to_string(),
            reason: "no addresses returned".into(),
        });
    }

    Ok(Resolved { addrs, ips })
}
