//! Turns a probe result into the tag line printed for a domain.

use crate::model::ProbeResult;
use ipnetwork::IpNetwork;

pub const FAILURE: &str = "failure";

/// Tags for `result`, in output order. An unavailable result is always the
/// single `failure` tag.
pub fn classify(result: &ProbeResult, owning_subnet: &IpNetwork, verbose: bool) -> Vec<String> {
    if !result.available {
        return vec![FAILURE.to_string()];
    }

    let mut tags = Vec::new();
    if result.http2_negotiated {
        tags.push("http2".to_string());
    }

    match &result.tls {
        Some(tls) => {
            tags.push(tls.version.tag().to_string());
            if !tls.verified {
                tags.push("self-signed".to_string());
            }
        }
        None => tags.push("non-tls".to_string()),
    }

    if !result.http_status_ok {
        tags.push("non-200".to_string());
    }

    if !in_subnet(result, owning_subnet) {
        tags.push("othersubnet".to_string());
    }

    if verbose {
        tags.extend(result.resolved_addresses.iter().map(|ip| ip.to_string()));
    }

    tags
}

pub fn in_subnet(result: &ProbeResult, owning_subnet: &IpNetwork) -> bool {
    result
        .resolved_addresses
        .iter()
        .any(|ip| owning_subnet.contains(*ip))
}

pub fn format_line(domain: &str, tags: &[String]) -> String {
    format!("{domain}: {}", tags.join(" "))
}
