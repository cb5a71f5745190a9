use ipnetwork::IpNetwork;
use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub domain: String,
    pub owning_subnet: IpNetwork,
}

/// What the user asked to scan: a single address whose owning prefix still
/// has to be looked up, or an explicit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetQuery {
    Address(IpAddr),
    Range(IpNetwork),
}

impl FromStr for TargetQuery {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains('/') {
            let net: IpNetwork = s
                .parse()
                .map_err(|err| anyhow::anyhow!("invalid CIDR range {s}: {err}"))?;
            // 203.0.113.77/24 names the same range as 203.0.113.0/24.
            let net = IpNetwork::new(net.network(), net.prefix())
                .map_err(|err| anyhow::anyhow!("invalid CIDR range {s}: {err}"))?;
            return Ok(TargetQuery::Range(net));
        }
        let ip: IpAddr = s
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid IP address: {s}"))?;
        Ok(TargetQuery::Address(ip))
    }
}

impl fmt::Display for TargetQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetQuery::Address(ip) => write!(f, "{ip}"),
            TargetQuery::Range(net) => write!(f, "{net}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TlsVersion {
    Tls10,
    Tls11,
    Tls12,
    Tls13,
}

// (version, flag value, output tag)
const TLS_VERSIONS: [(TlsVersion, &str, &str); 4] = [
    (TlsVersion::Tls10, "1.0", "tls1.0"),
    (TlsVersion::Tls11, "1.1", "tls1.1"),
    (TlsVersion::Tls12, "1.2", "tls1.2"),
    (TlsVersion::Tls13, "1.3", "tls1.3"),
];

impl TlsVersion {
    pub fn as_str(self) -> &'static str {
        TLS_VERSIONS[self as usize].1
    }

    pub fn tag(self) -> &'static str {
        TLS_VERSIONS[self as usize].2
    }
}

impl FromStr for TlsVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TLS_VERSIONS
            .iter()
            .find(|(_, name, _)| *name == s)
            .map(|(version, _, _)| *version)
            .ok_or_else(|| anyhow::anyhow!("invalid TLS version: {s}"))
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityPolicy {
    allow_http2: bool,
    min_tls: TlsVersion,
    max_tls: TlsVersion,
    timeout: Duration,
}

impl CapabilityPolicy {
    pub fn new(
        allow_http2: bool,
        min_tls: TlsVersion,
        max_tls: TlsVersion,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        if min_tls > max_tls {
            anyhow::bail!("minimum TLS version {min_tls} is above maximum {max_tls}");
        }
        if timeout.is_zero() {
            anyhow::bail!("probe timeout must be greater than zero");
        }
        Ok(Self {
            allow_http2,
            min_tls,
            max_tls,
            timeout,
        })
    }

    pub fn allow_http2(&self) -> bool {
        self.allow_http2
    }

    pub fn min_tls(&self) -> TlsVersion {
        self.min_tls
    }

    pub fn max_tls(&self) -> TlsVersion {
        self.max_tls
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for CapabilityPolicy {
    fn default() -> Self {
        Self {
            allow_http2: true,
            min_tls: TlsVersion::Tls12,
            max_tls: TlsVersion::Tls13,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiatedVersion {
    Known(TlsVersion),
    /// Whatever the TLS library reported for a version outside 1.0..=1.3.
    Unrecognized(String),
}

impl NegotiatedVersion {
    pub fn tag(&self) -> &'static str {
        match self {
            NegotiatedVersion::Known(version) => version.tag(),
            NegotiatedVersion::Unrecognized(_) => "unknowntls",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSession {
    pub version: NegotiatedVersion,
    pub verified: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    pub available: bool,
    pub http_status_ok: bool,
    pub resolved_addresses: BTreeSet<IpAddr>,
    pub http2_negotiated: bool,
    pub tls: Option<TlsSession>,
}

impl ProbeResult {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn tls_available(&self) -> bool {
        self.tls.is_some()
    }

    pub fn tls_verified(&self) -> bool {
        self.tls.as_ref().is_some_and(|tls| tls.verified)
    }

    pub fn tls_version(&self) -> Option<&NegotiatedVersion> {
        self.tls.as_ref().map(|tls| &tls.version)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub query: TargetQuery,
    pub input: Option<PathBuf>,
    pub threads: usize,
    pub policy: CapabilityPolicy,
    pub resolve_timeout: Duration,
    pub output: OutputConfig,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub show_failed: bool,
    pub verbose: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Tags,
            show_failed: false,
            verbose: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Tags,
    Jsonl,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Tags => write!(f, "tags"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}
