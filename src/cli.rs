use crate::model::{
    CapabilityPolicy, Config, OutputConfig, OutputFormat, TargetQuery, TlsVersion,
};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "sni-fetch",
    author,
    version,
    about = "Probe the domains hosted in a network range for HTTPS, TLS and HTTP/2 support",
    long_about = None
)]
pub struct Cli {
    /// IP address or CIDR range to inspect
    #[arg(value_name = "IP|CIDR")]
    pub target: String,

    /// Offer HTTP/2 via ALPN
    #[arg(
        long = "http2",
        default_value_t = true,
        default_missing_value = "true",
        num_args = 0..=1,
        require_equals = true,
        action = ArgAction::Set,
        value_name = "BOOL"
    )]
    pub http2: bool,

    /// Minimal TLS version to accept (1.0, 1.1, 1.2, 1.3)
    #[arg(long = "mintls", default_value = "1.2")]
    pub min_tls: String,

    /// Maximum TLS version to accept (1.0, 1.1, 1.2, 1.3)
    #[arg(long = "maxtls", default_value = "1.3")]
    pub max_tls: String,

    /// Concurrent checks (defaults to available parallelism)
    #[arg(long = "threads")]
    pub threads: Option<usize>,

    /// Also print domains that could not be probed
    #[arg(short = 'f', long = "failed", action = ArgAction::SetTrue)]
    pub failed: bool,

    /// Print resolved addresses after the tags
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Per-domain probe timeout in milliseconds
    #[arg(long = "timeout", default_value_t = 3000)]
    pub timeout_ms: u64,

    /// DNS resolution timeout in milliseconds
    #[arg(long = "resolve-timeout", default_value_t = 3000)]
    pub resolve_timeout_ms: u64,

    /// Read domains from FILE (one per line) instead of looking them up
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Output format
    #[arg(long = "output", value_enum, default_value_t = OutputFormat::Tags)]
    pub output: OutputFormat,
}

impl Cli {
    pub fn into_config(self) -> anyhow::Result<Config> {
        let min_tls: TlsVersion = self.min_tls.parse()?;
        let max_tls: TlsVersion = self.max_tls.parse()?;
        let policy = CapabilityPolicy::new(
            self.http2,
            min_tls,
            max_tls,
            Duration::from_millis(self.timeout_ms),
        )?;

        let query: TargetQuery = self.target.parse()?;

        let threads = match self.threads {
            Some(0) => anyhow::bail!("threads must be greater than zero"),
            Some(n) => n,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        };

        if self.resolve_timeout_ms == 0 {
            anyhow::bail!("resolve timeout must be greater than zero");
        }

        Ok(Config {
            query,
            input: self.input,
            threads,
            policy,
            resolve_timeout: Duration::from_millis(self.resolve_timeout_ms),
            output: OutputConfig {
                format: self.output,
                show_failed: self.failed,
                verbose: self.verbose,
            },
        })
    }
}
