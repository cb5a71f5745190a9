use super::Report;
use crate::classify::{classify, format_line, in_subnet};
use crate::model::{OutputConfig, OutputFormat};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::{BufWriter, Write};
use std::net::IpAddr;

pub struct OutputSink {
    cfg: OutputConfig,
    writer: BufWriter<Box<dyn Write + Send>>,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    domain: &'a str,
    subnet: String,
    timestamp: String,
    tags: Vec<String>,
    available: bool,
    status_ok: bool,
    http2: bool,
    tls_version: Option<&'static str>,
    tls_verified: bool,
    other_subnet: bool,
    addresses: &'a BTreeSet<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

impl OutputSink {
    pub fn new(cfg: OutputConfig) -> Self {
        Self::with_writer(cfg, Box::new(std::io::stdout()))
    }

    pub fn with_writer(cfg: OutputConfig, writer: Box<dyn Write + Send>) -> Self {
        Self {
            cfg,
            writer: BufWriter::new(writer),
        }
    }

    pub fn write_report(&mut self, report: &Report) -> anyhow::Result<()> {
        if !report.result.available && !self.cfg.show_failed {
            return Ok(());
        }

        let tags = classify(
            &report.result,
            &report.target.owning_subnet,
            self.cfg.verbose,
        );

        match self.cfg.format {
            OutputFormat::Tags => {
                writeln!(self.writer, "{}", format_line(&report.target.domain, &tags))?;
            }
            OutputFormat::Jsonl => {
                let record = JsonRecord {
                    domain: &report.target.domain,
                    subnet: report.target.owning_subnet.to_string(),
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    tags,
                    available: report.result.available,
                    status_ok: report.result.http_status_ok,
                    http2: report.result.http2_negotiated,
                    tls_version: report.result.tls_version().map(|v| v.tag()),
                    tls_verified: report.result.tls_verified(),
                    other_subnet: report.result.available
                        && !in_subnet(&report.result, &report.target.owning_subnet),
                    addresses: &report.result.resolved_addresses,
                    error: report.error,
                };
                let line = serde_json::to_string(&record)?;
                writeln!(self.writer, "{line}")?;
            }
        }

        // One flush per line keeps interactive runs readable.
        self.writer.flush()?;
        Ok(())
    }

    pub fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}
