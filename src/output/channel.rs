use super::sink::OutputSink;
use super::Report;
use crate::model::OutputConfig;
use std::io::Write;
use tokio::sync::{mpsc, oneshot};

const QUEUE_DEPTH: usize = 1024;

enum Command {
    Write(Report),
    /// Flush, acknowledge and stop. Reports queued before it are written first.
    Close(oneshot::Sender<()>),
}

/// Handle to the single writer thread. Every report goes through one queue,
/// so lines from concurrent probes never interleave.
#[derive(Clone)]
pub struct OutputChannel {
    tx: mpsc::Sender<Command>,
}

impl OutputChannel {
    pub fn new(cfg: OutputConfig) -> anyhow::Result<Self> {
        Ok(Self::start(OutputSink::new(cfg)))
    }

    pub fn with_writer(cfg: OutputConfig, writer: Box<dyn Write + Send>) -> anyhow::Result<Self> {
        Ok(Self::start(OutputSink::with_writer(cfg, writer)))
    }

    fn start(sink: OutputSink) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        tokio::task::spawn_blocking(move || drain(sink, rx));
        Self { tx }
    }

    pub async fn emit(&self, report: Report) -> anyhow::Result<()> {
        self.tx
            .send(Command::Write(report))
            .await
            .map_err(|_| anyhow::anyhow!("output writer already closed"))
    }

    /// Writes out everything emitted so far and stops the writer. Calling it
    /// again after the writer is gone is a no-op.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Close(ack)).await.is_err() {
            return Ok(());
        }
        done.await
            .map_err(|_| anyhow::anyhow!("output writer stopped before flushing"))
    }
}

fn drain(mut sink: OutputSink, mut rx: mpsc::Receiver<Command>) {
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            Command::Write(report) => {
                if let Err(err) = sink.write_report(&report) {
                    tracing::error!(
                        domain = %report.target.domain,
                        error = %err,
                        "failed to write report"
                    );
                }
            }
            Command::Close(ack) => {
                rx.close();
                sink.flush();
                let _ = ack.send(());
                return;
            }
        }
    }
    sink.flush();
}
