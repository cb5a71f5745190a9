mod channel;
mod sink;

pub use channel::OutputChannel;
pub use sink::OutputSink;

use crate::model::{ProbeResult, ProbeTarget};

/// Everything the writer needs to render one domain.
#[derive(Debug, Clone)]
pub struct Report {
    pub target: ProbeTarget,
    pub result: ProbeResult,
    /// Failure classification when the probe did not complete.
    pub error: Option<&'static str>,
}
