use async_trait::async_trait;
use tracing::warn;

use crate::sink::{Sink, SinkError};
use crate::snapshot::Snapshot;

/// Offers each snapshot to every member, in order.
///
/// One member failing does not stop the rest from receiving the snapshot;
/// the fanout then reports how many failed.
pub struct FanoutSink {
    sinks: Vec<Box<dyn Sink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl Sink for FanoutSink {
    fn name(&self) -> &'static str {
        "fanout"
    }

    async fn accept(&self, snapshot: Snapshot) -> Result<(), SinkError> {
        let total = self.sinks.len();
        let mut failed = 0;

        for sink in &self.sinks {
            if let Err(e) = sink.accept(snapshot.clone()).await {
                failed += 1;
                warn!(sink = sink.name(), error = %e, "sink rejected snapshot");
            }
        }

        if failed > 0 {
            return Err(SinkError::Partial { failed, total });
        }
        Ok(())
    }
}
