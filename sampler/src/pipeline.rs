//! One tick of sampling: build a snapshot, hand it to the sink.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::logger::warn_if_slow;
use tracing::{info, warn};

use crate::market::sampler::SideSource;
use crate::scheduler::{TickOutcome, TickWork};
use crate::sink::Sink;
use crate::snapshot::SnapshotBuilder;

pub struct SamplingPipeline<S, K> {
    builder: SnapshotBuilder<S>,
    sink: K,
}

impl<S: SideSource, K: Sink> SamplingPipeline<S, K> {
    pub fn new(builder: SnapshotBuilder<S>, sink: K) -> Self {
        Self { builder, sink }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }
}

#[async_trait]
impl<S: SideSource, K: Sink> TickWork for SamplingPipeline<S, K> {
    async fn run_tick(&self, now: DateTime<Utc>) -> anyhow::Result<TickOutcome> {
        info!(now = %now, "sampling tick started");

        let Some(snapshot) = self.builder.build(now).await else {
            info!("no snapshot this tick; skipping dispatch");
            return Ok(TickOutcome::Skipped);
        };

        let spread = snapshot.diff.price_spread_percent;
        let accepted = warn_if_slow(
            "sink_accept",
            Duration::from_secs(2),
            self.sink.accept(snapshot),
        )
        .await;

        match accepted {
            Ok(()) => {
                info!(sink = self.sink.name(), spread_pct = %spread, "snapshot dispatched");
                Ok(TickOutcome::Dispatched)
            }
            Err(e) => {
                warn!(sink = self.sink.name(), error = %e, "snapshot computed but not persisted");
                Ok(TickOutcome::NotPersisted)
            }
        }
    }
}
