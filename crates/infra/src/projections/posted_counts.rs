use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use tadbir_core::AggregateId;
use tadbir_events::{EventEnvelope, Projection};
use tadbir_products::ProductId;
use tadbir_stocktake::{CountId, StockCountEvent};
use tadbir_warehouses::WarehouseId;

use crate::read_model::ReadModelStore;

/// One finalized line of a posted count.
///
/// Unlike the domain aggregate, this is derived reporting data, so the
/// variance is stored alongside the quantities it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedCountLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub system_qty: i64,
    pub counted_qty: i64,
    pub variance: i64,
}

/// Reporting row for one posted stock count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedCountSummary {
    pub count_id: CountId,
    pub warehouse_id: WarehouseId,
    pub started_on: Option<NaiveDate>,
    pub posted_at: DateTime<Utc>,
    pub lines: Vec<PostedCountLine>,
    pub shortage_lines: u32,
    pub overage_lines: u32,
    pub net_variance: i64,
}

#[derive(Debug, Error)]
pub enum PostedCountsError {
    #[error("failed to deserialize stock count event: {0}")]
    Deserialize(String),

    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Posted counts projection.
///
/// Rows appear only when a count posts; drafts are invisible to reporting.
/// The start date is carried over from the `CountStarted` event, since the
/// posted event does not repeat it.
#[derive(Debug)]
pub struct PostedCountsProjection<S>
where
    S: ReadModelStore<CountId, PostedCountSummary>,
{
    store: S,
    started: RwLock<HashMap<CountId, NaiveDate>>,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> PostedCountsProjection<S>
where
    S: ReadModelStore<CountId, PostedCountSummary>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            started: RwLock::new(HashMap::new()),
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, count_id: &CountId) -> Option<PostedCountSummary> {
        self.store.get(count_id)
    }

    /// All posted counts, most recent first.
    pub fn list(&self) -> Vec<PostedCountSummary> {
        let mut rows = self.store.list();
        rows.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        rows
    }

    /// Apply a published envelope into the projection (idempotent).
    ///
    /// The cursor advances on every count event, including the draft-phase
    /// ones that produce no row, so a replayed draft event cannot be
    /// mistaken for new history.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), PostedCountsError> {
        if envelope.aggregate_type() != "stocktake.count" {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        if let Ok(mut cursors) = self.cursors.write() {
            let last = *cursors.get(&aggregate_id).unwrap_or(&0);

            if seq == 0 {
                return Err(PostedCountsError::NonMonotonicSequence { last, found: seq });
            }
            if seq <= last {
                return Ok(());
            }
            if seq != last + 1 && last != 0 {
                return Err(PostedCountsError::NonMonotonicSequence { last, found: seq });
            }

            let event: StockCountEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| PostedCountsError::Deserialize(e.to_string()))?;

            let count_id = match &event {
                StockCountEvent::CountStarted(e) => e.count_id,
                StockCountEvent::LineCountRecorded(e) => e.count_id,
                StockCountEvent::CountPosted(e) => e.count_id,
            };
            if count_id.0 != aggregate_id {
                return Err(PostedCountsError::StreamMismatch(
                    "event count_id does not match envelope aggregate_id".to_string(),
                ));
            }

            match event {
                StockCountEvent::CountStarted(e) => {
                    if let Ok(mut started) = self.started.write() {
                        started.insert(e.count_id, e.started_on);
                    }
                }
                StockCountEvent::LineCountRecorded(_) => {
                    // Draft activity; nothing to report yet.
                }
                StockCountEvent::CountPosted(e) => {
                    let started_on = self
                        .started
                        .read()
                        .ok()
                        .and_then(|started| started.get(&e.count_id).copied());

                    let lines: Vec<PostedCountLine> = e
                        .lines
                        .iter()
                        .map(|line| PostedCountLine {
                            product_id: line.product_id,
                            product_name: line.product_name.clone(),
                            system_qty: line.system_qty,
                            counted_qty: line.counted.unwrap_or(line.system_qty),
                            variance: line.variance(),
                        })
                        .collect();

                    let shortage_lines = lines.iter().filter(|l| l.variance < 0).count() as u32;
                    let overage_lines = lines.iter().filter(|l| l.variance > 0).count() as u32;
                    let net_variance = lines.iter().map(|l| l.variance).sum();

                    self.store.upsert(
                        e.count_id,
                        PostedCountSummary {
                            count_id: e.count_id,
                            warehouse_id: e.warehouse_id,
                            started_on,
                            posted_at: e.occurred_at,
                            lines,
                            shortage_lines,
                            overage_lines,
                            net_variance,
                        },
                    );
                }
            }

            cursors.insert(aggregate_id, seq);
        }

        Ok(())
    }
}

impl<S> Projection for PostedCountsProjection<S>
where
    S: ReadModelStore<CountId, PostedCountSummary>,
{
    type Error = PostedCountsError;

    fn name(&self) -> &'static str {
        "posted_counts"
    }

    fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
        self.apply_envelope(envelope)
    }
}
