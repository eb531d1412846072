//! Session layer: wires store, table and client; start/cancel batch

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::batch::BatchOrchestrator;
use crate::core::dedup::DedupIndex;
use crate::error::AltgenResult;
use crate::providers::GenerationClient;
use crate::services::store::{
    self, PropertyStore, RunStatus, SELECTED_MODEL, SELECTED_PROVIDER,
};
use crate::services::table::{AssetTable, FIRST_DATA_ROW};
use crate::services::RunControl;
use crate::types::{BatchReport, ProviderId};

/// How a batch is started
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub provider: ProviderId,
    pub model: String,
    /// Explicit first row; wins over the computed resume point
    pub start_row: Option<u32>,
    /// Clear all existing alternatives and start from the top
    pub reset_existing: bool,
}

/// Explicit context object replacing the original's ambient global state.
pub struct Session {
    store: Arc<dyn PropertyStore>,
}

impl Session {
    pub fn new(store: Arc<dyn PropertyStore>) -> Self {
        Self { store }
    }

    /// Run one batch to completion or abort, returning the summary.
    ///
    /// Seeds the dedup index from the persisted snapshot and the table's
    /// current contents, and writes the merged snapshot back once the batch
    /// ends, whatever the outcome.
    pub async fn start_batch(
        &self,
        table: &mut dyn AssetTable,
        client: &dyn GenerationClient,
        options: BatchOptions,
    ) -> AltgenResult<BatchReport> {
        store::set_run_status(&*self.store, RunStatus::Running).await?;
        self.store
            .set(SELECTED_MODEL, &options.model)
            .await?;
        self.store
            .set(SELECTED_PROVIDER, options.provider.as_str())
            .await?;

        if options.reset_existing {
            table.clear_all_alternatives().await?;
        }
        let start_row = match options.start_row {
            Some(row) => row.max(FIRST_DATA_ROW),
            None if options.reset_existing => FIRST_DATA_ROW,
            None => table.first_unfilled_row().await?,
        };

        let mut dedup = store::load_snapshot(&*self.store).await?;
        for (_, row) in table.snapshot().await? {
            if row.source_text.trim().is_empty() {
                continue;
            }
            for alternative in row.alternatives.iter().flatten() {
                dedup.insert(&row.source_text, alternative);
            }
        }
        info!(
            sources = dedup.source_count(),
            start_row, "dedup index seeded"
        );

        let control = RunControl::new(self.store.clone());
        let orchestrator = BatchOrchestrator::new(
            client,
            table,
            &control,
            &mut dedup,
            options.provider,
            options.model.clone(),
            start_row,
        );
        let report = orchestrator.run().await?;

        store::save_snapshot(&*self.store, &dedup).await?;
        self.store.delete(SELECTED_MODEL).await?;
        self.store.delete(SELECTED_PROVIDER).await?;

        let elapsed = Utc::now().signed_duration_since(report.started_at);
        match &report.stopped {
            None => info!(
                rows_processed = report.rows_processed,
                slots_written = report.slots_written,
                elapsed_s = elapsed.num_seconds(),
                "batch finished"
            ),
            Some(reason) => warn!(
                rows_processed = report.rows_processed,
                slots_written = report.slots_written,
                %reason,
                "batch stopped early"
            ),
        }
        Ok(report)
    }

    /// Flip the run-control flag; a running batch observes it at its next
    /// checkpoint.
    pub async fn cancel_batch(&self) -> AltgenResult<()> {
        store::set_run_status(&*self.store, RunStatus::Stop).await
    }
}
