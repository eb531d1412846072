//! Batch orchestration: row/slot iteration, circuit breaker, write-back

use tracing::{error, info, warn};

use crate::config;
use crate::core::dedup::DedupIndex;
use crate::core::rate_limiter::RateLimiter;
use crate::core::retry::RetryController;
use crate::core::validate;
use crate::error::{AltgenError, AltgenResult};
use crate::providers::GenerationClient;
use crate::services::table::{AssetRow, AssetTable};
use crate::services::RunControl;
use crate::types::{
    BatchCursor, BatchReport, GenerationOutcome, GenerationRequest, PerformanceLabel, ProviderId,
    StopReason,
};

enum Flow {
    Continue,
    Stop,
}

/// Row eligibility policy, supplied by the caller
pub type EligibilityFn = fn(&AssetRow) -> bool;

/// Default policy: the performance label signals LOW and both the asset type
/// and the source text are present.
pub fn low_performance(row: &AssetRow) -> bool {
    PerformanceLabel::parse(&row.performance_label) == PerformanceLabel::Low
        && !row.asset_type.trim().is_empty()
        && !row.source_text.trim().is_empty()
}

/// Drives one batch over the eligible rows of the asset table.
///
/// Owns the cursor and the merged dedup index for the run; every slot
/// resolves to exactly one write (the accepted text or an explicit clear)
/// before the next slot starts.
pub struct BatchOrchestrator<'a> {
    client: &'a dyn GenerationClient,
    table: &'a mut dyn AssetTable,
    control: &'a RunControl,
    dedup: &'a mut DedupIndex,
    limiter: RateLimiter,
    eligibility: EligibilityFn,
    provider: ProviderId,
    model: String,
    cursor: BatchCursor,
    report: BatchReport,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(
        client: &'a dyn GenerationClient,
        table: &'a mut dyn AssetTable,
        control: &'a RunControl,
        dedup: &'a mut DedupIndex,
        provider: ProviderId,
        model: String,
        start_row: u32,
    ) -> Self {
        Self {
            client,
            table,
            control,
            dedup,
            limiter: RateLimiter::new(),
            eligibility: low_performance,
            provider,
            model,
            cursor: BatchCursor::new(start_row),
            report: BatchReport::new(),
        }
    }

    /// Replace the default LOW-label eligibility policy.
    pub fn with_eligibility(mut self, eligibility: EligibilityFn) -> Self {
        self.eligibility = eligibility;
        self
    }

    pub async fn run(mut self) -> AltgenResult<BatchReport> {
        let rows = self.table.snapshot().await?;

        let end_row = rows
            .iter()
            .filter(|(_, row)| !row.source_text.trim().is_empty())
            .map(|(number, _)| *number)
            .max();
        let Some(end_row) = end_row else {
            info!("no rows with source text, nothing to process");
            return Ok(self.report);
        };
        self.cursor.end_row = end_row;

        info!(
            batch_id = %self.report.batch_id,
            provider = %self.provider,
            model = %self.model,
            start_row = self.cursor.start_row,
            end_row,
            "starting batch"
        );

        for (row_number, row) in rows {
            if row_number < self.cursor.start_row || row_number > end_row {
                continue;
            }
            if !self.checkpoint().await? {
                return Ok(self.report);
            }
            self.report.rows_scanned += 1;

            if !(self.eligibility)(&row) {
                continue;
            }
            info!(
                row = row_number,
                asset_type = %row.asset_type,
                text = %row.source_text,
                "processing low-performing asset"
            );
            self.report.rows_processed += 1;

            for slot in 0..config::ALTERNATIVE_SLOTS {
                match self.process_slot(row_number, slot, &row).await? {
                    Flow::Continue => {}
                    Flow::Stop => return Ok(self.report),
                }
            }
        }

        info!(
            batch_id = %self.report.batch_id,
            slots_written = self.report.slots_written,
            "batch complete"
        );
        Ok(self.report)
    }

    async fn process_slot(
        &mut self,
        row_number: u32,
        slot: usize,
        row: &AssetRow,
    ) -> AltgenResult<Flow> {
        if !self.checkpoint().await? {
            return Ok(Flow::Stop);
        }

        let request = GenerationRequest {
            provider: self.provider,
            model: self.model.clone(),
            asset_type: row.asset_type.clone(),
            source_text: row.source_text.clone(),
            max_chars: validate::ceiling_for(&row.asset_type),
            exclusions: self.dedup.exclusions_for(&row.source_text),
        };

        let outcome = {
            let mut retry = RetryController::new(self.client, &mut self.limiter, self.control);
            match retry.attempt(&request).await {
                Ok(outcome) => outcome,
                Err(AltgenError::Cancelled) => {
                    self.report.stopped = Some(StopReason::Cancelled);
                    warn!(row = row_number, slot, "batch cancelled mid-slot");
                    return Ok(Flow::Stop);
                }
                Err(e) => return Err(e),
            }
        };

        match outcome {
            GenerationOutcome::Generated(raw) => {
                let text = validate::normalize(&raw);
                if text.is_empty() {
                    self.reject(row_number, slot, "empty after normalization")
                        .await?;
                } else if !validate::is_valid(&text) {
                    self.reject(row_number, slot, "contains forbidden characters")
                        .await?;
                } else if !validate::within_length(&text, &row.asset_type) {
                    self.reject(row_number, slot, "exceeds length ceiling").await?;
                } else if self.dedup.contains(&row.source_text, &text) {
                    self.reject(row_number, slot, "duplicate alternative").await?;
                } else {
                    self.table.write_alternative(row_number, slot, &text).await?;
                    self.dedup.insert(&row.source_text, &text);
                    self.cursor.consecutive_errors = 0;
                    self.report.slots_written += 1;
                    info!(row = row_number, slot, text = %text, "alternative accepted");
                }
            }
            GenerationOutcome::Exhausted { last_failure } => {
                self.table.clear_alternative(row_number, slot).await?;
                self.report.slots_cleared += 1;

                if let Some(failure) = last_failure.as_ref().filter(|f| f.is_rate_limit()) {
                    let detail = failure.to_string();
                    error!(row = row_number, slot, %failure, "rate limit survived all retries, aborting batch");
                    self.report.stopped = Some(StopReason::RateLimitExhausted(detail));
                    return Ok(Flow::Stop);
                }

                self.cursor.consecutive_errors += 1;
                warn!(
                    row = row_number,
                    slot,
                    consecutive_errors = self.cursor.consecutive_errors,
                    failure = %last_failure.map(|f| f.to_string()).unwrap_or_default(),
                    "retries exhausted, slot cleared"
                );
            }
        }

        if self.cursor.consecutive_errors >= config::MAX_CONSECUTIVE_ERRORS {
            error!(
                consecutive_errors = self.cursor.consecutive_errors,
                "too many consecutive errors, aborting batch"
            );
            self.report.stopped = Some(StopReason::ConsecutiveErrors(
                self.cursor.consecutive_errors,
            ));
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    }

    /// Clear the slot and count the error.
    async fn reject(&mut self, row_number: u32, slot: usize, reason: &str) -> AltgenResult<()> {
        self.table.clear_alternative(row_number, slot).await?;
        self.cursor.consecutive_errors += 1;
        self.report.slots_cleared += 1;
        warn!(
            row = row_number,
            slot,
            reason,
            consecutive_errors = self.cursor.consecutive_errors,
            "alternative rejected"
        );
        Ok(())
    }

    /// Cancellation checkpoint; false means the batch must unwind.
    async fn checkpoint(&mut self) -> AltgenResult<bool> {
        match self.control.ensure_active().await {
            Ok(()) => Ok(true),
            Err(AltgenError::Cancelled) => {
                warn!("run-control flag set to STOP, unwinding batch");
                self.report.stopped = Some(StopReason::Cancelled);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
