//! Batch orchestrator behavior: slot outcomes, circuit breaker, cancellation

mod common;

use std::sync::Arc;

use altgen::core::{BatchOrchestrator, DedupIndex};
use altgen::services::store::PropertyStore;
use altgen::services::RunControl;
use altgen::types::{BatchReport, ProviderFailure, ProviderId, StopReason};

use common::{labeled_row, low_row, ok, repeat, MemoryStore, MemoryTable, ScriptedClient};

async fn run_batch(
    table: &mut MemoryTable,
    client: &ScriptedClient,
    store: Arc<MemoryStore>,
    start_row: u32,
) -> (BatchReport, DedupIndex) {
    let dyn_store: Arc<dyn PropertyStore> = store;
    let control = RunControl::new(dyn_store);
    let mut dedup = DedupIndex::new();
    let report = BatchOrchestrator::new(
        client,
        table,
        &control,
        &mut dedup,
        ProviderId::Groq,
        "gemma2-9b-it".to_string(),
        start_row,
    )
    .run()
    .await
    .unwrap();
    (report, dedup)
}

// Scenario A: the echoed label and trailing period are stripped and the
// 25-char result fits the 30-char headline ceiling.
#[tokio::test(start_paused = true)]
async fn accepted_alternative_is_normalized_and_written() {
    let mut table = MemoryTable::new(vec![low_row("headline", "Buy shoes now!!!")]);
    let client = ScriptedClient::new(vec![
        ok("Alternative: Grab your shoes today"),
        ok("Alternative: Step into comfort"),
        ok("Alternative: New shoes await"),
    ]);

    let (report, dedup) = run_batch(&mut table, &client, Arc::new(MemoryStore::new()), 3).await;

    assert!(report.completed());
    assert_eq!(report.rows_processed, 1);
    assert_eq!(report.slots_written, 3);
    assert_eq!(
        table.alternatives(3)[0].as_deref(),
        Some("Grab your shoes today")
    );
    assert!(dedup.contains("Buy shoes now!!!", "Grab your shoes today"));
}

// Scenario B: a question mark rejects the slot outright; the cell is
// cleared, not repaired.
#[tokio::test(start_paused = true)]
async fn forbidden_characters_reject_the_slot() {
    let mut table = MemoryTable::new(vec![low_row("headline", "Buy shoes now")]);
    let client = ScriptedClient::new(vec![
        ok("Is this the best deal?"),
        ok("Alternative: Step into comfort"),
        ok("Alternative: New shoes await"),
    ]);

    let (report, _) = run_batch(&mut table, &client, Arc::new(MemoryStore::new()), 3).await;

    assert!(report.completed());
    assert_eq!(report.slots_cleared, 1);
    assert_eq!(report.slots_written, 2);
    assert_eq!(table.alternatives(3)[0], None);
    assert!(table.alternatives(3)[1].is_some());
}

// Scenario C: over-ceiling output is rejected, never truncated.
#[tokio::test(start_paused = true)]
async fn over_ceiling_output_is_cleared_not_truncated() {
    let mut table = MemoryTable::new(vec![low_row("description", "Roomy hiking boots")]);
    let oversized = "x".repeat(95);
    let client = ScriptedClient::new(vec![
        ok(&oversized),
        ok("Alternative: Boots built for long trails"),
        ok("Alternative: All-day comfort on rough ground"),
    ]);

    let (report, _) = run_batch(&mut table, &client, Arc::new(MemoryStore::new()), 3).await;

    assert!(report.completed());
    assert_eq!(table.alternatives(3)[0], None);
    assert_eq!(report.slots_cleared, 1);
    assert_eq!(report.slots_written, 2);
}

// Scenario D: a rate limit surviving all five attempts aborts the whole
// batch, not just the slot.
#[tokio::test(start_paused = true)]
async fn rate_limit_exhaustion_aborts_the_batch() {
    let mut table = MemoryTable::new(vec![
        low_row("headline", "Buy shoes now"),
        low_row("headline", "Never processed"),
    ]);
    let script = repeat(
        ProviderFailure::RateLimited {
            retry_after_ms: Some(3500),
        },
        5,
    )
    .collect();
    let client = ScriptedClient::new(script);

    let (report, _) = run_batch(&mut table, &client, Arc::new(MemoryStore::new()), 3).await;

    match report.stopped {
        Some(StopReason::RateLimitExhausted(detail)) => {
            assert!(detail.contains("rate limit"), "detail: {detail}");
        }
        other => panic!("expected rate-limit abort, got {other:?}"),
    }
    assert_eq!(client.calls(), 5);
    assert_eq!(table.alternatives(3)[0], None);
    assert_eq!(report.slots_written, 0);
}

// Scenario E: three consecutive failed slots abort the batch even when they
// span rows.
#[tokio::test(start_paused = true)]
async fn circuit_breaker_counts_across_rows() {
    let mut table = MemoryTable::new(vec![
        low_row("headline", "First source"),
        low_row("headline", "Second source"),
    ]);
    let mut script = vec![
        ok("Alternative: First keeper"),
        ok("Alternative: Second keeper"),
    ];
    // Row 3 slot 3, then row 4 slots 1-2: five transient attempts each.
    script.extend(repeat(ProviderFailure::EmptyResponse, 15));
    let client = ScriptedClient::new(script);

    let (report, _) = run_batch(&mut table, &client, Arc::new(MemoryStore::new()), 3).await;

    assert_eq!(report.stopped, Some(StopReason::ConsecutiveErrors(3)));
    assert_eq!(report.slots_written, 2);
    // The third slot of row 4 is never attempted.
    assert_eq!(client.calls(), 2 + 15);
}

#[tokio::test(start_paused = true)]
async fn accepted_slot_resets_the_error_counter() {
    let mut table = MemoryTable::new(vec![low_row("headline", "Buy shoes now")]);
    let mut script = Vec::new();
    script.extend(repeat(ProviderFailure::EmptyResponse, 5)); // slot 1 errored
    script.push(ok("Alternative: Good one")); // slot 2 resets the counter
    script.extend(repeat(ProviderFailure::EmptyResponse, 5)); // slot 3 errored
    let client = ScriptedClient::new(script);

    let (report, _) = run_batch(&mut table, &client, Arc::new(MemoryStore::new()), 3).await;

    assert!(report.completed(), "stopped: {:?}", report.stopped);
    assert_eq!(report.slots_written, 1);
    assert_eq!(report.slots_cleared, 2);
}

#[tokio::test(start_paused = true)]
async fn duplicates_are_rejected_and_excluded_from_later_prompts() {
    let mut table = MemoryTable::new(vec![low_row("headline", "Buy shoes now")]);
    let client = ScriptedClient::new(vec![
        ok("Alternative: Same Text"),
        ok("same text."),
        ok("Alternative: Different text"),
    ]);

    let (report, dedup) = run_batch(&mut table, &client, Arc::new(MemoryStore::new()), 3).await;

    assert!(report.completed());
    assert_eq!(report.slots_written, 2);
    assert_eq!(table.alternatives(3)[1], None);
    assert_eq!(
        dedup.exclusions_for("Buy shoes now"),
        vec!["different text", "same text"]
    );

    let prompts = client.prompts();
    assert!(prompts[0].contains("Do not use these alternatives: None."));
    assert!(prompts[1].contains("same text"));
    assert!(prompts[2].contains("same text"));
}

#[tokio::test(start_paused = true)]
async fn ineligible_rows_are_skipped() {
    let mut table = MemoryTable::new(vec![
        labeled_row("GOOD", "headline", "Performs fine"),
        labeled_row("LOW", "", "Missing asset type"),
        labeled_row("LOW", "headline", ""),
        labeled_row("BEST", "description", "Top performer"),
    ]);
    let client = ScriptedClient::new(Vec::new());

    let (report, _) = run_batch(&mut table, &client, Arc::new(MemoryStore::new()), 3).await;

    assert!(report.completed());
    assert_eq!(report.rows_processed, 0);
    assert_eq!(client.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn start_row_skips_earlier_rows() {
    let mut table = MemoryTable::new(vec![
        low_row("headline", "First source"),
        low_row("headline", "Second source"),
    ]);
    let client = ScriptedClient::new(vec![
        ok("Alternative: Only for row four"),
        ok("Alternative: Another for row four"),
        ok("Alternative: Third for row four"),
    ]);

    let (report, _) = run_batch(&mut table, &client, Arc::new(MemoryStore::new()), 4).await;

    assert!(report.completed());
    assert_eq!(report.rows_processed, 1);
    assert_eq!(table.alternatives(3)[0], None);
    assert!(table.alternatives(4)[0].is_some());
    for prompt in client.prompts() {
        assert!(prompt.contains("Second source"));
    }
}

#[tokio::test(start_paused = true)]
async fn preset_stop_flag_cancels_before_any_write() {
    let store = Arc::new(MemoryStore::new());
    store.stop();
    let mut table = MemoryTable::new(vec![low_row("headline", "Buy shoes now")]);
    let client = ScriptedClient::new(vec![ok("Alternative: Never used")]);

    let (report, _) = run_batch(&mut table, &client, store, 3).await;

    assert_eq!(report.stopped, Some(StopReason::Cancelled));
    assert_eq!(client.calls(), 0);
    assert_eq!(table.alternatives(3)[0], None);
}

#[tokio::test(start_paused = true)]
async fn caller_supplied_eligibility_policy_is_honored() {
    let mut table = MemoryTable::new(vec![
        labeled_row("GOOD", "headline", "Also wanted"),
        labeled_row("LOW", "headline", "Wanted"),
    ]);
    let client = ScriptedClient::new(vec![
        ok("Alternative: One"),
        ok("Alternative: Two"),
        ok("Alternative: Three"),
        ok("Alternative: Four"),
        ok("Alternative: Five"),
        ok("Alternative: Six"),
    ]);

    let store: Arc<dyn PropertyStore> = Arc::new(MemoryStore::new());
    let control = RunControl::new(store);
    let mut dedup = DedupIndex::new();
    let report = BatchOrchestrator::new(
        &client,
        &mut table,
        &control,
        &mut dedup,
        ProviderId::Groq,
        "gemma2-9b-it".to_string(),
        3,
    )
    .with_eligibility(|row| !row.source_text.trim().is_empty())
    .run()
    .await
    .unwrap();

    assert!(report.completed());
    assert_eq!(report.rows_processed, 2);
}

#[tokio::test(start_paused = true)]
async fn unknown_asset_types_use_the_default_ceiling() {
    let mut table = MemoryTable::new(vec![low_row("sitelink", "Visit our store")]);
    let within_default = "y".repeat(90);
    let over_default = "y".repeat(91);
    let client = ScriptedClient::new(vec![
        ok(&within_default),
        ok(&over_default),
        ok("Alternative: Short and sweet"),
    ]);

    let (report, _) = run_batch(&mut table, &client, Arc::new(MemoryStore::new()), 3).await;

    assert!(report.completed());
    assert_eq!(table.alternatives(3)[0].as_deref(), Some(within_default.as_str()));
    assert_eq!(table.alternatives(3)[1], None);
}
