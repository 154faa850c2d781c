use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use dhemitter::upsert::classify;
use dhemitter::{
    dataset_urn, structured_property_urn, upsert_with_retry, FailureKind, MetadataGraph,
    PropertyUpsertRequest, SyncOutcome, RETENTION_PROPERTY_ID,
};
use snowfetcher::{extract_retention_facts, CatalogService, SourceFilter, TableRetentionFact};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::{SyncOptions, PLATFORM};
use crate::error::Result;

/// Aggregate of one run, folded from immutable per-entity outcomes.
///
/// The histogram reflects what was extracted (post-filter), independent of
/// whether the corresponding upserts succeeded. A fully failed batch is a
/// valid terminal state: callers derive success from `failed == 0`, never
/// from an error return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub dry_run: bool,
    /// True when the run was cut short by a shutdown signal; the counts then
    /// cover only what completed before the interrupt.
    pub interrupted: bool,
    /// Tables extracted from the catalog (after filtering).
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures_by_kind: BTreeMap<FailureKind, usize>,
    /// retention-days -> table count over all extracted facts.
    pub histogram: BTreeMap<i64, usize>,
}

impl SyncReport {
    fn build(
        dry_run: bool,
        interrupted: bool,
        facts: &[TableRetentionFact],
        outcomes: &[SyncOutcome],
    ) -> Self {
        let mut histogram = BTreeMap::new();
        for fact in facts {
            *histogram.entry(fact.retention_days).or_insert(0) += 1;
        }

        let mut succeeded = 0;
        let mut failures_by_kind = BTreeMap::new();
        for outcome in outcomes {
            match &outcome.result {
                Ok(()) => succeeded += 1,
                Err(failure) => {
                    *failures_by_kind.entry(failure.kind).or_insert(0) += 1;
                }
            }
        }

        Self {
            dry_run,
            interrupted,
            total: facts.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            failures_by_kind,
            histogram,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn log_summary(&self) {
        info!("retention period distribution:");
        for (days, count) in &self.histogram {
            info!("  {days} days: {count} tables");
        }

        if self.dry_run {
            info!(
                "dry run complete: {} tables extracted, no writes issued",
                self.total
            );
        } else {
            info!("sync complete: {} tables processed", self.total);
            info!("  succeeded: {}", self.succeeded);
            info!("  failed: {}", self.failed);
        }
        for (kind, count) in &self.failures_by_kind {
            warn!("  {count} failure(s) of kind {kind}");
        }
        if self.interrupted {
            warn!("run was interrupted; counts reflect completed work only");
        }
    }
}

/// Drives the full pipeline: extract, filter, map, sync (or dry-run), report.
///
/// Only extraction-level failures (no catalog session, no database listing)
/// return an error; everything past that point degrades to per-entity
/// outcomes inside the report. `shutdown` resolving abandons in-flight
/// upserts and yields a partial report of whatever completed.
pub async fn run_sync(
    catalog: &dyn CatalogService,
    graph: Arc<dyn MetadataGraph>,
    filter: &SourceFilter,
    options: &SyncOptions,
    shutdown: impl Future<Output = ()> + Send,
) -> Result<SyncReport> {
    info!("starting retention extraction");
    let facts = extract_retention_facts(catalog, filter).await?;

    let property_urn = structured_property_urn(RETENTION_PROPERTY_ID);
    let mut outcomes: Vec<SyncOutcome> = Vec::new();
    let mut pending: Vec<PropertyUpsertRequest> = Vec::new();

    for fact in &facts {
        match dataset_urn(
            PLATFORM,
            &fact.database,
            &fact.schema,
            &fact.table,
            &options.environment,
        ) {
            Ok(urn) => pending.push(PropertyUpsertRequest {
                urn,
                property_urn: property_urn.clone(),
                value: fact.retention_days,
            }),
            Err(err) => {
                warn!("cannot map {} to a URN: {err}", fact.qualified_name());
                outcomes.push(SyncOutcome::failure(
                    fact.qualified_name(),
                    classify(&err),
                    err.to_string(),
                ));
            }
        }
    }

    if options.dry_run {
        info!("dry run: {} datasets would be synced", pending.len());
        let report = SyncReport::build(true, false, &facts, &outcomes);
        report.log_summary();
        return Ok(report);
    }

    info!(
        "syncing {} datasets ({} max in flight)",
        pending.len(),
        options.max_in_flight
    );

    let semaphore = Arc::new(Semaphore::new(options.max_in_flight.max(1)));
    let mut tasks = JoinSet::new();
    for request in pending {
        let graph = Arc::clone(&graph);
        let semaphore = Arc::clone(&semaphore);
        let retry = options.retry.clone();
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return SyncOutcome::failure(
                        request.urn.clone(),
                        FailureKind::Unknown,
                        "upsert scheduler shut down",
                    )
                }
            };
            upsert_with_retry(graph.as_ref(), &request, &retry).await
        });
    }

    tokio::pin!(shutdown);
    let mut interrupted = false;
    loop {
        tokio::select! {
            joined = tasks.join_next() => match joined {
                Some(Ok(outcome)) => outcomes.push(outcome),
                Some(Err(err)) => {
                    if !err.is_cancelled() {
                        warn!("upsert task failed to complete: {err}");
                    }
                }
                None => break,
            },
            _ = &mut shutdown, if !interrupted => {
                warn!("shutdown requested, abandoning in-flight upserts");
                interrupted = true;
                tasks.abort_all();
            }
        }
    }

    let report = SyncReport::build(false, interrupted, &facts, &outcomes);
    report.log_summary();
    Ok(report)
}
