//! Diffs the desired catalog against the service's observed state and
//! applies additive, idempotent mutations.
//!
//! Each item moves through `Pending → Creating | Updating | Deleting →
//! Succeeded | Skipped | Failed`. Items are processed strictly sequentially
//! on the single session: every request/response cycle completes before the
//! next begins, which keeps push correlation safe and the summary
//! deterministic. One bad spec never blocks unrelated ones; only
//! connection-level errors abort the batch.

use std::collections::HashSet;

use crate::{
    catalog::Catalog,
    client::{ClientError, MonitorApi},
    models::{CategorySummary, FailedItem, MonitorSpec, RunSummary},
};

/// The outcome of one explicit per-id operation (delete or edit).
#[derive(Debug, Clone)]
pub struct ItemResult {
    /// The service-assigned id the operation targeted.
    pub id: i64,
    /// `None` on success, otherwise the error message.
    pub error: Option<String>,
}

impl ItemResult {
    /// True when the operation succeeded.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Applies catalog-driven and operator-driven mutations through the service
/// client.
pub struct Reconciler<'a> {
    api: &'a dyn MonitorApi,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler over the given client.
    pub fn new(api: &'a dyn MonitorApi) -> Self {
        Self { api }
    }

    /// Reconciles every desired monitor in the catalog against the observed
    /// snapshot.
    ///
    /// Monitors already present by name are skipped without a network call.
    /// A uniqueness conflict reported on create (a race against the snapshot
    /// observed earlier) is also a skip: the desired outcome "monitor
    /// exists" is already met. Any other per-item failure is recorded in the
    /// summary and processing continues.
    pub async fn reconcile(&self, catalog: &Catalog) -> Result<RunSummary, ClientError> {
        let observed = self.api.monitor_list().await?;
        let existing: HashSet<String> =
            observed.values().map(|monitor| monitor.name().to_string()).collect();

        let mut summary = RunSummary::default();
        for (category, specs) in catalog.sections() {
            let mut counts = CategorySummary::default();

            for spec in specs {
                if existing.contains(&spec.name) {
                    tracing::debug!(monitor = %spec.name, "Monitor already present, skipping");
                    counts.skipped += 1;
                    continue;
                }

                match self.api.create_monitor(spec).await {
                    Ok(id) => {
                        tracing::info!(monitor = %spec.name, id, "Created monitor");
                        counts.created += 1;
                    }
                    Err(error) if error.is_duplicate_name() => {
                        tracing::info!(
                            monitor = %spec.name,
                            "Monitor already exists on the service, skipping"
                        );
                        counts.skipped += 1;
                    }
                    Err(error) if error.is_fatal() => return Err(error),
                    Err(error) => {
                        tracing::warn!(monitor = %spec.name, %error, "Failed to create monitor");
                        counts.failed += 1;
                        summary
                            .failures
                            .push(FailedItem { name: spec.name.clone(), error: error.to_string() });
                    }
                }
            }

            summary.categories.push((category, counts));
        }

        Ok(summary)
    }

    /// Deletes monitors by operator-supplied ids, sequentially. Not-found
    /// and other per-item errors are recorded and the remaining ids are
    /// still processed.
    pub async fn delete_monitors(&self, ids: &[i64]) -> Result<Vec<ItemResult>, ClientError> {
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            match self.api.delete_monitor(id).await {
                Ok(()) => {
                    tracing::info!(id, "Deleted monitor");
                    results.push(ItemResult { id, error: None });
                }
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    tracing::warn!(id, %error, "Failed to delete monitor");
                    results.push(ItemResult { id, error: Some(error.to_string()) });
                }
            }
        }
        Ok(results)
    }

    /// Replaces one monitor's definition by id.
    pub async fn edit_monitor(&self, id: i64, spec: &MonitorSpec) -> Result<(), ClientError> {
        self.api.update_monitor(id, spec).await?;
        tracing::info!(id, monitor = %spec.name, "Updated monitor");
        Ok(())
    }
}
