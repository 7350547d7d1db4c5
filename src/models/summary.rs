//! Reconciliation outcome reporting.

/// Catalog section a monitor belongs to, used to bucket the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Certificate-expiry checks.
    Ssl,
    /// DNS resolution checks.
    Dns,
    /// HTTP health checks.
    Http,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Ssl => write!(f, "ssl"),
            Category::Dns => write!(f, "dns"),
            Category::Http => write!(f, "http"),
        }
    }
}

/// Per-category counts of reconciliation outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategorySummary {
    /// Monitors newly created on the service.
    pub created: usize,
    /// Monitors that already existed, either in the observed snapshot or as
    /// a uniqueness conflict reported on create.
    pub skipped: usize,
    /// Monitors whose create operation failed for any other reason.
    pub failed: usize,
}

/// A per-item failure recorded in the summary.
#[derive(Debug, Clone)]
pub struct FailedItem {
    /// Name of the monitor the operation was for.
    pub name: String,
    /// The error message reported for it.
    pub error: String,
}

/// The complete outcome of one reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Outcome counts per catalog section, in catalog order.
    pub categories: Vec<(Category, CategorySummary)>,
    /// Every failed item with its error message.
    pub failures: Vec<FailedItem>,
}

impl RunSummary {
    /// Total monitors created across all categories.
    pub fn created(&self) -> usize {
        self.categories.iter().map(|(_, c)| c.created).sum()
    }

    /// Total monitors skipped across all categories.
    pub fn skipped(&self) -> usize {
        self.categories.iter().map(|(_, c)| c.skipped).sum()
    }

    /// Total failed operations across all categories.
    pub fn failed(&self) -> usize {
        self.categories.iter().map(|(_, c)| c.failed).sum()
    }
}
