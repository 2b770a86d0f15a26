use crate::counts::CategoryCount;
use std::collections::BTreeSet;

/// Categories that need their file list fetched again, split by the reason
/// they were flagged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Remote count differs from the cached count (new or changed on the server).
    pub remote_changed: BTreeSet<String>,
    /// Fewer files on disk than the cache says were synced.
    pub local_missing: BTreeSet<String>,
}

impl Reconciliation {
    pub fn categories(&self) -> BTreeSet<String> {
        self.remote_changed
            .union(&self.local_missing)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.remote_changed.is_empty() && self.local_missing.is_empty()
    }
}

/// Three-way diff between the remote counts, the counts cached by the last
/// committed run (`None` on a first run) and the files found on disk.
///
/// Remote counts are compared with inequality while local counts only flag
/// when they fall *below* the cached value; extra local files never trigger a
/// fetch. The cache-vs-local pass is restricted to categories the remote
/// still reports (count > 0): a category gone from the remote is never
/// flagged, even when its local folder holds fewer files than cached.
pub fn reconcile(
    remote: &CategoryCount,
    cached: Option<&CategoryCount>,
    local: &CategoryCount,
) -> Reconciliation {
    let mut outcome = Reconciliation::default();

    for (category, &count) in remote {
        let known = cached.map_or(0, |cached| cached.get(category));
        if count > 0 && count != known {
            outcome.remote_changed.insert(category.clone());
        }
    }

    if let Some(cached) = cached {
        for (category, &count) in cached {
            if count > local.get(category) && remote.get(category) > 0 {
                outcome.local_missing.insert(category.clone());
            }
        }
    }

    outcome
}
