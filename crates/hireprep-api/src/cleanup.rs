use std::collections::HashSet;

use tracing::{info, warn};

use hireprep_db::Database;

use crate::storage::ResourceStore;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub orphans_removed: usize,
    pub missing_blobs: usize,
}

/// Reconcile the blob store with the `resources` table.
///
/// Files with no row are leftovers from a crash between the blob write and
/// the row insert, and are deleted. Rows with no file are only reported.
/// Must run before the server accepts uploads, since an in-flight upload
/// looks exactly like an orphan.
pub async fn sweep_resources(db: &Database, store: &ResourceStore) -> anyhow::Result<SweepReport> {
    let known: HashSet<String> = db.resource_file_names()?.into_iter().collect();
    let on_disk = store.list_files().await?;

    let mut report = SweepReport::default();

    for name in on_disk.iter().filter(|n| !known.contains(n.as_str())) {
        match store.remove(name).await {
            Ok(_) => report.orphans_removed += 1,
            Err(e) => warn!("Could not remove orphaned file {}: {}", name, e),
        }
    }

    let on_disk: HashSet<&str> = on_disk.iter().map(String::as_str).collect();
    for name in known.iter().filter(|n| !on_disk.contains(n.as_str())) {
        warn!("Resource row points at missing file {}", name);
        report.missing_blobs += 1;
    }

    if report != SweepReport::default() {
        info!(
            "Sweep: removed {} orphaned files, {} rows without files",
            report.orphans_removed, report.missing_blobs
        );
    }

    Ok(report)
}
