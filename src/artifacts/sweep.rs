use crate::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A directory whose regular files expire after `max_age`.
#[derive(Debug, Clone)]
pub struct SweepTarget {
    pub dir: PathBuf,
    pub max_age: Duration,
}

/// Deletes regular files in `dir` last modified at least `max_age` ago.
///
/// Subdirectories are left alone. Files that vanish mid-sweep are not errors.
pub async fn sweep_older_than(dir: &Path, max_age: Duration) -> Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                warn!("Failed to stat {}: {}", entry.path().display(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!("Removed expired file {}", entry.path().display());
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
        }
    }

    Ok(removed)
}

/// Runs [`sweep_older_than`] over every target on a fixed interval.
///
/// Returns `None` when there is nothing to sweep.
pub fn spawn_sweeper(targets: Vec<SweepTarget>, interval: Duration) -> Option<JoinHandle<()>> {
    if targets.is_empty() {
        return None;
    }

    info!(
        "Starting retention sweeper for {} directories every {:?}",
        targets.len(),
        interval
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            for target in &targets {
                match sweep_older_than(&target.dir, target.max_age).await {
                    Ok(0) => {}
                    Ok(n) => info!("Swept {} expired files from {}", n, target.dir.display()),
                    Err(e) => warn!("Sweep of {} failed: {}", target.dir.display(), e),
                }
            }
        }
    }))
}
