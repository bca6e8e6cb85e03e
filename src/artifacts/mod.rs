mod sweep;

pub use sweep::{SweepTarget, spawn_sweeper, sweep_older_than};

use crate::Result;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Directory of publicly servable chart images written by the analysis unit.
///
/// The store never writes artifacts itself. It owns the directory, knows the
/// URL prefix the directory is served under, and turns whatever path the
/// analysis unit reported into a URL a browser can fetch.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    url_prefix: String,
}

impl ArtifactStore {
    /// Creates the directory (and parents) if needed and resolves it to an
    /// absolute path. Safe to call concurrently and repeatedly.
    pub async fn open(dir: impl AsRef<Path>, url_prefix: &str) -> Result<Self> {
        let dir = ensure_dir(dir.as_ref()).await?;
        info!("Artifact directory ready: {}", dir.display());

        Ok(Self {
            dir,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.url_prefix, file_name.trim_start_matches('/'))
    }

    /// Maps a path reported by the analysis unit to a servable URL.
    ///
    /// URLs already under the prefix are returned as-is, as is anything that
    /// cannot be located inside the artifact directory.
    pub fn public_url(&self, reported: &str) -> String {
        if reported.starts_with(&format!("{}/", self.url_prefix)) {
            return reported.to_string();
        }

        let path = Path::new(reported);
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.dir).ok()
        } else if is_bare_file_name(path) {
            Some(path)
        } else {
            None
        };

        match relative.and_then(url_segments) {
            Some(segments) => {
                let url = self.url_for(&segments);
                debug!("Rewrote artifact path {} -> {}", reported, url);
                url
            }
            None => reported.to_string(),
        }
    }
}

/// `create_dir_all` tolerates a directory that already exists, including one
/// created by a concurrent caller between the check and the create.
pub(crate) async fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(tokio::fs::canonicalize(dir).await?)
}

/// Reduces a client-supplied file name to a single safe path component.
///
/// Returns `None` when nothing usable is left (empty, `.` or `..`).
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    Some(cleaned)
}

/// Prefixes a sanitized name with the run id so concurrent runs never share a file.
pub fn namespaced(run_id: Uuid, file_name: &str) -> String {
    format!("{}_{}", run_id.simple(), file_name)
}

fn is_bare_file_name(path: &Path) -> bool {
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn url_segments(relative: &Path) -> Option<String> {
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => segments.push(part.to_str()?.to_string()),
            _ => return None,
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}
