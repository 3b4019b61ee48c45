use notify::event::{AccessKind, AccessMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Error;
use crate::zone::{parse_zones, ZoneDefinition};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/traffi/boundaries.csv";

/// Ordered zone list shared between the frame filter and the reload watcher.
///
/// Reloads swap the whole list at once; readers hold on to a snapshot for the
/// duration of a frame and never see a mix of old and new entries.
#[derive(Debug)]
pub struct ZoneConfig {
    path: PathBuf,
    zones: RwLock<Arc<[ZoneDefinition]>>,
}

impl ZoneConfig {
    /// Loads `path` once. A missing or malformed file leaves the list empty
    /// rather than failing, so tracking can start and pick up a later fix.
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        let config = Self {
            path: path.into(),
            zones: RwLock::new(Arc::from(Vec::new())),
        };

        let _ = config.reload();
        config
    }

    pub fn from_zones(zones: Vec<ZoneDefinition>) -> Self {
        Self {
            path: PathBuf::new(),
            zones: RwLock::new(zones.into()),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn snapshot(&self) -> Arc<[ZoneDefinition]> {
        self.zones.read().clone()
    }

    pub fn replace(&self, zones: Vec<ZoneDefinition>) {
        *self.zones.write() = zones.into();
    }

    /// Re-reads the backing file. On any error the previous list stays active.
    pub fn reload(&self) -> Result<usize, Error> {
        let parsed = std::fs::read_to_string(&self.path)
            .map_err(Error::from)
            .and_then(|text| parse_zones(&text));

        match parsed {
            Ok(zones) => {
                let count = zones.len();
                self.replace(zones);
                info!(path = %self.path.display(), zones = count, "boundary config loaded");
                Ok(count)
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "boundary config rejected, keeping previous");
                Err(err)
            }
        }
    }

    /// Reloads whenever the backing file is closed after a write. The watch
    /// stops when the returned handle is dropped.
    pub fn watch(self: &Arc<Self>) -> Result<ZoneWatcher, Error> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(|n| n.to_os_string());

        let config = Arc::clone(self);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    warn!(error = %err, "boundary watch error");
                    return;
                }
            };

            if event.kind != EventKind::Access(AccessKind::Close(AccessMode::Write)) {
                return;
            }

            if event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name)
            {
                info!(path = %config.path.display(), "boundary config changed, reloading");
                let _ = config.reload();
            }
        })?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        Ok(ZoneWatcher { _watcher: watcher })
    }
}

pub struct ZoneWatcher {
    _watcher: RecommendedWatcher,
}
