use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::detection::Detection;
use crate::error::Error;

/// Writes the raw detections of every `interval`-th frame to
/// `<dir>/detections_<n>.json`, `n` counting up from zero.
#[derive(Debug)]
pub struct SnapshotDumper {
    dir: PathBuf,
    interval: u64,
    frames_seen: u64,
    next_index: u64,
}

impl SnapshotDumper {
    pub fn new<P: Into<PathBuf>>(dir: P, interval: u64) -> Result<Self, Error> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            interval: interval.max(1),
            frames_seen: 0,
            next_index: 0,
        })
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn observe(&mut self, detections: &[Detection]) -> Result<Option<PathBuf>, Error> {
        self.frames_seen += 1;
        if self.frames_seen % self.interval != 0 {
            return Ok(None);
        }

        let path = self.dir.join(format!("detections_{}.json", self.next_index));
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, detections)?;
        self.next_index += 1;

        debug!(path = %path.display(), count = detections.len(), "detections dumped");

        Ok(Some(path))
    }
}
