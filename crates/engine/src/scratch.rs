use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use pcat_layer::Layer;
use serde::Serialize;

use crate::error::Result;

/// Intermediate layers created by one calculator invocation.
///
/// With a workspace directory every kept layer is written as
/// `<stage>_<label>.json`; all of them are removed when the scratch is
/// dropped, whether the calculator returned normally or bailed out early.
#[derive(Debug)]
pub struct Scratch {
    stage: String,
    dir: Option<PathBuf>,
    labels: Vec<String>,
    written: Vec<PathBuf>,
}

fn file_stem(stage: &str, label: &str) -> String {
    format!("{stage}_{label}")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

impl Scratch {
    pub fn new(stage: impl Into<String>, workspace: Option<&Path>) -> Self {
        Self {
            stage: stage.into(),
            dir: workspace.map(Path::to_path_buf),
            labels: Vec::new(),
            written: Vec::new(),
        }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Labels of the intermediates recorded so far, in creation order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Paths currently held on disk
    pub fn files(&self) -> &[PathBuf] {
        &self.written
    }

    /// Record an intermediate layer
    pub fn keep<G: Serialize>(&mut self, label: &str, layer: &Layer<G>) -> Result<()> {
        log::debug!(
            "[{}] intermediate '{}': {} features",
            self.stage,
            label,
            layer.len()
        );
        self.labels.push(label.to_string());

        if let Some(dir) = &self.dir {
            fs::create_dir_all(dir)?;
            let path = dir.join(format!("{}.json", file_stem(&self.stage, label)));
            let writer = BufWriter::new(File::create(&path)?);
            // Register before writing so a failed write is still cleaned up.
            self.written.push(path);
            serde_json::to_writer(writer, layer)?;
        }
        Ok(())
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if self.labels.is_empty() {
            return;
        }
        log::debug!(
            "[{}] deleting {} temporary layers",
            self.stage,
            self.labels.len()
        );
        for path in self.written.drain(..) {
            if let Err(err) = fs::remove_file(&path) {
                log::warn!("failed to delete temporary layer {}: {err}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn files_removed_on_drop() {
        let dir = tempdir().unwrap();
        let layer = Layer::from_geometries("parcels", [1u8, 2]);
        let path;
        {
            let mut scratch = Scratch::new("buffer ring 'quarter'", Some(dir.path()));
            scratch.keep("buffer", &layer).unwrap();
            path = scratch.files()[0].clone();
            assert!(path.exists());
            assert_eq!(
                path.file_name().unwrap().to_str().unwrap(),
                "buffer_ring__quarter__buffer.json"
            );
        }
        assert!(!path.exists());
    }

    #[test]
    fn files_removed_on_early_return() {
        fn failing_stage(dir: &Path) -> std::result::Result<(), String> {
            let mut scratch = Scratch::new("perimeter", Some(dir));
            scratch
                .keep("boundary", &Layer::from_geometries("b", [0u8]))
                .map_err(|e| e.to_string())?;
            Err("boom".to_string())
        }

        let dir = tempdir().unwrap();
        assert!(failing_stage(dir.path()).is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn in_memory_scratch_tracks_labels() {
        let mut scratch = Scratch::new("connectivity", None);
        scratch.keep("hull", &Layer::from_geometries("h", [0u8])).unwrap();
        assert_eq!(scratch.labels(), ["hull".to_string()]);
        assert!(scratch.files().is_empty());
    }
}
