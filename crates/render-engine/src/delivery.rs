//! Delivery sinks: where exported files go.
//!
//! The engine only yields `{name, bytes}` pairs. Triggering a download,
//! writing to disk, or uploading is the sink's job.

use std::path::PathBuf;

use anyhow::Context;

use pixbatch_common::error::PixbatchResult;

use crate::export::ExportedFile;

/// Receives exported files one at a time, in batch order.
pub trait DeliverySink: Send {
    /// Deliver one file.
    fn deliver(&mut self, file: &ExportedFile) -> PixbatchResult<()>;

    /// Sink name for logging.
    fn name(&self) -> &str;
}

/// Keeps every delivery in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub delivered: Vec<ExportedFile>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.delivered.iter().map(|f| f.name.as_str()).collect()
    }
}

impl DeliverySink for MemorySink {
    fn deliver(&mut self, file: &ExportedFile) -> PixbatchResult<()> {
        self.delivered.push(file.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Writes each delivery into a host-chosen directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DeliverySink for DirectorySink {
    fn deliver(&mut self, file: &ExportedFile) -> PixbatchResult<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.dir.join(&file.name);
        std::fs::write(&path, &file.bytes)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::debug!(path = %path.display(), size = file.bytes.len(), "File delivered");
        Ok(())
    }

    fn name(&self) -> &str {
        "directory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.deliver(&ExportedFile::new("a.png", vec![1])).unwrap();
        sink.deliver(&ExportedFile::new("b.png", vec![2])).unwrap();
        assert_eq!(sink.names(), vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_directory_sink_writes_file() {
        let dir = std::env::temp_dir().join(format!("pixbatch-sink-{}", std::process::id()));
        let mut sink = DirectorySink::new(&dir);
        sink.deliver(&ExportedFile::new("out.png", vec![9, 9])).unwrap();
        assert_eq!(std::fs::read(dir.join("out.png")).unwrap(), vec![9, 9]);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
