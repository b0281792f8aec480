//! Deterministic output names.

use std::collections::HashSet;

/// Extension of every rendered output.
pub const RASTER_EXTENSION: &str = "png";

/// Extension of packaged deliveries.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// `"{prefix}_{stem}.png"` for a per-item output.
pub fn item_file_name(prefix: &str, stem: &str) -> String {
    format!("{prefix}_{stem}.{RASTER_EXTENSION}")
}

/// `"{prefix}_{millis}.png"` for a single composed output.
pub fn timestamped_file_name(prefix: &str, millis: i64) -> String {
    format!("{prefix}_{millis}.{RASTER_EXTENSION}")
}

/// `"{prefix}_{millis}.zip"`.
pub fn archive_file_name(prefix: &str, millis: i64) -> String {
    format!("{prefix}_{millis}.{ARCHIVE_EXTENSION}")
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Hands out unique names, suffixing `_2`, `_3`, ... on collisions.
///
/// Two sources called `photo.jpg` and `photo.png` would otherwise both
/// become `framed_photo.png`, which an archive cannot hold twice.
#[derive(Debug, Default)]
pub struct UniqueNames {
    seen: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, name: String) -> String {
        if self.seen.insert(name.clone()) {
            return name;
        }
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem.to_string(), format!(".{ext}")),
            None => (name.clone(), String::new()),
        };
        let mut n = 2;
        loop {
            let candidate = format!("{stem}_{n}{ext}");
            if self.seen.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
