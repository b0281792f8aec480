//! Zip packaging for archive deliveries.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use pixbatch_common::error::{PixbatchError, PixbatchResult};

use crate::export::ExportedFile;

/// Package `files` into one Deflate-compressed zip, in order.
pub fn build_archive(files: &[ExportedFile]) -> PixbatchResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in files {
        writer
            .start_file(file.name.as_str(), options)
            .map_err(|e| PixbatchError::archive(format!("{}: {e}", file.name)))?;
        writer.write_all(&file.bytes)?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| PixbatchError::archive(e.to_string()))?;
    let bytes = cursor.into_inner();
    tracing::debug!(entries = files.len(), size = bytes.len(), "Archive built");
    Ok(bytes)
}
