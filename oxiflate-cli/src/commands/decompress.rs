//! Decompress command implementation.

use super::{FileReport, check_paths, report};
use crate::utils::{
    SUFFIX, check_overwrite, create_progress_bar, decompressed_name, preserve_mtime,
    resolve_output, total_size, write_output,
};
use indicatif::ProgressBar;
use oxiflate_deflate::{InflateConfig, ZlibReader};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Options for the decompress command.
pub struct DecompressOptions {
    pub raw: bool,
    pub output: Option<PathBuf>,
    pub keep: bool,
    pub force: bool,
    pub progress: bool,
}

impl DecompressOptions {
    fn config(&self) -> InflateConfig {
        if self.raw {
            InflateConfig::raw()
        } else {
            InflateConfig::default()
        }
    }
}

/// Decompress each file on its own session, in parallel.
pub fn cmd_decompress(
    files: &[PathBuf],
    options: &DecompressOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = create_progress_bar(total_size(files), options.progress);
    let multiple = files.len() > 1;

    let results: Vec<_> = files
        .par_iter()
        .map(|input| (input, decompress_file(input, options, multiple, &pb)))
        .collect();
    pb.finish_and_clear();

    report(&results)
}

pub(crate) fn decompress_file(
    input: &Path,
    options: &DecompressOptions,
    multiple: bool,
    pb: &ProgressBar,
) -> io::Result<FileReport> {
    let output = match (options.output.as_deref(), decompressed_name(input)) {
        (Some(file), _) if !multiple && !file.is_dir() => file.to_path_buf(),
        (output, Some(derived)) => resolve_output(input, derived, output, multiple)?,
        (_, None) => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{}: unknown suffix, expected .{}", input.display(), SUFFIX),
            ));
        }
    };
    check_paths(input, &output)?;
    check_overwrite(&output, options.force)?;

    let source = pb.wrap_read(File::open(input)?);
    let ((compressed, original), _) = write_output(&output, |sink| {
        let (compressed, original, sink) = decompress_stream(source, sink, options.config())?;
        Ok(((compressed, original), sink))
    })?;

    preserve_mtime(input, &output)?;
    if !options.keep {
        fs::remove_file(input)?;
    }
    tracing::info!(
        input = %input.display(),
        compressed,
        original,
        "file decompressed"
    );

    Ok(FileReport {
        output,
        original,
        compressed,
    })
}

/// Decompress one stream from `source` into `sink`; returns the compressed
/// bytes consumed, the bytes written and the sink.
pub fn decompress_stream<R: Read, W: Write>(
    source: R,
    mut sink: W,
    config: InflateConfig,
) -> io::Result<(u64, u64, W)> {
    let mut reader = ZlibReader::with_config(source, config)?;
    let original = io::copy(&mut reader, &mut sink)?;
    sink.flush()?;
    Ok((reader.total_in(), original, sink))
}
