//! Compress command implementation.

use super::{FileReport, check_paths, report};
use crate::utils::{
    check_overwrite, compressed_name, create_progress_bar, preserve_mtime, resolve_output,
    total_size, write_output,
};
use indicatif::ProgressBar;
use oxiflate_core::Strategy;
use oxiflate_deflate::{DeflateConfig, ZlibWriter};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Options for the compress command.
pub struct CompressOptions {
    pub level: u8,
    pub raw: bool,
    pub strategy: Strategy,
    pub output: Option<PathBuf>,
    pub keep: bool,
    pub force: bool,
    pub progress: bool,
}

impl CompressOptions {
    fn config(&self) -> DeflateConfig {
        let config = DeflateConfig::new(self.level).with_strategy(self.strategy);
        if self.raw { config.raw() } else { config }
    }
}

/// Compress each file on its own session, in parallel.
pub fn cmd_compress(
    files: &[PathBuf],
    options: &CompressOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = create_progress_bar(total_size(files), options.progress);
    let multiple = files.len() > 1;

    let results: Vec<_> = files
        .par_iter()
        .map(|input| (input, compress_file(input, options, multiple, &pb)))
        .collect();
    pb.finish_and_clear();

    report(&results)
}

fn compress_file(
    input: &Path,
    options: &CompressOptions,
    multiple: bool,
    pb: &ProgressBar,
) -> io::Result<FileReport> {
    let output = resolve_output(input, compressed_name(input), options.output.as_deref(), multiple)?;
    check_paths(input, &output)?;
    check_overwrite(&output, options.force)?;

    let source = pb.wrap_read(File::open(input)?);
    let (original, compressed) = write_output(&output, |sink| {
        compress_stream(source, sink, options.config())
    })?;

    preserve_mtime(input, &output)?;
    if !options.keep {
        fs::remove_file(input)?;
    }
    tracing::info!(
        input = %input.display(),
        original,
        compressed,
        level = options.level,
        "file compressed"
    );

    Ok(FileReport {
        output,
        original,
        compressed,
    })
}

/// Compress everything from `source` into `sink`; returns the number of
/// input bytes and the sink.
pub fn compress_stream<R: Read, W: Write>(
    mut source: R,
    sink: W,
    config: DeflateConfig,
) -> io::Result<(u64, W)> {
    let mut writer = ZlibWriter::with_config(sink, config)?;
    io::copy(&mut source, &mut writer)?;
    let original = writer.total_in();
    let sink = writer.finish()?;
    Ok((original, sink))
}
