//! Command implementations for OxiFlate CLI.

pub mod compress;
pub mod decompress;
pub mod info;

pub use compress::{CompressOptions, cmd_compress};
pub use decompress::{DecompressOptions, cmd_decompress};
pub use info::cmd_info;
pub use test::cmd_test;

use crate::utils::format_ratio;
use std::io;
use std::path::{Path, PathBuf};

/// Outcome of compressing or decompressing one file.
#[derive(Debug)]
pub struct FileReport {
    pub output: PathBuf,
    pub original: u64,
    pub compressed: u64,
}

/// Print one line per file and fail if any file failed.
fn report(results: &[(&PathBuf, io::Result<FileReport>)]) -> Result<(), Box<dyn std::error::Error>> {
    let mut failed = 0usize;
    for (input, result) in results {
        match result {
            Ok(r) => println!(
                "{} -> {} ({} -> {} bytes, {})",
                input.display(),
                r.output.display(),
                r.original,
                r.compressed,
                format_ratio(r.original, r.compressed)
            ),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", input.display(), e);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} files failed", failed, results.len()).into());
    }
    Ok(())
}

/// Reject inputs that are not regular files, and outputs that would
/// overwrite their own input.
fn check_paths(input: &Path, output: &Path) -> io::Result<()> {
    if !input.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", input.display()),
        ));
    }
    if output == input {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "output would overwrite the input",
        ));
    }
    Ok(())
}
