//! Utility functions for the CLI.

use filetime::FileTime;
use indicatif::{ProgressBar, ProgressStyle};
use oxiflate_core::Adler32;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Suffix given to compressed files.
pub const SUFFIX: &str = "zz";

/// Create a byte-count progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
    let pb = ProgressBar::new(len);
    pb.set_style(style);
    pb
}

/// Total size of the given files; unreadable entries count as zero.
pub fn total_size(files: &[PathBuf]) -> u64 {
    files
        .iter()
        .filter_map(|f| fs::metadata(f).ok())
        .map(|m| m.len())
        .sum()
}

/// `name.ext` -> `name.ext.zz`
pub fn compressed_name(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(SUFFIX);
    PathBuf::from(name)
}

/// `name.ext.zz` -> `name.ext`; `None` without the suffix.
pub fn decompressed_name(input: &Path) -> Option<PathBuf> {
    if input.extension()? != SUFFIX {
        return None;
    }
    let stem = input.file_stem()?;
    if stem.is_empty() {
        return None;
    }
    Some(input.with_file_name(stem))
}

/// Resolve where the output for `input` goes.
///
/// An explicit output is a file path for a single input, or a directory
/// that receives the derived names of several inputs.
pub fn resolve_output(
    input: &Path,
    derived: PathBuf,
    output: Option<&Path>,
    multiple: bool,
) -> io::Result<PathBuf> {
    match output {
        None => Ok(derived),
        Some(dir) if multiple || dir.is_dir() => {
            if !dir.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} is not a directory", dir.display()),
                ));
            }
            let name = derived.file_name().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no file name", input.display()),
                )
            })?;
            Ok(dir.join(name))
        }
        Some(file) => Ok(file.to_path_buf()),
    }
}

/// Refuse to clobber an existing file unless forced.
pub fn check_overwrite(path: &Path, force: bool) -> io::Result<()> {
    if !force && path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists (use --force to overwrite)", path.display()),
        ));
    }
    Ok(())
}

/// Create `path` and fill it through `write`, removing it again if
/// `write` or the final flush fails. Returns the result of `write` and the
/// size of the finished file.
pub fn write_output<T, F>(path: &Path, write: F) -> io::Result<(T, u64)>
where
    F: FnOnce(BufWriter<File>) -> io::Result<(T, BufWriter<File>)>,
{
    let sink = BufWriter::new(File::create(path)?);
    let finished = write(sink).and_then(|(value, sink)| {
        let file = sink.into_inner().map_err(|e| e.into_error())?;
        Ok((value, file.metadata()?.len()))
    });
    if finished.is_err() {
        let _ = fs::remove_file(path);
    }
    finished
}

/// Copy the modification time of `from` onto `to`.
pub fn preserve_mtime(from: &Path, to: &Path) -> io::Result<()> {
    let metadata = fs::metadata(from)?;
    filetime::set_file_mtime(to, FileTime::from_last_modification_time(&metadata))
}

/// Space saved as a percentage, or `-` for empty input.
pub fn format_ratio(original: u64, compressed: u64) -> String {
    if original == 0 {
        return "-".to_string();
    }
    format!("{:.1}%", (1.0 - compressed as f64 / original as f64) * 100.0)
}

/// A writer that discards bytes while counting them and taking their
/// Adler-32.
#[derive(Debug, Default)]
pub struct ChecksumSink {
    adler: Adler32,
    count: u64,
}

impl ChecksumSink {
    /// Bytes written so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Adler-32 of the bytes written so far.
    pub fn checksum(&self) -> u32 {
        self.adler.finish()
    }
}

impl Write for ChecksumSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.adler.update(buf);
        self.count += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_name() {
        assert_eq!(compressed_name(Path::new("dir/notes.txt")), PathBuf::from("dir/notes.txt.zz"));
        assert_eq!(compressed_name(Path::new("data")), PathBuf::from("data.zz"));
    }

    #[test]
    fn test_decompressed_name() {
        assert_eq!(
            decompressed_name(Path::new("dir/notes.txt.zz")),
            Some(PathBuf::from("dir/notes.txt"))
        );
        assert_eq!(decompressed_name(Path::new("notes.txt")), None);
        assert_eq!(decompressed_name(Path::new(".zz")), None);
    }

    #[test]
    fn test_resolve_output() {
        let input = Path::new("a.txt");
        let derived = PathBuf::from("a.txt.zz");
        assert_eq!(resolve_output(input, derived.clone(), None, false).unwrap(), derived);
        assert_eq!(
            resolve_output(input, derived.clone(), Some(Path::new("out.bin")), false).unwrap(),
            PathBuf::from("out.bin")
        );

        let dir = std::env::temp_dir();
        assert_eq!(
            resolve_output(input, derived.clone(), Some(&dir), true).unwrap(),
            dir.join("a.txt.zz")
        );
        let missing = dir.join("oxiflate-no-such-dir");
        assert!(resolve_output(input, derived, Some(&missing), true).is_err());
    }

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(0, 8), "-");
        assert_eq!(format_ratio(200, 50), "75.0%");
        assert_eq!(format_ratio(100, 111), "-11.0%");
    }

    #[test]
    fn test_checksum_sink() {
        let mut sink = ChecksumSink::default();
        sink.write_all(b"Hello, ").unwrap();
        sink.write_all(b"World!").unwrap();
        assert_eq!(sink.count(), 13);
        assert_eq!(sink.checksum(), Adler32::checksum(b"Hello, World!"));
    }

    #[test]
    fn test_write_output_keeps_finished_file() {
        let path = std::env::temp_dir().join(format!("oxiflate-utils-{}-ok", std::process::id()));
        let (value, size) = write_output(&path, |mut sink| {
            sink.write_all(b"twelve bytes")?;
            Ok((7, sink))
        })
        .unwrap();
        assert_eq!((value, size), (7, 12));
        assert_eq!(fs::read(&path).unwrap(), b"twelve bytes");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_output_removes_failed_file() {
        let path = std::env::temp_dir().join(format!("oxiflate-utils-{}-err", std::process::id()));
        let err = write_output(&path, |mut sink| -> io::Result<((), BufWriter<File>)> {
            sink.write_all(b"partial")?;
            Err(io::Error::new(io::ErrorKind::InvalidData, "broken stream"))
        })
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(!path.exists());
    }
}
