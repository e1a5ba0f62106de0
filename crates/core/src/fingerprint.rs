//! Content fingerprint used by the subtitle service for exact matches.
//!
//! The fingerprint is the file size plus the wrapping sum of every
//! little-endian `u64` in the first and last 64 KiB of the file, printed as
//! 16 lowercase hex digits. The service matches on it bit for bit.

use crate::error::FingerprintError;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Size of each window read from the head and the tail of the file.
pub const WINDOW: usize = 65536;

/// Smallest file that can be fingerprinted.
pub const MIN_SIZE: u64 = 2 * WINDOW as u64;

/// Fingerprint and size of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub hash: String,
    pub size: u64,
}

/// A video identified for the duration of one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    path: PathBuf,
    size: u64,
    fingerprint: String,
    display_name: String,
}

impl VideoFile {
    /// Resolve `path` to an absolute path and fingerprint it.
    pub fn open(path: &Path) -> Result<Self, FingerprintError> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|source| FingerprintError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
                .join(path)
        };
        let Fingerprint { hash, size } = fingerprint(&path)?;
        Ok(Self::from_parts(path, size, hash))
    }

    /// Build a video from already known values.
    pub fn from_parts(path: PathBuf, size: u64, fingerprint: String) -> Self {
        let display_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Self {
            path,
            size,
            fingerprint,
            display_name,
        }
    }

    /// Absolute path of the video.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Fingerprint as 16 lowercase hex digits.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Base name of the video, used for filename searches and scoring.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Compute the fingerprint of the file at `path`.
pub fn fingerprint(path: &Path) -> Result<Fingerprint, FingerprintError> {
    trace!("fingerprint(path={})", path.display());
    let io_err = |source| FingerprintError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let size = file.metadata().map_err(io_err)?.len();
    if size < MIN_SIZE {
        return Err(FingerprintError::Size {
            size,
            min: MIN_SIZE,
        });
    }

    let mut window = vec![0u8; WINDOW];
    file.read_exact(&mut window).map_err(io_err)?;
    let mut hash = size.wrapping_add(window_sum(&window));

    file.seek(SeekFrom::End(-(WINDOW as i64))).map_err(io_err)?;
    file.read_exact(&mut window).map_err(io_err)?;
    hash = hash.wrapping_add(window_sum(&window));

    let hash = format!("{hash:016x}");
    debug!("fingerprint of {} is {hash} ({size} bytes)", path.display());
    Ok(Fingerprint { hash, size })
}

/// Wrapping sum of the little-endian `u64` words in `window`.
fn window_sum(window: &[u8]) -> u64 {
    window.chunks_exact(8).fold(0u64, |acc, chunk| {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        acc.wrapping_add(u64::from_le_bytes(word))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn zero_file_hashes_to_its_size() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "zero.mkv", &vec![0u8; 131072]);
        let fp = fingerprint(&path).unwrap();
        assert_eq!(fp.hash, "0000000000020000");
        assert_eq!(fp.size, 131072);
    }

    #[test]
    fn too_small_file_is_a_size_error() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "small.mkv", &vec![0u8; 131071]);
        let err = fingerprint(&path).unwrap_err();
        assert!(matches!(err, FingerprintError::Size { size: 131071, .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let err = fingerprint(&dir.path().join("nope.mkv")).unwrap_err();
        assert!(matches!(err, FingerprintError::Io { .. }));
    }

    /// Every word is u64::MAX, so each window sums to -8192 modulo 2^64.
    #[test]
    fn sum_wraps_around() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "ff.mkv", &vec![0xffu8; 131072]);
        let fp = fingerprint(&path).unwrap();
        assert_eq!(fp.hash, "000000000001c000");
    }

    /// Bytes in the middle of a large file are not part of the fingerprint.
    #[test]
    fn only_head_and_tail_are_read() {
        let dir = tempdir().unwrap();
        let mut data = vec![0u8; 300_000];
        data[0] = 1;
        data[150_000] = 0xff;
        data[300_000 - 8] = 2;
        let path = write_file(dir.path(), "big.mkv", &data);
        let fp = fingerprint(&path).unwrap();
        assert_eq!(fp.hash, format!("{:016x}", 300_000u64 + 1 + 2));
        assert_eq!(fingerprint(&path).unwrap(), fp);
    }

    #[test]
    fn video_file_keeps_display_name() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "Movie.2020.mkv", &vec![0u8; 131072]);
        let video = VideoFile::open(&path).unwrap();
        assert_eq!(video.display_name(), "Movie.2020.mkv");
        assert_eq!(video.fingerprint(), "0000000000020000");
        assert_eq!(video.size(), 131072);
        assert!(video.path().is_absolute());
    }
}
