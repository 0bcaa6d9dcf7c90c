//! Fixed-layout memory dump loading
//!
//! Dumps are raw byte images of the structs in [`crate::nes`], copied
//! byte-for-byte. A dump shorter than its struct is rejected; trailing bytes
//! are ignored with a warning.

use std::mem::size_of;
use std::path::{Path, PathBuf};

use bytemuck::Pod;

/// Error loading a memory dump
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("failed to read dump {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dump {path} is {actual} bytes, expected at least {expected}")]
    TooShort {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
}

/// Load a dump file as a `T`.
pub fn load_dump<T: Pod>(path: &Path) -> Result<T, DumpError> {
    let bytes = std::fs::read(path).map_err(|source| DumpError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    dump_from_bytes(path, &bytes)
}

/// Interpret an in-memory dump as a `T`. `path` is only used for errors.
pub fn dump_from_bytes<T: Pod>(path: &Path, bytes: &[u8]) -> Result<T, DumpError> {
    let expected = size_of::<T>();
    if bytes.len() < expected {
        return Err(DumpError::TooShort {
            path: path.to_path_buf(),
            expected,
            actual: bytes.len(),
        });
    }
    if bytes.len() > expected {
        tracing::warn!(
            "Dump {} has {} trailing bytes, ignoring them",
            path.display(),
            bytes.len() - expected
        );
    }
    Ok(bytemuck::pod_read_unaligned(&bytes[..expected]))
}

/// Load `count` precomputed frame dumps named `0.bin`, `1.bin`, ... from `dir`.
///
/// Frames are kept as raw bytes: tileset animators slice them at a fixed
/// offset rather than reinterpreting the whole struct.
pub fn load_frames(dir: &Path, count: usize) -> Result<Vec<Vec<u8>>, DumpError> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("{i}.bin"));
            std::fs::read(&path).map_err(|source| DumpError::Io { path, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nes::{Oam, Sprite};

    #[test]
    fn test_load_dump_exact_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oam.bin");
        let mut bytes = vec![0u8; Oam::SIZE];
        bytes[0..4].copy_from_slice(&[0xBA, 0xE9, 0x42, 0x06]);
        std::fs::write(&path, &bytes).unwrap();

        let oam: Oam = load_dump(&path).unwrap();
        assert_eq!(oam.sprites[0], Sprite::new(0xBA, 0xE9, 0x42, 0x06));
        assert_eq!(oam.sprites[1], Sprite::default());
    }

    #[test]
    fn test_load_dump_ignores_trailing_bytes() {
        let bytes = vec![7u8; Oam::SIZE + 10];
        let oam: Oam = dump_from_bytes(Path::new("oam.bin"), &bytes).unwrap();
        assert_eq!(oam.sprites[63].x, 7);
    }

    #[test]
    fn test_load_dump_too_short() {
        let bytes = vec![0u8; Oam::SIZE - 1];
        let err = dump_from_bytes::<Oam>(Path::new("oam.bin"), &bytes).unwrap_err();
        match err {
            DumpError::TooShort {
                expected, actual, ..
            } => {
                assert_eq!(expected, Oam::SIZE);
                assert_eq!(actual, Oam::SIZE - 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_dump_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dump::<Oam>(&dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, DumpError::Io { .. }));
    }

    #[test]
    fn test_load_frames_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3u8 {
            std::fs::write(dir.path().join(format!("{i}.bin")), [i; 4]).unwrap();
        }
        let frames = load_frames(dir.path(), 3).unwrap();
        assert_eq!(frames, vec![vec![0; 4], vec![1; 4], vec![2; 4]]);
        assert!(load_frames(dir.path(), 4).is_err());
    }
}
