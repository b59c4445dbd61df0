use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use super::{FileSaver, SavedFile};

/// Give up looking for a free name after this many collisions.
const MAX_SUFFIX: u32 = 999;

/// Saves into a directory the way a browser download does: an existing
/// file is never overwritten, the new one becomes `name (1).png`, `name (2).png`, ...
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSaver for DirectorySaver {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<SavedFile> {
        let file_name = sanitize(file_name);
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        for n in 0..=MAX_SUFFIX {
            let candidate = self.dir.join(numbered(&file_name, n));
            // create_new makes the existence check and the create one step.
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => {
                    write_or_discard(file, &candidate, bytes)?;
                    debug!(path = %candidate.display(), "wrote download");
                    return Ok(SavedFile {
                        name: numbered(&file_name, n),
                        location: candidate.display().to_string(),
                        bytes: bytes.len(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to create {}", candidate.display()));
                }
            }
        }

        bail!("no free file name for {} in {}", file_name, self.dir.display())
    }
}

/// Write `bytes` to the freshly created `path`, removing it again if the
/// write fails so a truncated download never takes the name.
fn write_or_discard(mut file: impl Write, path: &Path, bytes: &[u8]) -> Result<()> {
    match file.write_all(bytes).and_then(|()| file.flush()) {
        Ok(()) => Ok(()),
        Err(e) => {
            drop(file);
            if let Err(cleanup) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %cleanup, "failed to remove partial download");
            }
            Err(e).with_context(|| format!("failed to write {}", path.display()))
        }
    }
}

/// Strip path components so a name can never escape the target directory.
fn sanitize(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        crate::consts::DEFAULT_DOWNLOAD_NAME.to_string()
    } else {
        base.to_string()
    }
}

/// `photo.png` → `photo (n).png`; `n == 0` leaves the name alone.
fn numbered(file_name: &str, n: u32) -> String {
    if n == 0 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
        _ => format!("{file_name} ({n})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_inserts_before_extension() {
        assert_eq!(numbered("processed-image.png", 0), "processed-image.png");
        assert_eq!(numbered("processed-image.png", 2), "processed-image (2).png");
        assert_eq!(numbered("archive.tar.gz", 1), "archive.tar (1).gz");
        assert_eq!(numbered("README", 1), "README (1)");
        assert_eq!(numbered(".hidden", 1), ".hidden (1)");
    }

    /// Accepts a few bytes, then fails like a full disk.
    struct FullDisk {
        room: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.room == 0 {
                return Err(std::io::Error::other("no space left on device"));
            }
            let n = buf.len().min(self.room);
            self.room -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed-image.png");
        fs::write(&path, b"pa").unwrap();

        let err = write_or_discard(FullDisk { room: 2 }, &path, b"partial").unwrap_err();
        assert!(err.to_string().contains("failed to write"));
        assert!(!path.exists());
    }

    #[test]
    fn name_is_reused_after_failed_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed-image.png");
        fs::write(&path, b"").unwrap();
        let _ = write_or_discard(FullDisk { room: 0 }, &path, b"png");

        let saved = DirectorySaver::new(dir.path())
            .save("processed-image.png", b"png")
            .unwrap();
        assert_eq!(saved.name, "processed-image.png");
        assert_eq!(fs::read(&path).unwrap(), b"png");
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize("C:\\Users\\x\\out.png"), "out.png");
        assert_eq!(sanitize(".."), "processed-image.png");
        assert_eq!(sanitize(""), "processed-image.png");
    }
}
