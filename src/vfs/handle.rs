//! Reference-counted handles to physical files.
//!
//! A [`FileHandle`] holds one shared reference to a record naming a physical file. Cloning a
//! handle aliases the record; the physical file is deleted when the last reference goes away,
//! whether through [`FileHandle::release`] or through drop.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::{Result, VfsError};
use crate::vfs::BackingStore;

/// Shared state behind every alias of one file.
#[derive(Debug)]
struct FileRecord {
    name: String,
    path: PathBuf,
}

impl Drop for FileRecord {
    fn drop(&mut self) {
        // count is zero here; delete failures are only logged
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("last reference released, deleted '{}'", self.name),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("last reference released, '{}' was already gone", self.name)
            }
            Err(e) => log::warn!("failed to delete physical file '{}': {}", self.name, e),
        }
    }
}

/// A counted alias of a physical file.
///
/// Every byte access opens the physical file anew; no descriptor is kept between calls.
#[derive(Debug, Clone, Default)]
pub struct FileHandle {
    record: Option<Arc<FileRecord>>,
}

impl FileHandle {
    /// Creates a handle with a fresh record (count = 1) for the physical file `name`.
    /// The file must already exist in `store` and be openable for read and write.
    pub fn open(store: &BackingStore, name: &str) -> Result<Self> {
        let path = store.host_path(name)?;
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| VfsError::io("open", name, e))?;

        log::debug!("new file record for '{}'", name);
        Ok(Self {
            record: Some(Arc::new(FileRecord {
                name: name.to_string(),
                path,
            })),
        })
    }

    /// Makes `self` an alias of `other`, releasing whatever `self` held before.
    /// Does nothing if both already share a record.
    pub fn assign(&mut self, other: &FileHandle) {
        if self.shares_record(other) {
            return;
        }
        self.release();
        self.record = other.record.clone();
    }

    /// Drops this handle's reference. Calling it again is a no-op.
    pub fn release(&mut self) {
        if let Some(record) = self.record.take() {
            log::debug!(
                "releasing '{}' ({} refs before)",
                record.name,
                Arc::strong_count(&record)
            );
        }
    }

    pub fn is_released(&self) -> bool {
        self.record.is_none()
    }

    /// Returns true if both handles alias the same record.
    pub fn shares_record(&self, other: &FileHandle) -> bool {
        match (&self.record, &other.record) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Number of live handles sharing this record; 0 for a released handle.
    pub fn reference_count(&self) -> usize {
        self.record.as_ref().map_or(0, Arc::strong_count)
    }

    pub fn physical_name(&self) -> Option<&str> {
        self.record.as_ref().map(|r| r.name.as_str())
    }

    fn record(&self) -> Result<&FileRecord> {
        self.record.as_deref().ok_or(VfsError::ReleasedHandle)
    }

    /// Current content length in bytes.
    pub fn len(&self) -> Result<u64> {
        let record = self.record()?;
        let meta =
            std::fs::metadata(&record.path).map_err(|e| VfsError::io("stat", &record.name, e))?;
        Ok(meta.len())
    }

    /// Fails with `OutOfBounds` unless `pos` addresses an existing byte.
    pub fn check_bounds(&self, pos: u64) -> Result<()> {
        let len = self.len()?;
        if pos >= len {
            return Err(VfsError::OutOfBounds { pos, len });
        }
        Ok(())
    }

    /// Reads the byte at `pos`.
    pub fn read_at(&self, pos: u64) -> Result<u8> {
        let record = self.record()?;
        let mut file =
            File::open(&record.path).map_err(|e| VfsError::io("open for read", &record.name, e))?;
        file.seek(SeekFrom::Start(pos))
            .map_err(|e| VfsError::io("seek", &record.name, e))?;

        let mut buf = [0u8; 1];
        let n = file
            .read(&mut buf)
            .map_err(|e| VfsError::io("read", &record.name, e))?;
        if n == 0 {
            let len = file.metadata().map(|m| m.len()).unwrap_or(0);
            return Err(VfsError::OutOfBounds { pos, len });
        }
        Ok(buf[0])
    }

    /// Writes `byte` at `pos` and flushes. Writing past the end extends the file.
    pub fn write_at(&self, pos: u64, byte: u8) -> Result<()> {
        let record = self.record()?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&record.path)
            .map_err(|e| VfsError::io("open for write", &record.name, e))?;
        file.seek(SeekFrom::Start(pos))
            .map_err(|e| VfsError::io("seek", &record.name, e))?;
        file.write_all(&[byte])
            .and_then(|_| file.flush())
            .map_err(|e| VfsError::io("write", &record.name, e))?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<u8>> {
        let record = self.record()?;
        std::fs::read(&record.path).map_err(|e| VfsError::io("read", &record.name, e))
    }

    /// Returns the file content split into lines, without line terminators.
    pub fn lines(&self) -> Result<Vec<String>> {
        let content = self.read_all()?;
        Ok(String::from_utf8_lossy(&content)
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// Counts lines, words and bytes of the content.
    pub fn wc(&self) -> Result<WordCount> {
        Ok(WordCount::from_bytes(&self.read_all()?))
    }
}

/// Result of [`FileHandle::wc`], displayed as `<lines> <words> <bytes>`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WordCount {
    /// Number of `\n` bytes; a last line without terminator is not counted.
    pub lines: usize,
    /// Maximal runs of non-whitespace bytes.
    pub words: usize,
    pub bytes: usize,
}

impl WordCount {
    pub fn from_bytes(content: &[u8]) -> Self {
        let mut wc = WordCount {
            bytes: content.len(),
            ..Default::default()
        };
        let mut in_word = false;
        for &b in content {
            if b == b'\n' {
                wc.lines += 1;
            }
            if is_space(b) {
                in_word = false;
            } else if !in_word {
                in_word = true;
                wc.words += 1;
            }
        }
        wc
    }
}

impl fmt::Display for WordCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lines, self.words, self.bytes)
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}
