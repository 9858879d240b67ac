//! In-memory backing store
//!
//! `MemoryFiles` is a tiny named file table. Handles opened from it behave
//! like disk files (siblings resolve by name) and count the seeks and reads
//! that reach the backing store, which makes cache behavior observable.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::streamfile::{Backing, BufferedStreamFile, StreamHandle};

/// Seek/read counters shared by every handle of one `MemoryFiles`.
#[derive(Debug, Default)]
pub struct BackingStats {
    seeks: AtomicUsize,
    reads: AtomicUsize,
}

impl BackingStats {
    pub fn seeks(&self) -> usize {
        self.seeks.load(Ordering::Relaxed)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryFiles {
    files: HashMap<String, Arc<[u8]>>,
    stats: Arc<BackingStats>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.insert(name, data);
        self
    }

    pub fn insert(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        self.files.insert(name.to_string(), Arc::from(data.into()));
    }

    pub fn stats(&self) -> &BackingStats {
        &self.stats
    }

    /// Open `name` as a buffered stream file.
    pub fn open(&self, name: &str, buffer_size: usize) -> Option<StreamHandle> {
        let backing = self.backing(name).ok()?;
        let sf = BufferedStreamFile::open(backing, name, buffer_size).ok()?;
        Some(StreamHandle::new(Box::new(sf)))
    }

    fn backing(&self, name: &str) -> io::Result<MemoryBacking> {
        let data = self
            .files
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))?;
        Ok(MemoryBacking {
            data,
            pos: 0,
            files: Arc::new(self.clone()),
        })
    }
}

/// Cursor over one file of a `MemoryFiles` table.
pub struct MemoryBacking {
    data: Arc<[u8]>,
    pos: u64,
    files: Arc<MemoryFiles>,
}

impl Read for MemoryBacking {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.files.stats.reads.fetch_add(1, Ordering::Relaxed);
        let start = (self.pos as usize).min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for MemoryBacking {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.files.stats.seeks.fetch_add(1, Ordering::Relaxed);
        let target = match pos {
            SeekFrom::Start(p) => p as i128,
            SeekFrom::End(d) => self.data.len() as i128 + d as i128,
            SeekFrom::Current(d) => self.pos as i128 + d as i128,
        };
        if target < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "seek before start"));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}

impl Backing for MemoryBacking {
    fn duplicate(&self) -> io::Result<Self> {
        Ok(MemoryBacking {
            data: Arc::clone(&self.data),
            pos: 0,
            files: Arc::clone(&self.files),
        })
    }

    fn open_sibling(&self, name: &str) -> io::Result<Self> {
        self.files.backing(name)
    }
}
