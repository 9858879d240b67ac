//! Buffered random-access byte sources
//!
//! A `StreamFile` is a read-at-offset view over a file-like backing store.
//! Decoders never seek; they ask for `length` bytes at `offset` and get a
//! full buffer back, zero padded past the end of the data.
//!
//! `BufferedStreamFile` keeps a single cache window over its backing store.
//! Requests fully inside the window are served from memory; anything else
//! refills the window starting at the requested offset.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use parking_lot::Mutex;

/// Default cache size for stream files.
pub const STREAMFILE_DEFAULT_BUFFER_SIZE: usize = 0x8000;

/// Random-access byte source.
pub trait StreamFile: Send {
    /// Read `dest.len()` bytes at `offset`.
    ///
    /// Returns the number of bytes that came from the backing store. Any
    /// part of `dest` past the end of the data is zero filled.
    fn read(&mut self, dest: &mut [u8], offset: u64) -> usize;

    /// Total size of the data, cached at open.
    fn size(&self) -> u64;

    /// Offset of the current cache window.
    fn offset(&self) -> u64;

    /// Logical name, used to derive sibling file names.
    fn name(&self) -> &str;

    /// Open a related file. The same name duplicates the current handle.
    fn open(&self, name: &str, buffer_size: usize) -> Option<Box<dyn StreamFile>>;
}

/// Backing store of a [`BufferedStreamFile`].
pub trait Backing: Read + Seek + Send + Sized + 'static {
    /// Independent handle on the same data.
    fn duplicate(&self) -> io::Result<Self>;

    /// Open another file from the same store.
    fn open_sibling(&self, name: &str) -> io::Result<Self>;
}

impl Backing for File {
    fn duplicate(&self) -> io::Result<Self> {
        self.try_clone()
    }

    fn open_sibling(&self, name: &str) -> io::Result<Self> {
        File::open(name)
    }
}

/// Stream file with a single cached window over its backing store.
pub struct BufferedStreamFile<B: Backing> {
    backing: B,
    name: String,
    buffer: Vec<u8>,
    cache_offset: u64,
    valid_size: usize,
    file_size: u64,
    error_notified: bool,
}

impl<B: Backing> BufferedStreamFile<B> {
    /// Wrap `backing`, caching its size.
    pub fn open(mut backing: B, name: &str, buffer_size: usize) -> io::Result<Self> {
        let file_size = backing.seek(SeekFrom::End(0))?;
        Ok(Self {
            backing,
            name: name.to_string(),
            buffer: vec![0u8; buffer_size.max(1)],
            cache_offset: 0,
            valid_size: 0,
            file_size,
            error_notified: false,
        })
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    fn in_cache(&self, offset: u64) -> bool {
        offset >= self.cache_offset && offset < self.cache_offset + self.valid_size as u64
    }

    fn notify_out_of_range(&mut self, offset: u64, length: usize) {
        if cfg!(debug_assertions) && !self.error_notified {
            log::debug!(
                "{}: read of 0x{:x} bytes at 0x{:x} past end of file (0x{:x})",
                self.name,
                length,
                offset,
                self.file_size
            );
            self.error_notified = true;
        }
    }

    /// Fill the cache window starting at `offset`.
    fn refill(&mut self, offset: u64) -> usize {
        self.valid_size = 0;
        self.cache_offset = offset;
        if self.backing.seek(SeekFrom::Start(offset)).is_err() {
            return 0;
        }
        let mut filled = 0;
        while filled < self.buffer.len() {
            match self.backing.read(&mut self.buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        self.valid_size = filled;
        filled
    }

    fn read_the_rest(&mut self, dest: &mut [u8], mut offset: u64) -> usize {
        let mut done = 0;

        if self.in_cache(offset) {
            let start = (offset - self.cache_offset) as usize;
            let cached = (self.valid_size - start).min(dest.len());
            dest[..cached].copy_from_slice(&self.buffer[start..start + cached]);
            done = cached;
            offset += cached as u64;
        }

        while done < dest.len() {
            let remaining = dest.len() - done;
            if offset >= self.file_size {
                self.notify_out_of_range(offset, remaining);
                dest[done..].fill(0);
                return done;
            }

            let filled = self.refill(offset);
            let take = filled.min(remaining);
            dest[done..done + take].copy_from_slice(&self.buffer[..take]);
            done += take;
            offset += take as u64;

            if take < remaining && filled < self.buffer.len() {
                dest[done..].fill(0);
                return done;
            }
        }
        done
    }
}

impl<B: Backing> StreamFile for BufferedStreamFile<B> {
    fn read(&mut self, dest: &mut [u8], offset: u64) -> usize {
        if dest.is_empty() {
            return 0;
        }

        if offset >= self.file_size {
            self.notify_out_of_range(offset, dest.len());
            dest.fill(0);
            return 0;
        }

        let end = offset + dest.len() as u64;
        if offset >= self.cache_offset && end <= self.cache_offset + self.valid_size as u64 {
            let start = (offset - self.cache_offset) as usize;
            dest.copy_from_slice(&self.buffer[start..start + dest.len()]);
            return dest.len();
        }

        self.read_the_rest(dest, offset)
    }

    fn size(&self) -> u64 {
        self.file_size
    }

    fn offset(&self) -> u64 {
        self.cache_offset
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, name: &str, buffer_size: usize) -> Option<Box<dyn StreamFile>> {
        let backing = if name == self.name {
            self.backing.duplicate()
        } else {
            self.backing.open_sibling(name)
        };
        let backing = match backing {
            Ok(b) => b,
            Err(e) => {
                log::debug!("Cannot open {}: {}", name, e);
                return None;
            }
        };
        BufferedStreamFile::open(backing, name, buffer_size)
            .ok()
            .map(|sf| Box::new(sf) as Box<dyn StreamFile>)
    }
}

/// Shared handle to a stream file.
///
/// Channels and their loop snapshots all read through clones of one
/// handle. Dropping the last clone closes the file.
#[derive(Clone)]
pub struct StreamHandle {
    inner: Arc<Mutex<Box<dyn StreamFile>>>,
}

impl StreamHandle {
    pub fn new(sf: Box<dyn StreamFile>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sf)),
        }
    }

    pub fn read(&self, dest: &mut [u8], offset: u64) -> usize {
        self.inner.lock().read(dest, offset)
    }

    pub fn size(&self) -> u64 {
        self.inner.lock().size()
    }

    pub fn offset(&self) -> u64 {
        self.inner.lock().offset()
    }

    pub fn name(&self) -> String {
        self.inner.lock().name().to_string()
    }

    /// Open `name` relative to this file. The result has its own cache.
    pub fn open(&self, name: &str, buffer_size: usize) -> Option<StreamHandle> {
        self.inner.lock().open(name, buffer_size).map(StreamHandle::new)
    }

    /// Open another handle on this same file.
    pub fn reopen(&self, buffer_size: usize) -> Option<StreamHandle> {
        let sf = self.inner.lock();
        let name = sf.name().to_string();
        sf.open(&name, buffer_size).map(StreamHandle::new)
    }

    /// Release this handle. The file closes once no clone remains.
    pub fn close(self) {}

    /// Whether two handles share the same underlying file object.
    pub fn same_source(&self, other: &StreamHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn read_array<const N: usize>(&self, offset: u64) -> [u8; N] {
        let mut buf = [0u8; N];
        self.read(&mut buf, offset);
        buf
    }

    pub fn read_u8(&self, offset: u64) -> u8 {
        self.read_array::<1>(offset)[0]
    }

    pub fn read_i8(&self, offset: u64) -> i8 {
        self.read_u8(offset) as i8
    }

    pub fn read_u16le(&self, offset: u64) -> u16 {
        u16::from_le_bytes(self.read_array(offset))
    }

    pub fn read_u16be(&self, offset: u64) -> u16 {
        u16::from_be_bytes(self.read_array(offset))
    }

    pub fn read_i16le(&self, offset: u64) -> i16 {
        i16::from_le_bytes(self.read_array(offset))
    }

    pub fn read_i16be(&self, offset: u64) -> i16 {
        i16::from_be_bytes(self.read_array(offset))
    }

    pub fn read_u32le(&self, offset: u64) -> u32 {
        u32::from_le_bytes(self.read_array(offset))
    }

    pub fn read_u32be(&self, offset: u64) -> u32 {
        u32::from_be_bytes(self.read_array(offset))
    }

    pub fn read_i32le(&self, offset: u64) -> i32 {
        i32::from_le_bytes(self.read_array(offset))
    }

    pub fn read_i32be(&self, offset: u64) -> i32 {
        i32::from_be_bytes(self.read_array(offset))
    }

    pub fn read_u64le(&self, offset: u64) -> u64 {
        u64::from_le_bytes(self.read_array(offset))
    }

    pub fn read_f32le(&self, offset: u64) -> f32 {
        f32::from_le_bytes(self.read_array(offset))
    }

    pub fn read_f32be(&self, offset: u64) -> f32 {
        f32::from_be_bytes(self.read_array(offset))
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sf = self.inner.lock();
        f.debug_struct("StreamHandle")
            .field("name", &sf.name())
            .field("size", &sf.size())
            .finish()
    }
}

/// Open a file from disk with a cache of `buffer_size` bytes.
pub fn open_stdio_streamfile_buffer(path: &str, buffer_size: usize) -> Option<StreamHandle> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::debug!("Cannot open {}: {}", path, e);
            return None;
        }
    };
    match BufferedStreamFile::open(file, path, buffer_size) {
        Ok(sf) => Some(StreamHandle::new(Box::new(sf))),
        Err(e) => {
            log::debug!("Cannot size {}: {}", path, e);
            None
        }
    }
}

pub fn open_stdio_streamfile(path: &str) -> Option<StreamHandle> {
    open_stdio_streamfile_buffer(path, STREAMFILE_DEFAULT_BUFFER_SIZE)
}
