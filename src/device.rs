//! Random-access reader abstraction the core decodes against.
//!
//! The source depends on a single consumed interface —
//! `read(offset, buffer, size) -> bool`, a positioned absolute read — and
//! leaves how that is obtained (a volume handle, an image file, a memory
//! buffer) to the caller. `BlockReader` is that interface; `FileBlockDevice`
//! and `MmapBlockDevice` are its two adapters.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

/// Positioned random read over a volume, disk image, or in-memory buffer.
///
/// Implementations only need to support sequential, non-overlapping calls;
/// the core never assumes a shared cursor and always passes an absolute
/// offset.
pub trait BlockReader: Send + Sync {
    /// Reads exactly `buf.len()` bytes starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Total size of the underlying medium in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `read_at` backed by a plain `File`, guarded by a mutex since `Read` +
/// `Seek` need `&mut`. Works for both disk-image files and, on Linux, raw
/// block devices opened by path (`/dev/sdX`).
pub struct FileBlockDevice {
    file: Mutex<File>,
    size: u64,
}

impl FileBlockDevice {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).open(path)?;
        let size = Self::detect_size(&file)?;
        Ok(Self {
            file: Mutex::new(file),
            size,
        })
    }

    fn detect_size(file: &File) -> io::Result<u64> {
        let metadata = file.metadata()?;
        if metadata.is_file() {
            return Ok(metadata.len());
        }

        // Block devices report a zero-length metadata size; fall back to
        // seeking to the end, which the kernel resolves to the device size.
        let mut clone = file.try_clone()?;
        let size = clone.seek(SeekFrom::End(0))?;
        clone.seek(SeekFrom::Start(0))?;
        Ok(size)
    }
}

impl BlockReader for FileBlockDevice {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }

    fn len(&self) -> u64 {
        self.size
    }
}

/// Zero-copy `read_at` backed by a memory-mapped file, for local images that
/// fit the address space.
pub struct MmapBlockDevice {
    mmap: memmap2::Mmap,
}

impl MmapBlockDevice {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        let mmap = unsafe { memmap2::Mmap::map(&file) }?;
        Ok(Self { mmap })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }
}

impl BlockReader for MmapBlockDevice {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = offset as usize;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.mmap.len())
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of image"))?;
        buf.copy_from_slice(&self.mmap[start..end]);
        Ok(())
    }

    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }
}
