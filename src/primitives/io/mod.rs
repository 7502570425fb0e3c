#![forbid(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use crate::types::Result;

/// Positioned access to a store file.
///
/// Reads never move a shared cursor, so one handle can serve concurrent
/// traversals.
pub trait FileIo: Send + Sync + 'static {
    /// Fills `dst` from offset `off`; a short file is an `UnexpectedEof` error.
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<()>;
    /// Writes all of `src` at offset `off`.
    fn write_at(&self, off: u64, src: &[u8]) -> Result<()>;
    /// Flushes data and metadata to disk.
    fn sync_all(&self) -> Result<()>;
    /// Current file length in bytes.
    fn len(&self) -> Result<u64>;
    /// Returns true if the file is empty.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(unix)]
mod positioned {
    use std::fs::File;
    use std::io;
    use std::os::unix::fs::FileExt;

    pub fn read_exact(file: &File, off: u64, dst: &mut [u8]) -> io::Result<()> {
        file.read_exact_at(dst, off)
    }

    pub fn write_all(file: &File, off: u64, src: &[u8]) -> io::Result<()> {
        file.write_all_at(src, off)
    }
}

#[cfg(windows)]
mod positioned {
    use std::fs::File;
    use std::io::{self, ErrorKind};
    use std::os::windows::fs::FileExt;

    pub fn read_exact(file: &File, mut off: u64, mut dst: &mut [u8]) -> io::Result<()> {
        while !dst.is_empty() {
            match file.seek_read(dst, off)? {
                0 => return Err(ErrorKind::UnexpectedEof.into()),
                n => {
                    dst = &mut std::mem::take(&mut dst)[n..];
                    off += n as u64;
                }
            }
        }
        Ok(())
    }

    pub fn write_all(file: &File, mut off: u64, mut src: &[u8]) -> io::Result<()> {
        while !src.is_empty() {
            match file.seek_write(src, off)? {
                0 => return Err(ErrorKind::WriteZero.into()),
                n => {
                    src = &src[n..];
                    off += n as u64;
                }
            }
        }
        Ok(())
    }
}

#[cfg(not(any(unix, windows)))]
mod positioned {
    use std::fs::File;
    use std::io::{self, ErrorKind};

    pub fn read_exact(_file: &File, _off: u64, _dst: &mut [u8]) -> io::Result<()> {
        Err(io::Error::new(ErrorKind::Unsupported, "positioned reads unsupported"))
    }

    pub fn write_all(_file: &File, _off: u64, _src: &[u8]) -> io::Result<()> {
        Err(io::Error::new(ErrorKind::Unsupported, "positioned writes unsupported"))
    }
}

/// [`FileIo`] over a shared `std::fs::File`.
#[derive(Clone)]
pub struct StdFileIo {
    file: Arc<File>,
}

impl StdFileIo {
    /// Opens an existing store file read-only.
    pub fn open_read(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from(File::open(path)?))
    }

    /// Creates a store file, truncating any previous contents.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::from(file))
    }
}

impl From<File> for StdFileIo {
    fn from(file: File) -> Self {
        Self {
            file: Arc::new(file),
        }
    }
}

impl FileIo for StdFileIo {
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<()> {
        Ok(positioned::read_exact(&self.file, off, dst)?)
    }

    fn write_at(&self, off: u64, src: &[u8]) -> Result<()> {
        Ok(positioned::write_all(&self.file, off, src)?)
    }

    fn sync_all(&self) -> Result<()> {
        Ok(self.file.sync_all()?)
    }

    fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}
