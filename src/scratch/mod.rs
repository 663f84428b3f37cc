//! On-disk scratch log for `BlockFinder::new_with_temp`.
//!
//! When an engine is built over a `temp_dir` rather than kept fully
//! in-memory, the suffix-array enumeration path streams `(chr, strand,
//! pos)` triples through this log instead of collecting them into a
//! `Vec` first. The log uses length-prefixed, checksummed record framing
//! ([`ScratchRecord`] is the trait bound any record type must satisfy):
//!
//! ```text
//! [HEADER_BYTES][HEADER_CRC32_LE]
//! [REC_LEN_LE][REC_BYTES][REC_CRC32_LE]
//! [REC_LEN_LE][REC_BYTES][REC_CRC32_LE]
//! ...
//! ```
//!
//! A scratch log has exactly one writer and no rotation — the engine is
//! single-threaded, so there is no `Arc<Mutex<File>>` to share. Replay can
//! run either record-by-record (small files) or via a memory map
//! (`mmap_iter`, used once a scratch file is finalized and large).

#[cfg(test)]
mod tests;

use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use crate::encoding::{self, EncodingError};
use crc32fast::Hasher as Crc32;
use memmap2::Mmap;
use thiserror::Error;
use tracing::{debug, trace, warn};

const U32_SIZE: usize = std::mem::size_of::<u32>();

/// Errors raised by the scratch log.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScratchError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("checksum mismatch at offset {0}")]
    ChecksumMismatch(u64),

    #[error("record exceeds limit ({0} bytes)")]
    RecordTooLarge(usize),

    #[error("truncated record at offset {0}")]
    Truncated(u64),

    #[error("bad scratch header: {0}")]
    InvalidHeader(String),
}

/// Marker trait for record types [`ScratchLog`] can carry.
pub trait ScratchRecord: encoding::Encode + encoding::Decode + std::fmt::Debug {}
impl<T> ScratchRecord for T where T: encoding::Encode + encoding::Decode + std::fmt::Debug {}

/// A streamed `(chr, strand, pos)` occurrence triple — the default record
/// type written while enumerating bifurcations on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchAnchor {
    pub chr: u32,
    pub strand_positive: bool,
    pub pos: u32,
}

impl encoding::Encode for ScratchAnchor {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        encoding::Encode::encode_to(&self.chr, buf)?;
        encoding::Encode::encode_to(&self.strand_positive, buf)?;
        encoding::Encode::encode_to(&self.pos, buf)?;
        Ok(())
    }
}

impl encoding::Decode for ScratchAnchor {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let mut offset = 0;
        let (chr, n) = u32::decode_from(&buf[offset..])?;
        offset += n;
        let (strand_positive, n) = bool::decode_from(&buf[offset..])?;
        offset += n;
        let (pos, n) = u32::decode_from(&buf[offset..])?;
        offset += n;
        Ok((
            Self {
                chr,
                strand_positive,
                pos,
            },
            offset,
        ))
    }
}

#[derive(Debug)]
struct ScratchHeader {
    magic: [u8; 4],
    version: u32,
}

impl ScratchHeader {
    const MAGIC: [u8; 4] = *b"SCRT";
    const VERSION: u32 = 1;
    const ENCODED_SIZE: usize = 4 + 4;
    const DISK_SIZE: usize = Self::ENCODED_SIZE + U32_SIZE;

    fn new() -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
        }
    }
}

impl encoding::Encode for ScratchHeader {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        encoding::Encode::encode_to(&self.magic, buf)?;
        encoding::Encode::encode_to(&self.version, buf)?;
        Ok(())
    }
}

impl encoding::Decode for ScratchHeader {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let mut offset = 0;
        let (magic, n) = <[u8; 4]>::decode_from(&buf[offset..])?;
        offset += n;
        let (version, n) = u32::decode_from(&buf[offset..])?;
        offset += n;
        Ok((Self { magic, version }, offset))
    }
}

/// A single-writer, append-only scratch file of `T` records.
#[derive(Debug)]
pub struct ScratchLog<T: ScratchRecord> {
    file: File,
    path: PathBuf,
    max_record_size: u32,
    _phantom: PhantomData<T>,
}

impl<T: ScratchRecord> ScratchLog<T> {
    const DEFAULT_MAX_RECORD_SIZE: u32 = 256;

    /// Creates a new scratch file under `dir`, named `scratch-<tag>.log`.
    pub fn create(dir: impl AsRef<Path>, tag: &str) -> Result<Self, ScratchError> {
        let path = dir.as_ref().join(format!("scratch-{tag}.log"));
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)?;

        let header = ScratchHeader::new();
        write_header(&mut file, &header)?;
        file.sync_all()?;

        debug!(path = %path.display(), "scratch log created");

        Ok(Self {
            file,
            path,
            max_record_size: Self::DEFAULT_MAX_RECORD_SIZE,
            _phantom: PhantomData,
        })
    }

    /// Appends one record. Not synced; callers append many records in a
    /// tight loop and call [`ScratchLog::finish`] once at the end.
    pub fn append(&mut self, record: &T) -> Result<(), ScratchError> {
        let record_bytes = encoding::encode_to_vec(record)?;
        let record_len = u32::try_from(record_bytes.len())
            .map_err(|_| ScratchError::RecordTooLarge(record_bytes.len()))?;
        if record_len > self.max_record_size {
            return Err(ScratchError::RecordTooLarge(record_len as usize));
        }

        let len_bytes = record_len.to_le_bytes();
        let checksum = compute_crc(&[&len_bytes, &record_bytes]);

        self.file.write_all(&len_bytes)?;
        self.file.write_all(&record_bytes)?;
        self.file.write_all(&checksum.to_le_bytes())?;

        trace!(len = record_len, "scratch record appended");
        Ok(())
    }

    /// Flushes all pending writes to disk. Call once after the final
    /// `append`, before reading back via [`ScratchLog::replay_iter`] or
    /// [`ScratchLog::mmap_iter`].
    pub fn finish(&mut self) -> Result<(), ScratchError> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Streaming record-by-record replay, seeking past the header.
    pub fn replay_iter(&mut self) -> Result<ScratchIter<'_, T>, ScratchError> {
        self.file.seek(SeekFrom::Start(0))?;
        let _ = read_and_validate_header(&mut self.file)?;
        Ok(ScratchIter {
            file: &mut self.file,
            max_record_size: self.max_record_size as usize,
            _phantom: PhantomData,
        })
    }

    /// Memory-mapped replay: the whole file is mapped once and records
    /// are decoded directly from the map, avoiding a `read` syscall per
    /// record for very large scratch files.
    pub fn mmap_iter(&self) -> Result<ScratchMmapIter<T>, ScratchError> {
        let mmap = unsafe { Mmap::map(&self.file)? };
        let header_len = {
            let mut header_bytes = vec![0u8; ScratchHeader::ENCODED_SIZE];
            header_bytes.copy_from_slice(&mmap[..ScratchHeader::ENCODED_SIZE]);
            let mut checksum_bytes = [0u8; U32_SIZE];
            checksum_bytes
                .copy_from_slice(&mmap[ScratchHeader::ENCODED_SIZE..ScratchHeader::DISK_SIZE]);
            let stored = u32::from_le_bytes(checksum_bytes);
            verify_crc(&[&header_bytes], stored)
                .map_err(|_| ScratchError::InvalidHeader("header checksum mismatch".into()))?;
            let (header, _) = encoding::decode_from_slice::<ScratchHeader>(&header_bytes)?;
            if header.magic != ScratchHeader::MAGIC {
                return Err(ScratchError::InvalidHeader("bad magic".into()));
            }
            if header.version != ScratchHeader::VERSION {
                return Err(ScratchError::InvalidHeader(format!(
                    "unsupported version {}",
                    header.version
                )));
            }
            ScratchHeader::DISK_SIZE
        };

        Ok(ScratchMmapIter {
            mmap,
            offset: header_len,
            max_record_size: self.max_record_size as usize,
            _phantom: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the scratch file from disk after a successful pass — scratch
    /// files must not persist across calls.
    pub fn remove(self) -> Result<(), ScratchError> {
        let path = self.path.clone();
        drop(self);
        std::fs::remove_file(&path)?;
        Ok(())
    }
}

/// Streaming, file-backed replay iterator.
pub struct ScratchIter<'a, T: ScratchRecord> {
    file: &'a mut File,
    max_record_size: usize,
    _phantom: PhantomData<T>,
}

impl<T: ScratchRecord> Iterator for ScratchIter<'_, T> {
    type Item = Result<T, ScratchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = match self.file.stream_position() {
            Ok(p) => p,
            Err(e) => return Some(Err(ScratchError::Io(e))),
        };

        let mut len_bytes = [0u8; U32_SIZE];
        match self.file.read_exact(&mut len_bytes) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return None,
            Err(e) => return Some(Err(ScratchError::Io(e))),
        }

        let record_len = u32::from_le_bytes(len_bytes) as usize;
        if record_len > self.max_record_size {
            return Some(Err(ScratchError::RecordTooLarge(record_len)));
        }

        let mut record_bytes = vec![0u8; record_len];
        if let Err(e) = self.file.read_exact(&mut record_bytes) {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                return Some(Err(ScratchError::Truncated(offset)));
            }
            return Some(Err(ScratchError::Io(e)));
        }

        let mut checksum_bytes = [0u8; U32_SIZE];
        if let Err(e) = self.file.read_exact(&mut checksum_bytes) {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                return Some(Err(ScratchError::Truncated(offset)));
            }
            return Some(Err(ScratchError::Io(e)));
        }
        let stored_checksum = u32::from_le_bytes(checksum_bytes);

        if let Err(e) = verify_crc(&[&len_bytes, &record_bytes], stored_checksum) {
            let _ = e;
            warn!(offset, "scratch record checksum mismatch");
            return Some(Err(ScratchError::ChecksumMismatch(offset)));
        }

        match encoding::decode_from_slice::<T>(&record_bytes) {
            Ok((record, _)) => Some(Ok(record)),
            Err(e) => Some(Err(ScratchError::Encoding(e))),
        }
    }
}

/// Memory-mapped replay iterator.
pub struct ScratchMmapIter<T: ScratchRecord> {
    mmap: Mmap,
    offset: usize,
    max_record_size: usize,
    _phantom: PhantomData<T>,
}

impl<T: ScratchRecord> Iterator for ScratchMmapIter<T> {
    type Item = Result<T, ScratchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let buf = &self.mmap[..];
        if self.offset >= buf.len() {
            return None;
        }
        if self.offset + U32_SIZE > buf.len() {
            return Some(Err(ScratchError::Truncated(self.offset as u64)));
        }

        let mut len_bytes = [0u8; U32_SIZE];
        len_bytes.copy_from_slice(&buf[self.offset..self.offset + U32_SIZE]);
        let record_len = u32::from_le_bytes(len_bytes) as usize;
        if record_len > self.max_record_size {
            return Some(Err(ScratchError::RecordTooLarge(record_len)));
        }

        let rec_start = self.offset + U32_SIZE;
        let rec_end = rec_start + record_len;
        let crc_end = rec_end + U32_SIZE;
        if crc_end > buf.len() {
            return Some(Err(ScratchError::Truncated(self.offset as u64)));
        }

        let record_bytes = &buf[rec_start..rec_end];
        let mut checksum_bytes = [0u8; U32_SIZE];
        checksum_bytes.copy_from_slice(&buf[rec_end..crc_end]);
        let stored_checksum = u32::from_le_bytes(checksum_bytes);

        if let Err(e) = verify_crc(&[&len_bytes, record_bytes], stored_checksum) {
            let _ = e;
            return Some(Err(ScratchError::ChecksumMismatch(self.offset as u64)));
        }

        let result = match encoding::decode_from_slice::<T>(record_bytes) {
            Ok((record, _)) => Ok(record),
            Err(e) => Err(ScratchError::Encoding(e)),
        };

        self.offset = crc_end;
        Some(result)
    }
}

fn write_header(writer: &mut File, header: &ScratchHeader) -> Result<(), ScratchError> {
    let header_bytes = encoding::encode_to_vec(header)?;
    let checksum = compute_crc(&[&header_bytes]);
    writer.write_all(&header_bytes)?;
    writer.write_all(&checksum.to_le_bytes())?;
    Ok(())
}

fn read_and_validate_header(reader: &mut File) -> Result<ScratchHeader, ScratchError> {
    let mut header_bytes = vec![0u8; ScratchHeader::ENCODED_SIZE];
    reader.read_exact(&mut header_bytes)?;

    let mut checksum_bytes = [0u8; U32_SIZE];
    reader.read_exact(&mut checksum_bytes)?;
    let stored_checksum = u32::from_le_bytes(checksum_bytes);

    verify_crc(&[&header_bytes], stored_checksum)
        .map_err(|_| ScratchError::InvalidHeader("header checksum mismatch".into()))?;

    let (header, _) = encoding::decode_from_slice::<ScratchHeader>(&header_bytes)?;

    if header.magic != ScratchHeader::MAGIC {
        return Err(ScratchError::InvalidHeader("bad magic".into()));
    }
    if header.version != ScratchHeader::VERSION {
        return Err(ScratchError::InvalidHeader(format!(
            "unsupported version {}",
            header.version
        )));
    }

    Ok(header)
}

fn compute_crc(parts: &[&[u8]]) -> u32 {
    let mut hasher = Crc32::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}

fn verify_crc(parts: &[&[u8]], expected: u32) -> Result<(), ScratchError> {
    let computed = compute_crc(parts);
    if computed != expected {
        return Err(ScratchError::ChecksumMismatch(0));
    }
    Ok(())
}
