use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

/// Size of the head and tail blocks that are hashed.
pub const CHUNK_SIZE: u64 = 65536;

#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("File is too small to fingerprint ({size} bytes, need at least 65536)")]
    FileTooSmall { size: u64 },

    #[error("Short read at offset {offset}: got {read} of {expected} bytes")]
    ShortRead {
        offset: u64,
        expected: usize,
        read: usize,
    },
}

/// Fingerprint of the file at `path`, returned with the file size.
pub fn fingerprint_file(path: &Path) -> Result<(u64, u64), FingerprintError> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    let hash = fingerprint(&mut file, size)?;
    debug!(path = %path.display(), size, fingerprint = %format!("{hash:016x}"), "Fingerprinted file");
    Ok((hash, size))
}

/// Sums the head and tail blocks as little-endian u64 words, plus the size,
/// all with wraparound.
pub fn fingerprint<R: Read + Seek>(reader: &mut R, size: u64) -> Result<u64, FingerprintError> {
    if size < CHUNK_SIZE {
        return Err(FingerprintError::FileTooSmall { size });
    }

    let chunk = CHUNK_SIZE as usize;
    let mut buf = vec![0u8; chunk * 2];
    read_chunk(reader, 0, &mut buf[..chunk])?;
    read_chunk(reader, size - CHUNK_SIZE, &mut buf[chunk..])?;

    let sum = buf
        .chunks_exact(8)
        .map(|word| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(word);
            u64::from_le_bytes(bytes)
        })
        .fold(0u64, u64::wrapping_add);

    Ok(sum.wrapping_add(size))
}

// Fills `buf` from `offset`, failing if the source runs out first.
fn read_chunk<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    buf: &mut [u8],
) -> Result<(), FingerprintError> {
    reader.seek(SeekFrom::Start(offset))?;

    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    if filled != buf.len() {
        return Err(FingerprintError::ShortRead {
            offset,
            expected: buf.len(),
            read: filled,
        });
    }
    Ok(())
}
