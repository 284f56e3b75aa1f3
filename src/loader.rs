use std::{
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::Path,
};

/// Upper bound for a single record payload that will be loaded into memory.
/// Bigger payloads are skipped (and reported) instead of allocated.
pub(crate) const MAX_BODY_LEN: u64 = 100 * 1024 * 1024;

/// Number of bytes read for magic-byte detection.
pub(crate) const PREFIX_LEN: usize = 4096;

/// Reads records header-first from `R`, keeping track of the absolute
/// position so payloads that are not needed (e.g. `mdat`, `SSND`) can be
/// skipped by `Seek` instead of being read.
pub(crate) struct RecordReader<R> {
    read: R,
    pos: u64,
    len: u64,
}

impl<R: Read + Seek> RecordReader<R> {
    pub fn new(mut read: R) -> io::Result<Self> {
        let len = read.seek(SeekFrom::End(0))?;
        read.seek(SeekFrom::Start(0))?;
        Ok(Self { read, pos: 0, len })
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    /// Reads exactly `n` bytes.
    pub fn read_vec(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(n);
        let read = self
            .read
            .by_ref()
            .take(n as u64)
            .read_to_end(buf.as_mut())?;
        self.pos += read as u64;
        if read != n {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(buf)
    }

    /// Skips `n` bytes, clamped to the end of the input.
    pub fn skip(&mut self, n: u64) -> io::Result<()> {
        let n = n.min(self.remaining());
        let delta = i64::try_from(n).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        self.read.seek(SeekFrom::Current(delta))?;
        self.pos += n;
        Ok(())
    }
}

/// Opens `path` for header-first reading.
pub(crate) fn open_file(path: &Path) -> io::Result<BufReader<File>> {
    File::open(path).map(BufReader::new)
}

/// Reads at most [`PREFIX_LEN`] bytes from the beginning of `path`.
pub(crate) fn read_prefix(path: &Path) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(PREFIX_LEN);
    File::open(path)?
        .take(PREFIX_LEN as u64)
        .read_to_end(buf.as_mut())?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn read_and_skip() {
        let mut reader = RecordReader::new(Cursor::new((0u8..16).collect::<Vec<_>>())).unwrap();
        assert_eq!(reader.len(), 16);
        assert_eq!(reader.read_vec(4).unwrap(), [0, 1, 2, 3]);
        reader.skip(4).unwrap();
        assert_eq!(reader.position(), 8);
        assert_eq!(reader.read_vec(2).unwrap(), [8, 9]);
        assert_eq!(reader.remaining(), 6);

        // skipping is clamped to the end of input
        reader.skip(100).unwrap();
        assert_eq!(reader.remaining(), 0);

        let err = reader.read_vec(1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
