use std::io::{self, Read};

use depot_types::ContentHash;

/// Read buffer used when draining a stream into the hasher.
const READ_BUF_SIZE: usize = 64 * 1024;

/// Incremental BLAKE3 hasher producing a [`ContentHash`].
///
/// Identical byte sequences always produce the same hash regardless of how
/// they were split across `update` calls.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: blake3::Hasher,
    len: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more bytes into the digest.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
        self.len += data.len() as u64;
    }

    /// Number of bytes hashed so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finish and return the digest. The hasher can keep accepting input.
    pub fn finalize(&self) -> ContentHash {
        ContentHash::from_digest(*self.inner.finalize().as_bytes())
    }
}

impl std::fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHasher").field("len", &self.len).finish()
    }
}

/// Hash an in-memory byte slice.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    ContentHash::from_digest(*blake3::hash(data).as_bytes())
}

/// Hash a stream by reading it once to the end.
///
/// Memory use is bounded by a fixed read buffer. Returns the digest and the
/// number of bytes read. Read errors propagate unchanged.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<(ContentHash, u64)> {
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok((hasher.finalize(), hasher.len()))
}

/// Reader adapter that hashes every byte it hands out.
///
/// Wrap the upload stream in a `HashingReader` and copy it to storage; the
/// digest returned by [`finish`](Self::finish) covers exactly the bytes the
/// copy consumed, in a single pass.
pub struct HashingReader<R> {
    inner: R,
    hasher: ContentHasher,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: ContentHasher::new(),
        }
    }

    /// Bytes read through this adapter so far.
    pub fn bytes_read(&self) -> u64 {
        self.hasher.len()
    }

    /// Consume the adapter, returning the digest and byte count.
    pub fn finish(self) -> (ContentHash, u64) {
        (self.hasher.finalize(), self.hasher.len())
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Reader that fails after yielding a prefix.
    struct FailingReader {
        yielded: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.yielded {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))
            } else {
                self.yielded = true;
                buf[0] = 1;
                Ok(1)
            }
        }
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_bytes(b"hello world"), hash_bytes(b"hello world"));
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"world"));
    }

    #[test]
    fn matches_stock_blake3() {
        let expected = blake3::hash(b"game asset").to_hex().to_string();
        assert_eq!(hash_bytes(b"game asset").to_hex(), expected);
    }

    #[test]
    fn empty_input_has_a_digest() {
        let (hash, len) = hash_reader(io::empty()).unwrap();
        assert_eq!(len, 0);
        assert_eq!(hash, hash_bytes(b""));
    }

    #[test]
    fn reader_larger_than_buffer() {
        let data = vec![0x5a; READ_BUF_SIZE * 3 + 17];
        let (hash, len) = hash_reader(&data[..]).unwrap();
        assert_eq!(len, data.len() as u64);
        assert_eq!(hash, hash_bytes(&data));
    }

    #[test]
    fn hashing_reader_tracks_copied_bytes() {
        let data = b"copy me while hashing".to_vec();
        let mut reader = HashingReader::new(&data[..]);
        let mut sink = Vec::new();
        io::copy(&mut reader, &mut sink).unwrap();
        assert_eq!(reader.bytes_read(), data.len() as u64);
        let (hash, len) = reader.finish();
        assert_eq!(sink, data);
        assert_eq!(len, data.len() as u64);
        assert_eq!(hash, hash_bytes(&data));
    }

    #[test]
    fn read_errors_propagate() {
        let err = hash_reader(FailingReader { yielded: false }).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_digest(data in proptest::collection::vec(any::<u8>(), 0..4096), split in 0usize..4096) {
            let split = split.min(data.len());
            let mut hasher = ContentHasher::new();
            hasher.update(&data[..split]);
            hasher.update(&data[split..]);
            prop_assert_eq!(hasher.finalize(), hash_bytes(&data));
        }
    }
}
