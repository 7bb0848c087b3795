//! Content hashing for the depot update server.
//!
//! Every stored file is identified by the BLAKE3 digest of its bytes. The
//! digest is computed without domain separation so clients can verify a
//! download with any stock BLAKE3 implementation.
//!
//! Two entry points cover the ingestion paths:
//!
//! - [`ContentHasher`] / [`hash_reader`] — hash a stream read once
//! - [`HashingReader`] — hash while the stream is being copied elsewhere,
//!   so the digest reflects exactly the bytes that were written

pub mod hasher;

pub use hasher::{hash_bytes, hash_reader, ContentHasher, HashingReader};
