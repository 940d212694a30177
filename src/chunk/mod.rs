//! Result chunk download and decoding.

pub mod decode;
pub mod fetcher;

pub use decode::{RawRows, decode_chunk, decode_inline};
pub use fetcher::{ChunkFetcher, ChunkRequest, TransportChunkFetcher};
