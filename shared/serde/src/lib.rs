//! # Commune Serde
//! Byte-granularity wire serialization used by the replication layer.
//!
//! All multi-byte integers are little-endian. Variable-length data
//! (byte slices, strings, collections) is length-prefixed with a `u32`.

mod error;
mod reader;
mod serde;
mod writer;

pub use error::SerdeError;
pub use reader::ByteReader;
pub use serde::Serde;
pub use writer::ByteWriter;
