use thiserror::Error;

/// Errors that can occur while decoding wire data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeError {
    /// Reader ran out of bytes mid-value
    #[error("Buffer too short: needed {needed} more byte(s) at offset {offset}")]
    BufferTooShort { needed: usize, offset: usize },

    /// A length prefix describes more data than the buffer holds
    #[error("Invalid length prefix {length} at offset {offset}: only {remaining} byte(s) remain")]
    InvalidLength {
        length: usize,
        offset: usize,
        remaining: usize,
    },

    /// String payload was not valid UTF-8
    #[error("Invalid UTF-8 in string payload at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// An enum tag byte had no matching variant
    #[error("Unknown tag {tag} while decoding {type_name}")]
    UnknownTag { tag: u8, type_name: &'static str },
}
