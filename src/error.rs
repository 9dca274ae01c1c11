//! Unified error type for all store operations.

use thiserror::Error;

/// Things that can go wrong when opening, saving or closing a store.
///
/// Codecs pick the variant themselves: decode failures are
/// [`Deserialize`](Error::Deserialize), encode failures
/// [`Serialize`](Error::Serialize), whatever the underlying format error was.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The parent directory of the backing file could not be created.
    #[error("cannot create directory: {0}")]
    CreateDir(String),
    /// File system problem while reading or writing the backing file.
    #[error("i/o error: {0}")]
    Io(String),
    /// The codec failed to encode the map.
    #[error("serialization error: {0}")]
    Serialize(String),
    /// The backing file exists but could not be decoded.
    #[error("deserialization error: {0}")]
    Deserialize(String),
    /// A flush was requested after the store was closed.
    #[error("store is closed")]
    Closed,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Result alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(Error::from(err), Error::Io("denied".into()));
    }

    #[test]
    fn display_mentions_kind() {
        assert_eq!(Error::Closed.to_string(), "store is closed");
        assert!(Error::CreateDir("denied".into())
            .to_string()
            .contains("directory"));
        assert!(Error::Deserialize("eof".into())
            .to_string()
            .starts_with("deserialization"));
    }
}
