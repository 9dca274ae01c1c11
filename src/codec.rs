//! Codecs that turn the map into file contents and back.
//!
//! Defaults to bincode. [`JsonCodec`] writes human-readable JSON, and
//! [`FnCodec`] wraps a plain pair of functions when neither fits.
//!
//! Every codec declares its [`DataMode`] up front. The store reads and writes
//! raw bytes in both modes; text mode adds a UTF-8 check on the way in and on
//! the way out.
//!
//! Maps cross the codec boundary as [`IndexMap`], so entries are written in
//! the order they were loaded and inserted. Opening and closing a store
//! without touching it writes back the same bytes.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::hash::Hash;
use std::io::{Read, Write};

/// Whether a codec produces arbitrary bytes or UTF-8 text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataMode {
    /// Any byte sequence.
    Binary,
    /// Must be valid UTF-8.
    Text,
}

/// Serialize/deserialize pair used to persist a map of `K` to `V`.
///
/// `deserialize` must read back exactly what `serialize` wrote, in the same
/// order.
pub trait Codec<K, V>: Send + Sync {
    /// Data mode of the encoded form.
    fn mode(&self) -> DataMode;

    /// Write a complete representation of `data` to `dst`.
    fn serialize(&self, data: &IndexMap<K, V>, dst: &mut dyn Write) -> Result<()>;

    /// Read a complete map back from `src`.
    fn deserialize(&self, src: &mut dyn Read) -> Result<IndexMap<K, V>>;
}

// ---- bincode -----------------------------------------------------------------

/// Compact binary encoding via bincode. The default codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl<K, V> Codec<K, V> for BincodeCodec
where
    K: Serialize + DeserializeOwned + Eq + Hash,
    V: Serialize + DeserializeOwned,
{
    fn mode(&self) -> DataMode {
        DataMode::Binary
    }

    fn serialize(&self, data: &IndexMap<K, V>, dst: &mut dyn Write) -> Result<()> {
        bincode::serialize_into(dst, data).map_err(|e| Error::Serialize(e.to_string()))
    }

    // Decoding from a slice bounds every length prefix by the bytes actually
    // present. The reader path trusts the prefix and allocates up front.
    fn deserialize(&self, src: &mut dyn Read) -> Result<IndexMap<K, V>> {
        let mut bytes = Vec::new();
        src.read_to_end(&mut bytes)?;
        bincode::deserialize(&bytes).map_err(|e| Error::Deserialize(e.to_string()))
    }
}

// ---- JSON --------------------------------------------------------------------

/// JSON text encoding with optional pretty-printing.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    /// Compact JSON (single line, no extra whitespace).
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-printed JSON with indentation.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl<K, V> Codec<K, V> for JsonCodec
where
    K: Serialize + DeserializeOwned + Eq + Hash,
    V: Serialize + DeserializeOwned,
{
    fn mode(&self) -> DataMode {
        DataMode::Text
    }

    fn serialize(&self, data: &IndexMap<K, V>, dst: &mut dyn Write) -> Result<()> {
        let written = if self.pretty {
            serde_json::to_writer_pretty(dst, data)
        } else {
            serde_json::to_writer(dst, data)
        };
        written.map_err(|e| {
            if e.is_io() {
                Error::Io(e.to_string())
            } else {
                Error::Serialize(e.to_string())
            }
        })
    }

    fn deserialize(&self, src: &mut dyn Read) -> Result<IndexMap<K, V>> {
        serde_json::from_reader(src).map_err(|e| {
            if e.is_io() {
                Error::Io(e.to_string())
            } else {
                Error::Deserialize(e.to_string())
            }
        })
    }
}

// ---- function pair -----------------------------------------------------------

/// Codec assembled from a serialize function and a deserialize function.
///
/// ```rust
/// use file_map::codec::{Codec, DataMode, FnCodec};
/// use file_map::IndexMap;
/// use std::io::{Read, Write};
///
/// // one "key=value" pair per line
/// let lines = FnCodec::new(
///     DataMode::Text,
///     |map: &IndexMap<String, String>, dst: &mut dyn Write| {
///         for (k, v) in map {
///             writeln!(dst, "{k}={v}")?;
///         }
///         Ok(())
///     },
///     |src: &mut dyn Read| {
///         let mut text = String::new();
///         src.read_to_string(&mut text)?;
///         Ok(text
///             .lines()
///             .filter_map(|l| l.split_once('='))
///             .map(|(k, v)| (k.to_string(), v.to_string()))
///             .collect())
///     },
/// );
/// assert_eq!(Codec::<String, String>::mode(&lines), DataMode::Text);
/// ```
pub struct FnCodec<S, D> {
    mode: DataMode,
    ser: S,
    de: D,
}

impl<S, D> FnCodec<S, D> {
    /// Pair `ser` and `de` under the given data mode.
    pub fn new<K, V>(mode: DataMode, ser: S, de: D) -> Self
    where
        S: Fn(&IndexMap<K, V>, &mut dyn Write) -> Result<()> + Send + Sync,
        D: Fn(&mut dyn Read) -> Result<IndexMap<K, V>> + Send + Sync,
    {
        Self { mode, ser, de }
    }
}

impl<K, V, S, D> Codec<K, V> for FnCodec<S, D>
where
    S: Fn(&IndexMap<K, V>, &mut dyn Write) -> Result<()> + Send + Sync,
    D: Fn(&mut dyn Read) -> Result<IndexMap<K, V>> + Send + Sync,
{
    fn mode(&self) -> DataMode {
        self.mode
    }

    fn serialize(&self, data: &IndexMap<K, V>, dst: &mut dyn Write) -> Result<()> {
        (self.ser)(data, dst)
    }

    fn deserialize(&self, src: &mut dyn Read) -> Result<IndexMap<K, V>> {
        (self.de)(src)
    }
}

impl<S, D> fmt::Debug for FnCodec<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCodec")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
