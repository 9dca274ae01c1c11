//! Disk I/O helpers: directory setup, loading, and truncating writes.
//!
//! Writes go straight over the existing file. There is no temp file and no
//! rename, so a crash in the middle of a write can leave a torn file behind.
//! Encoding happens in memory first, which at least keeps a codec failure
//! from truncating the last good save.

use crate::codec::{Codec, DataMode};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;

/// Create every missing directory above `path`.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .map_err(|e| Error::CreateDir(format!("{}: {e}", dir.display()))),
        _ => Ok(()),
    }
}

/// Reads and decodes the file at `path`. A missing or zero-length file is an
/// empty map, not an error. Anything else the codec cannot read is
/// [`Error::Deserialize`].
pub fn load<K, V, C>(path: &Path, codec: &C) -> Result<IndexMap<K, V>>
where
    C: Codec<K, V>,
{
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(IndexMap::new()),
        Err(e) => return Err(Error::Io(format!("{}: {e}", path.display()))),
    };
    if bytes.is_empty() {
        return Ok(IndexMap::new());
    }
    if codec.mode() == DataMode::Text {
        std::str::from_utf8(&bytes).map_err(|e| {
            Error::Deserialize(format!("{} is not UTF-8 text: {e}", path.display()))
        })?;
    }
    codec.deserialize(&mut bytes.as_slice()).map_err(|e| match e {
        Error::Deserialize(_) => e,
        other => Error::Deserialize(other.to_string()),
    })
}

/// Encode `data` into memory. Text codecs must produce valid UTF-8.
pub fn encode<K, V, C>(data: &IndexMap<K, V>, codec: &C) -> Result<Vec<u8>>
where
    C: Codec<K, V>,
{
    let mut buf = Vec::new();
    codec.serialize(data, &mut buf)?;
    if codec.mode() == DataMode::Text {
        std::str::from_utf8(&buf)
            .map_err(|e| Error::Serialize(format!("text codec produced invalid UTF-8: {e}")))?;
    }
    Ok(buf)
}

/// Truncate the file at `path` and write `bytes` into it, syncing before return.
pub fn write_truncate(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
    file.write_all(bytes)?;
    file.sync_data()?;
    Ok(())
}
