use std::fs;
use std::path::Path;
use serde::Serialize;
use serde::de::DeserializeOwned;
use crate::error::HabeError;

/// Writes `value` to `path` as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), HabeError> {
    let data = serde_json::to_string_pretty(value)?;
    fs::write(path, data)?;
    Ok(())
}

/// Reads a JSON value of type `T` from `path`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, HabeError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Reads raw bytes from `path`.
pub fn read_to_vec(path: &Path) -> Result<Vec<u8>, HabeError> {
    Ok(fs::read(path)?)
}

/// Writes raw bytes to `path`.
pub fn write_from_vec(path: &Path, data: &[u8]) -> Result<(), HabeError> {
    Ok(fs::write(path, data)?)
}
