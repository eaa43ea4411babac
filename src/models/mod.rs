// src/models/mod.rs

use serde::{Deserialize, Deserializer};

pub mod certificate;
pub mod class;
pub mod exam_event;
pub mod import;
pub mod student;
pub mod subject;
pub mod user;

/// Trims a string field while deserializing, so length rules see what will be stored.
pub(crate) fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}

/// `trimmed` for optional fields. Use with `#[serde(default)]`.
pub(crate) fn trimmed_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|v| v.trim().to_string()))
}

/// Tells an explicit `null` apart from an absent field in partial updates:
/// absent is `None`, `null` is `Some(None)`. Use with `#[serde(default)]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
