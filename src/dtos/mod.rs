pub mod auth;
pub mod driver;
pub mod invoice;
pub mod location;
pub mod maintenance;
pub mod page;
pub mod route;
pub mod shipment;
pub mod transaction;
pub mod truck;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Tells an explicit `null` apart from an absent field.
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// absent -> `None`, `null` -> `Some(None)`, value -> `Some(Some(v))`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims and drops strings that end up empty.
pub fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
