mod desc;
mod patch;
mod spec;

pub use desc::ElectionDescription;
pub use patch::ElectionPatch;
pub use spec::ElectionSpec;

use serde::{Deserialize, Deserializer};

/// Deserialize a present field as `Some`, so that combined with
/// `#[serde(default)]` a field that is absent becomes `None` while an explicit
/// `null` becomes `Some(None)`.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
