use serde::{Deserialize, Serialize};

/// An origin and the channels to mirror for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncScope {
    /// Origin name.
    pub name: String,
    #[serde(default)]
    pub channels: Vec<String>,
}

impl SyncScope {
    pub fn new<I, S>(name: impl Into<String>, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { name: name.into(), channels: channels.into_iter().map(Into::into).collect() }
    }
}
