use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque post identifier as issued by the backend.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        PostId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        PostId(s.to_string())
    }
}

impl From<String> for PostId {
    fn from(s: String) -> Self {
        PostId(s)
    }
}
