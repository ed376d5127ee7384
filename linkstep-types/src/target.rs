use serde::{Deserialize, Serialize};

/// One executable to build, identified by its canonical (extension-stripped) name.
///
/// `ordinal` is the zero-based position in the sorted enumeration and is the sole
/// input to address assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildTarget {
    pub name: String,
    pub ordinal: u64,
}

impl BuildTarget {
    pub fn new(name: impl Into<String>, ordinal: u64) -> Self {
        Self {
            name: name.into(),
            ordinal,
        }
    }
}
