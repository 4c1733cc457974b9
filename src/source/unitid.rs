use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a source unit inside the [`SourceMap`](super::SourceMap) unit table.
#[repr(transparent)]
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UnitId(u32);

impl UnitId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> usize {
        self.0 as usize
    }
}

/// let id: UnitId = 1.into();
impl From<u32> for UnitId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// let idx: usize = id.into();
impl From<UnitId> for usize {
    fn from(id: UnitId) -> Self {
        id.0 as usize
    }
}

/// print like normal number
impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
