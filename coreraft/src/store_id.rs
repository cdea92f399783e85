//! Identity of the underlying data store.

use std::fmt;

/// Identifies the data store a member is attached to.
///
/// The core treats it as an opaque equality token: a vote request carries
/// the candidate's store id and the receiver rejects candidates attached
/// to an incompatible store, since replicating between unrelated stores
/// would corrupt both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StoreId {
    pub creation_time: u64,
    pub random_id: u64,
    pub upgrade_time: u64,
    pub upgrade_id: u64,
}

impl StoreId {
    pub fn new(creation_time: u64, random_id: u64, upgrade_time: u64, upgrade_id: u64) -> Self {
        Self {
            creation_time,
            random_id,
            upgrade_time,
            upgrade_id,
        }
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreId{{{:x}/{:x}/{:x}/{:x}}}",
            self.creation_time, self.random_id, self.upgrade_time, self.upgrade_id
        )
    }
}
