// src/snap/revision.rs

//! Snap revision numbers
//!
//! A revision identifies one build of a snap in the store. Revision 0 is
//! the "unset" marker used by actions that pin nothing; negative revisions
//! denote locally sideloaded builds that the store has never seen.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A store revision; 0 means unset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub i32);

impl Revision {
    pub const UNSET: Revision = Revision(0);

    pub fn new(n: i32) -> Self {
        Revision(n)
    }

    pub fn is_unset(&self) -> bool {
        self.0 == 0
    }

    pub fn is_local(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unset() {
            write!(f, "unset")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<i32> for Revision {
    fn from(n: i32) -> Self {
        Revision(n)
    }
}
