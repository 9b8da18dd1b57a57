// src/snap/epoch.rs

//! Snap epochs
//!
//! An epoch is a structured compatibility marker controlling which
//! revisions a device may upgrade to. It carries the list of epoch numbers
//! the snap can read data from and the list it writes; the zero epoch
//! (`{"read":[0],"write":[0]}`) is where every snap starts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A snap's epoch: which data generations it can read and write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epoch {
    pub read: Vec<u32>,
    pub write: Vec<u32>,
}

impl Default for Epoch {
    fn default() -> Self {
        Epoch {
            read: vec![0],
            write: vec![0],
        }
    }
}

impl Epoch {
    pub fn new(read: Vec<u32>, write: Vec<u32>) -> Self {
        Epoch { read, write }
    }

    /// The epoch every snap starts at
    pub fn is_zero(&self) -> bool {
        self.read == [0] && self.write == [0]
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // plain epochs print bare ("1"); an epoch that can still read the
        // previous generation prints with a star ("2*")
        if let [n] = self.write[..] {
            if self.read == [n] {
                return write!(f, "{n}");
            }
            if n > 0 && self.read == [n - 1, n] {
                return write!(f, "{n}*");
            }
        }
        write!(f, "{{read: {:?}, write: {:?}}}", self.read, self.write)
    }
}
