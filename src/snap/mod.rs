// src/snap/mod.rs

//! Snap naming and metadata primitives
//!
//! Instance names allow several parallel installations of the same snap on
//! one device: `hello` is the default instance, `hello_dev` a second one.
//! The suffix is a purely local concept; the store only ever sees the snap
//! name and an opaque correlation key.

mod epoch;
mod info;
mod revision;

pub use epoch::Epoch;
pub use info::{DeltaInfo, DownloadInfo, MediaInfo, SnapInfo, StoreAccount};
pub use revision::Revision;

/// Split an instance name into (snap name, instance key).
///
/// The instance key is everything after the first underscore; it is empty
/// for the default instance.
pub fn split_instance_name(name: &str) -> (&str, &str) {
    match name.split_once('_') {
        Some((snap, key)) => (snap, key),
        None => (name, ""),
    }
}

/// The snap-name component of an instance name.
pub fn instance_snap(name: &str) -> &str {
    split_instance_name(name).0
}
