// src/store/errors.rs

//! Typed store errors
//!
//! The store reports per-action failures as (code, message) pairs plus
//! optional structured extras. [`translate_action_error`] maps known codes
//! onto [`StoreError`] kinds, enriching them with the action context the
//! caller already knows (channel, offered releases). Unknown codes pass
//! through as [`StoreError::Api`] with the server's message verbatim so new
//! failure modes stay diagnosable without a client update.

use crate::store::action::SnapActionResult;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// A (channel, architecture) pair the store offers a snap on
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SnapRelease {
    pub architecture: String,
    pub channel: String,
}

/// One typed per-action or envelope-level store error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("snap not found")]
    SnapNotFound,

    #[error("snap-id not found")]
    IdNotFound,

    #[error("{0}")]
    NotFound(String),

    /// The pinned or resolved revision is not offered as requested; carries
    /// the releases the store does offer
    #[error("no snap revision available as specified")]
    RevisionNotAvailable {
        action: String,
        channel: String,
        releases: Vec<SnapRelease>,
    },

    #[error("no snap revision on channel {channel:?}")]
    ChannelNotAvailable { channel: String },

    #[error("cannot authenticate to snap store: {0}")]
    InvalidCredentials(String),

    #[error("snap requires classic confinement")]
    NeedsClassic,

    #[error("snap requires classic confinement which is only available on classic systems")]
    NeedsClassicSystem,

    #[error("snap requires devmode or confinement override")]
    NeedsDevMode,

    #[error("bad query: {0}")]
    BadQuery(String),

    /// Fallback for codes this client does not know, message preserved
    #[error("{message}")]
    Api { code: String, message: String },

    /// A refresh came back with the revision already installed or blocked
    #[error("snap has no updates available")]
    NoUpdateAvailable,

    /// Sentinel: the user's session authorization is soft-expired
    #[error("soft-expired user authorization needs refresh")]
    UserAuthNeedsRefresh,

    /// Sentinel: the device authorization is soft-expired
    #[error("soft-expired device authorization needs refresh")]
    DeviceAuthNeedsRefresh,
}

/// Map a wire (code, message) pair onto a typed error, given the context of
/// the action that triggered it.
pub(crate) fn translate_action_error(
    action: &str,
    channel: &str,
    code: &str,
    message: &str,
    releases: &[SnapRelease],
) -> StoreError {
    match code {
        "not-found" => StoreError::NotFound(message.to_string()),
        "name-not-found" | "snap-not-found" => StoreError::SnapNotFound,
        "id-not-found" => StoreError::IdNotFound,
        "revision-not-found" => StoreError::RevisionNotAvailable {
            action: action.to_string(),
            channel: channel.to_string(),
            releases: releases.to_vec(),
        },
        "snap-channel-not-available" => StoreError::ChannelNotAvailable {
            channel: channel.to_string(),
        },
        "invalid-credentials" => StoreError::InvalidCredentials(message.to_string()),
        "snap-needs-classic" => StoreError::NeedsClassic,
        "snap-needs-classic-system" => StoreError::NeedsClassicSystem,
        "snap-needs-devmode" => StoreError::NeedsDevMode,
        "bad-query" => StoreError::BadQuery(message.to_string()),
        "user-authorization-needs-refresh" => StoreError::UserAuthNeedsRefresh,
        "device-authorization-needs-refresh" => StoreError::DeviceAuthNeedsRefresh,
        _ => StoreError::Api {
            code: code.to_string(),
            message: message.to_string(),
        },
    }
}

/// Aggregate outcome of a snap-action batch that did not fully succeed.
///
/// Per-snap failures are bucketed by the action that caused them, keyed by
/// instance name; envelope-level and unattributable failures land in
/// `other`, in server order. Partial successes ride in `results`: callers
/// must treat this as "these succeeded AND these failed".
#[derive(Debug, Clone, Default)]
pub struct SnapActionError {
    /// Successfully resolved actions, in server result order
    pub results: Vec<SnapActionResult>,
    /// The store returned no results at all
    pub no_results: bool,
    pub refresh: HashMap<String, StoreError>,
    pub install: HashMap<String, StoreError>,
    pub download: HashMap<String, StoreError>,
    pub other: Vec<StoreError>,
}

impl SnapActionError {
    /// Total number of failures across all four buckets
    pub fn error_count(&self) -> usize {
        self.refresh.len() + self.install.len() + self.download.len() + self.other.len()
    }
}

impl fmt::Display for SnapActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (
            self.refresh.len(),
            self.install.len(),
            self.download.len(),
            self.other.len(),
        ) {
            (0, 0, 0, 0) => write!(f, "no install/refresh information results from the store"),
            (1, 0, 0, 0) => match self.refresh.iter().next() {
                Some((name, e)) => write!(f, "cannot refresh snap {name:?}: {e}"),
                None => Ok(()),
            },
            (0, 1, 0, 0) => match self.install.iter().next() {
                Some((name, e)) => write!(f, "cannot install snap {name:?}: {e}"),
                None => Ok(()),
            },
            (0, 0, 1, 0) => match self.download.iter().next() {
                Some((name, e)) => write!(f, "cannot download snap {name:?}: {e}"),
                None => Ok(()),
            },
            (0, 0, 0, 1) => write!(f, "cannot refresh, install, or download: {}", self.other[0]),
            _ => {
                write!(f, "cannot refresh, install, or download:")?;
                let buckets = [
                    ("refresh", &self.refresh),
                    ("install", &self.install),
                    ("download", &self.download),
                ];
                for (verb, bucket) in buckets {
                    let mut names: Vec<_> = bucket.keys().collect();
                    names.sort();
                    for name in names {
                        write!(f, "\ncannot {verb} snap {name:?}: {}", bucket[name])?;
                    }
                }
                for e in &self.other {
                    write!(f, "\n{e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SnapActionError {}
