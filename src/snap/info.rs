// src/snap/info.rs

//! Decoded snap metadata
//!
//! [`SnapInfo`] is the client-side view of one snap as the store describes
//! it: identity, publication metadata, and how to download it. It is
//! produced from the store's wire schema by the store module and never
//! serialized back.

use crate::snap::{Epoch, Revision};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A store account, as attached to a snap's publisher field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreAccount {
    pub id: String,
    pub username: String,
    #[serde(rename = "display-name")]
    pub display_name: String,
    /// Publisher vetting level, e.g. "verified" or "unproven"
    pub validation: String,
}

/// One piece of listing media (icon, screenshot, video)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaInfo {
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// A binary delta offered between two revisions of the same snap
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaInfo {
    pub from_revision: i32,
    pub to_revision: i32,
    pub format: String,
    pub url: String,
    pub size: u64,
    pub sha3_384: String,
}

/// Where and how to fetch a snap's blob
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadInfo {
    pub url: String,
    pub size: u64,
    pub sha3_384: String,
    pub deltas: Vec<DeltaInfo>,
}

/// Decoded description of one snap revision
#[derive(Debug, Clone, Default)]
pub struct SnapInfo {
    /// The store-facing snap name (no instance suffix)
    pub name: String,
    /// Local parallel-install key; empty for the default instance
    pub instance_key: String,
    pub snap_id: String,
    pub revision: Revision,
    /// The channel this revision was effectively delivered from
    pub channel: String,
    pub epoch: Epoch,
    pub snap_type: String,
    pub version: String,
    pub title: String,
    pub summary: String,
    pub description: String,
    pub license: String,
    pub base: String,
    pub confinement: String,
    pub contact: String,
    pub website: String,
    pub publisher: StoreAccount,
    pub private: bool,
    pub paid: bool,
    pub prices: HashMap<String, f64>,
    pub media: Vec<MediaInfo>,
    pub common_ids: Vec<String>,
    pub architectures: Vec<String>,
    /// When the store published this revision
    pub created_at: Option<DateTime<Utc>>,
    pub download: DownloadInfo,
}

impl SnapInfo {
    /// The local instance name: `name` or `name_instancekey`
    pub fn instance_name(&self) -> String {
        if self.instance_key.is_empty() {
            self.name.clone()
        } else {
            format!("{}_{}", self.name, self.instance_key)
        }
    }
}
