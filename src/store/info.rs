// src/store/info.rs

//! Store wire schema for snap metadata
//!
//! [`StoreSnap`] mirrors the `snap` object of the v2 API; [`STORE_SNAP_FIELDS`]
//! is the matching `fields` list the client asks the store to return. The
//! decoder turns a wire snap into the crate's [`SnapInfo`].

use crate::error::{Error, Result};
use crate::snap::{DeltaInfo, DownloadInfo, Epoch, MediaInfo, Revision, SnapInfo, StoreAccount};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Every wire field of [`StoreSnap`], as sent in the request's `fields` list
pub(crate) const STORE_SNAP_FIELDS: &[&str] = &[
    "architectures",
    "base",
    "common-ids",
    "confinement",
    "contact",
    "created-at",
    "description",
    "download",
    "epoch",
    "license",
    "media",
    "name",
    "prices",
    "private",
    "publisher",
    "revision",
    "snap-id",
    "summary",
    "title",
    "type",
    "version",
    "website",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StoreSnapDelta {
    pub format: String,
    #[serde(rename = "sha3-384")]
    pub sha3_384: String,
    pub size: u64,
    pub source: i32,
    pub target: i32,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StoreSnapDownload {
    #[serde(rename = "sha3-384")]
    pub sha3_384: String,
    pub size: u64,
    pub url: String,
    pub deltas: Vec<StoreSnapDelta>,
}

/// A snap as the store describes it on the wire
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StoreSnap {
    pub architectures: Vec<String>,
    pub base: String,
    #[serde(rename = "common-ids")]
    pub common_ids: Vec<String>,
    pub confinement: String,
    pub contact: String,
    #[serde(rename = "created-at")]
    pub created_at: String,
    pub description: String,
    pub download: StoreSnapDownload,
    pub epoch: Epoch,
    pub license: String,
    pub media: Vec<MediaInfo>,
    pub name: String,
    pub prices: HashMap<String, f64>,
    pub private: bool,
    pub publisher: StoreAccount,
    pub revision: i32,
    #[serde(rename = "snap-id")]
    pub snap_id: String,
    pub summary: String,
    pub title: String,
    #[serde(rename = "type")]
    pub snap_type: String,
    pub version: String,
    pub website: String,
}

/// Decode a wire snap into a [`SnapInfo`].
///
/// Pure: no store state is consulted. A snap without a name or snap-id is
/// not decodable and fails; the caller treats that as a protocol violation.
pub(crate) fn info_from_store_snap(d: &StoreSnap) -> Result<SnapInfo> {
    if d.name.is_empty() || d.snap_id.is_empty() {
        return Err(Error::InvalidResponse(
            "store snap carries no name or snap-id".to_string(),
        ));
    }

    let snap_type = if d.snap_type.is_empty() {
        "app".to_string()
    } else {
        d.snap_type.clone()
    };
    let confinement = if d.confinement.is_empty() {
        "strict".to_string()
    } else {
        d.confinement.clone()
    };

    Ok(SnapInfo {
        name: d.name.clone(),
        instance_key: String::new(),
        snap_id: d.snap_id.clone(),
        revision: Revision::new(d.revision),
        channel: String::new(),
        epoch: d.epoch.clone(),
        snap_type,
        version: d.version.clone(),
        title: d.title.clone(),
        summary: d.summary.clone(),
        description: d.description.clone(),
        license: d.license.clone(),
        base: d.base.clone(),
        confinement,
        contact: d.contact.clone(),
        website: d.website.clone(),
        publisher: d.publisher.clone(),
        private: d.private,
        paid: !d.prices.is_empty(),
        prices: d.prices.clone(),
        media: d.media.clone(),
        common_ids: d.common_ids.clone(),
        architectures: d.architectures.clone(),
        created_at: DateTime::parse_from_rfc3339(&d.created_at)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        download: DownloadInfo {
            url: d.download.url.clone(),
            size: d.download.size,
            sha3_384: d.download.sha3_384.clone(),
            deltas: d
                .download
                .deltas
                .iter()
                .map(|delta| DeltaInfo {
                    from_revision: delta.source,
                    to_revision: delta.target,
                    format: delta.format.clone(),
                    url: delta.url.clone(),
                    size: delta.size,
                    sha3_384: delta.sha3_384.clone(),
                })
                .collect(),
        },
    })
}
