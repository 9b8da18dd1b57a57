// src/store/action.rs

//! The snap action resolver
//!
//! One call batches install/refresh/download queries against the store's
//! v2 snap-action endpoint: the device's installed snaps go out as context,
//! the desired operations as actions, and the response is correlated back
//! per action through opaque instance keys. A batch that partially fails
//! returns both the decoded successes and a typed error per failed snap.
//!
//! Parallel installs of one snap share a snap-id, so refresh actions are
//! correlated by a derived key instead: the plain snap-id for the default
//! instance, or `snapid:hash` where the hash covers the local instance
//! suffix and a per-call salt. The suffix itself never goes on the wire.

use crate::error::{Error, Result};
use crate::snap::{instance_snap, split_instance_name, Epoch, Revision, SnapInfo};
use crate::store::auth::{AuthRefreshNeed, UserAuth};
use crate::store::errors::{translate_action_error, SnapActionError, SnapRelease, StoreError};
use crate::store::info::{info_from_store_snap, StoreSnap, STORE_SNAP_FIELDS};
use crate::store::transport::RequestOptions;
use crate::store::{CancelToken, Store, SNAP_ACTION_ENDPOINT, SUGGESTED_CURRENCY_HEADER};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// Options applying to one snap-action batch
#[derive(Debug, Clone, Default)]
pub struct RefreshOptions {
    /// The refresh is managed by an external orchestrator; the store is
    /// told so via a header
    pub refresh_managed: bool,
    /// The refresh was scheduled rather than user-initiated
    pub is_auto_refresh: bool,
    /// Salt for instance-key hashing; required whenever a current snap
    /// carries a parallel-install suffix
    pub privacy_key: String,
}

/// One installed snap, sent as context for the batch
#[derive(Debug, Clone, Default)]
pub struct CurrentSnap {
    pub instance_name: String,
    pub snap_id: String,
    pub revision: Revision,
    /// Channel the snap tracks; defaults to "stable" on the wire
    pub tracking_channel: String,
    pub refreshed_date: Option<DateTime<Utc>>,
    pub ignore_validation: bool,
    /// Revisions that must not be offered as updates
    pub block: Vec<Revision>,
    pub epoch: Epoch,
    pub cohort_key: String,
}

/// What a [`SnapAction`] asks the store to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Install,
    Refresh,
    Download,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Install => "install",
            ActionKind::Refresh => "refresh",
            ActionKind::Download => "download",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-action validation stance; serialized as an optional bool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationFlag {
    /// Leave validation gating to the store's defaults (field omitted)
    #[default]
    Default,
    /// Ask the store to ignore validation gating
    Ignore,
    /// Ask the store to enforce validation gating
    Enforce,
}

impl ValidationFlag {
    fn wire_value(self) -> Option<bool> {
        match self {
            ValidationFlag::Default => None,
            ValidationFlag::Ignore => Some(true),
            ValidationFlag::Enforce => Some(false),
        }
    }
}

/// One desired operation on a snap
#[derive(Debug, Clone)]
pub struct SnapAction {
    pub action: ActionKind,
    pub instance_name: String,
    pub snap_id: String,
    pub channel: String,
    /// When set, pins the exact revision; takes precedence over `channel`
    pub revision: Revision,
    pub cohort_key: String,
    pub validation: ValidationFlag,
    /// Prior epoch for install/download (the amend case); `None` still
    /// advertises epoch awareness to the store
    pub epoch: Option<Epoch>,
}

impl SnapAction {
    pub fn new(action: ActionKind, instance_name: impl Into<String>) -> Self {
        SnapAction {
            action,
            instance_name: instance_name.into(),
            snap_id: String::new(),
            channel: String::new(),
            revision: Revision::UNSET,
            cohort_key: String::new(),
            validation: ValidationFlag::Default,
            epoch: None,
        }
    }
}

/// The non-error outcome of a single action
#[derive(Debug, Clone)]
pub struct SnapActionResult {
    pub info: SnapInfo,
    /// Channel the store redirected the request to, when it did
    pub redirect_channel: String,
}

// wire shape of one context entry

#[derive(Serialize)]
struct CurrentSnapJson {
    #[serde(rename = "snap-id")]
    snap_id: String,
    #[serde(rename = "instance-key")]
    instance_key: String,
    revision: i32,
    #[serde(rename = "tracking-channel")]
    tracking_channel: String,
    epoch: Epoch,
    #[serde(rename = "refreshed-date", skip_serializing_if = "Option::is_none")]
    refreshed_date: Option<DateTime<Utc>>,
    #[serde(rename = "ignore-validation", skip_serializing_if = "is_false")]
    ignore_validation: bool,
    #[serde(rename = "cohort-key", skip_serializing_if = "String::is_empty")]
    cohort_key: String,
}

fn is_false(v: &bool) -> bool {
    !*v
}

// wire shape of one action entry
//
// The store wants the `epoch` field present (even as null) on install and
// download, as proof the client handles epochs; refresh must not send it,
// the context entry already carries the epoch. Hence the double Option:
// None omits the field, Some(None) serializes the null.
#[derive(Serialize)]
struct ActionJson {
    action: &'static str,
    #[serde(rename = "instance-key")]
    instance_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "snap-id", skip_serializing_if = "String::is_empty")]
    snap_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    channel: String,
    #[serde(skip_serializing_if = "Revision::is_unset")]
    revision: Revision,
    #[serde(rename = "cohort-key", skip_serializing_if = "String::is_empty")]
    cohort_key: String,
    #[serde(rename = "ignore-validation", skip_serializing_if = "Option::is_none")]
    ignore_validation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    epoch: Option<Option<Epoch>>,
}

#[derive(Serialize)]
struct ActionRequestJson {
    context: Vec<CurrentSnapJson>,
    actions: Vec<ActionJson>,
    fields: Vec<&'static str>,
}

// response envelope

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireErrorExtra {
    releases: Vec<SnapRelease>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireError {
    code: String,
    message: String,
    extra: WireErrorExtra,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActionResultJson {
    result: String,
    #[serde(rename = "instance-key")]
    instance_key: String,
    name: String,
    snap: StoreSnap,
    #[serde(rename = "effective-channel")]
    effective_channel: String,
    #[serde(rename = "redirect-channel")]
    redirect_channel: String,
    error: WireError,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListError {
    code: String,
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActionResultList {
    results: Vec<ActionResultJson>,
    #[serde(rename = "error-list")]
    error_list: Vec<ListError>,
}

/// Correlation tables built while shaping the request, consumed while
/// walking the response. Keys are the wire instance keys.
#[derive(Debug)]
struct ActionTables<'a> {
    cur_by_key: HashMap<String, &'a CurrentSnap>,
    installs: HashMap<String, &'a SnapAction>,
    downloads: HashMap<String, &'a SnapAction>,
    refreshes: HashMap<String, &'a SnapAction>,
}

/// Compute the opaque key the store correlates an installed snap by.
///
/// The default instance is its snap-id. A parallel install hashes the
/// snap-id, the local instance suffix, and the per-call salt, so the local
/// naming never reaches the store in the clear.
fn derive_instance_key(cur: &CurrentSnap, salt: &str) -> Result<String> {
    let (_, instance_key) = split_instance_name(&cur.instance_name);

    if instance_key.is_empty() {
        return Ok(cur.snap_id.clone());
    }
    if salt.is_empty() {
        return Err(Error::Internal("request salt not provided".to_string()));
    }

    let mut hasher = Sha256::new();
    hasher.update(cur.snap_id.as_bytes());
    hasher.update(instance_key.as_bytes());
    hasher.update(salt.as_bytes());
    let digest = URL_SAFE_NO_PAD.encode(hasher.finalize());
    Ok(format!("{}:{}", cur.snap_id, digest))
}

/// The channel an action effectively asks for: a pinned revision wins over
/// any channel, so the channel is dropped when a revision is set.
fn effective_channel(a: &SnapAction) -> &str {
    if a.revision.is_unset() {
        &a.channel
    } else {
        ""
    }
}

/// Shape the wire payload and the correlation tables for one batch.
fn build_action_request<'a>(
    current_snaps: &'a [CurrentSnap],
    actions: &'a [SnapAction],
    opts: &RefreshOptions,
) -> Result<(Vec<u8>, ActionTables<'a>)> {
    let mut tables = ActionTables {
        cur_by_key: HashMap::with_capacity(current_snaps.len()),
        installs: HashMap::new(),
        downloads: HashMap::new(),
        refreshes: HashMap::new(),
    };
    let mut name_to_key: HashMap<&str, String> = HashMap::with_capacity(current_snaps.len());

    let mut context = Vec::with_capacity(current_snaps.len());
    for cur in current_snaps {
        if cur.snap_id.is_empty() || cur.instance_name.is_empty() || cur.revision.is_unset() {
            return Err(Error::Internal(
                "invalid current snap information".to_string(),
            ));
        }
        let instance_key = derive_instance_key(cur, &opts.privacy_key)?;

        let tracking_channel = if cur.tracking_channel.is_empty() {
            "stable".to_string()
        } else {
            cur.tracking_channel.clone()
        };
        context.push(CurrentSnapJson {
            snap_id: cur.snap_id.clone(),
            instance_key: instance_key.clone(),
            revision: cur.revision.0,
            tracking_channel,
            epoch: cur.epoch.clone(),
            refreshed_date: cur.refreshed_date,
            ignore_validation: cur.ignore_validation,
            cohort_key: cur.cohort_key.clone(),
        });

        name_to_key.insert(cur.instance_name.as_str(), instance_key.clone());
        tables.cur_by_key.insert(instance_key, cur);
    }

    let mut install_num = 0;
    let mut download_num = 0;
    let mut action_jsons = Vec::with_capacity(actions.len());
    for a in actions {
        if a.instance_name.is_empty() {
            return Err(Error::Internal("action without instance name".to_string()));
        }

        let instance_key = match a.action {
            ActionKind::Install => {
                install_num += 1;
                let key = format!("install-{install_num}");
                tables.installs.insert(key.clone(), a);
                key
            }
            ActionKind::Download => {
                let (_, suffix) = split_instance_name(&a.instance_name);
                if !suffix.is_empty() {
                    return Err(Error::Internal(format!(
                        "unsupported download with instance name {:?}",
                        a.instance_name
                    )));
                }
                download_num += 1;
                let key = format!("download-{download_num}");
                tables.downloads.insert(key.clone(), a);
                key
            }
            ActionKind::Refresh => {
                let key = name_to_key
                    .get(a.instance_name.as_str())
                    .cloned()
                    .ok_or_else(|| {
                        Error::Internal(format!(
                            "refresh action for {:?} does not match a current snap",
                            a.instance_name
                        ))
                    })?;
                tables.refreshes.insert(key.clone(), a);
                key
            }
        };

        let (name, epoch) = if a.action == ActionKind::Refresh {
            // the context entry already carries name and epoch
            (None, None)
        } else {
            (
                Some(instance_snap(&a.instance_name).to_string()),
                Some(a.epoch.clone()),
            )
        };

        action_jsons.push(ActionJson {
            action: a.action.as_str(),
            instance_key,
            name,
            snap_id: a.snap_id.clone(),
            channel: effective_channel(a).to_string(),
            revision: a.revision,
            cohort_key: a.cohort_key.clone(),
            ignore_validation: a.validation.wire_value(),
            epoch,
        });
    }

    let body = serde_json::to_vec(&ActionRequestJson {
        context,
        actions: action_jsons,
        fields: STORE_SNAP_FIELDS.to_vec(),
    })
    .map_err(|e| Error::Internal(format!("cannot encode snap action request: {e}")))?;

    Ok((body, tables))
}

/// Walk the response, pairing each result with its originating action, and
/// fold failures into the composite error.
fn resolve_results(
    envelope: ActionResultList,
    tables: &ActionTables<'_>,
) -> Result<Vec<SnapActionResult>> {
    let mut refresh_errors: HashMap<String, StoreError> = HashMap::new();
    let mut install_errors: HashMap<String, StoreError> = HashMap::new();
    let mut download_errors: HashMap<String, StoreError> = HashMap::new();
    let mut other_errors: Vec<StoreError> = Vec::new();

    let mut sars = Vec::new();
    for res in &envelope.results {
        if res.result == "error" {
            if let Some(a) = tables.installs.get(res.instance_key.as_str()) {
                if !res.name.is_empty() {
                    install_errors.insert(
                        a.instance_name.clone(),
                        translate_action_error(
                            "install",
                            effective_channel(a),
                            &res.error.code,
                            &res.error.message,
                            &res.error.extra.releases,
                        ),
                    );
                    continue;
                }
            } else if let Some(a) = tables.downloads.get(res.instance_key.as_str()) {
                if !res.name.is_empty() {
                    download_errors.insert(
                        res.name.clone(),
                        translate_action_error(
                            "download",
                            effective_channel(a),
                            &res.error.code,
                            &res.error.message,
                            &res.error.extra.releases,
                        ),
                    );
                    continue;
                }
            } else if let Some(cur) = tables.cur_by_key.get(res.instance_key.as_str()) {
                match tables.refreshes.get(res.instance_key.as_str()) {
                    Some(a) => {
                        let mut channel = effective_channel(a).to_string();
                        if channel.is_empty() && a.revision.is_unset() {
                            channel = cur.tracking_channel.clone();
                        }
                        refresh_errors.insert(
                            cur.instance_name.clone(),
                            translate_action_error(
                                "refresh",
                                &channel,
                                &res.error.code,
                                &res.error.message,
                                &res.error.extra.releases,
                            ),
                        );
                    }
                    None => {
                        // an error for a snap that was not part of an action
                        debug!(
                            "unexpected error for snap {:?}, instance key {}: [{}] {}",
                            cur.instance_name, res.instance_key, res.error.code, res.error.message
                        );
                        other_errors.push(translate_action_error(
                            "",
                            "",
                            &res.error.code,
                            &format!("snap {:?}: {}", cur.instance_name, res.error.message),
                            &[],
                        ));
                    }
                }
                continue;
            }
            other_errors.push(translate_action_error(
                "",
                "",
                &res.error.code,
                &res.error.message,
                &[],
            ));
            continue;
        }

        let mut info = info_from_store_snap(&res.snap)?;
        info.channel = res.effective_channel.clone();

        let mut instance_name = String::new();
        if res.result == "refresh" {
            let cur = tables
                .cur_by_key
                .get(res.instance_key.as_str())
                .ok_or_else(|| {
                    Error::InvalidResponse(
                        "refresh result does not match a current snap".to_string(),
                    )
                })?;
            let returned = Revision::new(res.snap.revision);
            if returned == cur.revision || cur.block.contains(&returned) {
                refresh_errors.insert(cur.instance_name.clone(), StoreError::NoUpdateAvailable);
                continue;
            }
            instance_name = cur.instance_name.clone();
        } else if res.result == "install" {
            if let Some(a) = tables.installs.get(res.instance_key.as_str()) {
                instance_name = a.instance_name.clone();
            }
        }

        if res.result != "download" && instance_name.is_empty() {
            return Err(Error::InvalidResponse(format!(
                "unexpected instance-key {:?}",
                res.instance_key
            )));
        }

        let (_, local_key) = split_instance_name(&instance_name);
        info.instance_key = local_key.to_string();

        sars.push(SnapActionResult {
            info,
            redirect_channel: res.redirect_channel.clone(),
        });
    }

    for e in &envelope.error_list {
        other_errors.push(translate_action_error("", "", &e.code, &e.message, &[]));
    }

    if !refresh_errors.is_empty()
        || !install_errors.is_empty()
        || !download_errors.is_empty()
        || envelope.results.is_empty()
        || !other_errors.is_empty()
    {
        return Err(Error::SnapAction(SnapActionError {
            results: sars,
            no_results: envelope.results.is_empty(),
            refresh: refresh_errors,
            install: install_errors,
            download: download_errors,
            other: other_errors,
        }));
    }

    Ok(sars)
}

impl Store {
    /// Query the store for the given install/refresh/download actions,
    /// with `current_snaps` as context about what the device already runs.
    ///
    /// A fully successful batch returns the per-action results in server
    /// order. When the store reports per-action failures the call returns
    /// [`Error::SnapAction`]: the composite carries the partial successes
    /// next to the typed per-snap errors, and the caller must consume both.
    ///
    /// Soft-expired authorizations reported by the store trigger a refresh
    /// through the configured [`crate::store::AuthRefresher`] and a retry
    /// of the whole batch, at most twice.
    pub fn snap_action(
        &self,
        cancel: &CancelToken,
        current_snaps: &[CurrentSnap],
        actions: &[SnapAction],
        user: Option<&UserAuth>,
        opts: &RefreshOptions,
    ) -> Result<Vec<SnapActionResult>> {
        if current_snaps.is_empty() && actions.is_empty() {
            // nothing to ask; don't bother the store
            return Err(SnapActionError {
                no_results: true,
                ..Default::default()
            }
            .into());
        }

        let mut auth_refreshes = 0;
        loop {
            let res = self.snap_action_once(cancel, current_snaps, actions, user, opts);

            let mut need = AuthRefreshNeed::default();
            if auth_refreshes < 2 {
                if let Err(Error::SnapAction(e)) = &res {
                    for other in &e.other {
                        match other {
                            StoreError::UserAuthNeedsRefresh => need.user = true,
                            StoreError::DeviceAuthNeedsRefresh => need.device = true,
                            _ => {}
                        }
                    }
                }
            }
            if !need.needed() {
                return res;
            }

            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            match self.auth.as_deref() {
                Some(refresher) => {
                    if let Err(e) = refresher.refresh(user, need) {
                        // best effort, the retry may still succeed
                        warn!("cannot refresh soft-expired authorisation: {e}");
                    }
                }
                None => {
                    warn!("store reports soft-expired authorisation but no refresher is configured");
                }
            }
            auth_refreshes += 1;
        }
    }

    fn snap_action_once(
        &self,
        cancel: &CancelToken,
        current_snaps: &[CurrentSnap],
        actions: &[SnapAction],
        user: Option<&UserAuth>,
        opts: &RefreshOptions,
    ) -> Result<Vec<SnapActionResult>> {
        let (body, tables) = build_action_request(current_snaps, actions, opts)?;

        let mut req = RequestOptions::post_json(self.endpoint_url(SNAP_ACTION_ENDPOINT)?, body);
        if opts.is_auto_refresh {
            debug!("auto-refresh; adding header Snap-Refresh-Reason: scheduled");
            req.add_header("Snap-Refresh-Reason", "scheduled");
        }
        if self.cfg.accept_deltas {
            debug!(
                "deltas enabled; adding header Snap-Accept-Delta-Format: {}",
                self.cfg.delta_format
            );
            req.add_header("Snap-Accept-Delta-Format", &self.cfg.delta_format);
        }
        if opts.refresh_managed {
            req.add_header("Snap-Refresh-Managed", "true");
        }

        let reply = self.transport.request_json(cancel, &req, user)?;
        if reply.status != 200 {
            return Err(Error::UnexpectedStatus {
                operation: "query the store for updates",
                status: reply.status,
            });
        }

        if let Some(sink) = self.currency.as_deref() {
            if let Some(currency) = reply.header(SUGGESTED_CURRENCY_HEADER) {
                if !currency.is_empty() {
                    sink.suggested_currency(currency);
                }
            }
        }

        let envelope: ActionResultList = serde_json::from_value(reply.body)
            .map_err(|e| Error::InvalidResponse(format!("cannot decode action results: {e}")))?;

        resolve_results(envelope, &tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn current(name: &str, snap_id: &str, revision: i32) -> CurrentSnap {
        CurrentSnap {
            instance_name: name.to_string(),
            snap_id: snap_id.to_string(),
            revision: Revision::new(revision),
            ..Default::default()
        }
    }

    fn body_json(current: &[CurrentSnap], actions: &[SnapAction], opts: &RefreshOptions) -> Value {
        let (body, _) = build_action_request(current, actions, opts).unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_instance_key_plain_name_is_snap_id() {
        let cur = current("hello", "abc", 1);
        assert_eq!(derive_instance_key(&cur, "salt").unwrap(), "abc");
        // no suffix means no salt needed either
        assert_eq!(derive_instance_key(&cur, "").unwrap(), "abc");
    }

    #[test]
    fn test_instance_key_suffix_is_hashed() {
        let cur = current("hello_dev", "abc", 1);
        let key = derive_instance_key(&cur, "salt").unwrap();
        assert!(key.starts_with("abc:"));
        // deterministic, local suffix never leaks
        assert_eq!(key, derive_instance_key(&cur, "salt").unwrap());
        assert!(!key[4..].contains("dev"));
        assert!(!key[4..].contains("hello"));
        // different salt, different key
        assert_ne!(key, derive_instance_key(&cur, "pepper").unwrap());
    }

    #[test]
    fn test_instance_key_suffix_requires_salt() {
        let cur = current("hello_dev", "abc", 1);
        let err = derive_instance_key(&cur, "").unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_context_entry_defaults() {
        let mut cur = current("hello", "abc", 7);
        cur.ignore_validation = false;
        let body = body_json(&[cur], &[], &RefreshOptions::default());
        let entry = &body["context"][0];
        assert_eq!(entry["snap-id"], "abc");
        assert_eq!(entry["instance-key"], "abc");
        assert_eq!(entry["revision"], 7);
        // empty channel defaults to stable on the wire
        assert_eq!(entry["tracking-channel"], "stable");
        // epoch always present in context
        assert_eq!(entry["epoch"], serde_json::json!({"read": [0], "write": [0]}));
        // zero/false/empty optionals are omitted
        let obj = entry.as_object().unwrap();
        assert!(!obj.contains_key("refreshed-date"));
        assert!(!obj.contains_key("ignore-validation"));
        assert!(!obj.contains_key("cohort-key"));
    }

    #[test]
    fn test_context_entry_optionals_present_when_set() {
        let mut cur = current("hello", "abc", 7);
        cur.tracking_channel = "latest/edge".to_string();
        cur.ignore_validation = true;
        cur.cohort_key = "cohort-xyz".to_string();
        cur.refreshed_date = Some(
            DateTime::parse_from_rfc3339("2024-02-03T04:05:06Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        let body = body_json(&[cur], &[], &RefreshOptions::default());
        let entry = &body["context"][0];
        assert_eq!(entry["tracking-channel"], "latest/edge");
        assert_eq!(entry["ignore-validation"], true);
        assert_eq!(entry["cohort-key"], "cohort-xyz");
        assert!(entry["refreshed-date"]
            .as_str()
            .unwrap()
            .starts_with("2024-02-03T04:05:06"));
    }

    #[test]
    fn test_invalid_current_snap_rejected() {
        for cur in [
            current("", "abc", 1),
            current("hello", "", 1),
            current("hello", "abc", 0),
        ] {
            let err = build_action_request(&[cur], &[], &RefreshOptions::default()).unwrap_err();
            assert!(matches!(err, Error::Internal(_)));
        }
    }

    #[test]
    fn test_install_action_epoch_field_is_null_without_prior_epoch() {
        let mut a = SnapAction::new(ActionKind::Install, "hello");
        a.channel = "stable".to_string();
        let body = body_json(&[], &[a], &RefreshOptions::default());
        let action = &body["actions"][0];
        assert_eq!(action["action"], "install");
        assert_eq!(action["instance-key"], "install-1");
        assert_eq!(action["name"], "hello");
        assert_eq!(action["channel"], "stable");
        // present and null: epoch-aware, no prior epoch
        let obj = action.as_object().unwrap();
        assert!(obj.contains_key("epoch"));
        assert_eq!(action["epoch"], Value::Null);
    }

    #[test]
    fn test_install_action_amend_sends_epoch_object() {
        let mut a = SnapAction::new(ActionKind::Install, "hello");
        a.epoch = Some(Epoch::new(vec![0, 1], vec![1]));
        let body = body_json(&[], &[a], &RefreshOptions::default());
        assert_eq!(
            body["actions"][0]["epoch"],
            serde_json::json!({"read": [0, 1], "write": [1]})
        );
    }

    #[test]
    fn test_refresh_action_omits_name_and_epoch() {
        let cur = current("hello", "abc", 3);
        let mut a = SnapAction::new(ActionKind::Refresh, "hello");
        a.snap_id = "abc".to_string();
        let body = body_json(&[cur], &[a], &RefreshOptions::default());
        let action = &body["actions"][0];
        assert_eq!(action["action"], "refresh");
        assert_eq!(action["instance-key"], "abc");
        let obj = action.as_object().unwrap();
        assert!(!obj.contains_key("name"));
        assert!(!obj.contains_key("epoch"));
    }

    #[test]
    fn test_pinned_revision_clears_channel() {
        let mut a = SnapAction::new(ActionKind::Install, "hello");
        a.channel = "edge".to_string();
        a.revision = Revision::new(5);
        let body = body_json(&[], &[a], &RefreshOptions::default());
        let action = &body["actions"][0];
        assert_eq!(action["revision"], 5);
        assert!(!action.as_object().unwrap().contains_key("channel"));
    }

    #[test]
    fn test_validation_tri_state() {
        let mut ignore = SnapAction::new(ActionKind::Install, "a");
        ignore.validation = ValidationFlag::Ignore;
        let mut enforce = SnapAction::new(ActionKind::Install, "b");
        enforce.validation = ValidationFlag::Enforce;
        let plain = SnapAction::new(ActionKind::Install, "c");

        let body = body_json(&[], &[ignore, enforce, plain], &RefreshOptions::default());
        assert_eq!(body["actions"][0]["ignore-validation"], true);
        assert_eq!(body["actions"][1]["ignore-validation"], false);
        assert!(!body["actions"][2]
            .as_object()
            .unwrap()
            .contains_key("ignore-validation"));
    }

    #[test]
    fn test_counters_are_independent_and_ordered() {
        let actions = vec![
            SnapAction::new(ActionKind::Install, "one"),
            SnapAction::new(ActionKind::Download, "two"),
            SnapAction::new(ActionKind::Install, "three"),
            SnapAction::new(ActionKind::Download, "four"),
        ];
        let body = body_json(&[], &actions, &RefreshOptions::default());
        let keys: Vec<&str> = body["actions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["instance-key"].as_str().unwrap())
            .collect();
        assert_eq!(keys, ["install-1", "download-1", "install-2", "download-2"]);
    }

    #[test]
    fn test_instance_keys_pairwise_distinct() {
        let currents = vec![
            current("hello", "abc", 1),
            current("hello_dev", "abc", 2),
            current("other", "xyz", 3),
        ];
        let actions = vec![
            SnapAction::new(ActionKind::Install, "new"),
            SnapAction::new(ActionKind::Download, "blob"),
            SnapAction::new(ActionKind::Refresh, "hello"),
            SnapAction::new(ActionKind::Refresh, "hello_dev"),
            SnapAction::new(ActionKind::Refresh, "other"),
        ];
        let opts = RefreshOptions {
            privacy_key: "salt".to_string(),
            ..Default::default()
        };
        let body = body_json(&currents, &actions, &opts);
        let mut keys: Vec<String> = body["actions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["instance-key"].as_str().unwrap().to_string())
            .collect();
        keys.sort();
        let before = keys.len();
        keys.dedup();
        assert_eq!(keys.len(), before);
    }

    #[test]
    fn test_refresh_key_matches_context_key() {
        let currents = vec![current("hello_dev", "abc", 2)];
        let actions = vec![SnapAction::new(ActionKind::Refresh, "hello_dev")];
        let opts = RefreshOptions {
            privacy_key: "salt".to_string(),
            ..Default::default()
        };
        let body = body_json(&currents, &actions, &opts);
        assert_eq!(
            body["context"][0]["instance-key"],
            body["actions"][0]["instance-key"]
        );
    }

    #[test]
    fn test_refresh_without_current_snap_rejected() {
        let actions = vec![SnapAction::new(ActionKind::Refresh, "ghost")];
        let err = build_action_request(&[], &actions, &RefreshOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_download_with_instance_suffix_rejected() {
        let actions = vec![SnapAction::new(ActionKind::Download, "hello_dev")];
        let err = build_action_request(&[], &actions, &RefreshOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_action_without_instance_name_rejected() {
        let actions = vec![SnapAction::new(ActionKind::Install, "")];
        let err = build_action_request(&[], &actions, &RefreshOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_request_names_all_snap_fields() {
        let body = body_json(&[current("hello", "abc", 1)], &[], &RefreshOptions::default());
        let fields = body["fields"].as_array().unwrap();
        assert_eq!(fields.len(), STORE_SNAP_FIELDS.len());
        assert!(fields.iter().any(|f| f == "snap-id"));
    }

    #[test]
    fn test_install_name_strips_instance_suffix() {
        // installs may carry an instance name; only the snap name goes out
        let actions = vec![SnapAction::new(ActionKind::Install, "hello_dev")];
        let body = body_json(&[], &actions, &RefreshOptions::default());
        assert_eq!(body["actions"][0]["name"], "hello");
    }
}
