// tests/common/mod.rs

//! Shared test utilities and helpers for the snap-action integration tests.

use serde_json::Value;
use snapstore::store::{JsonReply, RequestOptions, Transport};
use snapstore::{
    AuthRefreshNeed, AuthRefresher, CancelToken, CurrentSnap, Error, RefreshOptions, Result,
    Revision, Store, StoreConfig, UserAuth,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Transport that replays scripted replies and records every request.
pub struct MockTransport {
    replies: Mutex<VecDeque<JsonReply>>,
    requests: Mutex<Vec<RequestOptions>>,
}

impl MockTransport {
    pub fn new(replies: Vec<JsonReply>) -> Arc<Self> {
        Arc::new(MockTransport {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> RequestOptions {
        self.requests.lock().unwrap()[index].clone()
    }

    pub fn request_body(&self, index: usize) -> Value {
        serde_json::from_slice(&self.request(index).data).unwrap()
    }
}

impl Transport for MockTransport {
    fn request_json(
        &self,
        cancel: &CancelToken,
        opts: &RequestOptions,
        _user: Option<&UserAuth>,
    ) -> Result<JsonReply> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.requests.lock().unwrap().push(opts.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Transport("mock transport ran out of replies".to_string()))
    }
}

/// Auth refresher that records which axes it was asked to renew.
#[derive(Default)]
pub struct MockRefresher {
    pub calls: Mutex<Vec<AuthRefreshNeed>>,
}

impl AuthRefresher for MockRefresher {
    fn refresh(&self, _user: Option<&UserAuth>, need: AuthRefreshNeed) -> Result<()> {
        self.calls.lock().unwrap().push(need);
        Ok(())
    }
}

pub fn ok_reply(body: Value) -> JsonReply {
    JsonReply {
        status: 200,
        body,
        headers: Vec::new(),
    }
}

pub fn store_over(transport: Arc<MockTransport>) -> Store {
    Store::with_transport(StoreConfig::default(), transport)
}

pub fn current(name: &str, snap_id: &str, revision: i32) -> CurrentSnap {
    CurrentSnap {
        instance_name: name.to_string(),
        snap_id: snap_id.to_string(),
        revision: Revision::new(revision),
        ..Default::default()
    }
}

pub fn salted() -> RefreshOptions {
    RefreshOptions {
        privacy_key: "salt".to_string(),
        ..Default::default()
    }
}

/// Minimal wire snap the decoder accepts.
pub fn wire_snap(name: &str, snap_id: &str, revision: i32) -> Value {
    serde_json::json!({
        "name": name,
        "snap-id": snap_id,
        "revision": revision,
        "version": "1.0",
        "epoch": {"read": [0], "write": [0]},
        "download": {
            "url": format!("https://store.example.com/{name}_{revision}.snap"),
            "size": 1024,
            "sha3-384": "aabbcc",
        },
    })
}
