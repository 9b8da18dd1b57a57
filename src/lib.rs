// src/lib.rs

//! Snap store client
//!
//! Client library for the store's transactional snap-action endpoint.
//! One call carries a description of the snaps a device currently runs
//! plus a batch of desired operations (install, refresh, download), and
//! comes back with per-snap results and per-snap errors.
//!
//! # Architecture
//!
//! - One POST per batch: installed snaps go out as context, operations as
//!   actions, correlated back through opaque instance keys
//! - Parallel-install instance names are hashed with a per-call salt and
//!   never reach the store in the clear
//! - Partial failure is first-class: successes and typed per-snap errors
//!   come back together
//! - Soft-expired authorizations are refreshed and the batch retried, at
//!   most twice

mod error;
pub mod snap;
pub mod store;

pub use error::{Error, Result};
pub use snap::{
    instance_snap, split_instance_name, DeltaInfo, DownloadInfo, Epoch, MediaInfo, Revision,
    SnapInfo, StoreAccount,
};
pub use store::{
    ActionKind, AuthRefreshNeed, AuthRefresher, CancelToken, CurrencySink, CurrentSnap,
    RefreshOptions, SnapAction, SnapActionError, SnapActionResult, SnapRelease, Store,
    StoreConfig, StoreError, UserAuth, ValidationFlag,
};
