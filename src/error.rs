// src/error.rs

//! Crate-wide error and result types

use crate::store::SnapActionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the store client
#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied input was inconsistent, or client-side setup failed
    #[error("internal error: {0}")]
    Internal(String),

    /// Network-level failure talking to the store
    #[error("cannot communicate with the store: {0}")]
    Transport(String),

    /// The store answered with a status code other than 200
    #[error("cannot {operation}: got unexpected HTTP status code {status}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
    },

    /// The store answered 200 but the payload violates the protocol
    #[error("invalid store API result: {0}")]
    InvalidResponse(String),

    /// The call was cancelled through its cancel token
    #[error("request cancelled")]
    Cancelled,

    /// One or more actions failed; partial successes ride inside
    #[error(transparent)]
    SnapAction(#[from] SnapActionError),
}
