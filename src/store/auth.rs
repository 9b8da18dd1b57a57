// src/store/auth.rs

//! Store credentials and the refresh seam
//!
//! The client does not manage token storage or the refresh protocol; it
//! only carries a user's macaroon into the Authorization header and, when
//! the store signals a soft-expired authorisation, asks the configured
//! [`AuthRefresher`] to renew the named tokens.

use crate::error::Result;

/// A user's store authorization: root macaroon plus discharges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAuth {
    pub store_macaroon: String,
    pub store_discharges: Vec<String>,
}

impl UserAuth {
    pub fn new(store_macaroon: impl Into<String>, store_discharges: Vec<String>) -> Self {
        UserAuth {
            store_macaroon: store_macaroon.into(),
            store_discharges,
        }
    }

    pub fn has_store_macaroon(&self) -> bool {
        !self.store_macaroon.is_empty()
    }

    /// Render the macaroon-style Authorization header value
    pub fn authorization_header(&self) -> String {
        let mut header = format!("Macaroon root=\"{}\"", self.store_macaroon);
        for discharge in &self.store_discharges {
            header.push_str(&format!(", discharge=\"{discharge}\""));
        }
        header
    }
}

/// Which authorization axes the store asked to be renewed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthRefreshNeed {
    /// The user's session macaroon is soft-expired
    pub user: bool,
    /// The device identity token is soft-expired
    pub device: bool,
}

impl AuthRefreshNeed {
    pub fn needed(&self) -> bool {
        self.user || self.device
    }
}

/// Collaborator that renews soft-expired store authorizations.
///
/// Failures are treated as best-effort by the caller: they are logged and
/// the batch is retried regardless.
pub trait AuthRefresher: Send + Sync {
    fn refresh(&self, user: Option<&UserAuth>, need: AuthRefreshNeed) -> Result<()>;
}
