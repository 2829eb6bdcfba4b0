//! Read-only shim over the external identity provider.
//!
//! The messaging layer never mutates identity; it only needs "who is signed
//! in right now" and a way to observe sign-in/sign-out. `sign_in`/`sign_out`
//! exist so tests and local mode can drive the observable.

use tokio::sync::watch;

use crate::models::UserRef;

/// Profile shape emitted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl UserProfile {
    /// The participant reference stored in directory entries.
    pub fn user_ref(&self) -> UserRef {
        UserRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Observable sign-in state. Cloning shares the same underlying channel.
#[derive(Clone)]
pub struct Session {
    tx: std::sync::Arc<watch::Sender<Option<UserProfile>>>,
}

impl Session {
    pub fn signed_out() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    pub fn signed_in(profile: UserProfile) -> Self {
        let (tx, _rx) = watch::channel(Some(profile));
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    pub fn sign_in(&self, profile: UserProfile) {
        self.tx.send_replace(Some(profile));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    /// Snapshot of the signed-in user, if any.
    pub fn current(&self) -> Option<UserProfile> {
        self.tx.borrow().clone()
    }

    /// Live view of sign-in/sign-out transitions.
    pub fn subscribe(&self) -> watch::Receiver<Option<UserProfile>> {
        self.tx.subscribe()
    }
}
