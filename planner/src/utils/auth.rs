use std::sync::Arc;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::SessionError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // User ID
    pub exp: usize,  // Expiration time
    #[serde(default)]
    pub email: Option<String>,
}

/// The signed-in user. Saved places are keyed by `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }

    /// Verifies an HS256 token and takes the user id from `sub`.
    pub fn from_token(token: &str, secret: &str) -> Result<Self, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        let data = decode::<Claims>(
            token.trim(),
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;

        Ok(Self {
            user_id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

/// Shared, observable "who is signed in" value. Clones share one channel.
#[derive(Clone)]
pub struct SessionContext {
    sender: Arc<watch::Sender<Option<Identity>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn signed_in(identity: Identity) -> Self {
        let context = Self::new();
        context.sign_in(identity);
        context
    }

    pub fn current(&self) -> Option<Identity> {
        self.sender.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.sender.borrow().is_some()
    }

    pub fn sign_in(&self, identity: Identity) {
        tracing::info!("Signed in as {}", identity.user_id);
        self.sender.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        if self.sender.send_replace(None).is_some() {
            tracing::info!("Signed out");
        }
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Change notifications for a `SessionContext`. Dropping it unsubscribes.
pub struct SessionSubscription {
    receiver: watch::Receiver<Option<Identity>>,
}

impl SessionSubscription {
    /// Waits for the next sign-in or sign-out and returns the new identity.
    pub async fn changed(&mut self) -> Result<Option<Identity>, SessionError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(self.receiver.borrow_and_update().clone())
    }
}
