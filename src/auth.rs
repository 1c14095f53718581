//! Identity provider boundary
//!
//! Authentication is delegated to an external identity provider. This module
//! defines the capability trait, the session handle the rest of the app
//! consumes, and an in-memory provider used by tests and the demo wiring.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// The authenticated identity for the current session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// External identity provider capability.
///
/// Implementations own credential handling entirely; the application only
/// ever sees the opaque [`Principal`] published on the watch channel.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Principal>;

    async fn register_with_password(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Principal>;

    /// Sign in through a federated provider (e.g. "google")
    async fn sign_in_with_federated(&self, provider: &str) -> Result<Principal>;

    async fn sign_out(&self) -> Result<()>;

    /// Watch the current principal; None means signed out
    fn watch_principal(&self) -> watch::Receiver<Option<Principal>>;
}

/// Cheap-to-clone handle over the provider's principal channel
#[derive(Clone)]
pub struct AuthSession {
    rx: watch::Receiver<Option<Principal>>,
}

impl AuthSession {
    pub fn new(rx: watch::Receiver<Option<Principal>>) -> Self {
        Self { rx }
    }

    pub fn current(&self) -> Option<Principal> {
        self.rx.borrow().clone()
    }

    /// The current principal, or AuthRequired when signed out
    pub fn require_principal(&self) -> Result<Principal> {
        self.current().ok_or(AppError::AuthRequired)
    }
}

struct RegisteredUser {
    uid: String,
    name: String,
    password: String,
}

/// In-memory identity provider.
///
/// Backs tests and local development; real deployments substitute the
/// managed provider behind the same trait.
pub struct LocalIdentityProvider {
    users: Mutex<HashMap<String, RegisteredUser>>,
    tx: watch::Sender<Option<Principal>>,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            users: Mutex::new(HashMap::new()),
            tx,
        }
    }

    pub fn session(&self) -> AuthSession {
        AuthSession::new(self.tx.subscribe())
    }
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Principal> {
        let users = self.users.lock().expect("auth registry poisoned");

        let user = users
            .get(email)
            .filter(|u| u.password == password)
            .ok_or_else(|| AppError::Unauthorized("invalid email or password".to_string()))?;

        let principal = Principal {
            id: user.uid.clone(),
            email: Some(email.to_string()),
            display_name: Some(user.name.clone()),
            photo_url: None,
        };
        drop(users);

        tracing::info!("Signed in: {}", principal.id);
        self.tx.send_replace(Some(principal.clone()));
        Ok(principal)
    }

    async fn register_with_password(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Principal> {
        let mut users = self.users.lock().expect("auth registry poisoned");

        if users.contains_key(email) {
            return Err(AppError::Validation(format!(
                "email already registered: {}",
                email
            )));
        }

        let uid = Uuid::new_v4().to_string();
        users.insert(
            email.to_string(),
            RegisteredUser {
                uid: uid.clone(),
                name: name.to_string(),
                password: password.to_string(),
            },
        );
        drop(users);

        let principal = Principal {
            id: uid,
            email: Some(email.to_string()),
            display_name: Some(name.to_string()),
            photo_url: None,
        };

        tracing::info!("Registered: {}", principal.id);
        self.tx.send_replace(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_in_with_federated(&self, provider: &str) -> Result<Principal> {
        let principal = Principal {
            id: Uuid::new_v4().to_string(),
            email: Some(format!("user@{}.local", provider)),
            display_name: Some(format!("{} user", provider)),
            photo_url: None,
        };

        tracing::info!("Federated sign-in via {}: {}", provider, principal.id);
        self.tx.send_replace(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_out(&self) -> Result<()> {
        tracing::info!("Signed out");
        self.tx.send_replace(None);
        Ok(())
    }

    fn watch_principal(&self) -> watch::Receiver<Option<Principal>> {
        self.tx.subscribe()
    }
}

/// Mirror the signed-in profile into the backend's relational store.
///
/// Called after every successful sign-in; the endpoint is idempotent per
/// uid, so repeat calls just return the existing record.
pub async fn mirror_profile(
    client: &reqwest::Client,
    base_url: &str,
    principal: &Principal,
) -> Result<()> {
    let body = serde_json::json!({
        "email": principal.email,
        "displayName": principal.display_name,
        "photoURL": principal.photo_url,
        "uid": principal.id,
    });

    let response = client
        .post(format!("{}/api/users", base_url))
        .json(&body)
        .send()
        .await?;

    if !response.status().is_success() {
        tracing::warn!("Profile mirror rejected: {}", response.status());
        return Err(AppError::Generic(format!(
            "profile mirror failed with status {}",
            response.status()
        )));
    }

    Ok(())
}

/// Drive profile mirroring from the principal channel: every sign-in that
/// publishes a principal triggers one [`mirror_profile`] call. Mirror
/// failures are logged and never interfere with the session itself.
///
/// Returns the driver task; dropping the provider side of the channel
/// ends it.
pub fn attach_profile_mirror(
    client: reqwest::Client,
    base_url: &str,
    mut principal_rx: watch::Receiver<Option<Principal>>,
) -> tokio::task::JoinHandle<()> {
    let base_url = base_url.trim_end_matches('/').to_string();

    tokio::spawn(async move {
        loop {
            let principal = principal_rx.borrow_and_update().clone();

            if let Some(principal) = principal {
                if let Err(err) = mirror_profile(&client, &base_url, &principal).await {
                    tracing::warn!("Profile mirror failed for {}: {}", principal.id, err);
                }
            }

            if principal_rx.changed().await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_then_sign_in() {
        let provider = LocalIdentityProvider::new();
        let session = provider.session();

        assert!(session.current().is_none());
        assert!(matches!(
            session.require_principal(),
            Err(AppError::AuthRequired)
        ));

        let registered = provider
            .register_with_password("Ada", "ada@example.com", "hunter2")
            .await
            .unwrap();

        assert_eq!(session.current().unwrap().id, registered.id);

        provider.sign_out().await.unwrap();
        assert!(session.current().is_none());

        let signed_in = provider
            .sign_in_with_password("ada@example.com", "hunter2")
            .await
            .unwrap();
        assert_eq!(signed_in.id, registered.id);
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let provider = LocalIdentityProvider::new();
        provider
            .register_with_password("Ada", "ada@example.com", "hunter2")
            .await
            .unwrap();
        provider.sign_out().await.unwrap();

        let result = provider
            .sign_in_with_password("ada@example.com", "wrong")
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));

        // Failed sign-in must not publish a principal
        assert!(provider.session().current().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let provider = LocalIdentityProvider::new();
        provider
            .register_with_password("Ada", "ada@example.com", "hunter2")
            .await
            .unwrap();

        let result = provider
            .register_with_password("Ada2", "ada@example.com", "other")
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
