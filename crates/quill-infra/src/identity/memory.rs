//! In-process identity provider for local development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use quill_core::ports::{
    IdentityError, IdentityProvider, IdentitySession, PasswordService, TokenService,
};

struct Account {
    local_id: String,
    password_hash: String,
}

/// Accounts kept in memory, answering with the same messages and response
/// shape as the hosted provider.
pub struct MemoryIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
}

impl MemoryIdentityProvider {
    pub fn new(passwords: Arc<dyn PasswordService>, tokens: Arc<dyn TokenService>) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            passwords,
            tokens,
        }
    }

    fn session(&self, local_id: &str, email: &str, kind: &str) -> Result<IdentitySession, IdentityError> {
        let id_token = self
            .tokens
            .generate_token(local_id, email)
            .map_err(|e| IdentityError::Internal(e.to_string()))?;

        let mut extra = Map::new();
        extra.insert(
            "kind".to_string(),
            Value::String(format!("identitytoolkit#{kind}")),
        );

        Ok(IdentitySession {
            local_id: local_id.to_string(),
            id_token,
            email: email.to_string(),
            refresh_token: uuid::Uuid::new_v4().simple().to_string(),
            expires_in: self.tokens.expiration_seconds().to_string(),
            extra,
        })
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError> {
        let key = normalize(email);
        if !key.contains('@') {
            return Err(IdentityError::Rejected("INVALID_EMAIL".to_string()));
        }
        // No strength policy here; only an absent password is refused.
        if password.is_empty() {
            return Err(IdentityError::Rejected("MISSING_PASSWORD".to_string()));
        }

        let password_hash = self
            .passwords
            .hash(password)
            .map_err(|e| IdentityError::Internal(e.to_string()))?;

        let local_id = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&key) {
                return Err(IdentityError::Rejected("EMAIL_EXISTS".to_string()));
            }
            let local_id = uuid::Uuid::new_v4().simple().to_string();
            accounts.insert(
                key.clone(),
                Account {
                    local_id: local_id.clone(),
                    password_hash,
                },
            );
            local_id
        };

        tracing::debug!(local_id = %local_id, "Local account created");
        self.session(&local_id, &key, "SignupNewUserResponse")
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError> {
        let key = normalize(email);
        let (local_id, hash) = {
            let accounts = self.accounts.read().await;
            match accounts.get(&key) {
                Some(account) => (account.local_id.clone(), account.password_hash.clone()),
                None => {
                    return Err(IdentityError::Rejected(
                        "INVALID_LOGIN_CREDENTIALS".to_string(),
                    ));
                }
            }
        };

        let valid = self
            .passwords
            .verify(password, &hash)
            .map_err(|e| IdentityError::Internal(e.to_string()))?;
        if !valid {
            return Err(IdentityError::Rejected(
                "INVALID_LOGIN_CREDENTIALS".to_string(),
            ));
        }

        let mut session = self.session(&local_id, &key, "VerifyPasswordResponse")?;
        session
            .extra
            .insert("registered".to_string(), Value::Bool(true));
        Ok(session)
    }
}
