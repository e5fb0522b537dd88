//! User service - admin provisioning and acting identity
//!
//! Provisioning is an explicit step (`caixa admin provision`), never a side
//! effect of importing or opening the database.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::{Actor, AuditAction, AuditEntry, User, UserRole};

/// Argon2id parameters for stored password hashes
const TIME_COST: u32 = 2;
const MEMORY_COST: u32 = 19456; // 19 MiB
const PARALLELISM: u32 = 1;
const HASH_LEN: usize = 32;
const SALT_LEN: usize = 16;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionOutcome {
    pub user: User,
    pub created: bool,
    /// Existing user promoted to admin or reactivated
    pub updated: bool,
}

pub struct UserService {
    repository: Arc<DuckDbRepository>,
}

impl UserService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Ensure an active admin with this email exists
    ///
    /// Creates the user when absent. An existing user is promoted and
    /// reactivated if needed; their password is left unchanged.
    pub fn provision_admin(&self, name: &str, email: &str, password: &str, actor: &Actor) -> Result<ProvisionOutcome> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(Error::validation(format!("invalid email: {}", email)).into());
        }

        if let Some(existing) = self.repository.get_user_by_email(&email)? {
            if existing.role == UserRole::Admin && existing.active {
                return Ok(ProvisionOutcome {
                    user: existing,
                    created: false,
                    updated: false,
                });
            }

            self.repository.update_user_access(&email, UserRole::Admin, true)?;
            self.repository.append_audit_entry(&AuditEntry::new(
                actor,
                AuditAction::ProvisionAdmin,
                format!("{} promoted to admin", email),
            ))?;
            let user = self
                .repository
                .get_user_by_email(&email)?
                .ok_or_else(|| Error::not_found(format!("user {}", email)))?;
            return Ok(ProvisionOutcome {
                user,
                created: false,
                updated: true,
            });
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("name cannot be empty").into());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(format!("password must have at least {} characters", MIN_PASSWORD_LEN)).into());
        }

        let salt: [u8; SALT_LEN] = rand::thread_rng().gen();
        let hash = hash_password(password, &salt)?;
        let user = User::new(Uuid::new_v4().to_string(), name, email.as_str(), UserRole::Admin);

        self.repository
            .insert_user(&user, &hash, &base64::engine::general_purpose::STANDARD.encode(salt))
            .context("Failed to create admin user")?;
        self.repository.append_audit_entry(&AuditEntry::new(
            actor,
            AuditAction::ProvisionAdmin,
            format!("{} created as admin", user.email),
        ))?;

        Ok(ProvisionOutcome {
            user,
            created: true,
            updated: false,
        })
    }

    pub fn verify_password(&self, email: &str, password: &str) -> Result<bool> {
        let Some((stored_hash, salt_b64)) = self.repository.get_user_credentials(email)? else {
            return Ok(false);
        };
        let salt = base64::engine::general_purpose::STANDARD
            .decode(salt_b64)
            .context("Invalid stored password salt")?;
        Ok(hash_password(password, &salt)? == stored_hash)
    }

    pub fn list(&self) -> Result<Vec<User>> {
        self.repository.list_users()
    }

    /// Identity for audit entries
    ///
    /// No email gives the unattributed system actor; an email must belong to
    /// an active user.
    pub fn resolve_actor(&self, email: Option<&str>) -> Result<Actor> {
        let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
            return Ok(Actor::system());
        };
        let user = self
            .repository
            .get_user_by_email(email)?
            .ok_or_else(|| Error::not_found(format!("user {}", email)))?;
        if !user.active {
            return Err(Error::forbidden(format!("user {} is inactive", user.email)).into());
        }
        Ok(Actor::from(&user))
    }
}

/// Hex-encoded Argon2id digest of `password` with `salt`
fn hash_password(password: &str, salt: &[u8]) -> Result<String> {
    let params = argon2::Params::new(MEMORY_COST, TIME_COST, PARALLELISM, Some(HASH_LEN))
        .map_err(|e| anyhow!("Failed to create argon2 params: {:?}", e))?;
    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut out = [0u8; HASH_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut out)
        .map_err(|e| anyhow!("Failed to hash password: {:?}", e))?;
    Ok(hex::encode(out))
}
