use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::utils::crypto::encode_password;
use crate::utils::token::generate_password;

const PASSWORD_LENGTH: usize = 10;

/// Login identity handed back once at creation; the plain password is not stored.
#[derive(Debug, Clone)]
pub struct IssuedAccount {
    pub account_id: Uuid,
    pub login: String,
    pub password: String,
}

/// Owns candidate login identities.
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn create_account(&self, login: &str) -> Result<IssuedAccount>;

    async fn delete_account(&self, account_id: Uuid) -> Result<()>;
}

fn issue_credentials(login: &str) -> Result<(IssuedAccount, String)> {
    let password = generate_password(PASSWORD_LENGTH);
    let password_hash = encode_password(&password)
        .map_err(|e| Error::Internal(format!("Failed to encode password: {}", e)))?;
    let issued = IssuedAccount {
        account_id: Uuid::new_v4(),
        login: login.to_string(),
        password,
    };
    Ok((issued, password_hash))
}

#[derive(Clone)]
pub struct PgAccountService {
    pool: PgPool,
}

impl PgAccountService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountService for PgAccountService {
    async fn create_account(&self, login: &str) -> Result<IssuedAccount> {
        let (issued, password_hash) = issue_credentials(login)?;

        sqlx::query(r#"INSERT INTO accounts (id, login, password_hash, role) VALUES ($1, $2, $3, 'candidate')"#)
            .bind(issued.account_id)
            .bind(&issued.login)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    Error::Conflict(format!("Account {} already exists", login))
                }
                other => Error::from(other),
            })?;

        Ok(issued)
    }

    async fn delete_account(&self, account_id: Uuid) -> Result<()> {
        sqlx::query(r#"DELETE FROM accounts WHERE id = $1"#)
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Keeps login -> encoded password pairs in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAccountService {
    accounts: Arc<Mutex<HashMap<Uuid, (String, String)>>>,
}

impl InMemoryAccountService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, account_id: Uuid) -> bool {
        self.accounts
            .lock()
            .expect("account map mutex poisoned")
            .contains_key(&account_id)
    }

    pub fn password_hash(&self, account_id: Uuid) -> Option<String> {
        self.accounts
            .lock()
            .expect("account map mutex poisoned")
            .get(&account_id)
            .map(|(_, hash)| hash.clone())
    }
}

#[async_trait]
impl AccountService for InMemoryAccountService {
    async fn create_account(&self, login: &str) -> Result<IssuedAccount> {
        let (issued, password_hash) = issue_credentials(login)?;
        let mut accounts = self.accounts.lock().expect("account map mutex poisoned");
        if accounts.values().any(|(existing, _)| existing == login) {
            return Err(Error::Conflict(format!("Account {} already exists", login)));
        }
        accounts.insert(issued.account_id, (issued.login.clone(), password_hash));
        Ok(issued)
    }

    async fn delete_account(&self, account_id: Uuid) -> Result<()> {
        self.accounts
            .lock()
            .expect("account map mutex poisoned")
            .remove(&account_id);
        Ok(())
    }
}
