// storage/src/accounts.rs

use async_trait::async_trait;
use bincode::{
    config::{BigEndian, Configuration, Fixint},
    serde::{decode_from_slice, encode_to_vec},
};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};

use models::errors::ClinicResult;

use crate::collection::bincode_config;

/// A staff login as the identity store keeps it. Role names are the two
/// seeded roles, "Admin" and "Staff".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

#[async_trait]
pub trait AccountStorage: Send + Sync + 'static {
    /// Inserts or replaces an account keyed by username.
    async fn put_account(&self, account: &Account) -> ClinicResult<()>;
    /// Retrieves an account by username.
    async fn get_account(&self, username: &str) -> ClinicResult<Option<Account>>;
}

/// Sled-backed implementation of the `AccountStorage` trait.
pub struct SledAccountStorage {
    tree: Tree,
    config: Configuration<BigEndian, Fixint>,
}

impl SledAccountStorage {
    /// Opens the "accounts" tree on the given database.
    pub fn new(db: &Db) -> ClinicResult<Self> {
        let tree = db.open_tree("accounts")?;
        Ok(Self {
            tree,
            config: bincode_config(),
        })
    }
}

#[async_trait]
impl AccountStorage for SledAccountStorage {
    async fn put_account(&self, account: &Account) -> ClinicResult<()> {
        let bytes = encode_to_vec(account, self.config.clone())?;
        self.tree.insert(account.username.as_bytes(), bytes)?;
        Ok(())
    }

    async fn get_account(&self, username: &str) -> ClinicResult<Option<Account>> {
        match self.tree.get(username.as_bytes())? {
            Some(bytes) => {
                let (account, _): (Account, usize) = decode_from_slice(&bytes, self.config.clone())?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_round_trip_an_account() {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .expect("open temporary db");
        let accounts = SledAccountStorage::new(&db).expect("open accounts");

        let account = Account {
            username: "admin@clinic.local".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            roles: vec!["Admin".to_string()],
        };
        accounts.put_account(&account).await.expect("put");

        let fetched = accounts
            .get_account("admin@clinic.local")
            .await
            .expect("get")
            .expect("present");
        assert_eq!(fetched, account);
        assert!(accounts
            .get_account("nobody")
            .await
            .expect("get")
            .is_none());
    }
}
