// storage/src/collection.rs

use std::marker::PhantomData;

use bincode::{
    config::{self, BigEndian, Configuration, Fixint},
    serde::{decode_from_slice, encode_to_vec},
};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};

use models::errors::{ClinicError, ClinicResult};
use models::Entity;

/// A row as it lives in the store: the record plus the version counter
/// the optimistic-concurrency check compares at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub version: u64,
    pub record: T,
}

/// Typed view over one sled tree. Keys are the big-endian surrogate id,
/// values are bincode envelopes.
pub struct Collection<T: Entity> {
    db: Db,
    tree: Tree,
    config: Configuration<BigEndian, Fixint>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Collection<T> {
    pub fn open(db: &Db) -> ClinicResult<Self> {
        let tree = db.open_tree(T::TREE)?;
        Ok(Self {
            db: db.clone(),
            tree,
            config: bincode_config(),
            _entity: PhantomData,
        })
    }

    /// Persists a new record under the next surrogate id. Ids start at 1;
    /// zero marks a record that has not been saved yet.
    pub async fn insert(&self, mut record: T) -> ClinicResult<T> {
        let id = self.db.generate_id()? + 1;
        record.set_id(id);
        self.write_new(record).await
    }

    /// Writes a fresh row for a record whose id is already assigned.
    pub(crate) async fn write_new(&self, record: T) -> ClinicResult<T> {
        let stored = Stored { version: 1, record };
        let bytes = encode_to_vec(&stored, self.config.clone())?;
        self.tree.insert(stored.record.id().to_be_bytes(), bytes)?;
        Ok(stored.record)
    }

    pub async fn get(&self, id: u64) -> ClinicResult<Option<Stored<T>>> {
        match self.tree.get(id.to_be_bytes())? {
            Some(bytes) => {
                let (stored, _) = decode_from_slice(&bytes, self.config.clone())?;
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }

    pub async fn contains(&self, id: u64) -> ClinicResult<bool> {
        Ok(self.tree.contains_key(id.to_be_bytes())?)
    }

    /// All rows, in key order. The store offers no other native ordering.
    pub async fn list(&self) -> ClinicResult<Vec<Stored<T>>> {
        let mut rows = Vec::new();
        for item in self.tree.iter() {
            let (_key, bytes) = item?;
            let (stored, _): (Stored<T>, usize) = decode_from_slice(&bytes, self.config.clone())?;
            rows.push(stored);
        }
        Ok(rows)
    }

    /// Replaces the row only if it still carries `expected_version`.
    /// A concurrent modification or removal surfaces as `Conflict`.
    pub async fn update(&self, expected_version: u64, record: T) -> ClinicResult<Stored<T>> {
        let key = record.id().to_be_bytes();
        let current = self.tree.get(key)?.ok_or(ClinicError::Conflict)?;
        let (stored, _): (Stored<T>, usize) = decode_from_slice(&current, self.config.clone())?;
        if stored.version != expected_version {
            return Err(ClinicError::Conflict);
        }
        let next = Stored {
            version: expected_version + 1,
            record,
        };
        let bytes = encode_to_vec(&next, self.config.clone())?;
        match self.tree.compare_and_swap(key, Some(current), Some(bytes))? {
            Ok(()) => Ok(next),
            Err(_) => Err(ClinicError::Conflict),
        }
    }

    /// Removes the row; an absent row is not an error.
    pub async fn remove(&self, id: u64) -> ClinicResult<bool> {
        Ok(self.tree.remove(id.to_be_bytes())?.is_some())
    }
}

/// Provides a standard bincode configuration.
pub(crate) fn bincode_config() -> Configuration<BigEndian, Fixint> {
    config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::Doctor;

    fn temp_db() -> Db {
        sled::Config::new()
            .temporary(true)
            .open()
            .expect("open temporary db")
    }

    fn doctor(name: &str) -> Doctor {
        Doctor {
            full_name: name.to_string(),
            specialty: "Orthodontics".to_string(),
            phone: Some("0722 111 222".to_string()),
            email: Some("doctor@clinic.local".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn should_return_created_record_by_id() {
        let db = temp_db();
        let doctors: Collection<Doctor> = Collection::open(&db).expect("open collection");

        let created = doctors.insert(doctor("Dr. Maria Enache")).await.expect("insert");
        assert_ne!(created.id, 0);

        let fetched = doctors.get(created.id).await.expect("get").expect("present");
        assert_eq!(fetched.version, 1);
        assert_eq!(fetched.record, created);
    }

    #[tokio::test]
    async fn should_report_missing_row_as_none() {
        let db = temp_db();
        let doctors: Collection<Doctor> = Collection::open(&db).expect("open collection");
        assert!(doctors.get(42).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn should_remove_a_row_once() {
        let db = temp_db();
        let doctors: Collection<Doctor> = Collection::open(&db).expect("open collection");

        let created = doctors.insert(doctor("Dr. Ion Vasile")).await.expect("insert");
        assert!(doctors.remove(created.id).await.expect("remove"));
        assert!(doctors.get(created.id).await.expect("get").is_none());
        assert!(!doctors.remove(created.id).await.expect("remove again"));
    }

    #[tokio::test]
    async fn should_bump_version_on_update() {
        let db = temp_db();
        let doctors: Collection<Doctor> = Collection::open(&db).expect("open collection");

        let mut created = doctors.insert(doctor("Dr. Ana Pop")).await.expect("insert");
        created.specialty = "Endodontics".to_string();

        let updated = doctors.update(1, created.clone()).await.expect("update");
        assert_eq!(updated.version, 2);

        let fetched = doctors.get(created.id).await.expect("get").expect("present");
        assert_eq!(fetched.record.specialty, "Endodontics");
    }

    #[tokio::test]
    async fn should_reject_update_with_stale_version() {
        let db = temp_db();
        let doctors: Collection<Doctor> = Collection::open(&db).expect("open collection");

        let created = doctors.insert(doctor("Dr. Ana Pop")).await.expect("insert");
        doctors.update(1, created.clone()).await.expect("first update");

        let err = doctors.update(1, created).await.unwrap_err();
        assert!(matches!(err, ClinicError::Conflict));
    }

    #[tokio::test]
    async fn should_list_rows_in_key_order() {
        let db = temp_db();
        let doctors: Collection<Doctor> = Collection::open(&db).expect("open collection");

        let a = doctors.insert(doctor("Dr. A")).await.expect("insert");
        let b = doctors.insert(doctor("Dr. B")).await.expect("insert");
        let c = doctors.insert(doctor("Dr. C")).await.expect("insert");

        let ids: Vec<u64> = doctors
            .list()
            .await
            .expect("list")
            .into_iter()
            .map(|s| s.record.id)
            .collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }
}
