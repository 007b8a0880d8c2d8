use std::collections::{hash_map, HashMap};
use std::sync::{Mutex, PoisonError};

use keyring::Entry;
use tracing::warn;

use super::{KeyValueStore, StorageError};

const SERVICE_NAME: &str = "crewznation";

/// Keeps each key as its own entry in the OS keychain.
///
/// Keychains have no transactions, so `set_many` remembers what each key
/// held before writing it and puts those values back when a later write
/// fails.
pub struct KeyringStore {
    service: String,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn with_entry<T>(
        &self,
        key: &str,
        f: impl FnOnce(&Entry) -> keyring::Result<T>,
    ) -> keyring::Result<T> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = match entries.entry(key.to_string()) {
            hash_map::Entry::Occupied(slot) => slot.into_mut(),
            hash_map::Entry::Vacant(slot) => slot.insert(Entry::new(&self.service, key)?),
        };
        f(entry)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(self.with_entry(key, |entry| entry.set_password(value))?)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.with_entry(key, |entry| entry.delete_credential()) {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Put back what each key held before, newest write first
    fn roll_back(&self, written: &[(&str, Option<String>)]) {
        for (key, previous) in written.iter().rev() {
            let restored = match previous {
                Some(value) => self.write(key, value),
                None => self.remove(key),
            };
            if let Err(e) = restored {
                warn!(key = %key, error = %e, "Failed to roll back keychain entry");
            }
        }
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.with_entry(key, |entry| entry.get_password()) {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut written: Vec<(&str, Option<String>)> = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let result = self.get(key).and_then(|previous| {
                self.write(key, value)?;
                Ok(previous)
            });
            match result {
                Ok(previous) => written.push((*key, previous)),
                Err(e) => {
                    self.roll_back(&written);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn multi_remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keyring::mock::MockCredential;

    use super::*;

    fn mock_store() -> KeyringStore {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        KeyringStore::new("crewznation-test")
    }

    /// Make the next keychain call for `key` fail
    fn fail_next_call(store: &KeyringStore, key: &str) {
        store
            .with_entry(key, |entry| {
                let credential: &MockCredential = entry
                    .get_credential()
                    .downcast_ref()
                    .expect("mock credential");
                credential.set_error(keyring::Error::PlatformFailure("credential too large".into()));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_set_get_remove() {
        let store = mock_store();
        store.set_many(&[("auth_token", "t1"), ("user_data", "{}")]).unwrap();
        assert_eq!(store.get("auth_token").unwrap().as_deref(), Some("t1"));

        store.multi_remove(&["auth_token", "user_data", "never_set"]).unwrap();
        assert_eq!(store.get("auth_token").unwrap(), None);
        assert_eq!(store.get("user_data").unwrap(), None);
    }

    #[test]
    fn test_failed_write_restores_previous_values() {
        let store = mock_store();
        store.set_many(&[("auth_token", "t1"), ("user_data", "u1")]).unwrap();

        fail_next_call(&store, "user_data");
        let result = store.set_many(&[("auth_token", "t2"), ("user_data", "u2")]);

        assert!(matches!(result, Err(StorageError::Keyring(_))));
        assert_eq!(store.get("auth_token").unwrap().as_deref(), Some("t1"));
        assert_eq!(store.get("user_data").unwrap().as_deref(), Some("u1"));
    }

    #[test]
    fn test_failed_first_write_leaves_nothing_behind() {
        let store = mock_store();

        fail_next_call(&store, "user_data");
        assert!(store.set_many(&[("auth_token", "t1"), ("user_data", "u1")]).is_err());

        assert_eq!(store.get("auth_token").unwrap(), None);
        assert_eq!(store.get("user_data").unwrap(), None);
    }
}
