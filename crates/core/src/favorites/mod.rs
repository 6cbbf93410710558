//! Favorited resort identifiers with persistence and change notification.
//!
//! Every mutating call notifies listeners first, then updates the set, then
//! writes the set through the storage backend. Listeners therefore observe
//! the set as it was before the change.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the serialized favorites.
pub const SAVE_KEY: &str = "Favorites";

/// Failures encountered while loading or saving favorites.
///
/// None of these reach the end user: decode failures fall back to an empty
/// set and save failures are logged.
#[derive(Debug, Error)]
pub enum FavoritesError {
    /// Stored bytes are not a JSON array of strings.
    #[error("failed to decode favorites: {0}")]
    Decode(#[source] serde_json::Error),
    /// The set could not be serialized.
    #[error("failed to encode favorites: {0}")]
    Encode(#[source] serde_json::Error),
    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Kind of mutation about to happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The id is being added.
    Add,
    /// The id is being removed.
    Remove,
}

/// Notification delivered to listeners ahead of a mutation.
#[derive(Debug, Clone, Copy)]
pub struct FavoritesChange<'a> {
    /// What is about to happen.
    pub kind: ChangeKind,
    /// Resort identifier affected.
    pub id: &'a str,
    /// The set as it is before the mutation.
    pub current: &'a BTreeSet<String>,
}

impl FavoritesChange<'_> {
    /// Whether the id is a favorite before the mutation is applied.
    pub fn was_favorite(&self) -> bool {
        self.current.contains(self.id)
    }
}

/// Handle returned by [`FavoritesStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&FavoritesChange<'_>)>;

/// Owner of the persisted set of favorited resort identifiers.
pub struct FavoritesStore<S> {
    ids: BTreeSet<String>,
    storage: S,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    /// Restore favorites from `storage`.
    ///
    /// Missing, unreadable or corrupt data yields an empty set.
    pub fn load(storage: S) -> Self {
        let ids = match read_ids(&storage) {
            Ok(Some(ids)) => {
                debug!(total = ids.len(), "Favorites restored");
                ids
            }
            Ok(None) => BTreeSet::new(),
            Err(err) => {
                warn!(%err, "Discarding saved favorites");
                BTreeSet::new()
            }
        };

        Self {
            ids,
            storage,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Returns true if `id` is a favorite.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Mark `id` as a favorite, notifying listeners and saving.
    pub fn add(&mut self, id: &str) {
        self.notify(ChangeKind::Add, id);
        self.ids.insert(id.to_string());
        self.save();
    }

    /// Unmark `id`, notifying listeners and saving.
    pub fn remove(&mut self, id: &str) {
        self.notify(ChangeKind::Remove, id);
        self.ids.remove(id);
        self.save();
    }

    /// Flip membership of `id` and return whether it is now a favorite.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.contains(id) {
            self.remove(id);
            false
        } else {
            self.add(id);
            true
        }
    }

    /// Persist the current set, logging any failure.
    pub fn save(&self) {
        if let Err(err) = self.try_save() {
            warn!(%err, "Failed to save favorites");
        }
    }

    /// Persist the current set, returning any failure to the caller.
    pub fn try_save(&self) -> Result<(), FavoritesError> {
        let encoded = serde_json::to_vec(&self.ids).map_err(FavoritesError::Encode)?;
        self.storage.set(SAVE_KEY, &encoded)?;
        Ok(())
    }

    /// Register a listener invoked before every mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&FavoritesChange<'_>) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Drop a previously registered listener.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Number of favorites.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether there are no favorites.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Favorited identifiers in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Backend the store persists through.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn notify(&mut self, kind: ChangeKind, id: &str) {
        let change = FavoritesChange {
            kind,
            id,
            current: &self.ids,
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener(&change);
        }
    }
}

fn read_ids<S: KeyValueStore>(storage: &S) -> Result<Option<BTreeSet<String>>, FavoritesError> {
    let Some(bytes) = storage.get(SAVE_KEY)? else {
        return Ok(None);
    };
    let ids = serde_json::from_slice(&bytes).map_err(FavoritesError::Decode)?;
    Ok(Some(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use anyhow::Result;
    use std::{cell::RefCell, rc::Rc};
    use tempfile::tempdir;

    /// Backend recording every write into a shared log.
    struct RecordingStore {
        inner: MemoryStore,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl KeyValueStore for RecordingStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
            self.log
                .borrow_mut()
                .push(format!("persist {}", String::from_utf8_lossy(value)));
            self.inner.set(key, value)
        }
    }

    /// Backend whose writes always fail.
    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Ok(None)
        }

        fn set(&self, key: &str, _value: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::Write {
                path: key.into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        }
    }

    #[test]
    fn add_then_remove() {
        let storage = MemoryStore::new();
        let mut store = FavoritesStore::load(&storage);
        assert!(!store.contains("a"));

        store.add("a");
        assert!(store.contains("a"));

        store.remove("a");
        assert!(!store.contains("a"));
        assert!(store.is_empty());
    }

    #[test]
    fn add_and_remove_are_idempotent() {
        let storage = MemoryStore::new();
        let mut store = FavoritesStore::load(&storage);

        store.add("a");
        store.add("a");
        assert!(store.contains("a"));
        assert_eq!(store.len(), 1);

        store.remove("missing");
        assert!(!store.contains("missing"));
        assert_eq!(store.ids().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn notifies_then_mutates_then_persists() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let storage = RecordingStore {
            inner: MemoryStore::new(),
            log: Rc::clone(&log),
        };
        let mut store = FavoritesStore::load(storage);

        let listener_log = Rc::clone(&log);
        store.subscribe(move |change| {
            listener_log.borrow_mut().push(format!(
                "notify {:?} {} was_favorite={}",
                change.kind,
                change.id,
                change.was_favorite()
            ));
        });

        store.add("a");
        store.remove("a");

        assert_eq!(
            *log.borrow(),
            vec![
                "notify Add a was_favorite=false".to_string(),
                r#"persist ["a"]"#.to_string(),
                "notify Remove a was_favorite=true".to_string(),
                "persist []".to_string(),
            ]
        );
    }

    #[test]
    fn redundant_mutations_still_notify_and_save() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let storage = RecordingStore {
            inner: MemoryStore::new(),
            log: Rc::clone(&log),
        };
        let mut store = FavoritesStore::load(storage);
        let listener_log = Rc::clone(&log);
        store.subscribe(move |change| {
            listener_log
                .borrow_mut()
                .push(format!("notify {:?} {}", change.kind, change.id));
        });

        store.remove("ghost");
        assert_eq!(
            *log.borrow(),
            vec!["notify Remove ghost".to_string(), "persist []".to_string()]
        );
    }

    #[test]
    fn unsubscribed_listeners_are_silent() {
        let storage = MemoryStore::new();
        let mut store = FavoritesStore::load(&storage);
        let hits = Rc::new(RefCell::new(0));

        let counter = Rc::clone(&hits);
        let first = store.subscribe(move |_| *counter.borrow_mut() += 1);
        let counter = Rc::clone(&hits);
        store.subscribe(move |_| *counter.borrow_mut() += 10);

        store.add("a");
        assert_eq!(*hits.borrow(), 11);

        assert!(store.unsubscribe(first));
        assert!(!store.unsubscribe(first));
        store.add("b");
        assert_eq!(*hits.borrow(), 21);
    }

    #[test]
    fn save_round_trip() {
        let storage = MemoryStore::new();
        {
            let mut store = FavoritesStore::load(&storage);
            store.add("zermatt");
            store.add("aspen");
            store.add("stale-id-from-older-catalog");
        }

        let restored = FavoritesStore::load(&storage);
        assert_eq!(
            restored.ids().collect::<Vec<_>>(),
            vec!["aspen", "stale-id-from-older-catalog", "zermatt"]
        );
    }

    #[test]
    fn file_backed_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let mut store = FavoritesStore::load(FileStore::new(dir.path()));
        store.toggle("a");
        store.toggle("b");
        assert!(!store.toggle("a"));

        let restored = FavoritesStore::load(FileStore::new(dir.path()));
        assert_eq!(restored.ids().collect::<Vec<_>>(), vec!["b"]);
        Ok(())
    }

    #[test]
    fn corrupt_data_yields_empty_set() -> Result<()> {
        let storage = MemoryStore::new();
        storage.set(SAVE_KEY, b"{not json")?;
        let store = FavoritesStore::load(&storage);
        assert!(store.is_empty());

        storage.set(SAVE_KEY, b"[1, 2, 3]")?;
        let store = FavoritesStore::load(&storage);
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn save_failure_keeps_in_memory_state() {
        let mut store = FavoritesStore::load(FailingStore);
        store.add("a");
        assert!(store.contains("a"));
        assert!(matches!(store.try_save(), Err(FavoritesError::Storage(_))));
    }
}
