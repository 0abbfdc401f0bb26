//! Live game registry
//!
//! Maps a key (bet id, chat id) to a game behind its own mutex. Lookups go
//! through the concurrent map; the per-game mutex gives each game an
//! exclusive critical section without blocking unrelated games. No map shard
//! is held while a game is being built, so slow ledger writes during creation
//! never stall lookups of other games.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// How many generated ids are tried before giving up
const MAX_ID_ATTEMPTS: usize = 64;

pub type SharedGame<G> = Arc<Mutex<G>>;

/// Lock a game, recovering it if a previous holder panicked
pub fn lock_game<G>(game: &SharedGame<G>) -> MutexGuard<'_, G> {
    game.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Key {0} is already in use")]
    DuplicateKey(String),

    #[error("No free id after {0} attempts")]
    IdSpaceExhausted(usize),
}

/// Concurrent map from key to exclusively-locked game
#[derive(Debug)]
pub struct GameRegistry<K, G>
where
    K: Eq + Hash,
{
    games: DashMap<K, SharedGame<G>>,
    /// Fresh ids handed out but not yet filled with a game
    reserved: DashMap<K, ()>,
}

/// A fresh key held while its game is built; released on drop
struct Reservation<'a, K, G>
where
    K: Eq + Hash,
{
    registry: &'a GameRegistry<K, G>,
    key: K,
}

impl<K, G> Drop for Reservation<'_, K, G>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        self.registry.reserved.remove(&self.key);
    }
}

impl<K, G> GameRegistry<K, G>
where
    K: Eq + Hash + Clone + Display,
{
    pub fn new() -> Self {
        Self {
            games: DashMap::new(),
            reserved: DashMap::new(),
        }
    }

    /// Register `game` under `key`; fails if the key is taken or reserved
    pub fn insert(&self, key: K, game: G) -> Result<SharedGame<G>, RegistryError> {
        match self.games.entry(key) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateKey(entry.key().to_string())),
            Entry::Vacant(entry) if self.reserved.contains_key(entry.key()) => {
                Err(RegistryError::DuplicateKey(entry.key().to_string()))
            }
            Entry::Vacant(entry) => {
                let shared = Arc::new(Mutex::new(game));
                entry.insert(shared.clone());
                Ok(shared)
            }
        }
    }

    /// Register a game under a freshly generated key.
    ///
    /// `next_id` yields candidate keys; `None` marks a candidate the caller
    /// already knows is unusable and counts as a collision. The first vacant
    /// key is reserved, then `make` runs with no map lock held. Until the game
    /// is registered no other caller can claim the key, and if `make` fails
    /// the reservation is released and nothing is registered.
    pub fn insert_with_fresh_id<F, M, E>(
        &self,
        mut next_id: F,
        make: M,
    ) -> Result<(K, SharedGame<G>), E>
    where
        F: FnMut() -> Option<K>,
        M: FnOnce(&K) -> Result<G, E>,
        E: From<RegistryError>,
    {
        let reservation = (0..MAX_ID_ATTEMPTS)
            .find_map(|_| next_id().and_then(|key| self.reserve(key)))
            .ok_or(RegistryError::IdSpaceExhausted(MAX_ID_ATTEMPTS))?;

        let shared = Arc::new(Mutex::new(make(&reservation.key)?));
        let key = reservation.key.clone();
        // Reserved keys are never inserted by anyone else
        self.games.insert(key.clone(), shared.clone());
        drop(reservation);
        Ok((key, shared))
    }

    fn reserve(&self, key: K) -> Option<Reservation<'_, K, G>> {
        match self.reserved.entry(key.clone()) {
            Entry::Occupied(_) => return None,
            Entry::Vacant(entry) => {
                entry.insert(());
            }
        }
        // Built before the check so an early return releases the key
        let reservation = Reservation { registry: self, key };
        if self.games.contains_key(&reservation.key) {
            return None;
        }
        Some(reservation)
    }

    pub fn get(&self, key: &K) -> Option<SharedGame<G>> {
        self.games.get(key).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, key: &K) -> Option<SharedGame<G>> {
        self.games.remove(key).map(|(_, game)| game)
    }

    /// Remove `key` only while it still maps to `game`.
    ///
    /// Lets a caller retire the game it holds without touching a newer game
    /// registered under the same key in the meantime.
    pub fn remove_game(&self, key: &K, game: &SharedGame<G>) -> bool {
        self.games
            .remove_if(key, |_, current| Arc::ptr_eq(current, game))
            .is_some()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.games.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn keys(&self) -> Vec<K> {
        self.games.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Run `f` with exclusive access to the game under `key`.
    ///
    /// The map shard is released before the game lock is taken.
    pub fn with<R>(&self, key: &K, f: impl FnOnce(&mut G) -> R) -> Option<R> {
        let shared = self.get(key)?;
        let mut game = lock_game(&shared);
        Some(f(&mut game))
    }

    /// Clone out every game for which `keep` returns a value
    pub fn collect<R>(&self, mut keep: impl FnMut(&G) -> Option<R>) -> Vec<R> {
        let shared: Vec<SharedGame<G>> = self.games.iter().map(|e| e.value().clone()).collect();
        shared
            .iter()
            .filter_map(|game| keep(&lock_game(game)))
            .collect()
    }
}

impl<K, G> Default for GameRegistry<K, G>
where
    K: Eq + Hash + Clone + Display,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_rejects_duplicate_key() {
        let registry: GameRegistry<String, u32> = GameRegistry::new();
        registry.insert("A".to_string(), 1).unwrap();
        assert_eq!(
            registry.insert("A".to_string(), 2).unwrap_err(),
            RegistryError::DuplicateKey("A".to_string())
        );
        assert_eq!(registry.with(&"A".to_string(), |g| *g), Some(1));
    }

    #[test]
    fn test_fresh_id_skips_taken_keys() {
        let registry: GameRegistry<String, u32> = GameRegistry::new();
        registry.insert("AAA".to_string(), 0).unwrap();

        let mut candidates = vec!["BBB", "AAA"];
        let (key, _) = registry
            .insert_with_fresh_id::<_, _, RegistryError>(
                || Some(candidates.pop().unwrap_or("CCC").to_string()),
                |key| Ok(key.len() as u32),
            )
            .unwrap();

        assert_eq!(key, "BBB");
        assert_eq!(registry.len(), 2);
        assert!(registry.reserved.is_empty());
    }

    #[test]
    fn test_rejected_candidates_count_as_collisions() {
        let registry: GameRegistry<String, u32> = GameRegistry::new();
        let mut draws = 0;
        let result: Result<_, RegistryError> = registry.insert_with_fresh_id(
            || {
                draws += 1;
                None
            },
            |_| Ok(1),
        );
        assert_eq!(
            result.unwrap_err(),
            RegistryError::IdSpaceExhausted(MAX_ID_ATTEMPTS)
        );
        assert_eq!(draws, MAX_ID_ATTEMPTS);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reserved_key_is_invisible_and_unclaimable() {
        let registry: GameRegistry<String, u32> = GameRegistry::new();
        registry
            .insert_with_fresh_id::<_, _, RegistryError>(
                || Some("R".to_string()),
                |key| {
                    // Building the game happens outside any map lock
                    assert!(registry.get(key).is_none());
                    assert_eq!(
                        registry.insert(key.clone(), 9).unwrap_err(),
                        RegistryError::DuplicateKey("R".to_string())
                    );
                    let second: Result<_, RegistryError> =
                        registry.insert_with_fresh_id(|| Some("R".to_string()), |_| Ok(7));
                    assert!(second.is_err());
                    Ok(1)
                },
            )
            .unwrap();
        assert_eq!(registry.with(&"R".to_string(), |g| *g), Some(1));
    }

    #[test]
    fn test_slow_build_does_not_block_other_lookups() {
        let registry: Arc<GameRegistry<u64, u32>> = Arc::new(GameRegistry::new());
        for key in 0..64 {
            registry.insert(key, 0).unwrap();
        }

        let building = Arc::new(std::sync::Barrier::new(2));
        let release = Arc::new(std::sync::Barrier::new(2));
        let builder = {
            let registry = registry.clone();
            let building = building.clone();
            let release = release.clone();
            std::thread::spawn(move || {
                registry
                    .insert_with_fresh_id::<_, _, RegistryError>(
                        || Some(1000),
                        |_| {
                            building.wait();
                            release.wait();
                            Ok(1)
                        },
                    )
                    .unwrap();
            })
        };

        // Every shard stays readable while the builder is parked
        building.wait();
        for key in 0..64 {
            assert_eq!(registry.with(&key, |g| *g), Some(0));
        }
        release.wait();
        builder.join().unwrap();
        assert_eq!(registry.len(), 65);
    }

    #[test]
    fn test_remove_game_spares_a_replacement() {
        let registry: GameRegistry<i64, u32> = GameRegistry::new();
        let old = registry.insert(5, 1).unwrap();
        registry.remove(&5);
        let new = registry.insert(5, 2).unwrap();

        assert!(!registry.remove_game(&5, &old));
        assert_eq!(registry.with(&5, |g| *g), Some(2));
        assert!(registry.remove_game(&5, &new));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failed_make_registers_nothing() {
        let registry: GameRegistry<String, u32> = GameRegistry::new();
        let result: Result<_, RegistryError> = registry.insert_with_fresh_id(
            || Some("X".to_string()),
            |_| Err(RegistryError::DuplicateKey("X".to_string())),
        );
        assert!(result.is_err());
        assert!(registry.is_empty());
        // The failed build released its reservation
        registry.insert("X".to_string(), 3).unwrap();
    }

    #[test]
    fn test_exhausted_id_space() {
        let registry: GameRegistry<String, u32> = GameRegistry::new();
        registry.insert("X".to_string(), 0).unwrap();
        let result: Result<_, RegistryError> =
            registry.insert_with_fresh_id(|| Some("X".to_string()), |_| Ok(1));
        assert_eq!(
            result.unwrap_err(),
            RegistryError::IdSpaceExhausted(MAX_ID_ATTEMPTS)
        );
    }

    #[test]
    fn test_with_mutates_in_place_and_remove() {
        let registry: GameRegistry<i64, Vec<u8>> = GameRegistry::new();
        registry.insert(10, Vec::new()).unwrap();
        registry.with(&10, |g| g.push(3));
        assert_eq!(registry.collect(|g| Some(g.len())), vec![1]);

        assert!(registry.remove(&10).is_some());
        assert!(registry.with(&10, |g| g.len()).is_none());
        assert!(!registry.contains(&10));
    }

    #[test]
    fn test_concurrent_updates_serialise_per_key() {
        let registry: Arc<GameRegistry<i64, u64>> = Arc::new(GameRegistry::new());
        registry.insert(1, 0).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        registry.with(&1, |count| *count += 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.with(&1, |count| *count), Some(8000));
    }
}
