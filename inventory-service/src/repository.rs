//! In-memory storage for stock levels and reservations

use std::sync::Arc;

use common::model::inventory::{Reservation, ReservationId, StockKey, StockLevel, StockSnapshot};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

/// Stock levels keyed by (item, location), each behind its own mutex, plus
/// the outstanding reservations
///
/// Callers clone the `Arc` out of the map before locking, so no map shard is
/// held while a stock mutex is taken.
#[derive(Debug, Default)]
pub struct StockStore {
    levels: DashMap<StockKey, Arc<Mutex<StockLevel>>>,
    reservations: DashMap<ReservationId, Reservation>,
}

impl StockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lockable level for a key, if it was ever stocked
    pub fn level(&self, key: &StockKey) -> Option<Arc<Mutex<StockLevel>>> {
        self.levels.get(key).map(|level| level.value().clone())
    }

    /// Get the lockable level for a key, creating an empty one if necessary
    ///
    /// The flag is true when this call created the entry.
    pub fn level_or_create(&self, key: &StockKey) -> (Arc<Mutex<StockLevel>>, bool) {
        match self.levels.entry(key.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => (entry.insert(Arc::default()).value().clone(), true),
        }
    }

    /// Drop an entry created by an operation that then failed
    ///
    /// Only removed while it is still all-zero and no caller holds it, so a
    /// concurrent operation that picked the entry up keeps its update.
    pub fn discard_if_empty(&self, key: &StockKey) -> bool {
        self.levels
            .remove_if(key, |_, level| {
                if Arc::strong_count(level) > 1 {
                    return false;
                }
                let level = level.lock();
                level.on_hand() == 0 && level.reserved() == 0
            })
            .is_some()
    }

    /// Copy of the current level; unknown keys read as zero
    pub fn snapshot(&self, key: &StockKey) -> StockSnapshot {
        match self.level(key) {
            Some(level) => {
                let level = level.lock();
                StockSnapshot::of(key.clone(), &level)
            }
            None => StockSnapshot::of(key.clone(), &StockLevel::default()),
        }
    }

    /// All stocked keys, sorted
    pub fn keys(&self) -> Vec<StockKey> {
        let mut keys: Vec<StockKey> = self.levels.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn insert_reservation(&self, reservation: Reservation) {
        self.reservations.insert(reservation.id, reservation);
    }

    /// Remove and return a reservation
    pub fn take_reservation(&self, id: &ReservationId) -> Option<Reservation> {
        self.reservations.remove(id).map(|(_, reservation)| reservation)
    }

    pub fn get_reservation(&self, id: &ReservationId) -> Option<Reservation> {
        self.reservations.get(id).map(|r| r.value().clone())
    }

    /// Outstanding reservations against a key, oldest first
    pub fn reservations_for(&self, key: &StockKey) -> Vec<Reservation> {
        let mut reservations: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|entry| entry.value().key == *key)
            .map(|entry| entry.value().clone())
            .collect();
        reservations.sort_by_key(|r| r.created_at);
        reservations
    }

    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }
}
