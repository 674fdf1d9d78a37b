//! Inventory ledger implementation

use chrono::Utc;
use common::error::{Error, Result};
use common::model::inventory::{
    ItemId, LocationId, Reservation, ReservationId, StockKey, StockLevel, StockSnapshot,
};
use tracing::{debug, error, info, warn};

use crate::config::InventoryConfig;
use crate::repository::StockStore;

/// How a reservation is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    /// Hold returns to availability
    Release,
    /// Stock leaves the location
    Commit,
}

/// Ledger of on-hand and reserved stock per (item, location)
///
/// Each key is locked independently. Single-key operations take only that
/// key's lock; `transfer` takes both keys' locks in [`StockKey`] order. Every
/// operation is all-or-nothing and keeps `0 <= reserved <= on_hand`.
pub struct InventoryLedger {
    config: InventoryConfig,
    store: StockStore,
}

impl Default for InventoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryLedger {
    /// Create a new ledger with the default configuration
    pub fn new() -> Self {
        Self::with_config(InventoryConfig::default())
    }

    /// Create a new ledger with a specific configuration
    pub fn with_config(config: InventoryConfig) -> Self {
        Self {
            config,
            store: StockStore::new(),
        }
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    fn check_reference(&self, reference: &str) -> Result<()> {
        if reference.len() > self.config.max_reference_len {
            return Err(Error::ValidationError(format!(
                "Reference longer than {} bytes",
                self.config.max_reference_len
            )));
        }
        Ok(())
    }

    fn check_positive(quantity: u64) -> Result<()> {
        if quantity == 0 {
            return Err(Error::InvalidQuantity("Quantity must be positive".to_string()));
        }
        Ok(())
    }

    fn audit(&self, operation: &str, key: &StockKey, quantity: impl std::fmt::Display, reason: &str) {
        if self.config.audit_logging {
            info!(
                target: "inventory_audit",
                operation,
                item = %key.item,
                location = %key.location,
                quantity = %quantity,
                reason,
                "stock mutation"
            );
        } else {
            debug!("{} {} x{} ({})", operation, key, quantity, reason);
        }
    }

    /// Increase on-hand stock
    pub fn receive_stock(
        &self,
        item: &ItemId,
        location: &LocationId,
        quantity: u64,
        reason: &str,
    ) -> Result<StockSnapshot> {
        Self::check_positive(quantity)?;
        self.check_reference(reason)?;

        let key = StockKey::new(item.clone(), location.clone());
        let (level, created) = self.store.level_or_create(&key);
        let outcome = {
            let mut level = level.lock();
            level.receive(quantity).map(|_| StockSnapshot::of(key.clone(), &level))
        };
        drop(level);

        match outcome {
            Ok(snapshot) => {
                self.audit("receive", &key, quantity, reason);
                Ok(snapshot)
            }
            Err(e) => {
                warn!("Receive of {} x{} rejected: {}", key, quantity, e);
                if created {
                    self.store.discard_if_empty(&key);
                }
                Err(e)
            }
        }
    }

    /// Hold available stock, returning the reservation id
    pub fn reserve(
        &self,
        item: &ItemId,
        location: &LocationId,
        quantity: u64,
        reference: &str,
    ) -> Result<ReservationId> {
        Self::check_positive(quantity)?;
        self.check_reference(reference)?;

        let key = StockKey::new(item.clone(), location.clone());
        let Some(level) = self.store.level(&key) else {
            warn!("Reserve of {} x{} rejected: nothing stocked", key, quantity);
            return Err(Error::InsufficientAvailable(format!(
                "Requested {} of {}, available 0",
                quantity, key
            )));
        };
        let mut level = level.lock();
        if let Err(e) = level.reserve(quantity) {
            warn!("Reserve of {} x{} rejected: {}", key, quantity, e);
            return Err(e);
        }

        let reservation = Reservation {
            id: ReservationId::random(),
            key,
            quantity,
            reference: reference.to_string(),
            created_at: Utc::now(),
        };
        let id = reservation.id;
        self.audit("reserve", &reservation.key, quantity, reference);
        self.store.insert_reservation(reservation);
        Ok(id)
    }

    /// Cancel a reservation, returning its quantity to availability
    pub fn release(&self, id: ReservationId, reason: &str) -> Result<Reservation> {
        self.resolve(id, Resolution::Release, reason)
    }

    /// Resolve a reservation by removing the held stock from on-hand
    pub fn commit(&self, id: ReservationId, reason: &str) -> Result<Reservation> {
        self.resolve(id, Resolution::Commit, reason)
    }

    fn resolve(&self, id: ReservationId, resolution: Resolution, reason: &str) -> Result<Reservation> {
        self.check_reference(reason)?;

        let key = self
            .store
            .get_reservation(&id)
            .map(|r| r.key)
            .ok_or_else(|| Error::ReservationNotFound(id.to_string()))?;
        let level = self.store.level(&key).ok_or_else(|| {
            Error::InternalConsistency(format!("Reservation {} has no stock entry {}", id, key))
        })?;
        let mut level = level.lock();

        // Taken under the key lock; a concurrent resolve of the same id loses here
        let reservation = self
            .store
            .take_reservation(&id)
            .ok_or_else(|| Error::ReservationNotFound(id.to_string()))?;

        let outcome = match resolution {
            Resolution::Release => level.release(reservation.quantity),
            Resolution::Commit => level.commit(reservation.quantity),
        };
        if let Err(e) = outcome {
            error!("{:?} of reservation {} on {} failed: {}", resolution, id, key, e);
            self.store.insert_reservation(reservation);
            return Err(e);
        }

        let operation = match resolution {
            Resolution::Release => "release",
            Resolution::Commit => "commit",
        };
        self.audit(operation, &key, reservation.quantity, reason);
        Ok(reservation)
    }

    /// Correct on-hand by a signed delta (shrinkage, found stock, cycle counts)
    pub fn adjust(
        &self,
        item: &ItemId,
        location: &LocationId,
        delta: i64,
        reason: &str,
    ) -> Result<StockSnapshot> {
        self.check_reference(reason)?;

        let key = StockKey::new(item.clone(), location.clone());
        let (level, created) = if delta > 0 {
            self.store.level_or_create(&key)
        } else {
            match self.store.level(&key) {
                Some(level) => (level, false),
                None if delta == 0 => return Ok(self.store.snapshot(&key)),
                None => {
                    return Err(Error::InvariantViolation(format!(
                        "Adjustment {} would make on-hand of {} negative",
                        delta, key
                    )))
                }
            }
        };
        let outcome = {
            let mut level = level.lock();
            level.adjust(delta).map(|_| StockSnapshot::of(key.clone(), &level))
        };
        drop(level);

        match outcome {
            Ok(snapshot) => {
                self.audit("adjust", &key, delta, reason);
                Ok(snapshot)
            }
            Err(e) => {
                warn!("Adjustment of {} by {} rejected: {}", key, delta, e);
                if created {
                    self.store.discard_if_empty(&key);
                }
                Err(e)
            }
        }
    }

    /// Move available stock between two locations as one atomic step
    ///
    /// Both entries are locked in [`StockKey`] order, so concurrent transfers
    /// in opposite directions cannot deadlock. Moving to the same location is
    /// a no-op.
    pub fn transfer(
        &self,
        item: &ItemId,
        from: &LocationId,
        to: &LocationId,
        quantity: u64,
        reason: &str,
    ) -> Result<()> {
        Self::check_positive(quantity)?;
        self.check_reference(reason)?;
        if from == to {
            debug!("Transfer of {} within {} ignored", item, from);
            return Ok(());
        }

        let source_key = StockKey::new(item.clone(), from.clone());
        let target_key = StockKey::new(item.clone(), to.clone());
        let source = self.store.level(&source_key).ok_or_else(|| {
            Error::InsufficientAvailable(format!(
                "Requested {} of {}, available 0",
                quantity, source_key
            ))
        })?;
        let (target, created) = self.store.level_or_create(&target_key);

        let outcome = {
            let (mut source, mut target) = if source_key < target_key {
                let source = source.lock();
                let target = target.lock();
                (source, target)
            } else {
                let target = target.lock();
                let source = source.lock();
                (source, target)
            };
            Self::move_stock(&mut source, &mut target, quantity)
        };
        drop(source);
        drop(target);

        if let Err(e) = outcome {
            warn!(
                "Transfer of {} x{} from {} to {} rejected: {}",
                item, quantity, from, to, e
            );
            // A failed transfer leaves no trace at the destination
            if created {
                self.store.discard_if_empty(&target_key);
            }
            return Err(e);
        }

        self.audit("transfer_out", &source_key, quantity, reason);
        self.audit("transfer_in", &target_key, quantity, reason);
        Ok(())
    }

    /// Validate both sides before touching either
    fn move_stock(
        source: &mut StockLevel,
        target: &mut StockLevel,
        quantity: u64,
    ) -> Result<()> {
        if source.available() < quantity {
            return Err(Error::InsufficientAvailable(format!(
                "Requested {}, available {}",
                quantity,
                source.available()
            )));
        }
        if target.on_hand().checked_add(quantity).is_none() {
            return Err(Error::InvalidQuantity(format!(
                "Destination overflow adding {}",
                quantity
            )));
        }
        source.withdraw_available(quantity)?;
        target.receive(quantity)
    }

    /// Current quantities for an item at a location
    pub fn get_stock(&self, item: &ItemId, location: &LocationId) -> StockSnapshot {
        self.store
            .snapshot(&StockKey::new(item.clone(), location.clone()))
    }

    /// Look up an outstanding reservation
    pub fn get_reservation(&self, id: ReservationId) -> Option<Reservation> {
        self.store.get_reservation(&id)
    }

    /// Outstanding reservations for an item at a location, oldest first
    pub fn outstanding_reservations(&self, item: &ItemId, location: &LocationId) -> Vec<Reservation> {
        self.store
            .reservations_for(&StockKey::new(item.clone(), location.clone()))
    }

    /// Snapshots of every stocked key, sorted by key
    pub fn stock_levels(&self) -> Vec<StockSnapshot> {
        self.store
            .keys()
            .iter()
            .map(|key| self.store.snapshot(key))
            .collect()
    }
}
