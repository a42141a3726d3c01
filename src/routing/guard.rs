use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

use super::domain::PartnerId;

/// Per-partner mutual exclusion for the "evaluate quota, commit assignment,
/// deduct balance" sequence. Two evaluations for the same partner are
/// serialized; unrelated partners never block each other.
///
/// Acquisition hands out an RAII [`PartnerGuard`] whose `Drop` releases the
/// slot on every exit path, including unwinding, so a crashed holder cannot
/// starve later requests.
#[derive(Debug, Default)]
pub struct PartnerLocks {
    held: Mutex<HashSet<PartnerId>>,
    released: Condvar,
}

impl PartnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until no other evaluation holds this partner, then claim it.
    pub fn lock(&self, partner_id: &PartnerId) -> PartnerGuard<'_> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while held.contains(partner_id) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(partner_id.clone());

        PartnerGuard {
            locks: self,
            partner_id: partner_id.clone(),
        }
    }

    fn release(&self, partner_id: &PartnerId) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.remove(partner_id);
        self.released.notify_all();
    }
}

/// Exclusive claim on one partner id, released on drop.
#[derive(Debug)]
pub struct PartnerGuard<'a> {
    locks: &'a PartnerLocks,
    partner_id: PartnerId,
}

impl Drop for PartnerGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.partner_id);
    }
}
