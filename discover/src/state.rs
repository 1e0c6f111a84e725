//! Local instance identity and mutable election flags, kept separate
//! from [`discover_types::Options`] because they are runtime state
//! (mutated by the check loop and by explicit promote/demote), not
//! configuration.

use std::sync::atomic::{AtomicBool, Ordering};

use discover_types::new_v4_id;

pub struct InstanceState {
    pub process_id: String,
    pub instance_id: String,
    is_master: AtomicBool,
    is_master_eligible: AtomicBool,
}

impl InstanceState {
    pub fn new(process_id: Option<String>) -> Self {
        Self {
            process_id: process_id.unwrap_or_else(new_v4_id),
            instance_id: new_v4_id(),
            is_master: AtomicBool::new(false),
            is_master_eligible: AtomicBool::new(true),
        }
    }

    pub fn is_master(&self) -> bool {
        self.is_master.load(Ordering::SeqCst)
    }

    pub fn is_master_eligible(&self) -> bool {
        self.is_master_eligible.load(Ordering::SeqCst)
    }

    pub fn set_master(&self, value: bool) {
        self.is_master.store(value, Ordering::SeqCst);
    }

    /// `promote()`: makes the instance master immediately and restores
    /// eligibility if a prior permanent demote had cleared it.
    pub fn promote(&self) {
        self.is_master_eligible.store(true, Ordering::SeqCst);
        self.is_master.store(true, Ordering::SeqCst);
    }

    /// `demote(permanent)`: steps down immediately; if `permanent`,
    /// also clears eligibility until the next explicit `promote()`.
    pub fn demote(&self, permanent: bool) {
        self.is_master.store(false, Ordering::SeqCst);
        if permanent {
            self.is_master_eligible.store(false, Ordering::SeqCst);
        }
    }

}
