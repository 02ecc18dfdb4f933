//! Single-slot handoff of immutable values between threads.
//!
//! Writers build a complete value and swap the `Arc` in; readers clone the
//! `Arc` they find. The lock is only ever held for the pointer swap or clone.

use std::sync::{Arc, Mutex, TryLockError};

pub struct Snapshot<T: ?Sized> {
    slot: Mutex<Arc<T>>,
}

impl<T: ?Sized> Snapshot<T> {
    pub fn new(value: Arc<T>) -> Self {
        Self {
            slot: Mutex::new(value),
        }
    }

    /// Replace the current value, waiting for the slot if a reader holds it.
    pub fn store(&self, value: Arc<T>) {
        match self.slot.lock() {
            Ok(mut slot) => *slot = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    /// Replace the current value only if the slot is free right now.
    ///
    /// Used from the audio callback, which must not wait. Returns `false`
    /// when the value was dropped.
    pub fn try_store(&self, value: Arc<T>) -> bool {
        match self.slot.try_lock() {
            Ok(mut slot) => {
                *slot = value;
                true
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                *poisoned.into_inner() = value;
                true
            }
            Err(TryLockError::WouldBlock) => false,
        }
    }

    /// The most recently stored value.
    pub fn load(&self) -> Arc<T> {
        match self.slot.lock() {
            Ok(slot) => Arc::clone(&slot),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    #[cfg(test)]
    pub(super) fn slot_for_tests(&self) -> std::sync::MutexGuard<'_, Arc<T>> {
        self.slot.lock().unwrap()
    }
}

/// Latest amplitude vector, shared between the audio callback and the UI.
pub type SpectrumHandle = Arc<Snapshot<[f32]>>;

/// A zeroed amplitude vector for an FFT of `fft_size`.
pub fn silent_spectrum(fft_size: usize) -> Arc<[f32]> {
    vec![0.0; fft_size / 2].into()
}
