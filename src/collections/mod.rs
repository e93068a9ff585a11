//! Concurrent collections backing the import pipeline.

pub mod bitset;
pub mod sparse_array;

pub use bitset::AtomicBitSet;
pub use sparse_array::{DrainingBatch, DrainingIterator, SparseArray, SparseArrayBuilder};

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Poisoned locks are recovered. Every critical section guarded by these
// is a single insert or slot write.

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
