//! # Kernel synchronization primitives
//!
//! A small spin mutex parameterized over its raw lock, plus an interrupt-safe
//! acquisition path ([`Mutex::lock_irq`]) for state that is also touched from
//! interrupt handlers (page-fault driven frame allocation, for example).
//!
//! ```
//! use kernel_sync::SpinMutex;
//!
//! static COUNTER: SpinMutex<u64> = SpinMutex::new(0);
//!
//! *COUNTER.lock_irq() += 1;
//! assert_eq!(COUNTER.with_lock(|v| *v), 1);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod mutex;
mod raw_spin;

pub use irq::{IrqGuard, IrqMutexGuard};
pub use mutex::{Mutex, MutexGuard};
pub use raw_spin::RawSpin;

pub type SpinMutex<T> = Mutex<T, RawSpin>;

impl<T> SpinMutex<T> {
    pub const fn new(value: T) -> Self {
        Self::from_raw(RawSpin::new(), value)
    }
}

pub trait RawLock {
    fn raw_lock(&self);
    fn raw_try_lock(&self) -> bool;
}

pub trait RawUnlock {
    /// # Safety
    /// The caller must currently hold the lock.
    unsafe fn raw_unlock(&self);
}
