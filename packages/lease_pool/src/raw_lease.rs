use std::fmt;
use std::ptr::NonNull;

use crate::SlotId;

/// Exclusive claim on one pooled object that is not tied to a borrow of the pool.
///
/// Obtained from [`Pool::acquire_raw()`][crate::Pool::acquire_raw] or
/// [`Lease::into_raw()`][crate::Lease::into_raw]. The slot stays leased until the raw lease is
/// passed to [`Pool::release()`][crate::Pool::release]; simply dropping it keeps the slot leased
/// until the pool is torn down.
///
/// Since a raw lease does not borrow the pool, the pool can be re-initialized, torn down or
/// dropped while the raw lease still exists. The pool remembers which generation each raw lease
/// came from and ignores leases from an earlier generation or from another pool, so a stale
/// raw lease can never release a slot that now belongs to someone else.
///
/// The raw lease cannot be copied or cloned, so a slot cannot be released twice through it.
///
/// # Accessing the object
///
/// The object is reachable through [`ptr()`][Self::ptr]. Dereferencing the pointer is `unsafe`:
/// the caller must ensure the pool is still alive and has not been reset since the lease was
/// taken. For safe access, turn the raw lease back into a [`Lease`][crate::Lease] via
/// [`Pool::attach()`][crate::Pool::attach].
///
/// # Example
///
/// ```rust
/// use lease_pool::{Config, Pool, Poolable};
///
/// #[derive(Default)]
/// struct Slot(u32);
///
/// impl Poolable for Slot {
///     type Error = std::convert::Infallible;
///
///     fn initialize(&mut self, _config: &Config) -> Result<(), Self::Error> {
///         Ok(())
///     }
///
///     fn teardown(&mut self) {}
/// }
///
/// let mut pool = Pool::<Slot>::new();
/// pool.init_default().unwrap();
///
/// let raw = pool.acquire_raw().unwrap();
///
/// // SAFETY: The pool is alive, has not been reset and we hold the only lease on the slot.
/// unsafe { raw.ptr().as_mut().0 = 10 };
///
/// pool.release(raw);
/// assert_eq!(pool.busy_count(), 0);
/// ```
#[must_use = "dropping a raw lease keeps its slot leased; pass it to Pool::release() instead"]
pub struct RawLease<T> {
    pool_id: u64,
    epoch: u64,
    slot: SlotId,
    ptr: NonNull<T>,
}

impl<T> RawLease<T> {
    pub(crate) fn new(pool_id: u64, epoch: u64, slot: SlotId, ptr: NonNull<T>) -> Self {
        Self {
            pool_id,
            epoch,
            slot,
            ptr,
        }
    }

    /// The slot this lease refers to.
    #[must_use]
    #[inline]
    pub fn id(&self) -> SlotId {
        self.slot
    }

    /// A pointer to the leased object.
    ///
    /// The pointer is valid for as long as the pool that issued the lease exists. The holder of
    /// the raw lease has exclusive access to the object until the lease is released or the pool
    /// is reset.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl<T> fmt::Debug for RawLease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawLease")
            .field("pool_id", &self.pool_id)
            .field("epoch", &self.epoch)
            .field("slot", &self.slot)
            .field("ptr", &self.ptr)
            .finish()
    }
}

// SAFETY: The raw lease is a claim on exclusive access to a `T`. Handing that claim to another
// thread lets the other thread access the `T`, which requires `T: Send`.
unsafe impl<T: Send> Send for RawLease<T> {}

// SAFETY: A shared raw lease only exposes its identity and a pointer; any access through the
// pointer from multiple threads at once would at most be shared access, requiring `T: Sync`.
unsafe impl<T: Sync> Sync for RawLease<T> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::num::NonZero;
    use std::thread;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::{Config, Pool, Poolable};

    assert_impl_all!(RawLease<u64>: Send, Sync);
    assert_impl_all!(RawLease<Cell<u64>>: Send);
    assert_not_impl_any!(RawLease<Cell<u64>>: Sync);
    assert_not_impl_any!(RawLease<u64>: Clone, Copy);

    #[derive(Debug, Default)]
    struct Number(u64);

    impl Poolable for Number {
        type Error = std::convert::Infallible;

        fn initialize(&mut self, _config: &Config) -> Result<(), Self::Error> {
            Ok(())
        }

        fn teardown(&mut self) {}
    }

    #[test]
    fn raw_lease_released_from_another_thread() {
        let mut pool = Pool::<Number>::with_capacity(NonZero::new(1).unwrap());
        pool.init_default().unwrap();

        let raw = pool.acquire_raw().unwrap();

        thread::scope(|s| {
            s.spawn(|| {
                // SAFETY: The pool outlives the scope and we hold the only lease on the slot.
                unsafe { raw.ptr().as_mut().0 = 3 };
                pool.release(raw);
            });
        });

        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.acquire().unwrap().0, 3);
    }

    #[test]
    fn debug_output_mentions_identity() {
        let mut pool = Pool::<Number>::with_capacity(NonZero::new(1).unwrap());
        pool.init_default().unwrap();

        let raw = pool.acquire_raw().unwrap();
        let output = format!("{raw:?}");

        assert!(output.contains("SlotId(0)"));
        assert!(output.contains("epoch"));

        pool.release(raw);
    }
}
