use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::{Pool, Poolable, RawLease, SlotId};

/// Exclusive access to one pooled object, returned to the pool when dropped.
///
/// Obtained from [`Pool::acquire()`] or [`Pool::attach()`]. While the lease exists, no other
/// lease can refer to the same slot, and the pool cannot be re-initialized or torn down because
/// the lease borrows it.
///
/// The object is returned to the pool exactly once: when the lease is dropped, whether that
/// happens at the end of a scope, on an early return or during unwinding. Use
/// [`release()`][Self::release] to make the hand-back explicit, or
/// [`into_raw()`][Self::into_raw] to keep the slot past the current scope.
///
/// The lease cannot be copied or cloned, only moved, so there is never more than one owner.
///
/// # Example
///
/// ```rust
/// use lease_pool::{Config, Pool, Poolable};
///
/// #[derive(Default)]
/// struct Session {
///     queries: Vec<String>,
/// }
///
/// impl Poolable for Session {
///     type Error = std::convert::Infallible;
///
///     fn initialize(&mut self, _config: &Config) -> Result<(), Self::Error> {
///         Ok(())
///     }
///
///     fn teardown(&mut self) {
///         self.queries.clear();
///     }
/// }
///
/// let mut pool = Pool::<Session>::new();
/// pool.init_default().unwrap();
///
/// {
///     let mut session = pool.acquire().unwrap();
///     session.queries.push("SELECT 1".to_string());
///     assert_eq!(pool.busy_count(), 1);
/// }
///
/// // The lease went out of scope, so the session is back in the pool.
/// assert_eq!(pool.busy_count(), 0);
/// ```
///
/// # Thread safety
///
/// A lease can be sent to another thread if `T` is [`Send`] and shared between threads if `T`
/// is also [`Sync`], just like `&mut T`.
pub struct Lease<'pool, T: Poolable> {
    pool: &'pool Pool<T>,
    slot: SlotId,
    epoch: u64,
    ptr: NonNull<T>,
}

impl<'pool, T: Poolable> Lease<'pool, T> {
    pub(crate) fn new(pool: &'pool Pool<T>, slot: SlotId, epoch: u64, ptr: NonNull<T>) -> Self {
        Self {
            pool,
            slot,
            epoch,
            ptr,
        }
    }

    /// The slot this lease refers to.
    #[must_use]
    #[inline]
    pub fn id(&self) -> SlotId {
        self.slot
    }

    /// The pool the lease came from.
    #[must_use]
    #[inline]
    pub fn pool(&self) -> &'pool Pool<T> {
        self.pool
    }

    /// A pointer to the leased object.
    ///
    /// The pointer stays valid for as long as the pool exists, but the lease only guarantees
    /// exclusive access while it is alive.
    #[must_use]
    #[inline]
    pub fn as_ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// Returns the object to the pool.
    ///
    /// Equivalent to dropping the lease.
    pub fn release(self) {
        drop(self);
    }

    /// Detaches the lease from the borrow of the pool without returning the object.
    ///
    /// The slot stays leased until the returned [`RawLease`] is passed to [`Pool::release()`]
    /// or converted back with [`Pool::attach()`].
    #[must_use]
    pub fn into_raw(self) -> RawLease<T> {
        let raw = RawLease::new(self.pool.pool_id(), self.epoch, self.slot, self.ptr);

        // The lease only holds a reference and plain data, so forgetting it leaks nothing.
        mem::forget(self);

        raw
    }
}

impl<T: Poolable> Deref for Lease<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: The slot is marked busy on our behalf and no other lease can exist for it.
        // The pool is borrowed for our lifetime, so it cannot be torn down or moved.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: Poolable> DerefMut for Lease<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: See `deref()`. We have `&mut self`, so this is the only reference we hand out.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: Poolable> Drop for Lease<'_, T> {
    fn drop(&mut self) {
        self.pool.release_slot(self.slot, self.epoch);
    }
}

impl<T: Poolable> fmt::Debug for Lease<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("pool", &self.pool.name())
            .field("slot", &self.slot)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

// SAFETY: The lease behaves like `&mut T` plus a `&Pool<T>`. Moving it to another thread moves
// the exclusive access along with it, which is sound if `T: Send`; `&Pool<T>` is `Send` under
// the same condition because `Pool<T>: Sync` requires only `T: Send`.
unsafe impl<T: Poolable + Send> Send for Lease<'_, T> {}

// SAFETY: Through `&Lease` other threads can only obtain `&T` (requires `T: Sync`) and
// `&Pool<T>` (requires `T: Send`).
unsafe impl<T: Poolable + Send + Sync> Sync for Lease<'_, T> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::convert::Infallible;
    use std::num::NonZero;
    use std::panic::{self, AssertUnwindSafe};
    use std::thread;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::Config;

    #[derive(Debug, Default)]
    struct Value(i64);

    impl Poolable for Value {
        type Error = Infallible;

        fn initialize(&mut self, _config: &Config) -> Result<(), Self::Error> {
            self.0 = 0;
            Ok(())
        }

        fn teardown(&mut self) {
            self.0 = -2;
        }
    }

    #[derive(Debug, Default)]
    struct SendNotSync(Cell<u32>);

    impl Poolable for SendNotSync {
        type Error = Infallible;

        fn initialize(&mut self, _config: &Config) -> Result<(), Self::Error> {
            Ok(())
        }

        fn teardown(&mut self) {}
    }

    assert_impl_all!(Lease<'static, Value>: Send, Sync);
    assert_impl_all!(Lease<'static, SendNotSync>: Send);
    assert_not_impl_any!(Lease<'static, SendNotSync>: Sync);
    assert_not_impl_any!(Lease<'static, Value>: Clone, Copy);

    fn ready_pool(size: usize) -> Pool<Value> {
        let mut pool = Pool::with_capacity(NonZero::new(size).unwrap());
        pool.init_default().unwrap();
        pool
    }

    #[test]
    fn deref_reads_and_writes_pooled_object() {
        let pool = ready_pool(1);

        let mut lease = pool.acquire().unwrap();
        assert_eq!(lease.0, 0);

        lease.0 = 41;
        lease.0 += 1;
        assert_eq!((*lease).0, 42);

        // SAFETY: We hold the lease and do not use any reference to the object concurrently.
        assert_eq!(unsafe { lease.as_ptr().as_ref().0 }, 42);
    }

    #[test]
    fn drop_returns_slot() {
        let pool = ready_pool(1);

        let lease = pool.acquire().unwrap();
        assert_eq!(pool.free_count(), 0);

        drop(lease);
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.busy_count(), 0);
    }

    #[test]
    fn explicit_release_returns_slot() {
        let pool = ready_pool(1);

        pool.acquire().unwrap().release();

        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn early_return_releases() {
        fn use_and_bail(pool: &Pool<Value>) -> Option<i64> {
            let mut lease = pool.acquire()?;
            lease.0 = 13;

            if lease.0 > 10 {
                return None;
            }

            Some(lease.0)
        }

        let pool = ready_pool(1);

        assert_eq!(use_and_bail(&pool), None);
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.acquire().unwrap().0, 13);
    }

    #[test]
    fn unwinding_releases() {
        let pool = ready_pool(1);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut lease = pool.acquire().unwrap();
            lease.0 = 99;
            panic!("boom");
        }));

        assert!(result.is_err());
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.acquire().unwrap().0, 99);
    }

    #[test]
    fn moved_lease_releases_once() {
        let pool = ready_pool(2);

        let lease = pool.acquire().unwrap();
        let moved = lease;
        let holder = vec![moved];
        assert_eq!(pool.busy_count(), 1);

        drop(holder);
        assert_eq!(pool.busy_count(), 0);
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn into_raw_keeps_slot_busy() {
        let pool = ready_pool(1);

        let lease = pool.acquire().unwrap();
        let id = lease.id();
        let raw = lease.into_raw();

        assert_eq!(raw.id(), id);
        assert_eq!(pool.busy_count(), 1);

        pool.release(raw);
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn lease_can_cross_threads() {
        let pool = ready_pool(1);

        let mut lease = pool.acquire().unwrap();

        thread::scope(|s| {
            s.spawn(move || {
                lease.0 = 5;
            });
        });

        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.acquire().unwrap().0, 5);
    }

    #[test]
    fn pool_accessor_points_back() {
        let pool = ready_pool(1);

        let lease = pool.acquire().unwrap();

        assert!(std::ptr::eq(lease.pool(), &pool));
    }

    #[test]
    fn debug_output_mentions_slot() {
        let pool = ready_pool(1);

        let lease = pool.acquire().unwrap();

        assert!(format!("{lease:?}").contains("SlotId(0)"));
    }
}
