use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::num::NonZero;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::{
    Config, DropPolicy, Error, Lease, PoolBuilder, Poolable, RawLease, Result, SlotId, Slots,
    Tracker,
};

/// Global counter for generating unique pool IDs.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique pool ID.
fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A fixed-capacity pool of objects that threads lease one at a time.
///
/// The pool owns `size()` objects of type `T`, created up front. After [`init()`][Self::init]
/// has prepared every object, any thread holding a shared reference to the pool can
/// [`acquire()`][Self::acquire] one of them. The returned [`Lease`] grants exclusive access to
/// that object until the lease is dropped, at which point the object goes back to the pool. If
/// all objects are leased, `acquire()` blocks until one is returned or the pool is closed.
///
/// # Lifecycle
///
/// 1. A new pool is closed and its objects are not initialized.
/// 2. [`init()`][Self::init] initializes every object with the same [`Config`] and opens the
///    pool. If any object fails to initialize, all of them are torn down and the pool stays
///    closed.
/// 3. While open, threads acquire and release objects. [`close(true)`][Self::close] wakes all
///    blocked acquirers empty-handed and makes further acquires return `None` immediately;
///    [`close(false)`][Self::close] opens the pool again.
/// 4. [`release_all()`][Self::release_all] (or dropping the pool) closes the pool and tears
///    down every object.
///
/// `init()` and `release_all()` take `&mut self`, so they can never run while a [`Lease`]
/// exists.
///
/// # Fairness
///
/// There is no ordering among blocked acquirers. When a slot is released, every waiter is woken
/// and whichever gets the lock first takes the slot. Among free slots, the one with the lowest
/// [`SlotId`] is always handed out first.
///
/// # Example
///
/// ```rust
/// use std::thread;
///
/// use lease_pool::{Config, Pool, Poolable};
///
/// #[derive(Default)]
/// struct Counter {
///     uses: usize,
/// }
///
/// impl Poolable for Counter {
///     type Error = std::convert::Infallible;
///
///     fn initialize(&mut self, _config: &Config) -> Result<(), Self::Error> {
///         self.uses = 0;
///         Ok(())
///     }
///
///     fn teardown(&mut self) {}
/// }
///
/// let mut pool = Pool::<Counter>::new();
/// pool.init(Config::new()).unwrap();
///
/// thread::scope(|s| {
///     for _ in 0..20 {
///         s.spawn(|| {
///             let mut counter = pool.acquire().expect("pool is open");
///             counter.uses += 1;
///         });
///     }
/// });
///
/// let total: usize = (0..pool.size())
///     .map(|index| {
///         let counter = pool.raw(index).unwrap();
///         // SAFETY: All threads have finished, so nobody holds a lease.
///         unsafe { counter.as_ref().uses }
///     })
///     .sum();
/// assert_eq!(total, 20);
/// ```
pub struct Pool<T: Poolable> {
    /// Ensures raw leases can only be returned to the pool they came from.
    pool_id: u64,

    name: Cow<'static, str>,
    drop_policy: DropPolicy,

    /// The configuration passed to the most recent `init()`.
    config: Config,

    slots: Slots<T>,

    gate: Mutex<Gate>,

    /// Signaled whenever a slot becomes free or the shutdown flag changes.
    state_changed: Condvar,
}

/// Everything that acquire and release need to agree on, kept under one lock.
#[derive(Debug)]
struct Gate {
    tracker: Tracker,

    closed: bool,

    /// Whether the most recent `init()` succeeded and no teardown has happened since.
    ready: bool,

    /// Incremented by every teardown. Raw leases from an earlier epoch refer to a previous
    /// generation of the pool and are not accepted back.
    epoch: u64,
}

impl<T: Poolable> Pool<T> {
    pub(crate) fn new_inner(
        capacity: NonZero<usize>,
        name: Cow<'static, str>,
        drop_policy: DropPolicy,
        factory: impl FnMut(SlotId) -> T,
    ) -> Self {
        Self {
            pool_id: generate_pool_id(),
            name,
            drop_policy,
            config: Config::new(),
            slots: Slots::new_with(capacity, factory),
            gate: Mutex::new(Gate {
                tracker: Tracker::default(),
                closed: true,
                ready: false,
                epoch: 0,
            }),
            state_changed: Condvar::new(),
        }
    }

    /// Creates a pool with [`DEFAULT_CAPACITY`][crate::DEFAULT_CAPACITY] default-constructed
    /// objects.
    ///
    /// The pool is closed until [`init()`][Self::init] succeeds.
    #[must_use]
    pub fn new() -> Self
    where
        T: Default,
    {
        Self::builder().build()
    }

    /// Creates a pool with `capacity` default-constructed objects.
    ///
    /// The pool is closed until [`init()`][Self::init] succeeds.
    #[must_use]
    pub fn with_capacity(capacity: NonZero<usize>) -> Self
    where
        T: Default,
    {
        Self::builder().capacity(capacity).build()
    }

    /// Starts building a new [`Pool`].
    ///
    /// Use this when you want to customize the pool beyond the defaults.
    pub fn builder() -> PoolBuilder<T> {
        PoolBuilder::new()
    }

    /// The number of slots in the pool. Fixed for the lifetime of the pool.
    #[must_use]
    #[inline]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// The name the pool uses in log events.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The [drop policy][DropPolicy] the pool was built with.
    #[must_use]
    pub fn drop_policy(&self) -> DropPolicy {
        self.drop_policy
    }

    /// The configuration passed to the most recent [`init()`][Self::init].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Initializes every pooled object with `config` and opens the pool.
    ///
    /// The pool is first fully reset, as if by [`release_all()`][Self::release_all]. Then each
    /// object's [`Poolable::initialize()`] is called in slot order. If all succeed, every slot
    /// becomes available and the pool opens for acquisition.
    ///
    /// # Errors
    ///
    /// If any object fails to initialize, the remaining objects are not attempted, every object
    /// is torn down and the pool stays closed. The returned [`Error::Initialize`] names the slot
    /// that failed. A later successful `init()` is required before anything can be acquired.
    pub fn init(&mut self, config: Config) -> Result<()> {
        self.release_all();

        debug!(pool = %self.name, size = self.size(), "initializing pool");

        let failure = self.slots.iter_mut().find_map(|(slot, item)| {
            item.initialize(&config)
                .err()
                .map(|source| (slot, source))
        });

        self.config = config;

        if let Some((slot, source)) = failure {
            debug!(pool = %self.name, %slot, error = %source, "pooled object failed to initialize, rolling back");

            self.teardown_slots();

            return Err(Error::Initialize {
                slot,
                source: Box::new(source),
            });
        }

        let size = self.size();
        let gate = self.gate.get_mut();
        gate.tracker.fill(size);
        gate.ready = true;
        gate.closed = false;

        debug!(pool = %self.name, size, "pool initialized");

        Ok(())
    }

    /// Initializes every pooled object with an empty [`Config`] and opens the pool.
    ///
    /// # Errors
    ///
    /// See [`init()`][Self::init].
    pub fn init_default(&mut self) -> Result<()> {
        self.init(Config::new())
    }

    /// Closes the pool and tears down every pooled object.
    ///
    /// All slots are forgotten, whether they were free or leased, and every object's
    /// [`Poolable::teardown()`] is called. Raw leases obtained before this call are no longer
    /// accepted by [`release()`][Self::release] or [`attach()`][Self::attach].
    ///
    /// Calling this again, or on a pool that was never initialized, is harmless; the objects'
    /// teardown is simply invoked again.
    pub fn release_all(&mut self) {
        let gate = self.gate.get_mut();

        // The exclusive borrow means nobody can be waiting in acquire(), so there is nobody
        // to wake up here.
        gate.closed = true;
        gate.ready = false;
        gate.tracker.clear();
        gate.epoch = gate.epoch.wrapping_add(1);

        self.teardown_slots();

        debug!(pool = %self.name, "pool released");
    }

    fn teardown_slots(&mut self) {
        for (_, item) in self.slots.iter_mut() {
            item.teardown();
        }
    }

    /// Whether the most recent [`init()`][Self::init] succeeded and the pool has not been
    /// released since.
    ///
    /// A ready pool may still be temporarily closed via [`close(true)`][Self::close].
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.gate.lock().ready
    }

    /// Sets or clears the shutdown flag and wakes every thread blocked in
    /// [`acquire()`][Self::acquire].
    ///
    /// While closed, all acquire attempts return `None` without blocking, including those that
    /// were already blocked when the pool was closed. Releasing leases into a closed pool still
    /// works.
    ///
    /// Opening a pool that is not [ready][Self::is_ready] is ignored: it has no slots to hand
    /// out, so acquirers would block forever. Call [`init()`][Self::init] instead.
    pub fn close(&self, closed: bool) {
        let mut gate = self.gate.lock();

        if !closed && !gate.ready {
            debug!(pool = %self.name, "ignoring request to open a pool that is not initialized");
            return;
        }

        gate.closed = closed;
        self.state_changed.notify_all();

        debug!(pool = %self.name, closed, "pool shutdown flag changed");
    }

    /// Whether the pool is currently closed to acquisition.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.gate.lock().closed
    }

    /// Leases an object from the pool, blocking until one is available.
    ///
    /// Returns `None` if the pool is closed, either already when called or at any point while
    /// waiting. The object is returned to the pool when the [`Lease`] is dropped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::num::NonZero;
    ///
    /// use lease_pool::{Config, Pool, Poolable};
    ///
    /// #[derive(Default)]
    /// struct Buffer(Vec<u8>);
    ///
    /// impl Poolable for Buffer {
    ///     type Error = std::convert::Infallible;
    ///
    ///     fn initialize(&mut self, _config: &Config) -> Result<(), Self::Error> {
    ///         self.0.reserve(1024);
    ///         Ok(())
    ///     }
    ///
    ///     fn teardown(&mut self) {
    ///         self.0 = Vec::new();
    ///     }
    /// }
    ///
    /// let mut pool = Pool::<Buffer>::with_capacity(NonZero::new(2).unwrap());
    ///
    /// // Not initialized yet, so nothing can be acquired.
    /// assert!(pool.acquire().is_none());
    ///
    /// pool.init_default().unwrap();
    ///
    /// let mut buffer = pool.acquire().unwrap();
    /// buffer.0.extend_from_slice(b"hello");
    /// drop(buffer);
    ///
    /// // With no contention, the same slot comes back.
    /// assert_eq!(pool.acquire().unwrap().0, b"hello");
    /// ```
    #[must_use]
    pub fn acquire(&self) -> Option<Lease<'_, T>> {
        let (slot, epoch, ptr) = self.reserve()?;

        Some(Lease::new(self, slot, epoch, ptr))
    }

    /// Leases an object from the pool without tying the lease to a borrow of the pool.
    ///
    /// Blocks and fails exactly like [`acquire()`][Self::acquire]. The slot stays leased until
    /// the [`RawLease`] is passed to [`release()`][Self::release]. Dropping a raw lease without
    /// releasing it keeps the slot leased until the pool is torn down.
    #[must_use]
    pub fn acquire_raw(&self) -> Option<RawLease<T>> {
        let (slot, epoch, ptr) = self.reserve()?;

        Some(RawLease::new(self.pool_id, epoch, slot, ptr))
    }

    #[cfg_attr(test, mutants::skip)] // Mutations can turn this into an infinite wait.
    fn reserve(&self) -> Option<(SlotId, u64, NonNull<T>)> {
        let mut gate = self.gate.lock();

        loop {
            // The shutdown check and the reservation happen in the same critical section as
            // close(), so a slot is never taken out of the free set once the pool is closed.
            if gate.closed {
                trace!(pool = %self.name, "acquire found the pool closed");
                return None;
            }

            if let Some(slot) = gate.tracker.reserve() {
                let epoch = gate.epoch;
                drop(gate);

                let ptr = self
                    .slots
                    .ptr(slot)
                    .expect("tracker only ever holds IDs of slots that exist in storage");

                trace!(pool = %self.name, %slot, "slot acquired");
                return Some((slot, epoch, ptr));
            }

            self.state_changed.wait(&mut gate);
        }
    }

    /// Returns a raw lease's slot to the pool.
    ///
    /// This is a no-op if the lease came from a different pool, from before the most recent
    /// [`release_all()`][Self::release_all] or [`init()`][Self::init] of this pool, or if its
    /// slot is not currently leased. Such releases are logged at debug level but are not
    /// reported to the caller.
    pub fn release(&self, raw: RawLease<T>) {
        if raw.pool_id() != self.pool_id {
            debug!(pool = %self.name, slot = %raw.id(), "ignoring release of a lease that belongs to a different pool");
            return;
        }

        self.release_slot(raw.id(), raw.epoch());
    }

    pub(crate) fn release_slot(&self, slot: SlotId, epoch: u64) {
        let mut gate = self.gate.lock();

        if gate.epoch != epoch {
            debug!(pool = %self.name, %slot, "ignoring release of a lease from before the pool was reset");
            return;
        }

        if !gate.tracker.release(slot) {
            debug!(pool = %self.name, %slot, "ignoring release of a slot that is not leased");
            return;
        }

        self.state_changed.notify_all();

        trace!(pool = %self.name, %slot, "slot released");
    }

    /// Converts a [`RawLease`] from this pool back into a scoped [`Lease`].
    ///
    /// # Errors
    ///
    /// Returns the raw lease unchanged if it did not come from this pool, is from before the
    /// most recent reset of this pool, or its slot is not currently leased.
    pub fn attach(&self, raw: RawLease<T>) -> std::result::Result<Lease<'_, T>, RawLease<T>> {
        if raw.pool_id() != self.pool_id {
            return Err(raw);
        }

        {
            let gate = self.gate.lock();

            if gate.epoch != raw.epoch() || !gate.tracker.is_busy(raw.id()) {
                return Err(raw);
            }
        }

        Ok(Lease::new(self, raw.id(), raw.epoch(), raw.ptr()))
    }

    /// Returns a pointer to the object in a slot, bypassing the leasing protocol.
    ///
    /// Returns `None` if `index` is out of range or the pool is closed. The pool does not mark
    /// the slot as leased and does not prevent others from leasing it, so this is only meant for
    /// diagnostics. Dereferencing the pointer is only valid while nobody else is accessing the
    /// object, which the caller has to ensure by other means.
    #[must_use]
    pub fn raw(&self, index: usize) -> Option<NonNull<T>> {
        if self.is_closed() {
            debug!(pool = %self.name, index, "raw access refused because the pool is closed");
            return None;
        }

        let ptr = self.slots.ptr(SlotId::new(index));

        if ptr.is_none() {
            debug!(pool = %self.name, index, size = self.size(), "raw access out of range");
        }

        ptr
    }

    /// The number of slots that are currently available for leasing.
    ///
    /// The value may be outdated by the time it is returned if other threads use the pool.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.gate.lock().tracker.free_len()
    }

    /// The number of slots that are currently leased.
    ///
    /// The value may be outdated by the time it is returned if other threads use the pool.
    #[must_use]
    pub fn busy_count(&self) -> usize {
        self.gate.lock().tracker.busy_len()
    }

    /// Whether any slot is currently available for leasing.
    #[must_use]
    pub fn has_free(&self) -> bool {
        self.gate.lock().tracker.has_free()
    }
}

impl<T: Poolable + Default> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Poolable> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("pool_id", &self.pool_id)
            .field("name", &self.name)
            .field("size", &self.size())
            .field("drop_policy", &self.drop_policy)
            .field("gate", &*self.gate.lock())
            .finish_non_exhaustive()
    }
}

impl<T: Poolable> Drop for Pool<T> {
    fn drop(&mut self) {
        let leased = self.gate.get_mut().tracker.busy_len();

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if !thread::panicking() && matches!(self.drop_policy, DropPolicy::MustNotTeardownLeased) {
            assert!(
                leased == 0,
                "dropped a Pool with {leased} leased slots - this is forbidden by DropPolicy::MustNotTeardownLeased"
            );
        }

        self.release_all();
    }
}

// SAFETY: The only shared-access path to the pooled objects is through leases. The tracker,
// guarded by the mutex, hands each slot to at most one lease at a time, and `&mut self`
// methods that touch all slots cannot run while any `Lease` borrows the pool. This is the
// same contract as `Mutex<T>`, which is `Sync` whenever `T: Send`.
unsafe impl<T: Poolable + Send> Sync for Pool<T> {}
