use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::{DropPolicy, Pool, Poolable, SlotId};

/// Number of slots in a pool when the capacity is not specified.
pub const DEFAULT_CAPACITY: NonZero<usize> = NonZero::new(8).expect("8 is not zero");

const DEFAULT_NAME: &str = "lease_pool";

/// Builder for creating an instance of [`Pool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// [`Pool::new()`] creates a pool with [`DEFAULT_CAPACITY`] slots and default settings.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use lease_pool::{DropPolicy, Pool};
/// # use lease_pool::{Config, Poolable};
/// # #[derive(Default)]
/// # struct Connection;
/// # impl Poolable for Connection {
/// #     type Error = std::convert::Infallible;
/// #     fn initialize(&mut self, _: &Config) -> Result<(), Self::Error> { Ok(()) }
/// #     fn teardown(&mut self) {}
/// # }
///
/// let pool = Pool::<Connection>::builder()
///     .capacity(NonZero::new(4).unwrap())
///     .name("orders-db")
///     .drop_policy(DropPolicy::MustNotTeardownLeased)
///     .build();
///
/// assert_eq!(pool.size(), 4);
/// assert_eq!(pool.name(), "orders-db");
/// ```
#[must_use]
pub struct PoolBuilder<T> {
    capacity: NonZero<usize>,
    name: Cow<'static, str>,
    drop_policy: DropPolicy,

    _item: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for PoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("capacity", &self.capacity)
            .field("name", &self.name)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<T: Poolable> PoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            name: Cow::Borrowed(DEFAULT_NAME),
            drop_policy: DropPolicy::default(),
            _item: PhantomData,
        }
    }

    /// Sets the number of slots in the pool.
    ///
    /// The capacity is fixed for the lifetime of the pool. Defaults to [`DEFAULT_CAPACITY`].
    pub fn capacity(mut self, capacity: NonZero<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the name the pool uses to identify itself in log events.
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how to treat slots that are
    /// still leased when the pool is dropped.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool, creating each pooled object with [`Default`].
    ///
    /// The pool starts out closed; call [`Pool::init()`] before acquiring from it.
    #[must_use]
    pub fn build(self) -> Pool<T>
    where
        T: Default,
    {
        self.build_with(|_| T::default())
    }

    /// Builds the pool, creating each pooled object with the given factory.
    ///
    /// The factory is called once per slot, in slot order. It only constructs the objects; the
    /// pool still has to be initialized with [`Pool::init()`] before use.
    ///
    /// # Examples
    ///
    /// ```
    /// use lease_pool::{Pool, SlotId};
    /// # use lease_pool::{Config, Poolable};
    /// # struct Worker { label: String }
    /// # impl Poolable for Worker {
    /// #     type Error = std::convert::Infallible;
    /// #     fn initialize(&mut self, _: &Config) -> Result<(), Self::Error> { Ok(()) }
    /// #     fn teardown(&mut self) {}
    /// # }
    ///
    /// let pool = Pool::builder().build_with(|id: SlotId| Worker {
    ///     label: format!("worker-{}", id.index()),
    /// });
    ///
    /// assert_eq!(pool.size(), 8);
    /// ```
    #[must_use]
    pub fn build_with(self, factory: impl FnMut(SlotId) -> T) -> Pool<T> {
        Pool::new_inner(self.capacity, self.name, self.drop_policy, factory)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::convert::Infallible;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::Config;

    #[derive(Debug, Default)]
    struct Probe;

    impl Poolable for Probe {
        type Error = Infallible;

        fn initialize(&mut self, _config: &Config) -> Result<(), Self::Error> {
            Ok(())
        }

        fn teardown(&mut self) {}
    }

    assert_impl_all!(PoolBuilder<Probe>: Send, Sync);

    #[test]
    fn defaults() {
        let pool = PoolBuilder::<Probe>::new().build();

        assert_eq!(pool.size(), DEFAULT_CAPACITY.get());
        assert_eq!(pool.name(), DEFAULT_NAME);
        assert_eq!(pool.drop_policy(), DropPolicy::MayTeardownLeased);
    }

    #[test]
    fn overrides() {
        let pool = PoolBuilder::<Probe>::new()
            .capacity(NonZero::new(3).unwrap())
            .name(String::from("custom"))
            .drop_policy(DropPolicy::MustNotTeardownLeased)
            .build();

        assert_eq!(pool.size(), 3);
        assert_eq!(pool.name(), "custom");
        assert_eq!(pool.drop_policy(), DropPolicy::MustNotTeardownLeased);
    }

    #[test]
    fn build_with_calls_factory_per_slot() {
        let mut calls = 0;

        let pool = PoolBuilder::<Probe>::new()
            .capacity(NonZero::new(5).unwrap())
            .build_with(|_| {
                calls += 1;
                Probe
            });

        assert_eq!(calls, 5);
        assert_eq!(pool.size(), 5);
    }
}
