/// Determines what happens to leased slots when the pool is dropped.
///
/// Scoped [`Lease`][crate::Lease]s borrow the pool, so the pool can never be dropped while one of
/// them is alive. A [`RawLease`][crate::RawLease] does not borrow the pool, so it is possible for
/// the pool to be dropped while some slots are still held through raw leases. The drop policy
/// governs this case.
///
/// By default, the pool tears down every slot when it is dropped, leased or not.
///
/// # Examples
///
/// ```
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
/// // The drop policy is set at pool creation time.
/// let pool = Pool::<Connection>::builder()
///     .drop_policy(DropPolicy::MustNotTeardownLeased)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool tears down all slots when it is dropped, even ones still held through raw leases.
    /// This is the default.
    #[default]
    MayTeardownLeased,

    /// The pool will panic if any slot is still leased when it is dropped.
    ///
    /// This may be valuable if raw leases are handed to code that keeps using the pooled object
    /// through its pointer, and tearing the object down underneath that code would be a bug.
    MustNotTeardownLeased,
}
