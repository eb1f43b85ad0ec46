use crate::Config;

/// An object that can live in a [`Pool`][crate::Pool].
///
/// Pooled objects are created up front when the pool is created (typically via [`Default`]) and
/// are not usable until the pool is initialized. Initialization and teardown are the two points
/// in the object's life that the pool controls:
///
/// * [`initialize()`][Self::initialize] is called once per slot by
///   [`Pool::init()`][crate::Pool::init], with the same [`Config`] for every slot. This is where
///   a connection would connect, for example.
/// * [`teardown()`][Self::teardown] is called for every slot when the pool is torn down, when
///   initialization of any slot fails, and when the pool is dropped.
///
/// # Example
///
/// ```rust
/// use std::io;
///
/// use lease_pool::{Config, Poolable};
///
/// #[derive(Default)]
/// struct Connection {
///     endpoint: Option<String>,
/// }
///
/// impl Poolable for Connection {
///     type Error = io::Error;
///
///     fn initialize(&mut self, config: &Config) -> Result<(), Self::Error> {
///         let host = config
///             .get("Host")
///             .ok_or_else(|| io::Error::other("Host is required"))?;
///
///         self.endpoint = Some(host.to_string());
///         Ok(())
///     }
///
///     fn teardown(&mut self) {
///         self.endpoint = None;
///     }
/// }
/// ```
pub trait Poolable {
    /// The error reported when the object cannot be initialized.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Prepares the object for use.
    ///
    /// May be called again after [`teardown()`][Self::teardown], when the pool is re-initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be made ready for use. The pool responds by tearing
    /// down all of its slots and staying closed.
    fn initialize(&mut self, config: &Config) -> Result<(), Self::Error>;

    /// Releases whatever the object acquired in [`initialize()`][Self::initialize].
    ///
    /// Must not fail and must tolerate being called on an object that was never initialized,
    /// was only partially initialized or was already torn down.
    fn teardown(&mut self);
}
