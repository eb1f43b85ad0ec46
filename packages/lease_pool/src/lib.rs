#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-capacity pool of reusable, expensive-to-construct objects shared by many threads.
//!
//! This crate provides [`Pool`], which owns a fixed number of objects (e.g. database
//! connections) created up front. Threads lease one object at a time with exclusive access and
//! give it back when done. If every object is leased, a thread asking for one blocks until
//! another thread gives one back or the pool is shut down.
//!
//! This is part of the [Folo project](https://github.com/folo-rs/folo) that provides mechanisms for
//! high-performance hardware-aware programming in Rust.
//!
//! # Key Features
//!
//! - **Fixed capacity**: The number of objects is set when the pool is created and never changes
//! - **Stable slots**: Objects never move; each one keeps its [`SlotId`] for the pool's lifetime
//! - **Scoped leases**: [`Lease`] returns its object on drop, including on early return and
//!   unwinding, and cannot outlive the pool or be used after it is returned
//! - **Raw leases**: [`RawLease`] for code that needs to hold an object beyond a single scope
//! - **Blocking acquire with shutdown**: [`Pool::close()`] wakes every blocked acquirer with `None`
//! - **All-or-nothing initialization**: If any object fails to initialize, all are torn down and
//!   the pool stays closed
//!
//! # Pooled objects
//!
//! Objects in the pool implement [`Poolable`], which defines how an object is initialized from a
//! [`Config`] and how it is torn down. Construction of the objects themselves happens through
//! [`Default`] or a factory passed to [`PoolBuilder::build_with()`].
//!
//! # Example
//!
//! ```rust
//! use std::io;
//! use std::num::NonZero;
//! use std::thread;
//!
//! use lease_pool::{Config, Pool, Poolable};
//!
//! #[derive(Default)]
//! struct Connection {
//!     host: String,
//!     queries: usize,
//! }
//!
//! impl Poolable for Connection {
//!     type Error = io::Error;
//!
//!     fn initialize(&mut self, config: &Config) -> Result<(), Self::Error> {
//!         self.host = config
//!             .get("Host")
//!             .ok_or_else(|| io::Error::other("missing Host"))?
//!             .to_string();
//!         Ok(())
//!     }
//!
//!     fn teardown(&mut self) {
//!         self.host.clear();
//!     }
//! }
//!
//! let mut pool = Pool::<Connection>::with_capacity(NonZero::new(2).unwrap());
//! pool.init(Config::new().with("Host", "10.0.0.7")).unwrap();
//!
//! thread::scope(|s| {
//!     for _ in 0..10 {
//!         s.spawn(|| {
//!             // Blocks while both connections are leased by other threads.
//!             let mut connection = pool.acquire().expect("pool is open");
//!             assert_eq!(connection.host, "10.0.0.7");
//!             connection.queries += 1;
//!         });
//!     }
//! });
//!
//! assert_eq!(pool.free_count(), 2);
//!
//! // Tear down all connections. Dropping the pool would do the same.
//! pool.release_all();
//! assert!(pool.acquire().is_none());
//! ```
//!
//! # Shutdown
//!
//! [`Pool::close(true)`][Pool::close] makes every current and future acquire return `None`
//! without blocking. Leases that are already out stay valid and can still be returned.
//! [`Pool::close(false)`][Pool::close] reopens the pool. To decommission the pool entirely, use
//! [`Pool::release_all()`] or drop it.
//!
//! # Logging
//!
//! The pool emits [`tracing`](https://docs.rs/tracing) events: lifecycle changes and ignored
//! misuse (such as releasing a lease into the wrong pool) at debug level, individual acquire and
//! release operations at trace level.

mod builder;
mod config;
mod drop_policy;
mod error;
mod lease;
mod pool;
mod poolable;
mod raw_lease;
mod slots;
mod tracker;

pub use builder::*;
pub use config::*;
pub use drop_policy::*;
pub use error::*;
pub use lease::*;
pub use pool::*;
pub use poolable::*;
pub use raw_lease::*;
pub use slots::SlotId;
pub(crate) use slots::Slots;
pub(crate) use tracker::*;
