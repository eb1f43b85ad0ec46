//! Shutting down a pool while threads are waiting for it:
//!
//! * Workers block because every slot is leased.
//! * `close(true)` wakes them all up with `None`.
//! * Leases that were already handed out still go back to the pool normally.

use std::convert::Infallible;
use std::num::NonZero;
use std::thread;
use std::time::Duration;

use lease_pool::{Config, Pool, Poolable};

#[derive(Debug, Default)]
struct Worker;

impl Poolable for Worker {
    type Error = Infallible;

    fn initialize(&mut self, _config: &Config) -> Result<(), Self::Error> {
        Ok(())
    }

    fn teardown(&mut self) {}
}

fn main() {
    let mut pool = Pool::<Worker>::with_capacity(NonZero::new(1).unwrap());
    pool.init_default().unwrap();

    let held = pool.acquire().unwrap();
    println!("Main thread holds slot {}", held.id());

    thread::scope(|s| {
        for index in 0..3 {
            let pool = &pool;
            s.spawn(move || match pool.acquire() {
                Some(lease) => println!("Waiter {index} got slot {}", lease.id()),
                None => println!("Waiter {index} was turned away: the pool is closed"),
            });
        }

        // Give the waiters a moment to block before closing the pool.
        thread::sleep(Duration::from_millis(50));
        pool.close(true);
    });

    drop(held);
    println!(
        "After shutdown: {} free, {} leased",
        pool.free_count(),
        pool.busy_count()
    );
}
