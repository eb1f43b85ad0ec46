//! A pool of (pretend) database connections shared by many threads:
//!
//! * Configuring the connections with a `Config`.
//! * Leasing a connection from 100 threads at once, with only 8 connections in the pool.
//! * Tearing the pool down at the end.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use lease_pool::{Config, Pool, Poolable};

/// Every connection gets a serial number when it connects, so we can see which one is in use.
static CONNECTIONS_OPENED: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Default)]
struct Connection {
    serial: usize,
    endpoint: String,
}

impl Poolable for Connection {
    type Error = Infallible;

    fn initialize(&mut self, config: &Config) -> Result<(), Self::Error> {
        self.serial = CONNECTIONS_OPENED
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1);
        self.endpoint = format!(
            "{}:{}/{}",
            config.get("Host").unwrap_or("localhost"),
            config.get("Port").unwrap_or("5432"),
            config.get("Dbname").unwrap_or("postgres"),
        );

        println!("Connection {} opened to {}", self.serial, self.endpoint);
        Ok(())
    }

    fn teardown(&mut self) {
        if !self.endpoint.is_empty() {
            println!("Connection {} closed", self.serial);
        }

        self.endpoint.clear();
    }
}

fn main() {
    const WORKERS: usize = 100;

    let mut pool = Pool::<Connection>::builder().name("example-db").build();

    let config = Config::new()
        .with("Host", "111.222.33.44")
        .with("Port", "6666")
        .with("Dbname", "dbname")
        .with("User", "username");

    if let Err(e) = pool.init(config) {
        println!("Unable to initialize the pool: {e}");
        return;
    }

    thread::scope(|s| {
        for _ in 0..WORKERS {
            s.spawn(|| {
                // Each worker waits here until one of the 8 connections is free.
                let Some(connection) = pool.acquire() else {
                    return;
                };

                println!("Acquired  : {}", connection.serial);
                thread::sleep(Duration::from_millis(10));
                println!("Releasing : {}", connection.serial);
            });
        }
    });

    pool.release_all();
}
