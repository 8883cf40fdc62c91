//! Fixed-size pool of SQLite connections with a bounded acquire wait.

use crate::error::{DeskError, DeskResult};
use parking_lot::{Condvar, Mutex};
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

struct PoolState {
    idle: Vec<Connection>,
    closed: bool,
}

pub struct ConnectionPool {
    state: Mutex<PoolState>,
    available: Condvar,
    size: usize,
    acquire_timeout: Duration,
}

impl ConnectionPool {
    pub fn new(connections: Vec<Connection>, acquire_timeout: Duration) -> Self {
        let size = connections.len();
        Self {
            state: Mutex::new(PoolState {
                idle: connections,
                closed: false,
            }),
            available: Condvar::new(),
            size,
            acquire_timeout,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Take a connection, waiting up to the acquire timeout for one to be
    /// returned. Fails with `ResourceExhausted` when the wait runs out.
    pub fn acquire(&self) -> DeskResult<PooledConnection<'_>> {
        let deadline = Instant::now() + self.acquire_timeout;
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(DeskError::StoreClosed);
            }
            if let Some(conn) = state.idle.pop() {
                return Ok(PooledConnection {
                    pool: self,
                    conn: Some(conn),
                });
            }
            if self.available.wait_until(&mut state, deadline).timed_out() && state.idle.is_empty()
            {
                log::warn!(
                    "No connection free within {} ms ({} in pool)",
                    self.acquire_timeout.as_millis(),
                    self.size
                );
                return Err(DeskError::ResourceExhausted(format!(
                    "no pooled connection available within {} ms",
                    self.acquire_timeout.as_millis()
                )));
            }
        }
    }

    /// Drop every idle connection and refuse further acquires. Connections
    /// still checked out are closed when their guard is dropped.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.idle.clear();
        self.available.notify_all();
    }

    fn release(&self, conn: Connection) {
        let mut state = self.state.lock();
        if !state.closed {
            state.idle.push(conn);
        }
        drop(state);
        self.available.notify_one();
    }
}

/// A checked-out connection. Returned to the pool on drop.
pub struct PooledConnection<'p> {
    pool: &'p ConnectionPool,
    conn: Option<Connection>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
