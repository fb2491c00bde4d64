//! Object pools for requests and responses.
//!
//! A pool is a mutex-guarded free list. Objects are reset when released, so
//! an acquired object never remembers a previous tenant. Release takes the
//! object by value; nothing can touch it afterwards.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::cookie::Jar;
use tracing::{instrument, trace};

use crate::constants::DEFAULT_POOL_CAPACITY;
use crate::request::Request;
use crate::response::Response;
use crate::transport::Transport;

/// Objects that can be returned to their freshly constructed state in place.
pub trait Recycle {
    /// Resets every field.
    fn recycle(&mut self);
}

/// A bounded free list of reusable objects.
#[derive(Debug)]
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    capacity: usize,
}

impl<T: Recycle + Default> Pool<T> {
    /// Creates a pool keeping at most `capacity` idle objects.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Takes an idle object, or constructs a new one.
    pub fn acquire(&self) -> T {
        self.lock().pop().unwrap_or_default()
    }

    /// Resets `item` and keeps it for reuse. Dropped when the pool is full.
    pub fn release(&self, mut item: T) {
        item.recycle();
        let mut free = self.lock();
        if free.len() < self.capacity {
            free.push(item);
        } else {
            trace!(capacity = self.capacity, "pool full; dropping released object");
        }
    }

    /// Number of idle objects.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    // Objects are reset before they enter the list, so a poisoned list is still consistent.
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Recycle + Default> Default for Pool<T> {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

/// Request and response pools sharing one default transport.
///
/// Every acquired [`Request`] has the default transport attached and a fresh,
/// empty cookie jar. Share a jar across requests explicitly with
/// [`Request::jar`].
#[derive(Debug)]
pub struct RequestPool {
    requests: Pool<Request>,
    responses: Pool<Response>,
    transport: Arc<dyn Transport>,
}

impl RequestPool {
    /// Creates pools whose requests use `transport` for primary attempts.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_capacity(transport, DEFAULT_POOL_CAPACITY)
    }

    /// Creates pools keeping at most `capacity` idle objects of each kind.
    #[must_use]
    pub fn with_capacity(transport: Arc<dyn Transport>, capacity: usize) -> Self {
        Self {
            requests: Pool::new(capacity),
            responses: Pool::new(capacity),
            transport,
        }
    }

    /// Returns the default transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Acquires a request ready to configure.
    #[instrument(level = "trace", skip(self))]
    pub fn acquire_request(&self) -> Request {
        let mut request = self.requests.acquire();
        request
            .client(Arc::clone(&self.transport))
            .jar(Arc::new(Jar::default()));
        request
    }

    /// Acquires an empty response.
    #[instrument(level = "trace", skip(self))]
    pub fn acquire_response(&self) -> Response {
        self.responses.acquire()
    }

    /// Acquires a request and a response.
    pub fn acquire_pair(&self) -> (Request, Response) {
        (self.acquire_request(), self.acquire_response())
    }

    /// Resets `request` and returns it to the pool.
    #[instrument(level = "trace", skip_all)]
    pub fn release_request(&self, request: Request) {
        self.requests.release(request);
    }

    /// Resets `response` and returns it to the pool.
    #[instrument(level = "trace", skip_all)]
    pub fn release_response(&self, response: Response) {
        self.responses.release(response);
    }

    /// Releases both halves of a pair.
    pub fn release_pair(&self, request: Request, response: Response) {
        self.release_request(request);
        self.release_response(response);
    }

    /// Idle requests and responses currently pooled.
    #[must_use]
    pub fn idle(&self) -> (usize, usize) {
        (self.requests.idle(), self.responses.idle())
    }
}
