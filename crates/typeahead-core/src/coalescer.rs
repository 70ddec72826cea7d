//! Request coalescing
//!
//! Concurrent identical requests (same fingerprint) share one in-flight
//! future instead of racing the network. The in-flight entry removes
//! itself from the map before observers settle, so a follow-up request
//! issued from a completion callback starts fresh.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::Result;
use crate::types::CompletionResponse;

/// A coalesced in-flight request
pub type SharedRequest = Shared<BoxFuture<'static, Result<CompletionResponse>>>;

/// Fingerprint → in-flight shared future
///
/// Guarantees at most one concurrent network request per fingerprint:
/// observers arriving while a request is in flight await the same future
/// and receive clones of the same settled result, in subscription order.
#[derive(Clone, Default)]
pub struct RequestCoalescer {
    in_flight: Arc<Mutex<HashMap<String, SharedRequest>>>,
}

impl RequestCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight request for `fingerprint`, or start one
    ///
    /// `make` is only invoked when no request is in flight; the future it
    /// returns runs exactly once regardless of how many observers join.
    pub fn run<F, Fut>(&self, fingerprint: &str, make: F) -> SharedRequest
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CompletionResponse>> + Send + 'static,
    {
        let mut in_flight = self.in_flight.lock().expect("coalescer lock poisoned");

        if let Some(existing) = in_flight.get(fingerprint) {
            return existing.clone();
        }

        let map = Arc::clone(&self.in_flight);
        let key = fingerprint.to_string();
        let request = make();
        let shared = async move {
            let result = request.await;
            // Deregister before any observer resumes
            map.lock().expect("coalescer lock poisoned").remove(&key);
            result
        }
        .boxed()
        .shared();

        in_flight.insert(fingerprint.to_string(), shared.clone());
        shared
    }

    /// Number of requests currently in flight
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().expect("coalescer lock poisoned").len()
    }
}
