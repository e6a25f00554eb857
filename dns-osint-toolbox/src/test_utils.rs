//! In-memory DNS backend for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::services::{DnsBackend, ResolveFailure, ResolverIdentity};
use crate::types::{DnsRecordType, RecordValue};

type Response = Result<Vec<RecordValue>, ResolveFailure>;

/// Scripted [`DnsBackend`].
///
/// Lookups are answered from (in order) the per-resolver script, the
/// per-name script, then the default response. Unscripted names fail with
/// NXDOMAIN unless a default is set.
pub(crate) struct MockBackend {
    by_resolver: Mutex<HashMap<(String, String, DnsRecordType), Response>>,
    by_name: Mutex<HashMap<(String, DnsRecordType), Response>>,
    default: Option<Response>,
    delay: Duration,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<(String, DnsRecordType)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            by_resolver: Mutex::new(HashMap::new()),
            by_name: Mutex::new(HashMap::new()),
            default: None,
            delay: Duration::ZERO,
            delays: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Response for any name without a script.
    pub(crate) fn with_default(mut self, response: Response) -> Self {
        self.default = Some(response);
        self
    }

    /// Latency applied to every lookup.
    pub(crate) const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) async fn respond(&self, name: &str, record_type: DnsRecordType, response: Response) {
        self.by_name
            .lock()
            .await
            .insert((name.to_string(), record_type), response);
    }

    /// Script a response for one resolver identity only.
    pub(crate) async fn respond_for(
        &self,
        resolver_id: &str,
        name: &str,
        record_type: DnsRecordType,
        response: Response,
    ) {
        self.by_resolver.lock().await.insert(
            (resolver_id.to_string(), name.to_string(), record_type),
            response,
        );
    }

    /// Latency for one name, overriding the global delay.
    pub(crate) async fn delay_for(&self, name: &str, delay: Duration) {
        self.delays.lock().await.insert(name.to_string(), delay);
    }

    pub(crate) async fn calls(&self) -> Vec<(String, DnsRecordType)> {
        self.calls.lock().await.clone()
    }

    /// Highest number of lookups observed in flight at once.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn response(&self, resolver_id: &str, name: &str, record_type: DnsRecordType) -> Response {
        let key = (resolver_id.to_string(), name.to_string(), record_type);
        if let Some(response) = self.by_resolver.lock().await.get(&key) {
            return response.clone();
        }
        if let Some(response) = self.by_name.lock().await.get(&(name.to_string(), record_type)) {
            return response.clone();
        }
        self.default.clone().unwrap_or_else(|| {
            Err(ResolveFailure::new(
                "ResolveError",
                format!("NXDOMAIN: no record found for {name}"),
            ))
        })
    }
}

#[async_trait]
impl DnsBackend for MockBackend {
    async fn resolve(
        &self,
        name: &str,
        record_type: DnsRecordType,
        resolver: &ResolverIdentity,
    ) -> Result<Vec<RecordValue>, ResolveFailure> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls
            .lock()
            .await
            .push((name.to_string(), record_type));

        let delay = self
            .delays
            .lock()
            .await
            .get(name)
            .copied()
            .unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let response = self.response(resolver.id(), name, record_type).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}
