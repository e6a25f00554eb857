use super::*;

use dns_osint_toolbox::{
    DnsBackend, DnsRecordType, OsintConfig, RecordValue, ResolveFailure, ResolverIdentity,
};
use tokio::sync::Mutex;

/// Backend answering A queries for `example.com` and failing everything else.
pub struct StaticBackend;

#[async_trait]
impl DnsBackend for StaticBackend {
    async fn resolve(
        &self,
        name: &str,
        record_type: DnsRecordType,
        _resolver: &ResolverIdentity,
    ) -> Result<Vec<RecordValue>, ResolveFailure> {
        match (name, record_type) {
            ("example.com", DnsRecordType::A) => Ok(vec![RecordValue::A([93, 184, 215, 14].into())]),
            _ => Err(ResolveFailure::new(
                "ResolveError",
                format!("NXDOMAIN: no record found for {name}"),
            )),
        }
    }
}

/// Gateway recording every call before delegating to a service over [`StaticBackend`].
pub struct MockOsintGateway {
    service: OsintService,
    calls: Mutex<Vec<(String, String)>>,
    delay: Mutex<Option<Duration>>,
    propagation_resolvers: Mutex<Option<Vec<(String, String)>>>,
}

impl Default for MockOsintGateway {
    fn default() -> Self {
        let config = OsintConfig {
            analysis_delay_secs: 0.0,
            ..OsintConfig::default()
        };
        Self {
            service: OsintService::new(config, Arc::new(StaticBackend)).unwrap(),
            calls: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
            propagation_resolvers: Mutex::new(None),
        }
    }
}

impl MockOsintGateway {
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().await = delay;
    }

    /// `(operation, primary argument)` pairs in call order.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }

    pub async fn propagation_resolvers(&self) -> Option<Vec<(String, String)>> {
        self.propagation_resolvers.lock().await.clone()
    }

    async fn record(&self, operation: &str, argument: &str) {
        self.calls
            .lock()
            .await
            .push((operation.to_string(), argument.to_string()));
        if let Some(delay) = *self.delay.lock().await {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl OsintGateway for MockOsintGateway {
    async fn query(
        &self,
        domain: &str,
        record_type: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<QueryReport> {
        self.record("query", &format!("{domain} {record_type}")).await;
        self.service.query(domain, record_type, resolver).await
    }

    async fn reverse_lookup(
        &self,
        ip: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<ReverseLookupReport> {
        self.record("reverse_lookup", ip).await;
        self.service.reverse_lookup(ip, resolver).await
    }

    async fn query_all(
        &self,
        domain: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<ProfileReport> {
        self.record("query_all", domain).await;
        self.service.query_all(domain, resolver).await
    }

    async fn bulk_query(
        &self,
        domains: &[String],
        record_type: &str,
        resolver: &ResolverOptions,
        max_workers: Option<i64>,
    ) -> ToolboxResult<BulkQueryReport> {
        self.record("bulk_query", &domains.join(",")).await;
        self.service
            .bulk_query(domains, record_type, resolver, max_workers)
            .await
    }

    async fn bulk_reverse_lookup(
        &self,
        ips: &[String],
        resolver: &ResolverOptions,
        max_workers: Option<i64>,
    ) -> ToolboxResult<BulkReverseReport> {
        self.record("bulk_reverse_lookup", &ips.join(",")).await;
        self.service
            .bulk_reverse_lookup(ips, resolver, max_workers)
            .await
    }

    async fn propagation_check(
        &self,
        domain: &str,
        record_type: &str,
        resolvers: Option<&[(String, String)]>,
        timeout_secs: Option<u64>,
    ) -> ToolboxResult<PropagationReport> {
        self.record("propagation_check", &format!("{domain} {record_type}"))
            .await;
        *self.propagation_resolvers.lock().await = resolvers.map(<[_]>::to_vec);
        self.service
            .propagation_check(domain, record_type, resolvers, timeout_secs)
            .await
    }

    async fn wildcard_check(
        &self,
        domain: &str,
        test_count: Option<u32>,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<WildcardReport> {
        self.record("wildcard_check", domain).await;
        self.service
            .wildcard_check(domain, test_count, resolver)
            .await
    }

    async fn response_analysis(
        &self,
        domain: &str,
        iterations: Option<u32>,
        record_type: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<ResponseAnalysisReport> {
        self.record("response_analysis", &format!("{domain} {record_type}"))
            .await;
        self.service
            .response_analysis(domain, iterations, record_type, resolver)
            .await
    }

    async fn rate_limiter_stats(&self) -> Vec<RateLimiterStat> {
        self.service.rate_limiter_stats().await
    }
}

pub(super) fn build_server(toolbox: Arc<dyn OsintGateway>, timeouts: ToolTimeouts) -> DnsOsintMcp {
    DnsOsintMcp::with_toolbox_and_timeouts(toolbox, timeouts)
}

/// Text payload of the first content item, parsed as JSON.
pub fn result_json(result: &CallToolResult) -> serde_json::Value {
    let text = result
        .content
        .first()
        .and_then(|c| c.raw.as_text())
        .map(|t| t.text.as_str())
        .unwrap();
    serde_json::from_str(text).unwrap()
}
