//! MCP Server implementation for the DNS OSINT toolbox.
//!
//! Exposes every toolbox operation as a tool for AI agents.

use async_trait::async_trait;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router,
};
use std::sync::Arc;
use tokio::time::{Duration, timeout};

use dns_osint_toolbox::{
    BulkQueryReport, BulkReverseReport, OsintService, ProfileReport, PropagationReport,
    QueryReport, RateLimiterStat, ResolverOptions, ResponseAnalysisReport, ReverseLookupReport,
    ToolboxError, ToolboxResult, WildcardReport,
};

use crate::schemas::{
    BulkQueryParams, BulkReverseLookupParams, DnsQueryParams, PropagationCheckParams,
    QueryAllParams, RateLimiterStatsParams, ResponseAnalysisParams, ReverseLookupParams,
    WildcardCheckParams,
};

const DEFAULT_RECORD_TYPE: &str = "A";

// Overall ceilings per tool; per-query timeouts are enforced by the resolver
const QUERY_TIMEOUT_SECS: u64 = 75;
const QUERY_ALL_TIMEOUT_SECS: u64 = 180;
const BULK_TIMEOUT_SECS: u64 = 600;
const PROPAGATION_TIMEOUT_SECS: u64 = 90;
const WILDCARD_TIMEOUT_SECS: u64 = 120;
const RESPONSE_ANALYSIS_TIMEOUT_SECS: u64 = 900;

#[derive(Clone, Copy)]
struct ToolTimeouts {
    query: Duration,
    reverse_lookup: Duration,
    query_all: Duration,
    bulk_query: Duration,
    bulk_reverse_lookup: Duration,
    propagation_check: Duration,
    wildcard_check: Duration,
    response_analysis: Duration,
}

impl Default for ToolTimeouts {
    fn default() -> Self {
        Self {
            query: Duration::from_secs(QUERY_TIMEOUT_SECS),
            reverse_lookup: Duration::from_secs(QUERY_TIMEOUT_SECS),
            query_all: Duration::from_secs(QUERY_ALL_TIMEOUT_SECS),
            bulk_query: Duration::from_secs(BULK_TIMEOUT_SECS),
            bulk_reverse_lookup: Duration::from_secs(BULK_TIMEOUT_SECS),
            propagation_check: Duration::from_secs(PROPAGATION_TIMEOUT_SECS),
            wildcard_check: Duration::from_secs(WILDCARD_TIMEOUT_SECS),
            response_analysis: Duration::from_secs(RESPONSE_ANALYSIS_TIMEOUT_SECS),
        }
    }
}

#[async_trait]
trait OsintGateway: Send + Sync {
    async fn query(
        &self,
        domain: &str,
        record_type: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<QueryReport>;

    async fn reverse_lookup(
        &self,
        ip: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<ReverseLookupReport>;

    async fn query_all(
        &self,
        domain: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<ProfileReport>;

    async fn bulk_query(
        &self,
        domains: &[String],
        record_type: &str,
        resolver: &ResolverOptions,
        max_workers: Option<i64>,
    ) -> ToolboxResult<BulkQueryReport>;

    async fn bulk_reverse_lookup(
        &self,
        ips: &[String],
        resolver: &ResolverOptions,
        max_workers: Option<i64>,
    ) -> ToolboxResult<BulkReverseReport>;

    async fn propagation_check(
        &self,
        domain: &str,
        record_type: &str,
        resolvers: Option<&[(String, String)]>,
        timeout_secs: Option<u64>,
    ) -> ToolboxResult<PropagationReport>;

    async fn wildcard_check(
        &self,
        domain: &str,
        test_count: Option<u32>,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<WildcardReport>;

    async fn response_analysis(
        &self,
        domain: &str,
        iterations: Option<u32>,
        record_type: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<ResponseAnalysisReport>;

    async fn rate_limiter_stats(&self) -> Vec<RateLimiterStat>;
}

struct DefaultOsintGateway {
    service: OsintService,
}

#[async_trait]
impl OsintGateway for DefaultOsintGateway {
    async fn query(
        &self,
        domain: &str,
        record_type: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<QueryReport> {
        self.service.query(domain, record_type, resolver).await
    }

    async fn reverse_lookup(
        &self,
        ip: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<ReverseLookupReport> {
        self.service.reverse_lookup(ip, resolver).await
    }

    async fn query_all(
        &self,
        domain: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<ProfileReport> {
        self.service.query_all(domain, resolver).await
    }

    async fn bulk_query(
        &self,
        domains: &[String],
        record_type: &str,
        resolver: &ResolverOptions,
        max_workers: Option<i64>,
    ) -> ToolboxResult<BulkQueryReport> {
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
        self.service
            .response_analysis(domain, iterations, record_type, resolver)
            .await
    }

    async fn rate_limiter_stats(&self) -> Vec<RateLimiterStat> {
        self.service.rate_limiter_stats().await
    }
}

/// Sanitize error messages to prevent sensitive information leakage.
///
/// Logs the full error to stderr but returns a generic message to the client.
fn sanitize_internal_error(error: impl std::fmt::Display, context: &str) -> McpError {
    tracing::error!("{context} error: {error}");
    McpError::internal_error(
        format!("{context} failed - check server logs for details"),
        None,
    )
}

/// Validation failures are the caller's fault and go back verbatim.
fn map_toolbox_error(context: &str, error: &ToolboxError) -> McpError {
    tracing::warn!("{context} error: {error}");
    match error {
        ToolboxError::ValidationError(_) => McpError::invalid_params(error.to_string(), None),
    }
}

/// Execute a toolbox operation with timeout, error mapping, and JSON serialization.
async fn run_toolbox_tool<T: serde::Serialize>(
    duration: Duration,
    future: impl std::future::Future<Output = ToolboxResult<T>>,
    tool_name: &str,
) -> Result<CallToolResult, McpError> {
    let result = timeout(duration, future)
        .await
        .map_err(|_| McpError::internal_error(format!("{tool_name} timeout"), None))?
        .map_err(|e| map_toolbox_error(tool_name, &e))?;

    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| sanitize_internal_error(e, &format!("Serialize {tool_name} result")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn record_type_or_default(record_type: Option<&str>) -> &str {
    record_type
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_RECORD_TYPE)
}

/// MCP Server for the DNS OSINT toolbox.
///
/// Provides AI agents with rate-limited DNS reconnaissance through the
/// Model Context Protocol.
#[derive(Clone)]
pub struct DnsOsintMcp {
    /// Gateway to the toolbox operations.
    toolbox: Arc<dyn OsintGateway>,
    /// Timeout configuration for toolbox calls.
    timeouts: ToolTimeouts,
    /// Tool router generated by macro.
    tool_router: ToolRouter<Self>,
}

impl DnsOsintMcp {
    /// Create a new MCP server instance over a configured service.
    #[must_use]
    pub fn new(service: OsintService) -> Self {
        Self::with_toolbox_and_timeouts(
            Arc::new(DefaultOsintGateway { service }),
            ToolTimeouts::default(),
        )
    }

    fn with_toolbox_and_timeouts(toolbox: Arc<dyn OsintGateway>, timeouts: ToolTimeouts) -> Self {
        Self {
            toolbox,
            timeouts,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl DnsOsintMcp {
    /// Resolve one record type.
    #[tool(
        description = "Resolve one DNS record type for a domain (A, AAAA, MX, TXT, NS, SOA, CNAME, CAA, SRV, PTR) via the system resolver, a preset or a custom nameserver"
    )]
    async fn dns_query(
        &self,
        Parameters(params): Parameters<DnsQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        run_toolbox_tool(
            self.timeouts.query,
            self.toolbox.query(
                &params.domain,
                record_type_or_default(params.record_type.as_deref()),
                &params.resolver,
            ),
            "DNS query",
        )
        .await
    }

    /// PTR lookup for one address.
    #[tool(description = "Reverse DNS (PTR) lookup for an IPv4 or IPv6 address")]
    async fn dns_reverse_lookup(
        &self,
        Parameters(params): Parameters<ReverseLookupParams>,
    ) -> Result<CallToolResult, McpError> {
        run_toolbox_tool(
            self.timeouts.reverse_lookup,
            self.toolbox.reverse_lookup(&params.ip, &params.resolver),
            "Reverse lookup",
        )
        .await
    }

    /// Full record profile of a domain.
    #[tool(
        description = "Query every common record type (A, AAAA, MX, TXT, NS, SOA, CNAME, CAA, SRV) for a domain"
    )]
    async fn dns_query_all(
        &self,
        Parameters(params): Parameters<QueryAllParams>,
    ) -> Result<CallToolResult, McpError> {
        run_toolbox_tool(
            self.timeouts.query_all,
            self.toolbox.query_all(&params.domain, &params.resolver),
            "DNS query all",
        )
        .await
    }

    /// Same record type across many domains.
    #[tool(
        description = "Query one record type for many domains concurrently, with per-domain classified errors"
    )]
    async fn dns_bulk_query(
        &self,
        Parameters(params): Parameters<BulkQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        run_toolbox_tool(
            self.timeouts.bulk_query,
            self.toolbox.bulk_query(
                &params.domains,
                record_type_or_default(params.record_type.as_deref()),
                &params.resolver,
                params.max_workers,
            ),
            "Bulk DNS query",
        )
        .await
    }

    #[tool(description = "Reverse DNS (PTR) lookups for many IP addresses concurrently")]
    async fn dns_bulk_reverse_lookup(
        &self,
        Parameters(params): Parameters<BulkReverseLookupParams>,
    ) -> Result<CallToolResult, McpError> {
        run_toolbox_tool(
            self.timeouts.bulk_reverse_lookup,
            self.toolbox
                .bulk_reverse_lookup(&params.ips, &params.resolver, params.max_workers),
            "Bulk reverse lookup",
        )
        .await
    }

    /// Compare answers across independent resolvers.
    #[tool(
        description = "Compare a record across independent public resolvers and assess consistency and trust"
    )]
    async fn dns_propagation_check(
        &self,
        Parameters(params): Parameters<PropagationCheckParams>,
    ) -> Result<CallToolResult, McpError> {
        let resolvers: Option<Vec<(String, String)>> = params
            .resolvers
            .map(|list| list.into_iter().map(|r| (r.name, r.ip)).collect());

        run_toolbox_tool(
            self.timeouts.propagation_check,
            self.toolbox.propagation_check(
                &params.domain,
                record_type_or_default(params.record_type.as_deref()),
                resolvers.as_deref(),
                params.timeout_secs,
            ),
            "DNS propagation check",
        )
        .await
    }

    /// Wildcard detection.
    #[tool(
        description = "Detect wildcard DNS by probing random subdomains for A and CNAME answers, with risk assessment"
    )]
    async fn dns_wildcard_check(
        &self,
        Parameters(params): Parameters<WildcardCheckParams>,
    ) -> Result<CallToolResult, McpError> {
        run_toolbox_tool(
            self.timeouts.wildcard_check,
            self.toolbox
                .wildcard_check(&params.domain, params.test_count, &params.resolver),
            "Wildcard check",
        )
        .await
    }

    /// Response-time sampling.
    #[tool(
        description = "Sample DNS response times with sequential queries and flag latency anomalies and failure patterns"
    )]
    async fn dns_response_analysis(
        &self,
        Parameters(params): Parameters<ResponseAnalysisParams>,
    ) -> Result<CallToolResult, McpError> {
        run_toolbox_tool(
            self.timeouts.response_analysis,
            self.toolbox.response_analysis(
                &params.domain,
                params.iterations,
                record_type_or_default(params.record_type.as_deref()),
                &params.resolver,
            ),
            "DNS response analysis",
        )
        .await
    }

    #[tool(description = "Show the per-resolver rate limiter token buckets")]
    async fn dns_rate_limiter_stats(
        &self,
        _params: Parameters<RateLimiterStatsParams>,
    ) -> Result<CallToolResult, McpError> {
        let stats = self.toolbox.rate_limiter_stats().await;

        let json = serde_json::to_string_pretty(&stats)
            .map_err(|e| sanitize_internal_error(e, "Serialize rate limiter stats"))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

#[tool_handler]
impl ServerHandler for DnsOsintMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "DNS OSINT MCP Server - rate-limited DNS reconnaissance. \
                 Use dns_query, dns_reverse_lookup and dns_query_all for single targets, \
                 dns_bulk_query and dns_bulk_reverse_lookup for lists. \
                 Analysis tools (dns_propagation_check, dns_wildcard_check, dns_response_analysis) \
                 return findings with investigation suggestions. \
                 DNS failures are reported as classified data, not tool errors."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
#[path = "test_mocks.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
pub(crate) mod test_mocks;

#[cfg(test)]
#[path = "server_tests.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests;
