//! MCP tool parameter schemas
//!
//! Defines the input parameter structures for all MCP tools.
//! All structs derive `Debug`, `Deserialize`, and `JsonSchema` as required by rmcp.
//! Resolver selection is shared through a flattened [`ResolverOptions`].

use dns_osint_toolbox::ResolverOptions;
use schemars::JsonSchema;
use serde::Deserialize;

/// Parameters for `dns_query` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DnsQueryParams {
    /// The domain name to query.
    #[schemars(description = "The domain name to query")]
    pub domain: String,

    /// DNS record type (default: A).
    #[schemars(description = "DNS record type: A, AAAA, MX, TXT, NS, SOA, CNAME, CAA, SRV, PTR (default: A)")]
    pub record_type: Option<String>,

    #[serde(flatten)]
    pub resolver: ResolverOptions,
}

/// Parameters for `dns_reverse_lookup` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReverseLookupParams {
    /// IPv4 or IPv6 address to look up.
    #[schemars(description = "IPv4 or IPv6 address to look up")]
    pub ip: String,

    #[serde(flatten)]
    pub resolver: ResolverOptions,
}

/// Parameters for `dns_query_all` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryAllParams {
    /// The domain name to profile.
    #[schemars(description = "The domain name to profile")]
    pub domain: String,

    #[serde(flatten)]
    pub resolver: ResolverOptions,
}

/// Parameters for `dns_bulk_query` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BulkQueryParams {
    /// Domains to query.
    #[schemars(description = "Domains to query; one invalid entry rejects the whole batch")]
    pub domains: Vec<String>,

    /// DNS record type (default: A).
    #[schemars(description = "DNS record type queried for every domain (default: A)")]
    pub record_type: Option<String>,

    /// Concurrent workers (1-50, default: 10); out-of-range values are clamped.
    #[schemars(description = "Concurrent workers (1-50, default: 10); out-of-range values are clamped")]
    pub max_workers: Option<i64>,

    #[serde(flatten)]
    pub resolver: ResolverOptions,
}

/// Parameters for `dns_bulk_reverse_lookup` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BulkReverseLookupParams {
    /// Addresses to look up.
    #[schemars(description = "IP addresses to look up; one invalid entry rejects the whole batch")]
    pub ips: Vec<String>,

    /// Concurrent workers (1-50, default: 10); out-of-range values are clamped.
    #[schemars(description = "Concurrent workers (1-50, default: 10); out-of-range values are clamped")]
    pub max_workers: Option<i64>,

    #[serde(flatten)]
    pub resolver: ResolverOptions,
}

/// One resolver of a propagation check.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PropagationResolverParam {
    /// Display name for the resolver.
    #[schemars(description = "Display name for the resolver")]
    pub name: String,

    /// Resolver IP address.
    #[schemars(description = "Resolver IP address")]
    pub ip: String,
}

/// Parameters for `dns_propagation_check` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PropagationCheckParams {
    /// The domain name to check.
    #[schemars(description = "The domain name to check")]
    pub domain: String,

    /// DNS record type to check (default: A).
    #[schemars(description = "DNS record type to check (default: A)")]
    pub record_type: Option<String>,

    /// Resolvers to compare; omitted or empty uses the built-in set.
    #[schemars(
        description = "Resolvers to compare as {name, ip}; omitted or empty uses Google, Cloudflare, Quad9, OpenDNS, Level3, Verisign"
    )]
    pub resolvers: Option<Vec<PropagationResolverParam>>,

    /// Per-resolver timeout in seconds.
    #[schemars(description = "Per-resolver timeout in seconds (1-60, default: 10)")]
    pub timeout_secs: Option<u64>,
}

/// Parameters for `dns_wildcard_check` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct WildcardCheckParams {
    /// The domain name to probe.
    #[schemars(description = "The domain name to probe")]
    pub domain: String,

    /// Number of random subdomains (1-10, default: 3).
    #[schemars(description = "Number of random subdomains to probe (1-10, default: 3)")]
    pub test_count: Option<u32>,

    #[serde(flatten)]
    pub resolver: ResolverOptions,
}

/// Parameters for `dns_response_analysis` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResponseAnalysisParams {
    /// The domain name to sample.
    #[schemars(description = "The domain name to sample")]
    pub domain: String,

    /// Sequential queries to run (max 100, default: 10).
    #[schemars(description = "Sequential queries to run (max 100, default: 10)")]
    pub iterations: Option<u32>,

    /// DNS record type (default: A).
    #[schemars(description = "DNS record type (default: A)")]
    pub record_type: Option<String>,

    #[serde(flatten)]
    pub resolver: ResolverOptions,
}

/// Parameters for `dns_rate_limiter_stats` tool.
///
/// This tool takes no parameters, but we need an empty struct for the schema.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RateLimiterStatsParams {}
