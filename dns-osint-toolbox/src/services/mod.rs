//! Service façade exposing all OSINT operations.
//!
//! [`OsintService`] owns the configuration, the shared rate limiter and the
//! DNS backend; every operation validates its inputs up front and then runs
//! through the dispatcher.

mod classifier;
mod dispatcher;
mod dns;
mod dns_propagation;
mod rate_limiter;
mod resolver;
mod response_analysis;
mod stats;
mod wildcard;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::config::{DEFAULT_PROPAGATION_RESOLVERS, OsintConfig};
use crate::error::{ToolboxError, ToolboxResult};
use crate::types::{
    BulkQueryReport, BulkReverseReport, DnsRecordType, ProfileReport, PropagationReport,
    QueryReport, RateLimiterStat, ResponseAnalysisReport, ReverseLookupReport, WildcardReport,
};

pub use dns_propagation::PropagationResolver;
pub use rate_limiter::RateLimiter;
pub use resolver::{
    DnsBackend, HickoryBackend, ResolveFailure, ResolverHandle, ResolverIdentity,
    ResolverSelector, reverse_pointer_name,
};

use dispatcher::Dispatcher;

/// Validate and normalise a domain name or IP address input.
///
/// Trims whitespace, passes through valid IP addresses unchanged, converts
/// internationalised domain names to ASCII, and rejects empty or overlong
/// inputs. Non-strict IDNA so underscore labels (`_dmarc`, `_sip._tcp`) pass.
fn validate_domain(domain: &str) -> ToolboxResult<String> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(ToolboxError::ValidationError(
            "Domain name is required".to_string(),
        ));
    }
    if domain.parse::<IpAddr>().is_ok() {
        return Ok(domain.to_string());
    }
    let ascii_domain = idna::domain_to_ascii(domain)
        .map_err(|_| ToolboxError::ValidationError(format!("Invalid domain name: {domain}")))?;
    if ascii_domain.is_empty() {
        return Err(ToolboxError::ValidationError(format!(
            "Invalid domain name: {domain}"
        )));
    }
    if ascii_domain.len() > 253 {
        return Err(ToolboxError::ValidationError(format!(
            "Domain name exceeds maximum length of 253 characters (got {})",
            ascii_domain.len()
        )));
    }
    Ok(ascii_domain)
}

fn validate_ip(ip: &str) -> ToolboxResult<IpAddr> {
    ip.trim()
        .parse()
        .map_err(|_| ToolboxError::ValidationError(format!("Invalid IP address: {}", ip.trim())))
}

/// Resolver selection shared by every operation.
///
/// A non-empty `nameserver` wins over `resolver_type`; both absent means the
/// host system configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub struct ResolverOptions {
    /// Custom nameserver IP address.
    pub nameserver: Option<String>,
    /// Resolver preset: system, public, google, cloudflare, quad9 or opendns.
    pub resolver_type: Option<String>,
    /// Per-query timeout in seconds, clamped to the configured bounds.
    pub timeout_secs: Option<u64>,
}

impl ResolverOptions {
    pub fn preset(name: &str) -> Self {
        Self {
            resolver_type: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn nameserver(ip: &str) -> Self {
        Self {
            nameserver: Some(ip.to_string()),
            ..Self::default()
        }
    }
}

/// Entry point for all OSINT DNS operations.
///
/// ```rust,no_run
/// use dns_osint_toolbox::{OsintConfig, OsintService, ResolverOptions};
/// # async fn demo() -> dns_osint_toolbox::ToolboxResult<()> {
/// let service = OsintService::with_config(OsintConfig::default())?;
/// let report = service
///     .query("example.com", "MX", &ResolverOptions::preset("cloudflare"))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct OsintService {
    config: OsintConfig,
    limiter: Arc<RateLimiter>,
    backend: Arc<dyn DnsBackend>,
    dispatcher: Dispatcher,
}

impl OsintService {
    /// Build a service over an arbitrary backend. The configuration is
    /// validated first.
    pub fn new(config: OsintConfig, backend: Arc<dyn DnsBackend>) -> ToolboxResult<Self> {
        config.validate()?;
        Ok(Self {
            limiter: Arc::new(RateLimiter::new(config.rate_limit)),
            dispatcher: Dispatcher::new(config.max_workers),
            backend,
            config,
        })
    }

    /// Service backed by `hickory-resolver`.
    pub fn with_config(config: OsintConfig) -> ToolboxResult<Self> {
        Self::new(config, Arc::new(HickoryBackend))
    }

    pub const fn config(&self) -> &OsintConfig {
        &self.config
    }

    pub(crate) fn handle_for(&self, identity: ResolverIdentity) -> ResolverHandle {
        ResolverHandle::new(identity, Arc::clone(&self.backend), Arc::clone(&self.limiter))
    }

    fn timeout(&self, timeout_secs: Option<u64>) -> Duration {
        Duration::from_secs(self.config.clamp_timeout(timeout_secs))
    }

    fn resolve_handle(&self, options: &ResolverOptions) -> ToolboxResult<ResolverHandle> {
        let selector = ResolverSelector::parse(
            options.nameserver.as_deref(),
            options.resolver_type.as_deref(),
        )?;
        let identity = ResolverIdentity::from_selector(&selector, self.timeout(options.timeout_secs));
        Ok(self.handle_for(identity))
    }

    /// Resolve one record type for a domain.
    pub async fn query(
        &self,
        domain: &str,
        record_type: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<QueryReport> {
        let domain = validate_domain(domain)?;
        let record_type: DnsRecordType = record_type.parse()?;
        let handle = self.resolve_handle(resolver)?;
        Ok(dns::query(handle, domain, record_type).await)
    }

    /// PTR lookup for an IPv4 or IPv6 address.
    pub async fn reverse_lookup(
        &self,
        ip: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<ReverseLookupReport> {
        let ip = validate_ip(ip)?;
        let handle = self.resolve_handle(resolver)?;
        Ok(dns::reverse_lookup(handle, ip).await)
    }

    /// Query every common record type (all but PTR) for one domain.
    pub async fn query_all(
        &self,
        domain: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<ProfileReport> {
        let domain = validate_domain(domain)?;
        let handle = self.resolve_handle(resolver)?;
        Ok(dns::query_all(
            &self.dispatcher,
            handle,
            domain,
            self.config.query_all_concurrency,
        )
        .await)
    }

    /// Same record type for many domains. One bad domain rejects the batch.
    pub async fn bulk_query(
        &self,
        domains: &[String],
        record_type: &str,
        resolver: &ResolverOptions,
        max_workers: Option<i64>,
    ) -> ToolboxResult<BulkQueryReport> {
        let record_type: DnsRecordType = record_type.parse()?;
        let domains = domains
            .iter()
            .map(|d| validate_domain(d))
            .collect::<ToolboxResult<Vec<_>>>()?;
        let handle = self.resolve_handle(resolver)?;
        Ok(dns::bulk_query(
            &self.dispatcher,
            handle,
            domains,
            record_type,
            self.config.clamp_workers(max_workers),
        )
        .await)
    }

    /// PTR lookups for many addresses. One bad address rejects the batch.
    pub async fn bulk_reverse_lookup(
        &self,
        ips: &[String],
        resolver: &ResolverOptions,
        max_workers: Option<i64>,
    ) -> ToolboxResult<BulkReverseReport> {
        let ips = ips
            .iter()
            .map(|ip| validate_ip(ip))
            .collect::<ToolboxResult<Vec<_>>>()?;
        let handle = self.resolve_handle(resolver)?;
        Ok(dns::bulk_reverse_lookup(
            &self.dispatcher,
            handle,
            ips,
            self.config.clamp_workers(max_workers),
        )
        .await)
    }

    /// Compare answers from several independent resolvers.
    ///
    /// `resolvers` is an ordered list of `(name, ip)`; `None` or an empty list
    /// uses the built-in set.
    pub async fn propagation_check(
        &self,
        domain: &str,
        record_type: &str,
        resolvers: Option<&[(String, String)]>,
        timeout_secs: Option<u64>,
    ) -> ToolboxResult<PropagationReport> {
        let domain = validate_domain(domain)?;
        let record_type: DnsRecordType = record_type.parse()?;

        let resolvers = match resolvers.filter(|list| !list.is_empty()) {
            Some(list) => list
                .iter()
                .map(|(name, ip)| {
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(ToolboxError::ValidationError(
                            "Resolver name is required".to_string(),
                        ));
                    }
                    Ok(PropagationResolver {
                        name: name.to_string(),
                        ip: validate_ip(ip)?,
                    })
                })
                .collect::<ToolboxResult<Vec<_>>>()?,
            None => DEFAULT_PROPAGATION_RESOLVERS
                .iter()
                .filter_map(|(name, ip)| {
                    ip.parse().ok().map(|ip| PropagationResolver {
                        name: (*name).to_string(),
                        ip,
                    })
                })
                .collect(),
        };

        Ok(dns_propagation::dns_propagation_check(
            self,
            domain,
            record_type,
            resolvers,
            self.timeout(timeout_secs),
        )
        .await)
    }

    /// Probe random subdomains for catch-all answers.
    pub async fn wildcard_check(
        &self,
        domain: &str,
        test_count: Option<u32>,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<WildcardReport> {
        let domain = validate_domain(domain)?;
        let handle = self.resolve_handle(resolver)?;
        let test_count = self.config.clamp_wildcard_count(test_count);
        Ok(wildcard::dns_wildcard_check(self, handle, domain, test_count).await)
    }

    /// Sample response times sequentially and flag anomalies.
    pub async fn response_analysis(
        &self,
        domain: &str,
        iterations: Option<u32>,
        record_type: &str,
        resolver: &ResolverOptions,
    ) -> ToolboxResult<ResponseAnalysisReport> {
        let domain = validate_domain(domain)?;
        let record_type: DnsRecordType = record_type.parse()?;
        let handle = self.resolve_handle(resolver)?;
        let iterations = self.config.clamp_iterations(iterations);
        Ok(
            response_analysis::dns_response_analysis(self, handle, domain, record_type, iterations)
                .await,
        )
    }

    /// Token-bucket state for every resolver used so far.
    pub async fn rate_limiter_stats(&self) -> Vec<RateLimiterStat> {
        self.limiter.stats().await
    }
}
