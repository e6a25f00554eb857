//! Resolver identities, the DNS backend seam and the rate-limited handle.

use std::fmt::Write as _;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::{
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
    proto::{
        op::ResponseCode,
        rr::{RData, Record, RecordType},
        ProtoErrorKind,
    },
    ResolveError, TokioResolver,
};

use crate::config::preset_nameservers;
use crate::error::{ToolboxError, ToolboxResult};
use crate::types::{DnsRecordType, RecordValue, ResolverInfo};

use super::rate_limiter::RateLimiter;

/// Raw failure reported by a [`DnsBackend`], before classification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{type_name}: {message}")]
pub struct ResolveFailure {
    pub type_name: String,
    pub message: String,
}

impl ResolveFailure {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

/// The DNS resolution collaborator.
///
/// Implementations perform exactly one lookup and never retry; rate limiting
/// and classification happen around them.
#[async_trait]
pub trait DnsBackend: Send + Sync {
    async fn resolve(
        &self,
        name: &str,
        record_type: DnsRecordType,
        resolver: &ResolverIdentity,
    ) -> Result<Vec<RecordValue>, ResolveFailure>;
}

/// How the caller picked its resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverSelector {
    /// Host system configuration.
    System,
    /// Named preset from [`crate::config::RESOLVER_PRESETS`].
    Preset(&'static str),
    /// A single explicit nameserver.
    Nameserver(IpAddr),
}

impl ResolverSelector {
    /// A non-empty `nameserver` overrides `resolver_type`.
    pub fn parse(nameserver: Option<&str>, resolver_type: Option<&str>) -> ToolboxResult<Self> {
        if let Some(ns) = nameserver.map(str::trim).filter(|ns| !ns.is_empty()) {
            let ip: IpAddr = ns.parse().map_err(|_| {
                ToolboxError::ValidationError(format!("Invalid DNS server address: {ns}"))
            })?;
            return Ok(Self::Nameserver(ip));
        }

        match resolver_type.map(str::trim).filter(|t| !t.is_empty()) {
            None | Some("system") => Ok(Self::System),
            Some(name) => crate::config::RESOLVER_PRESETS
                .iter()
                .find(|(preset, _)| *preset == name)
                .map(|(preset, _)| Self::Preset(preset))
                .ok_or_else(|| {
                    ToolboxError::ValidationError(format!(
                        "Unsupported resolver type: {name}. Supported types: {}, system",
                        crate::config::RESOLVER_PRESETS
                            .iter()
                            .map(|(preset, _)| *preset)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                }),
        }
    }
}

/// Immutable description of the nameserver set a query goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverIdentity {
    id: String,
    resolver_type: String,
    nameservers: Vec<IpAddr>,
    timeout: Duration,
}

impl ResolverIdentity {
    pub fn from_selector(selector: &ResolverSelector, timeout: Duration) -> Self {
        match selector {
            ResolverSelector::System => Self {
                id: "system".to_string(),
                resolver_type: "system".to_string(),
                nameservers: Vec::new(),
                timeout,
            },
            ResolverSelector::Preset(name) => Self {
                id: (*name).to_string(),
                resolver_type: (*name).to_string(),
                nameservers: preset_nameservers(name)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|ip| ip.parse().ok())
                    .collect(),
                timeout,
            },
            ResolverSelector::Nameserver(ip) => Self {
                id: format!("custom-{ip}"),
                resolver_type: "custom".to_string(),
                nameservers: vec![*ip],
                timeout,
            },
        }
    }

    /// Rate-limiter key and report label.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Empty means "use the host configuration".
    pub fn nameservers(&self) -> &[IpAddr] {
        &self.nameservers
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Report label: the explicit nameserver address, else the resolver type.
    pub fn label(&self) -> String {
        match self.nameservers.first() {
            Some(ip) if self.resolver_type == "custom" => ip.to_string(),
            _ => self.resolver_type.clone(),
        }
    }

    pub fn info(&self) -> ResolverInfo {
        ResolverInfo {
            resolver_id: self.id.clone(),
            resolver_type: self.resolver_type.clone(),
            nameserver: (self.resolver_type == "custom")
                .then(|| self.nameservers.first().map(ToString::to_string))
                .flatten(),
            nameservers: self.nameservers.iter().map(ToString::to_string).collect(),
        }
    }
}

/// A resolver identity bound to a backend and the shared rate limiter.
#[derive(Clone)]
pub struct ResolverHandle {
    identity: Arc<ResolverIdentity>,
    backend: Arc<dyn DnsBackend>,
    limiter: Arc<RateLimiter>,
}

impl ResolverHandle {
    pub fn new(
        identity: ResolverIdentity,
        backend: Arc<dyn DnsBackend>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            identity: Arc::new(identity),
            backend,
            limiter,
        }
    }

    pub fn identity(&self) -> &ResolverIdentity {
        &self.identity
    }

    /// Rate-limited lookup returning formatted record strings in answer order.
    ///
    /// Backend failures are returned untouched.
    pub async fn query(
        &self,
        target: &str,
        record_type: DnsRecordType,
    ) -> Result<Vec<String>, ResolveFailure> {
        self.limiter.acquire(self.identity.id()).await;
        let values = self
            .backend
            .resolve(target, record_type, &self.identity)
            .await?;
        Ok(values.iter().map(ToString::to_string).collect())
    }
}

/// Reverse-zone name for an address (`in-addr.arpa` / `ip6.arpa`).
pub fn reverse_pointer_name(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{d}.{c}.{b}.{a}.in-addr.arpa")
        }
        IpAddr::V6(v6) => {
            let mut name = String::with_capacity(72);
            for byte in v6.octets().iter().rev() {
                let _ = write!(name, "{:x}.{:x}.", byte & 0x0f, byte >> 4);
            }
            name.push_str("ip6.arpa");
            name
        }
    }
}

/// [`DnsBackend`] backed by `hickory-resolver`.
///
/// A fresh resolver is built per lookup with the identity's nameservers and
/// timeout, and with the answer cache disabled so repeated queries measure
/// real round trips.
#[derive(Debug, Default, Clone, Copy)]
pub struct HickoryBackend;

impl HickoryBackend {
    /// One attempt per nameserver so the identity timeout bounds the lookup.
    fn resolver_opts(identity: &ResolverIdentity) -> ResolverOpts {
        let mut opts = ResolverOpts::default();
        opts.timeout = identity.timeout();
        opts.attempts = 1;
        opts.cache_size = 0;
        opts
    }

    fn build_resolver(identity: &ResolverIdentity) -> TokioResolver {
        let opts = Self::resolver_opts(identity);

        if !identity.nameservers().is_empty() {
            let config = ResolverConfig::from_parts(
                None,
                vec![],
                NameServerConfigGroup::from_ips_clear(identity.nameservers(), 53, true),
            );
            return TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
                .with_options(opts)
                .build();
        }

        #[cfg(any(unix, target_os = "windows"))]
        {
            match TokioResolver::builder_tokio() {
                Ok(mut builder) => {
                    *builder.options_mut() = opts;
                    return builder.build();
                }
                Err(e) => {
                    log::warn!(
                        "Failed to load system DNS configuration, falling back to defaults: {e}"
                    );
                }
            }
        }

        TokioResolver::builder_with_config(
            ResolverConfig::default(),
            TokioConnectionProvider::default(),
        )
        .with_options(opts)
        .build()
    }
}

#[async_trait]
impl DnsBackend for HickoryBackend {
    async fn resolve(
        &self,
        name: &str,
        record_type: DnsRecordType,
        resolver: &ResolverIdentity,
    ) -> Result<Vec<RecordValue>, ResolveFailure> {
        let wanted = to_hickory_type(record_type);
        let lookup = Self::build_resolver(resolver)
            .lookup(name, wanted)
            .await
            .map_err(|e| describe_failure(&e))?;

        Ok(lookup
            .record_iter()
            .filter(|record| record.record_type() == wanted)
            .filter_map(record_value)
            .collect())
    }
}

const fn to_hickory_type(record_type: DnsRecordType) -> RecordType {
    match record_type {
        DnsRecordType::A => RecordType::A,
        DnsRecordType::Aaaa => RecordType::AAAA,
        DnsRecordType::Mx => RecordType::MX,
        DnsRecordType::Txt => RecordType::TXT,
        DnsRecordType::Ns => RecordType::NS,
        DnsRecordType::Soa => RecordType::SOA,
        DnsRecordType::Cname => RecordType::CNAME,
        DnsRecordType::Caa => RecordType::CAA,
        DnsRecordType::Srv => RecordType::SRV,
        DnsRecordType::Ptr => RecordType::PTR,
    }
}

fn trim_root(name: &impl ToString) -> String {
    name.to_string().trim_end_matches('.').to_string()
}

fn record_value(record: &Record) -> Option<RecordValue> {
    let value = match record.data() {
        RData::A(a) => RecordValue::A(a.0),
        RData::AAAA(aaaa) => RecordValue::Aaaa(aaaa.0),
        RData::CNAME(cname) => RecordValue::Cname(trim_root(&cname.0)),
        RData::NS(ns) => RecordValue::Ns(trim_root(&ns.0)),
        RData::PTR(ptr) => RecordValue::Ptr(trim_root(&ptr.0)),
        RData::MX(mx) => RecordValue::Mx {
            priority: mx.preference(),
            host: trim_root(mx.exchange()),
        },
        RData::TXT(txt) => RecordValue::Txt {
            chunks: txt.iter().map(|chunk| chunk.to_vec()).collect(),
        },
        RData::SOA(soa) => RecordValue::Soa {
            mname: trim_root(soa.mname()),
            rname: trim_root(soa.rname()),
            serial: soa.serial(),
            refresh: soa.refresh(),
            retry: soa.retry(),
            expire: soa.expire(),
            minimum: soa.minimum(),
        },
        RData::SRV(srv) => RecordValue::Srv {
            priority: srv.priority(),
            weight: srv.weight(),
            port: srv.port(),
            target: trim_root(srv.target()),
        },
        RData::CAA(caa) => RecordValue::Caa {
            flags: if caa.issuer_critical() { 128 } else { 0 },
            tag: caa.tag().as_str().to_string(),
            value: String::from_utf8_lossy(caa.raw_value()).into_owned(),
        },
        other => {
            log::warn!("Unexpected RData in answer: {other:?}");
            return None;
        }
    };
    Some(value)
}

/// Flatten a hickory error into a message carrying the keywords the
/// classifier matches on.
fn describe_failure(err: &ResolveError) -> ResolveFailure {
    let message = err.to_string();
    let proto_kind = err.proto().map(hickory_resolver::proto::ProtoError::kind);
    let response_code = match proto_kind {
        Some(ProtoErrorKind::NoRecordsFound { response_code, .. }) => Some(*response_code),
        _ => None,
    };

    let message = if err.is_nx_domain() {
        format!("NXDOMAIN: {message}")
    } else if response_code == Some(ResponseCode::ServFail) {
        format!("SERVFAIL: {message}")
    } else if response_code == Some(ResponseCode::Refused) {
        format!("REFUSED: {message}")
    } else if err.is_no_records_found() {
        format!("No answer: {message}")
    } else if matches!(proto_kind, Some(ProtoErrorKind::Timeout)) {
        format!("Timeout: {message}")
    } else {
        message
    };

    ResolveFailure::new("ResolveError", message)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::MockBackend;
    use crate::types::ErrorKind;
    use hickory_resolver::proto::{op::Query, ProtoError};
    use hickory_resolver::Name;

    #[test]
    fn test_selector_nameserver_overrides_type() {
        let selector = ResolverSelector::parse(Some("1.1.1.1"), Some("google")).unwrap();
        assert_eq!(selector, ResolverSelector::Nameserver("1.1.1.1".parse().unwrap()));
    }

    #[test]
    fn test_selector_empty_nameserver_falls_back_to_type() {
        let selector = ResolverSelector::parse(Some("  "), Some("quad9")).unwrap();
        assert_eq!(selector, ResolverSelector::Preset("quad9"));
        assert_eq!(
            ResolverSelector::parse(None, None).unwrap(),
            ResolverSelector::System
        );
        assert_eq!(
            ResolverSelector::parse(None, Some("system")).unwrap(),
            ResolverSelector::System
        );
    }

    #[test]
    fn test_selector_rejects_bad_inputs() {
        assert!(matches!(
            ResolverSelector::parse(Some("not-an-ip"), None),
            Err(ToolboxError::ValidationError(_))
        ));
        let err = ResolverSelector::parse(None, Some("bogus")).unwrap_err();
        assert!(err.to_string().contains("bogus"));
        assert!(err.to_string().contains("cloudflare"));
    }

    #[test]
    fn test_identity_ids() {
        let timeout = Duration::from_secs(5);
        let custom = ResolverIdentity::from_selector(
            &ResolverSelector::Nameserver("9.9.9.9".parse().unwrap()),
            timeout,
        );
        assert_eq!(custom.id(), "custom-9.9.9.9");
        assert_eq!(custom.info().nameserver, Some("9.9.9.9".to_string()));
        assert_eq!(custom.label(), "9.9.9.9");

        let preset =
            ResolverIdentity::from_selector(&ResolverSelector::Preset("cloudflare"), timeout);
        assert_eq!(preset.id(), "cloudflare");
        assert_eq!(preset.nameservers().len(), 2);
        assert!(preset.info().nameserver.is_none());
        assert_eq!(preset.label(), "cloudflare");

        let system = ResolverIdentity::from_selector(&ResolverSelector::System, timeout);
        assert_eq!(system.id(), "system");
        assert!(system.nameservers().is_empty());
        assert_eq!(system.timeout(), timeout);
    }

    #[test]
    fn test_reverse_pointer_name_v4() {
        assert_eq!(
            reverse_pointer_name("8.8.4.4".parse().unwrap()),
            "4.4.8.8.in-addr.arpa"
        );
    }

    #[test]
    fn test_reverse_pointer_name_v6() {
        let name = reverse_pointer_name("2001:db8::1".parse().unwrap());
        assert_eq!(
            name,
            "1.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa"
        );
    }

    #[tokio::test]
    async fn test_handle_formats_records_and_keys_limiter() {
        let backend = Arc::new(MockBackend::new());
        backend
            .respond(
                "example.com",
                DnsRecordType::Mx,
                Ok(vec![
                    RecordValue::Mx {
                        priority: 10,
                        host: "mail.example.com".to_string(),
                    },
                    RecordValue::Mx {
                        priority: 20,
                        host: "backup.example.com".to_string(),
                    },
                ]),
            )
            .await;
        let limiter = Arc::new(RateLimiter::new(30));
        let handle = ResolverHandle::new(
            ResolverIdentity::from_selector(&ResolverSelector::Preset("google"), Duration::from_secs(5)),
            backend.clone(),
            Arc::clone(&limiter),
        );

        let records = handle.query("example.com", DnsRecordType::Mx).await.unwrap();
        assert_eq!(records, vec!["10 mail.example.com", "20 backup.example.com"]);

        let stats = limiter.stats().await;
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].key, "google");
        assert_eq!(backend.calls().await, vec![("example.com".to_string(), DnsRecordType::Mx)]);
    }

    #[tokio::test]
    async fn test_handle_passes_failure_through() {
        let backend = Arc::new(MockBackend::new());
        backend
            .respond(
                "gone.example",
                DnsRecordType::A,
                Err(ResolveFailure::new("ResolveError", "NXDOMAIN: gone")),
            )
            .await;
        let handle = ResolverHandle::new(
            ResolverIdentity::from_selector(&ResolverSelector::System, Duration::from_secs(5)),
            backend,
            Arc::new(RateLimiter::new(0)),
        );

        let err = handle.query("gone.example", DnsRecordType::A).await.unwrap_err();
        assert_eq!(err, ResolveFailure::new("ResolveError", "NXDOMAIN: gone"));
    }

    fn no_records_error(response_code: ResponseCode) -> ResolveError {
        let query = Query::query(Name::from_ascii("example.com.").unwrap(), RecordType::A);
        ProtoError::nx_error(Box::new(query), None, None, None, response_code, false, None).into()
    }

    #[test]
    fn test_describe_failure_tags_resolver_errors() {
        let cases = [
            (no_records_error(ResponseCode::NXDomain), "NXDOMAIN: ", ErrorKind::DomainNotFound),
            (no_records_error(ResponseCode::ServFail), "SERVFAIL: ", ErrorKind::ServerFailure),
            (no_records_error(ResponseCode::Refused), "REFUSED: ", ErrorKind::QueryRefused),
            (no_records_error(ResponseCode::NoError), "No answer: ", ErrorKind::NoRecords),
            (
                ResolveError::from(ProtoError::from(ProtoErrorKind::Timeout)),
                "Timeout: ",
                ErrorKind::Timeout,
            ),
        ];

        for (error, prefix, kind) in cases {
            let failure = describe_failure(&error);
            assert_eq!(failure.type_name, "ResolveError");
            assert!(failure.message.starts_with(prefix), "{failure}");
            assert_eq!(ErrorKind::classify(&failure.type_name, &failure.message), kind, "{failure}");
        }
    }

    #[test]
    fn test_resolver_opts_single_attempt_without_cache() {
        let identity = ResolverIdentity::from_selector(
            &ResolverSelector::Nameserver([9, 9, 9, 9].into()),
            Duration::from_secs(3),
        );
        let opts = HickoryBackend::resolver_opts(&identity);
        assert_eq!(opts.attempts, 1);
        assert_eq!(opts.timeout, Duration::from_secs(3));
        assert_eq!(opts.cache_size, 0);
    }

    #[test]
    fn test_hickory_type_mapping_is_total() {
        for record_type in DnsRecordType::ALL {
            assert_eq!(to_hickory_type(record_type).to_string(), record_type.as_str());
        }
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_hickory_backend_real_lookup() {
        let identity = ResolverIdentity::from_selector(
            &ResolverSelector::Preset("cloudflare"),
            Duration::from_secs(5),
        );
        let records = HickoryBackend
            .resolve("one.one.one.one", DnsRecordType::A, &identity)
            .await
            .unwrap();
        assert!(!records.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_hickory_backend_nxdomain_is_tagged() {
        let identity = ResolverIdentity::from_selector(
            &ResolverSelector::Preset("google"),
            Duration::from_secs(5),
        );
        let err = HickoryBackend
            .resolve("does-not-exist.invalid", DnsRecordType::A, &identity)
            .await
            .unwrap_err();
        assert!(err.message.starts_with("NXDOMAIN"), "{err}");
    }
}
