//! Public types returned by toolbox operations.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::PerformanceRating;
use crate::error::ToolboxError;

/// DNS record type accepted by every query operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Mail exchange record.
    Mx,
    /// Text record.
    Txt,
    /// Name server record.
    Ns,
    /// Start of authority record.
    Soa,
    /// Canonical name (alias) record.
    Cname,
    /// Certificate Authority Authorization record.
    Caa,
    /// Service locator record.
    Srv,
    /// Pointer record (reverse DNS).
    Ptr,
}

impl DnsRecordType {
    /// Every supported type, in the canonical order.
    pub const ALL: [Self; 10] = [
        Self::A,
        Self::Aaaa,
        Self::Mx,
        Self::Txt,
        Self::Ns,
        Self::Soa,
        Self::Cname,
        Self::Caa,
        Self::Srv,
        Self::Ptr,
    ];

    /// Types queried when profiling a whole domain (PTR only makes sense for reverse zones).
    pub const PROFILE: [Self; 9] = [
        Self::A,
        Self::Aaaa,
        Self::Mx,
        Self::Txt,
        Self::Ns,
        Self::Soa,
        Self::Cname,
        Self::Caa,
        Self::Srv,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Mx => "MX",
            Self::Txt => "TXT",
            Self::Ns => "NS",
            Self::Soa => "SOA",
            Self::Cname => "CNAME",
            Self::Caa => "CAA",
            Self::Srv => "SRV",
            Self::Ptr => "PTR",
        }
    }
}

impl fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DnsRecordType {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| {
                ToolboxError::ValidationError(format!(
                    "Unsupported record type: {upper}. Supported types: {}",
                    Self::ALL.map(Self::as_str).join(", ")
                ))
            })
    }
}

/// Typed record data as returned by a [`DnsBackend`](crate::DnsBackend).
///
/// Domain names are stored without the trailing root dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValue {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(String),
    Ns(String),
    Ptr(String),
    Mx {
        priority: u16,
        host: String,
    },
    /// Character-strings exactly as received; decoded lossily on display.
    Txt {
        chunks: Vec<Vec<u8>>,
    },
    Soa {
        mname: String,
        rname: String,
        serial: u32,
        refresh: i32,
        retry: i32,
        expire: i32,
        minimum: u32,
    },
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    Caa {
        flags: u8,
        tag: String,
        value: String,
    },
}

impl RecordValue {
    pub const fn record_type(&self) -> DnsRecordType {
        match self {
            Self::A(_) => DnsRecordType::A,
            Self::Aaaa(_) => DnsRecordType::Aaaa,
            Self::Cname(_) => DnsRecordType::Cname,
            Self::Ns(_) => DnsRecordType::Ns,
            Self::Ptr(_) => DnsRecordType::Ptr,
            Self::Mx { .. } => DnsRecordType::Mx,
            Self::Txt { .. } => DnsRecordType::Txt,
            Self::Soa { .. } => DnsRecordType::Soa,
            Self::Srv { .. } => DnsRecordType::Srv,
            Self::Caa { .. } => DnsRecordType::Caa,
        }
    }
}

/// Flat, human-readable rendering used in every report.
///
/// - `MX`: `priority host`
/// - `SOA`: `mname rname serial refresh retry expire minimum`
/// - `TXT`: all character-strings concatenated
/// - `SRV`: `priority weight port target`
/// - `CAA`: `flags tag value`
impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(ip) => write!(f, "{ip}"),
            Self::Aaaa(ip) => write!(f, "{ip}"),
            Self::Cname(name) | Self::Ns(name) | Self::Ptr(name) => f.write_str(name),
            Self::Mx { priority, host } => write!(f, "{priority} {host}"),
            Self::Txt { chunks } => {
                for chunk in chunks {
                    f.write_str(&String::from_utf8_lossy(chunk))?;
                }
                Ok(())
            }
            Self::Soa {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => write!(
                f,
                "{mname} {rname} {serial} {refresh} {retry} {expire} {minimum}"
            ),
            Self::Srv {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{priority} {weight} {port} {target}"),
            Self::Caa { flags, tag, value } => write!(f, "{flags} {tag} {value}"),
        }
    }
}

/// Closed DNS failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DomainNotFound,
    NoRecords,
    Timeout,
    ServerFailure,
    QueryRefused,
    Unknown,
}

/// Static investigative guidance attached to a classified failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsintInsights {
    pub possible_scenarios: &'static [&'static str],
    pub investigation_tips: &'static [&'static str],
}

/// A DNS failure after classification.
///
/// Caller context (domain, resolver, operation...) is flattened next to the
/// classifier-owned fields, which it can never overwrite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedError {
    pub error: ErrorKind,
    /// Short type label (`NXDOMAIN`, `NoAnswer`, `Timeout`, `SERVFAIL`, `REFUSED`)
    /// or the raw failure type name when unclassified.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Raw failure message.
    pub details: String,
    /// UTC, RFC 3339.
    pub timestamp: String,
    #[serde(flatten)]
    pub context: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osint_insights: Option<OsintInsights>,
}

/// Result of a single query task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QueryOutcome {
    Success {
        records: Vec<String>,
        #[serde(rename = "query_time_seconds")]
        elapsed_seconds: f64,
    },
    Failure {
        error: ClassifiedError,
        #[serde(rename = "query_time_seconds")]
        elapsed_seconds: f64,
    },
}

impl QueryOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub const fn elapsed_seconds(&self) -> f64 {
        match self {
            Self::Success {
                elapsed_seconds, ..
            }
            | Self::Failure {
                elapsed_seconds, ..
            } => *elapsed_seconds,
        }
    }

    /// Records of a successful outcome; `None` for failures.
    pub fn records(&self) -> Option<&[String]> {
        match self {
            Self::Success { records, .. } => Some(records),
            Self::Failure { .. } => None,
        }
    }

    pub fn record_count(&self) -> Option<usize> {
        self.records().map(<[String]>::len)
    }

    pub const fn error(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}

/// Descriptive latency statistics, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingStats {
    pub min_time: f64,
    pub max_time: f64,
    pub avg_time: f64,
    pub median_time: f64,
    /// Sample standard deviation; only with two or more samples.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
}

/// Which resolver answered an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverInfo {
    pub resolver_id: String,
    pub resolver_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nameserver: Option<String>,
    /// Effective nameserver addresses; empty when the host configuration is used.
    pub nameservers: Vec<String>,
}

/// `dns_query` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryReport {
    pub domain: String,
    pub record_type: DnsRecordType,
    /// Resolver identity that served the query.
    pub nameserver: String,
    /// Number of answers; present on success only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<usize>,
    #[serde(flatten)]
    pub outcome: QueryOutcome,
}

/// `dns_reverse_lookup` result; also one entry of a bulk reverse lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReverseLookupReport {
    pub ip: String,
    pub reverse_domain: String,
    pub nameserver: String,
    /// PTR hostnames; present on success only, mirroring `records`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostnames: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname_count: Option<usize>,
    #[serde(flatten)]
    pub outcome: QueryOutcome,
}

/// `dns_query_all` result: one domain profiled across all common types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileReport {
    pub domain: String,
    pub nameserver: String,
    pub resolver_id: String,
    pub total_query_time_seconds: f64,
    /// Non-empty answers keyed by record type.
    pub records: BTreeMap<String, Vec<String>>,
    pub record_types_found: usize,
    pub total_records: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, ClassifiedError>,
}

/// One domain of a bulk query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkQueryEntry {
    pub domain: String,
    pub record_type: DnsRecordType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<usize>,
    #[serde(flatten)]
    pub outcome: QueryOutcome,
}

/// `dns_bulk_query` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkQueryReport {
    pub bulk_query: bool,
    pub record_type: DnsRecordType,
    pub nameserver: String,
    pub domain_count: usize,
    pub successful_queries: usize,
    pub failed_queries: usize,
    pub total_query_time_seconds: f64,
    pub average_query_time_seconds: f64,
    pub results: Vec<BulkQueryEntry>,
}

/// `dns_bulk_reverse_lookup` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkReverseReport {
    pub bulk_reverse_lookup: bool,
    pub nameserver: String,
    pub ip_count: usize,
    pub successful_queries: usize,
    pub failed_queries: usize,
    pub total_query_time_seconds: f64,
    pub average_query_time_seconds: f64,
    pub results: Vec<ReverseLookupReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyStatus {
    Consistent,
    Inconsistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustLevel {
    High,
    Medium,
    Low,
}

/// Answer of one resolver in a propagation check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropagationResolverResult {
    pub resolver: String,
    pub resolver_ip: String,
    #[serde(flatten)]
    pub outcome: QueryOutcome,
}

/// Resolvers that returned the same (sorted) record list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseGroup {
    pub resolvers: Vec<String>,
    pub records: Vec<String>,
    pub resolver_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropagationAnalysis {
    pub consistency_status: ConsistencyStatus,
    pub trust_level: TrustLevel,
    pub potential_issues: Vec<String>,
}

/// `dns_propagation_check` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropagationReport {
    pub domain: String,
    pub record_type: DnsRecordType,
    pub total_resolvers_queried: usize,
    pub successful_queries: usize,
    pub failed_queries: usize,
    pub is_consistent: bool,
    pub unique_response_count: usize,
    pub total_query_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_stats: Option<TimingStats>,
    pub resolver_results: Vec<PropagationResolverResult>,
    pub response_groups: Vec<ResponseGroup>,
    pub osint_analysis: PropagationAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// One step toward [`RiskLevel::Low`].
    pub const fn downgraded(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }
}

/// A single random-subdomain probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WildcardProbe {
    pub test_domain: String,
    pub record_type: DnsRecordType,
    pub has_wildcard: bool,
    #[serde(flatten)]
    pub outcome: QueryOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatternAnalysis {
    pub single_target: bool,
    pub multiple_targets: bool,
}

/// Wildcard verdict for one record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WildcardTypeAnalysis {
    pub detected: bool,
    /// Distinct values seen across all probes, sorted.
    pub unique_records: Vec<String>,
    pub record_count: usize,
    pub pattern_analysis: PatternAnalysis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WildcardInsights {
    pub risk_level: RiskLevel,
    pub security_implications: Vec<String>,
    pub investigation_notes: Vec<String>,
}

/// `dns_wildcard_check` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WildcardReport {
    pub domain: String,
    pub test_subdomains: Vec<String>,
    pub test_count: u32,
    pub has_wildcard: bool,
    /// Keyed by record type (`A`, `CNAME`).
    pub wildcard_analysis: BTreeMap<String, WildcardTypeAnalysis>,
    pub total_query_time_seconds: f64,
    pub resolver_info: ResolverInfo,
    pub test_results: Vec<WildcardProbe>,
    pub osint_insights: WildcardInsights,
}

/// Outlier detection over a latency series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalySummary {
    pub anomalous_times: Vec<f64>,
    pub anomaly_count: usize,
    pub anomaly_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseTimeAnalysis {
    #[serde(flatten)]
    pub stats: TimingStats,
    /// Present with two or more successful samples.
    #[serde(flatten)]
    pub anomalies: Option<AnomalySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationError {
    /// 1-based.
    pub iteration: u32,
    pub query_time_seconds: f64,
    pub error: ClassifiedError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyDetection {
    Detected,
    #[serde(rename = "NONE")]
    NotDetected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingInsights {
    pub performance_rating: PerformanceRating,
    pub anomaly_detection: AnomalyDetection,
    pub potential_issues: Vec<String>,
    pub investigation_tips: Vec<String>,
}

/// `dns_response_analysis` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseAnalysisReport {
    pub domain: String,
    pub record_type: DnsRecordType,
    pub iterations: u32,
    pub successful_queries: usize,
    pub failed_queries: usize,
    pub failure_rate: f64,
    pub total_analysis_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_analysis: Option<ResponseTimeAnalysis>,
    pub errors: Vec<IterationError>,
    pub resolver_info: ResolverInfo,
    pub osint_insights: TimingInsights,
}

/// Snapshot of one rate-limiter bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimiterStat {
    pub key: String,
    pub rate_limit: u32,
    pub available_tokens: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_parse_case_insensitive() {
        assert_eq!("aaaa".parse::<DnsRecordType>().unwrap(), DnsRecordType::Aaaa);
        assert_eq!(" Mx ".parse::<DnsRecordType>().unwrap(), DnsRecordType::Mx);
        assert_eq!("cname".parse::<DnsRecordType>().unwrap(), DnsRecordType::Cname);
    }

    #[test]
    fn test_record_type_parse_rejects_unknown() {
        let err = "AXFR".parse::<DnsRecordType>().unwrap_err();
        assert!(matches!(err, ToolboxError::ValidationError(_)));
        assert!(err.to_string().contains("AXFR"));
        assert!(err.to_string().contains("PTR"));
    }

    #[test]
    fn test_record_type_serde_uppercase() {
        assert_eq!(serde_json::to_string(&DnsRecordType::Aaaa).unwrap(), "\"AAAA\"");
        let parsed: DnsRecordType = serde_json::from_str("\"SRV\"").unwrap();
        assert_eq!(parsed, DnsRecordType::Srv);
    }

    #[test]
    fn test_profile_excludes_ptr() {
        assert!(!DnsRecordType::PROFILE.contains(&DnsRecordType::Ptr));
        assert_eq!(DnsRecordType::PROFILE.len(), 9);
    }

    #[test]
    fn test_format_mx() {
        let mx = RecordValue::Mx {
            priority: 10,
            host: "mail.example.com".to_string(),
        };
        assert_eq!(mx.to_string(), "10 mail.example.com");
    }

    #[test]
    fn test_format_srv() {
        let srv = RecordValue::Srv {
            priority: 1,
            weight: 2,
            port: 3,
            target: "t.example.com".to_string(),
        };
        assert_eq!(srv.to_string(), "1 2 3 t.example.com");
    }

    #[test]
    fn test_format_soa() {
        let soa = RecordValue::Soa {
            mname: "ns1.example.com".to_string(),
            rname: "hostmaster.example.com".to_string(),
            serial: 2_024_010_101,
            refresh: 7200,
            retry: 3600,
            expire: 1_209_600,
            minimum: 300,
        };
        assert_eq!(
            soa.to_string(),
            "ns1.example.com hostmaster.example.com 2024010101 7200 3600 1209600 300"
        );
    }

    #[test]
    fn test_format_txt_concatenates_and_decodes_lossily() {
        let txt = RecordValue::Txt {
            chunks: vec![b"v=spf1 ".to_vec(), b"-all".to_vec(), vec![0xff]],
        };
        assert_eq!(txt.to_string(), "v=spf1 -all\u{fffd}");
    }

    #[test]
    fn test_format_caa_and_addresses() {
        let caa = RecordValue::Caa {
            flags: 0,
            tag: "issue".to_string(),
            value: "letsencrypt.org".to_string(),
        };
        assert_eq!(caa.to_string(), "0 issue letsencrypt.org");
        assert_eq!(RecordValue::A(Ipv4Addr::new(1, 2, 3, 4)).to_string(), "1.2.3.4");
        assert_eq!(RecordValue::Aaaa(Ipv6Addr::LOCALHOST).to_string(), "::1");
        assert_eq!(
            RecordValue::Ptr("dns.google".to_string()).to_string(),
            "dns.google"
        );
    }

    #[test]
    fn test_record_value_type() {
        assert_eq!(
            RecordValue::Cname("a.example.com".to_string()).record_type(),
            DnsRecordType::Cname
        );
        assert_eq!(
            RecordValue::Txt { chunks: vec![] }.record_type(),
            DnsRecordType::Txt
        );
    }

    #[test]
    fn test_risk_level_downgrade() {
        assert_eq!(RiskLevel::High.downgraded(), RiskLevel::Medium);
        assert_eq!(RiskLevel::Medium.downgraded(), RiskLevel::Low);
        assert_eq!(RiskLevel::Low.downgraded(), RiskLevel::Low);
    }

    #[test]
    fn test_outcome_serializes_flat_with_status_tag() {
        let entry = BulkQueryEntry {
            domain: "a.com".to_string(),
            record_type: DnsRecordType::A,
            record_count: Some(1),
            outcome: QueryOutcome::Success {
                records: vec!["1.2.3.4".to_string()],
                elapsed_seconds: 0.012,
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["domain"], "a.com");
        assert_eq!(json["record_type"], "A");
        assert_eq!(json["records"][0], "1.2.3.4");
        assert_eq!(json["query_time_seconds"], 0.012);
        assert_eq!(json["record_count"], 1);
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = QueryOutcome::Success {
            records: vec!["x".to_string()],
            elapsed_seconds: 0.5,
        };
        assert!(ok.is_success());
        assert_eq!(ok.records(), Some(&["x".to_string()][..]));
        assert!(ok.error().is_none());
        assert_eq!(ok.record_count(), Some(1));
        assert!((ok.elapsed_seconds() - 0.5).abs() < f64::EPSILON);
    }
}
