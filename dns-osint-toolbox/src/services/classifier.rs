//! DNS failure classification with OSINT guidance.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};

use crate::types::{ClassifiedError, ErrorKind, OsintInsights};

use super::resolver::ResolveFailure;

/// Keys written by the classifier; caller context never replaces them.
const OWNED_KEYS: [&str; 5] = ["error", "type", "details", "timestamp", "osint_insights"];

impl ErrorKind {
    /// Classify a raw failure by its type name and message.
    ///
    /// Patterns are checked in order and the first match wins, since resolver
    /// messages frequently mention more than one condition.
    pub fn classify(type_name: &str, message: &str) -> Self {
        if message.contains("NXDOMAIN") || message.contains("No such domain") {
            Self::DomainNotFound
        } else if message.contains("No answer") || message.contains("NODATA") {
            Self::NoRecords
        } else if message.to_lowercase().contains("timeout") || type_name.contains("Timeout") {
            Self::Timeout
        } else if message.contains("SERVFAIL") {
            Self::ServerFailure
        } else if message.contains("REFUSED") {
            Self::QueryRefused
        } else {
            Self::Unknown
        }
    }

    /// Short label reported in the `type` field; `None` for [`ErrorKind::Unknown`].
    pub const fn type_label(self) -> Option<&'static str> {
        match self {
            Self::DomainNotFound => Some("NXDOMAIN"),
            Self::NoRecords => Some("NoAnswer"),
            Self::Timeout => Some("Timeout"),
            Self::ServerFailure => Some("SERVFAIL"),
            Self::QueryRefused => Some("REFUSED"),
            Self::Unknown => None,
        }
    }

    pub const fn insights(self) -> Option<OsintInsights> {
        match self {
            Self::DomainNotFound => Some(OsintInsights {
                possible_scenarios: &[
                    "Domain never existed (typosquatting target)",
                    "Domain expired (abandoned infrastructure)",
                    "Domain suspended (possible takedown)",
                    "DNS configuration error",
                ],
                investigation_tips: &[
                    "Check historical DNS records",
                    "Search for similar domain variations",
                    "Verify domain registration status",
                ],
            }),
            Self::NoRecords => Some(OsintInsights {
                possible_scenarios: &[
                    "Record type not configured",
                    "Selective DNS response (geo-blocking)",
                    "DNS filtering/sinkholing",
                ],
                investigation_tips: &[
                    "Try different record types",
                    "Query from different resolver locations",
                    "Check if domain is parked",
                ],
            }),
            Self::Timeout => Some(OsintInsights {
                possible_scenarios: &[
                    "Slow/overloaded nameserver",
                    "Network filtering",
                    "DDoS protection triggering",
                ],
                investigation_tips: &[
                    "Retry with longer timeout",
                    "Try alternative resolver",
                    "Check nameserver health",
                ],
            }),
            Self::ServerFailure => Some(OsintInsights {
                possible_scenarios: &[
                    "Authoritative server error",
                    "DNSSEC validation failure",
                    "Nameserver misconfiguration",
                ],
                investigation_tips: &[
                    "Try different resolver",
                    "Check DNSSEC status",
                    "Verify nameserver configuration",
                ],
            }),
            Self::QueryRefused => Some(OsintInsights {
                possible_scenarios: &[
                    "Recursive queries disabled",
                    "Access control restrictions",
                    "Rate limiting active",
                ],
                investigation_tips: &[
                    "Try authoritative nameserver",
                    "Use different source IP",
                    "Reduce query rate",
                ],
            }),
            Self::Unknown => None,
        }
    }
}

/// Classify `failure` and attach caller `context`.
pub fn classify(failure: &ResolveFailure, context: BTreeMap<String, String>) -> ClassifiedError {
    let kind = ErrorKind::classify(&failure.type_name, &failure.message);

    let context = context
        .into_iter()
        .filter(|(key, _)| !OWNED_KEYS.contains(&key.as_str()))
        .collect();

    ClassifiedError {
        error: kind,
        error_type: kind
            .type_label()
            .map_or_else(|| failure.type_name.clone(), str::to_string),
        details: failure.message.clone(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        context,
        osint_insights: kind.insights(),
    }
}

/// Build a context map from `(key, value)` pairs.
pub(crate) fn context<I, K, V>(pairs: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
