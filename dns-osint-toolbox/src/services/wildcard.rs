//! Wildcard DNS detection via random subdomain probes.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::config::is_cdn_related;
use crate::types::{
    DnsRecordType, PatternAnalysis, RiskLevel, WildcardInsights, WildcardProbe, WildcardReport,
    WildcardTypeAnalysis,
};

use super::OsintService;
use super::dispatcher::QueryTask;
use super::resolver::ResolverHandle;

/// Record types probed for every random subdomain.
const PROBE_TYPES: [DnsRecordType; 2] = [DnsRecordType::A, DnsRecordType::Cname];

const LABEL_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

const INVESTIGATION_NOTES: [&str; 4] = [
    "Wildcard DNS can be legitimate (CDN/hosting) or suspicious (phishing)",
    "Check domain registration age and reputation",
    "Monitor for suspicious subdomain creation patterns",
    "Verify wildcard targets against known good infrastructure",
];

/// Lowercase alphanumeric label from the thread-local CSPRNG.
fn random_label(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(LABEL_ALPHABET[rng.random_range(0..LABEL_ALPHABET.len())]))
        .collect()
}

fn type_analysis(probes: &[WildcardProbe], record_type: DnsRecordType) -> WildcardTypeAnalysis {
    let mut detected = false;
    let mut unique = BTreeSet::new();
    for probe in probes.iter().filter(|p| p.record_type == record_type) {
        if probe.has_wildcard {
            detected = true;
        }
        if let Some(records) = probe.outcome.records() {
            unique.extend(records.iter().cloned());
        }
    }

    let unique_records: Vec<String> = unique.into_iter().collect();
    WildcardTypeAnalysis {
        detected,
        record_count: unique_records.len(),
        pattern_analysis: PatternAnalysis {
            single_target: unique_records.len() == 1,
            multiple_targets: unique_records.len() > 1,
        },
        unique_records,
    }
}

fn insights(analysis: &BTreeMap<String, WildcardTypeAnalysis>) -> WildcardInsights {
    let mut security_implications = Vec::new();
    let has_wildcard = analysis.values().any(|a| a.detected);

    let risk_level = if has_wildcard {
        security_implications.extend(
            [
                "All subdomains resolve to same target",
                "Potential for subdomain confusion attacks",
                "May indicate shared hosting environment",
            ]
            .map(String::from),
        );

        let mut risk = RiskLevel::Medium;
        if analysis.values().any(|a| a.pattern_analysis.multiple_targets) {
            risk = RiskLevel::High;
            security_implications.push("Multiple wildcard targets - unusual configuration".to_string());
        }

        let cdn = analysis
            .values()
            .flat_map(|a| a.unique_records.iter())
            .any(|record| is_cdn_related(record));
        if cdn {
            risk = risk.downgraded();
            security_implications.push("CDN/hosting wildcard detected - likely legitimate".to_string());
        }
        risk
    } else {
        security_implications
            .push("No wildcard DNS detected - specific subdomain configuration".to_string());
        RiskLevel::Low
    };

    WildcardInsights {
        risk_level,
        security_implications,
        investigation_notes: INVESTIGATION_NOTES.map(String::from).to_vec(),
    }
}

/// Probe `test_count` random subdomains of `domain` for A and CNAME answers.
pub async fn dns_wildcard_check(
    service: &OsintService,
    handle: ResolverHandle,
    domain: String,
    test_count: u32,
) -> WildcardReport {
    let test_subdomains: Vec<String> = (0..test_count)
        .map(|_| format!("{}.{domain}", random_label(service.config.wildcard_label_length)))
        .collect();

    let probes: Vec<(String, DnsRecordType)> = test_subdomains
        .iter()
        .flat_map(|name| PROBE_TYPES.map(|rt| (name.clone(), rt)))
        .collect();
    let tasks = probes
        .iter()
        .map(|(name, rt)| QueryTask::new(name.clone(), *rt, handle.clone(), "wildcard_test"))
        .collect::<Vec<_>>();
    let concurrency = tasks.len();
    let round = service.dispatcher.run_all(tasks, concurrency).await;

    let test_results: Vec<WildcardProbe> = probes
        .into_iter()
        .zip(round.outcomes)
        .map(|((test_domain, record_type), outcome)| WildcardProbe {
            test_domain,
            record_type,
            has_wildcard: outcome.records().is_some_and(|r| !r.is_empty()),
            outcome,
        })
        .collect();

    let wildcard_analysis: BTreeMap<String, WildcardTypeAnalysis> = PROBE_TYPES
        .iter()
        .map(|rt| (rt.to_string(), type_analysis(&test_results, *rt)))
        .collect();
    let has_wildcard = wildcard_analysis.values().any(|a| a.detected);
    let osint_insights = insights(&wildcard_analysis);

    log::debug!(
        "Wildcard check for {domain}: detected={has_wildcard}, risk={:?}",
        osint_insights.risk_level
    );

    WildcardReport {
        domain,
        test_subdomains,
        test_count,
        has_wildcard,
        wildcard_analysis,
        total_query_time_seconds: round.total_elapsed,
        resolver_info: handle.identity().info(),
        test_results,
        osint_insights,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::config::OsintConfig;
    use crate::services::resolver::{
        DnsBackend, ResolveFailure, ResolverIdentity, ResolverSelector,
    };
    use crate::test_utils::MockBackend;
    use crate::types::RecordValue;

    async fn run(backend: Arc<dyn DnsBackend>, test_count: u32) -> WildcardReport {
        let service = OsintService::new(OsintConfig::default(), backend).unwrap();
        let handle = service.handle_for(ResolverIdentity::from_selector(
            &ResolverSelector::System,
            Duration::from_secs(5),
        ));
        dns_wildcard_check(&service, handle, "example.com".to_string(), test_count).await
    }

    /// Answers every probe of one type with the value computed from the probe name.
    struct PerNameBackend {
        record_type: DnsRecordType,
        value: fn(&str) -> RecordValue,
    }

    #[async_trait]
    impl DnsBackend for PerNameBackend {
        async fn resolve(
            &self,
            name: &str,
            record_type: DnsRecordType,
            _resolver: &ResolverIdentity,
        ) -> Result<Vec<RecordValue>, ResolveFailure> {
            if record_type == self.record_type {
                Ok(vec![(self.value)(name)])
            } else {
                Err(ResolveFailure::new("ResolveError", "No answer"))
            }
        }
    }

    #[test]
    fn test_random_label_shape() {
        let label = random_label(32);
        assert_eq!(label.len(), 32);
        assert!(label.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
        assert_ne!(random_label(32), label);
    }

    #[tokio::test]
    async fn test_no_wildcard_low_risk() {
        let backend = Arc::new(MockBackend::new());
        let report = run(backend.clone(), 3).await;

        assert!(!report.has_wildcard);
        assert_eq!(report.test_subdomains.len(), 3);
        assert_eq!(report.test_results.len(), 6);
        assert_eq!(backend.calls().await.len(), 6);
        assert!(report.test_subdomains.iter().all(|d| d.ends_with(".example.com")));
        assert!(!report.wildcard_analysis["A"].detected);
        assert!(!report.wildcard_analysis["CNAME"].detected);
        assert_eq!(report.osint_insights.risk_level, RiskLevel::Low);
        assert_eq!(report.osint_insights.investigation_notes.len(), 4);
        let probe_error = report.test_results[0].outcome.error().unwrap();
        assert_eq!(probe_error.context["operation"], "wildcard_test");
    }

    #[tokio::test]
    async fn test_single_target_medium_risk() {
        let backend = Arc::new(
            MockBackend::new().with_default(Ok(vec![RecordValue::A([203, 0, 113, 10].into())])),
        );
        let report = run(backend, 3).await;

        assert!(report.has_wildcard);
        let a = &report.wildcard_analysis["A"];
        assert!(a.detected);
        assert_eq!(a.unique_records, ["203.0.113.10"]);
        assert!(a.pattern_analysis.single_target);
        assert_eq!(report.osint_insights.risk_level, RiskLevel::Medium);
        assert!(report.test_results.iter().all(|p| p.has_wildcard));
    }

    #[tokio::test]
    async fn test_multiple_targets_high_risk() {
        let backend = Arc::new(PerNameBackend {
            record_type: DnsRecordType::A,
            // distinct address per probe name
            value: |name| RecordValue::A([198, 51, 100, name.as_bytes()[0]].into()),
        });
        let report = run(backend, 10).await;

        assert!(report.wildcard_analysis["A"].pattern_analysis.multiple_targets);
        assert!(!report.wildcard_analysis["CNAME"].detected);
        assert_eq!(report.osint_insights.risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_cdn_target_downgrades_risk() {
        let backend = Arc::new(PerNameBackend {
            record_type: DnsRecordType::Cname,
            value: |_| RecordValue::Cname("edge.cloudfront.net".to_string()),
        });
        let report = run(backend, 2).await;

        assert!(report.wildcard_analysis["CNAME"].detected);
        assert_eq!(report.osint_insights.risk_level, RiskLevel::Low);
        assert!(report
            .osint_insights
            .security_implications
            .iter()
            .any(|s| s.starts_with("CDN/hosting wildcard")));
    }

    #[tokio::test]
    async fn test_empty_answers_are_not_wildcards() {
        let backend = Arc::new(MockBackend::new().with_default(Ok(vec![])));
        let report = run(backend, 1).await;

        assert!(!report.has_wildcard);
        assert!(report.test_results.iter().all(|p| !p.has_wildcard));
    }

    #[test]
    fn test_insights_high_with_cdn_becomes_medium() {
        let analysis = BTreeMap::from([(
            "A".to_string(),
            WildcardTypeAnalysis {
                detected: true,
                unique_records: vec!["a.akamai.net".to_string(), "b.akamai.net".to_string()],
                record_count: 2,
                pattern_analysis: PatternAnalysis {
                    single_target: false,
                    multiple_targets: true,
                },
            },
        )]);
        assert_eq!(insights(&analysis).risk_level, RiskLevel::Medium);
    }
}
