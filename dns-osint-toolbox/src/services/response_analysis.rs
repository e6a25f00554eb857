//! Response-time sampling and anomaly detection.

use tokio::time::{Duration, Instant, sleep};

use crate::config::{OsintConfig, PerformanceRating};
use crate::types::{
    AnomalyDetection, AnomalySummary, DnsRecordType, IterationError, ResponseAnalysisReport,
    ResponseTimeAnalysis, TimingInsights,
};

use super::OsintService;
use super::classifier::{classify, context};
use super::resolver::ResolverHandle;
use super::stats::{mean, round_to, sample_std_dev, timing_stats};

const INVESTIGATION_TIPS: [&str; 4] = [
    "Compare response times across different resolvers",
    "Test from different network locations if possible",
    "Monitor for patterns in failure timing",
    "Check if anomalies correlate with specific query types",
];

/// Outliers above `mean + multiplier * stdev`; needs two or more samples.
fn detect_anomalies(samples: &[f64], multiplier: f64) -> Option<AnomalySummary> {
    let std_dev = sample_std_dev(samples)?;
    let threshold = multiplier.mul_add(std_dev, mean(samples));
    let anomalous_times: Vec<f64> = samples
        .iter()
        .filter(|t| **t > threshold)
        .map(|t| round_to(*t, 4))
        .collect();

    Some(AnomalySummary {
        anomaly_count: anomalous_times.len(),
        anomalous_times,
        anomaly_threshold: round_to(threshold, 4),
    })
}

fn potential_issues(
    config: &OsintConfig,
    analysis: Option<&ResponseTimeAnalysis>,
    failed: usize,
    failure_rate: f64,
) -> Vec<String> {
    let mut issues = Vec::new();
    let stats = analysis.map(|a| a.stats);
    let anomaly_count = analysis
        .and_then(|a| a.anomalies.as_ref())
        .map_or(0, |a| a.anomaly_count);

    if failure_rate > config.high_failure_rate_threshold {
        issues.push("High failure rate - possible blocking or filtering".to_string());
    }
    if stats.is_some_and(|s| s.avg_time > config.performance_thresholds.poor) {
        issues.push("Very slow responses - infrastructure issues".to_string());
    }
    if stats
        .and_then(|s| s.std_dev)
        .is_some_and(|sd| sd > config.high_variance_threshold)
    {
        issues.push("High response time variance - unstable performance".to_string());
    }
    if anomaly_count > 0 {
        issues.push(format!(
            "Response time anomalies detected ({anomaly_count} outliers)"
        ));
    }
    if failed > 0 && failure_rate < 1.0 {
        issues.push("Intermittent failures - possible rate limiting".to_string());
    }
    if issues.is_empty() {
        issues.push("No significant issues detected".to_string());
    }
    issues
}

/// Query `domain` `iterations` times in sequence and analyse the latencies.
pub async fn dns_response_analysis(
    service: &OsintService,
    handle: ResolverHandle,
    domain: String,
    record_type: DnsRecordType,
    iterations: u32,
) -> ResponseAnalysisReport {
    let config = &service.config;
    let delay = Duration::from_secs_f64(config.analysis_delay_secs);
    let started = Instant::now();

    let mut response_times = Vec::new();
    let mut errors = Vec::new();

    for iteration in 1..=iterations {
        let query_started = Instant::now();
        let result = handle.query(&domain, record_type).await;
        let elapsed = query_started.elapsed().as_secs_f64();

        match result {
            Ok(_) => response_times.push(elapsed),
            Err(failure) => errors.push(IterationError {
                iteration,
                query_time_seconds: round_to(elapsed, 3),
                error: classify(
                    &failure,
                    context([
                        ("domain", domain.clone()),
                        ("record_type", record_type.to_string()),
                        ("iteration", iteration.to_string()),
                        ("resolver", handle.identity().id().to_string()),
                        ("operation", "response_analysis".to_string()),
                    ]),
                ),
            }),
        }

        if iteration < iterations && !delay.is_zero() {
            sleep(delay).await;
        }
    }

    let total_analysis_time_seconds = round_to(started.elapsed().as_secs_f64(), 3);

    let response_time_analysis = timing_stats(&response_times, 4).map(|stats| ResponseTimeAnalysis {
        stats,
        anomalies: detect_anomalies(&response_times, config.anomaly_threshold_multiplier),
    });

    let failed_queries = errors.len();
    // counts are at most max_analysis_iterations
    #[allow(clippy::cast_precision_loss)]
    let failure_rate = if iterations == 0 {
        0.0
    } else {
        round_to(failed_queries as f64 / f64::from(iterations), 3)
    };

    let performance_rating = response_time_analysis
        .as_ref()
        .map_or(PerformanceRating::Unknown, |a| {
            config.performance_rating(a.stats.avg_time)
        });
    let anomaly_detection = if response_time_analysis
        .as_ref()
        .and_then(|a| a.anomalies.as_ref())
        .is_some_and(|a| a.anomaly_count > 0)
    {
        AnomalyDetection::Detected
    } else {
        AnomalyDetection::NotDetected
    };

    ResponseAnalysisReport {
        osint_insights: TimingInsights {
            performance_rating,
            anomaly_detection,
            potential_issues: potential_issues(
                config,
                response_time_analysis.as_ref(),
                failed_queries,
                failure_rate,
            ),
            investigation_tips: INVESTIGATION_TIPS.map(String::from).to_vec(),
        },
        domain,
        record_type,
        iterations,
        successful_queries: response_times.len(),
        failed_queries,
        failure_rate,
        total_analysis_time_seconds,
        response_time_analysis,
        errors,
        resolver_info: handle.identity().info(),
    }
}
