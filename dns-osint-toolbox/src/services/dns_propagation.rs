//! DNS propagation check module.

use std::net::IpAddr;
use std::time::Duration;

use crate::types::{
    ConsistencyStatus, DnsRecordType, PropagationAnalysis, PropagationReport,
    PropagationResolverResult, ResponseGroup, TrustLevel,
};

use super::OsintService;
use super::dispatcher::QueryTask;
use super::resolver::{ResolverIdentity, ResolverSelector};
use super::stats::timing_stats;

/// One resolver taking part in a propagation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationResolver {
    pub name: String,
    pub ip: IpAddr,
}

/// Group successful answers by their sorted record list, keeping the order
/// in which each distinct answer first appeared.
fn group_responses(results: &[PropagationResolverResult]) -> Vec<ResponseGroup> {
    let mut groups: Vec<ResponseGroup> = Vec::new();

    for result in results {
        let Some(records) = result.outcome.records() else {
            continue;
        };
        let mut sorted = records.to_vec();
        sorted.sort();

        if let Some(group) = groups.iter_mut().find(|g| g.records == sorted) {
            group.resolvers.push(result.resolver.clone());
            group.resolver_count += 1;
        } else {
            groups.push(ResponseGroup {
                resolvers: vec![result.resolver.clone()],
                records: sorted,
                resolver_count: 1,
            });
        }
    }

    groups
}

fn analyse(
    is_consistent: bool,
    successful: usize,
    failed: usize,
    max_time: Option<f64>,
    slow_threshold: f64,
) -> PropagationAnalysis {
    // Zero successes is vacuously consistent but proves nothing.
    let trust_level = if !is_consistent || successful == 0 {
        TrustLevel::Low
    } else if failed == 0 {
        TrustLevel::High
    } else {
        TrustLevel::Medium
    };

    let mut potential_issues = Vec::new();
    if !is_consistent {
        potential_issues.extend(
            [
                "DNS response inconsistency detected",
                "Possible DNS cache poisoning",
                "Geographic DNS steering active",
                "DNS filtering or censorship",
                "Domain propagation still in progress",
            ]
            .map(String::from),
        );
    }
    if failed > successful {
        potential_issues.push("High resolver failure rate - possible blocking".to_string());
    }
    if max_time.is_some_and(|t| t > slow_threshold) {
        potential_issues.push("Slow DNS response detected".to_string());
    }

    PropagationAnalysis {
        consistency_status: if is_consistent {
            ConsistencyStatus::Consistent
        } else {
            ConsistencyStatus::Inconsistent
        },
        trust_level,
        potential_issues,
    }
}

/// Query every resolver concurrently and compare their answers.
pub async fn dns_propagation_check(
    service: &OsintService,
    domain: String,
    record_type: DnsRecordType,
    resolvers: Vec<PropagationResolver>,
    timeout: Duration,
) -> PropagationReport {
    let tasks = resolvers
        .iter()
        .map(|resolver| {
            // rate-limited by address; the name is only a label
            let handle = service.handle_for(ResolverIdentity::from_selector(
                &ResolverSelector::Nameserver(resolver.ip),
                timeout,
            ));
            QueryTask::new(domain.clone(), record_type, handle, "propagation_check")
                .with_context("resolver", resolver.name.clone())
                .with_context("resolver_ip", resolver.ip.to_string())
        })
        .collect();
    // every resolver at once
    let round = service.dispatcher.run_all(tasks, resolvers.len()).await;

    let resolver_results: Vec<PropagationResolverResult> = resolvers
        .into_iter()
        .zip(round.outcomes)
        .map(|(resolver, outcome)| PropagationResolverResult {
            resolver: resolver.name,
            resolver_ip: resolver.ip.to_string(),
            outcome,
        })
        .collect();

    let response_times: Vec<f64> = resolver_results
        .iter()
        .filter(|r| r.outcome.is_success())
        .map(|r| r.outcome.elapsed_seconds())
        .collect();
    let successful_queries = response_times.len();
    let failed_queries = resolver_results.len() - successful_queries;

    let response_groups = group_responses(&resolver_results);
    let is_consistent = response_groups.len() <= 1;
    let response_time_stats = timing_stats(&response_times, 3);

    log::debug!(
        "Propagation check for {domain} {record_type}: {successful_queries} ok, {failed_queries} failed, {} distinct answers",
        response_groups.len()
    );

    PropagationReport {
        total_resolvers_queried: resolver_results.len(),
        successful_queries,
        failed_queries,
        is_consistent,
        unique_response_count: response_groups.len(),
        total_query_time_seconds: round.total_elapsed,
        osint_analysis: analyse(
            is_consistent,
            successful_queries,
            failed_queries,
            response_time_stats.map(|s| s.max_time),
            service.config.slow_response_threshold_secs,
        ),
        response_time_stats,
        resolver_results,
        response_groups,
        domain,
        record_type,
    }
}
