//! Record lookups: single, reverse, full-profile and bulk fan-out.

use std::collections::BTreeMap;
use std::net::IpAddr;

use crate::types::{
    BulkQueryEntry, BulkQueryReport, BulkReverseReport, DnsRecordType, ProfileReport,
    QueryOutcome, QueryReport, ReverseLookupReport,
};

use super::dispatcher::{Dispatcher, QueryTask, run_task};
use super::resolver::{ResolverHandle, reverse_pointer_name};
use super::stats::round_to;

/// Resolve one record type for one domain.
pub async fn query(handle: ResolverHandle, domain: String, record_type: DnsRecordType) -> QueryReport {
    let nameserver = handle.identity().label();
    let outcome = run_task(QueryTask::new(domain.clone(), record_type, handle, "query")).await;

    QueryReport {
        domain,
        record_type,
        nameserver,
        record_count: outcome.record_count(),
        outcome,
    }
}

fn reverse_task(handle: &ResolverHandle, ip: IpAddr, operation: &'static str) -> (String, QueryTask) {
    let reverse_domain = reverse_pointer_name(ip);
    let task = QueryTask::new(reverse_domain.clone(), DnsRecordType::Ptr, handle.clone(), operation)
        .with_context("ip", ip.to_string())
        .with_context("reverse_domain", reverse_domain.clone());
    (reverse_domain, task)
}

fn reverse_report(
    ip: IpAddr,
    reverse_domain: String,
    nameserver: String,
    outcome: QueryOutcome,
) -> ReverseLookupReport {
    let hostnames = outcome.records().map(<[String]>::to_vec);
    ReverseLookupReport {
        ip: ip.to_string(),
        reverse_domain,
        nameserver,
        hostname_count: hostnames.as_ref().map(Vec::len),
        hostnames,
        outcome,
    }
}

/// PTR lookup for one address.
pub async fn reverse_lookup(handle: ResolverHandle, ip: IpAddr) -> ReverseLookupReport {
    let (reverse_domain, task) = reverse_task(&handle, ip, "reverse_lookup");
    let outcome = run_task(task).await;

    reverse_report(ip, reverse_domain, handle.identity().label(), outcome)
}

/// Profile a domain across every common record type.
///
/// Empty answers are left out of `records`; failures are keyed by type in
/// `errors`.
pub async fn query_all(
    dispatcher: &Dispatcher,
    handle: ResolverHandle,
    domain: String,
    concurrency: usize,
) -> ProfileReport {
    let tasks = DnsRecordType::PROFILE
        .iter()
        .map(|rt| QueryTask::new(domain.clone(), *rt, handle.clone(), "query_all"))
        .collect();
    let round = dispatcher.run_all(tasks, concurrency).await;

    let mut records = BTreeMap::new();
    let mut errors = BTreeMap::new();
    for (record_type, outcome) in DnsRecordType::PROFILE.iter().zip(round.outcomes) {
        match outcome {
            QueryOutcome::Success { records: found, .. } if !found.is_empty() => {
                records.insert(record_type.to_string(), found);
            }
            QueryOutcome::Success { .. } => {}
            QueryOutcome::Failure { error, .. } => {
                errors.insert(record_type.to_string(), error);
            }
        }
    }

    let identity = handle.identity();
    ProfileReport {
        domain,
        nameserver: identity.label(),
        resolver_id: identity.id().to_string(),
        total_query_time_seconds: round.total_elapsed,
        record_types_found: records.len(),
        total_records: records.values().map(Vec::len).sum(),
        records,
        errors,
    }
}

// usize -> f64: list lengths are bounded by caller input, far below 2^52
#[allow(clippy::cast_precision_loss)]
fn average(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        round_to(total / count as f64, 3)
    }
}

/// Query the same record type for many domains.
pub async fn bulk_query(
    dispatcher: &Dispatcher,
    handle: ResolverHandle,
    domains: Vec<String>,
    record_type: DnsRecordType,
    max_workers: usize,
) -> BulkQueryReport {
    let tasks = domains
        .iter()
        .map(|domain| QueryTask::new(domain.clone(), record_type, handle.clone(), "bulk_query"))
        .collect();
    let round = dispatcher.run_all(tasks, max_workers).await;

    let results: Vec<BulkQueryEntry> = domains
        .into_iter()
        .zip(round.outcomes)
        .map(|(domain, outcome)| BulkQueryEntry {
            domain,
            record_type,
            record_count: outcome.record_count(),
            outcome,
        })
        .collect();
    let successful_queries = results.iter().filter(|r| r.outcome.is_success()).count();

    BulkQueryReport {
        bulk_query: true,
        record_type,
        nameserver: handle.identity().label(),
        domain_count: results.len(),
        successful_queries,
        failed_queries: results.len() - successful_queries,
        total_query_time_seconds: round.total_elapsed,
        average_query_time_seconds: average(round.total_elapsed, results.len()),
        results,
    }
}

/// PTR lookups for many addresses.
pub async fn bulk_reverse_lookup(
    dispatcher: &Dispatcher,
    handle: ResolverHandle,
    ips: Vec<IpAddr>,
    max_workers: usize,
) -> BulkReverseReport {
    let (reverse_domains, tasks): (Vec<_>, Vec<_>) = ips
        .iter()
        .map(|ip| reverse_task(&handle, *ip, "bulk_reverse_lookup"))
        .unzip();
    let round = dispatcher.run_all(tasks, max_workers).await;

    let nameserver = handle.identity().label();
    let results: Vec<ReverseLookupReport> = ips
        .into_iter()
        .zip(reverse_domains)
        .zip(round.outcomes)
        .map(|((ip, reverse_domain), outcome)| {
            reverse_report(ip, reverse_domain, nameserver.clone(), outcome)
        })
        .collect();
    let successful_queries = results.iter().filter(|r| r.outcome.is_success()).count();

    BulkReverseReport {
        bulk_reverse_lookup: true,
        nameserver,
        ip_count: results.len(),
        successful_queries,
        failed_queries: results.len() - successful_queries,
        total_query_time_seconds: round.total_elapsed,
        average_query_time_seconds: average(round.total_elapsed, results.len()),
        results,
    }
}
