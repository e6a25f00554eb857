//! DNS OSINT toolbox
//!
//! 面向情报侦察的 DNS 查询引擎：限速的并发批量查询、传播一致性分析、泛解析检测、
//! 响应时间异常检测。每个 DNS 失败都被分类并附带调查建议，以数据形式返回。

mod config;
mod error;
mod services;
mod types;

#[cfg(test)]
mod test_utils;

pub use config::{
    CDN_INDICATORS, DEFAULT_PROPAGATION_RESOLVERS, OsintConfig, PerformanceRating,
    PerformanceThresholds, RESOLVER_PRESETS, is_cdn_related, preset_nameservers,
};
pub use error::{ToolboxError, ToolboxResult};
pub use services::{
    DnsBackend, HickoryBackend, OsintService, PropagationResolver, RateLimiter, ResolveFailure,
    ResolverHandle, ResolverIdentity, ResolverOptions, ResolverSelector, reverse_pointer_name,
};
pub use types::{
    AnomalyDetection, AnomalySummary, BulkQueryEntry, BulkQueryReport, BulkReverseReport,
    ClassifiedError, ConsistencyStatus, DnsRecordType, ErrorKind, IterationError, OsintInsights,
    PatternAnalysis, ProfileReport, PropagationAnalysis, PropagationReport,
    PropagationResolverResult, QueryOutcome, QueryReport, RateLimiterStat, RecordValue,
    ResolverInfo, ResponseAnalysisReport, ResponseGroup, ResponseTimeAnalysis,
    ReverseLookupReport, RiskLevel, TimingInsights, TimingStats, TrustLevel, WildcardInsights,
    WildcardProbe, WildcardReport, WildcardTypeAnalysis,
};
