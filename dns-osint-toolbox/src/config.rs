//! Tunables and static reference data for the OSINT toolbox.

use serde::{Deserialize, Serialize};

use crate::error::{ToolboxError, ToolboxResult};

/// Nameserver presets selectable by name. `system` is handled separately
/// (empty list = host configuration).
pub const RESOLVER_PRESETS: &[(&str, &[&str])] = &[
    ("public", &["8.8.8.8", "1.1.1.1", "9.9.9.9"]),
    ("google", &["8.8.8.8", "8.8.4.4"]),
    ("cloudflare", &["1.1.1.1", "1.0.0.1"]),
    ("quad9", &["9.9.9.9", "149.112.112.112"]),
    ("opendns", &["208.67.222.222", "208.67.220.220"]),
];

/// Resolvers queried by a propagation check when the caller supplies none.
pub const DEFAULT_PROPAGATION_RESOLVERS: &[(&str, &str)] = &[
    ("google", "8.8.8.8"),
    ("cloudflare", "1.1.1.1"),
    ("quad9", "9.9.9.9"),
    ("opendns", "208.67.222.222"),
    ("level3", "4.2.2.1"),
    ("verisign", "64.6.64.6"),
];

/// Substrings that mark a wildcard target as CDN / shared hosting.
pub const CDN_INDICATORS: &[&str] = &[
    "cloudflare",
    "amazonaws",
    "cloudfront",
    "fastly",
    "cdn",
    "akamai",
    "edgecast",
    "maxcdn",
    "keycdn",
];

/// Mean-latency buckets (seconds) used for the performance rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceThresholds {
    pub excellent: f64,
    pub good: f64,
    pub moderate: f64,
    pub poor: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            excellent: 0.1,
            good: 0.3,
            moderate: 0.5,
            poor: 1.0,
        }
    }
}

/// Toolbox configuration.
///
/// Every field has a default, so a partial JSON document is enough to
/// override a single value:
///
/// ```rust
/// let config: dns_osint_toolbox::OsintConfig =
///     serde_json::from_str(r#"{ "rate_limit": 5 }"#).unwrap();
/// assert_eq!(config.rate_limit, 5);
/// assert_eq!(config.max_workers, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsintConfig {
    /// Queries per second per resolver identity. `0` disables limiting.
    pub rate_limit: u32,

    /// Default resolver timeout (seconds).
    pub default_timeout_secs: u64,
    pub min_timeout_secs: u64,
    pub max_timeout_secs: u64,

    /// Default bulk concurrency.
    pub default_max_workers: usize,
    /// Hard ceiling for any dispatch round.
    pub max_workers: usize,
    /// Concurrency used when profiling every record type of one domain.
    pub query_all_concurrency: usize,

    /// Pause between response-analysis iterations (seconds).
    pub analysis_delay_secs: f64,
    pub default_analysis_iterations: u32,
    pub max_analysis_iterations: u32,

    pub default_wildcard_test_count: u32,
    pub max_wildcard_test_count: u32,
    pub wildcard_label_length: usize,

    /// Standard deviations above the mean that mark a latency as anomalous.
    pub anomaly_threshold_multiplier: f64,
    pub performance_thresholds: PerformanceThresholds,
    pub high_failure_rate_threshold: f64,
    pub high_variance_threshold: f64,
    /// Max propagation latency (seconds) above which a slow response is reported.
    pub slow_response_threshold_secs: f64,
}

impl Default for OsintConfig {
    fn default() -> Self {
        Self {
            rate_limit: 30,
            default_timeout_secs: 10,
            min_timeout_secs: 1,
            max_timeout_secs: 60,
            default_max_workers: 10,
            max_workers: 50,
            query_all_concurrency: 3,
            analysis_delay_secs: 0.1,
            default_analysis_iterations: 10,
            max_analysis_iterations: 100,
            default_wildcard_test_count: 3,
            max_wildcard_test_count: 10,
            wildcard_label_length: 32,
            anomaly_threshold_multiplier: 2.0,
            performance_thresholds: PerformanceThresholds::default(),
            high_failure_rate_threshold: 0.3,
            high_variance_threshold: 0.5,
            slow_response_threshold_secs: 2.0,
        }
    }
}

impl OsintConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> ToolboxResult<()> {
        fn invalid(msg: &str) -> ToolboxResult<()> {
            Err(ToolboxError::ValidationError(msg.to_string()))
        }

        if self.min_timeout_secs == 0 || self.min_timeout_secs > self.max_timeout_secs {
            return invalid("Timeout bounds must satisfy 0 < min <= max");
        }
        if self.max_workers == 0 || self.default_max_workers == 0 {
            return invalid("Worker counts must be positive");
        }
        if self.query_all_concurrency == 0 {
            return invalid("Query-all concurrency must be positive");
        }
        if self.max_wildcard_test_count == 0 || self.wildcard_label_length == 0 {
            return invalid("Wildcard probe settings must be positive");
        }
        if self.wildcard_label_length > 63 {
            return invalid("Wildcard label length cannot exceed 63 characters");
        }
        if !(self.high_failure_rate_threshold > 0.0 && self.high_failure_rate_threshold < 1.0) {
            return invalid("Failure rate threshold must be between 0 and 1");
        }
        if self.analysis_delay_secs < 0.0 || !self.analysis_delay_secs.is_finite() {
            return invalid("Analysis delay must be a non-negative number of seconds");
        }
        if self.default_timeout_secs < self.min_timeout_secs
            || self.default_timeout_secs > self.max_timeout_secs
        {
            return invalid("Default timeout must lie within the timeout bounds");
        }
        if !positive(self.anomaly_threshold_multiplier) {
            return invalid("Anomaly threshold multiplier must be positive");
        }
        if !positive(self.high_variance_threshold) {
            return invalid("Variance threshold must be positive");
        }
        if !positive(self.slow_response_threshold_secs) {
            return invalid("Slow response threshold must be positive");
        }
        let t = &self.performance_thresholds;
        if !(positive(t.excellent) && t.excellent < t.good && t.good < t.moderate && t.moderate < t.poor)
            || !t.poor.is_finite()
        {
            return invalid("Performance thresholds must be positive and strictly increasing");
        }
        Ok(())
    }

    /// Clamp a caller-supplied timeout, falling back to the default.
    pub fn clamp_timeout(&self, timeout_secs: Option<u64>) -> u64 {
        timeout_secs
            .unwrap_or(self.default_timeout_secs)
            .clamp(self.min_timeout_secs, self.max_timeout_secs)
    }

    /// Clamp a caller-supplied worker count to `[1, max_workers]`.
    ///
    /// Zero and negative counts become 1.
    pub fn clamp_workers(&self, workers: Option<i64>) -> usize {
        workers
            .map_or(self.default_max_workers, |w| {
                usize::try_from(w.max(1)).unwrap_or(self.max_workers)
            })
            .clamp(1, self.max_workers)
    }

    pub fn clamp_wildcard_count(&self, count: Option<u32>) -> u32 {
        count
            .unwrap_or(self.default_wildcard_test_count)
            .clamp(1, self.max_wildcard_test_count)
    }

    pub fn clamp_iterations(&self, iterations: Option<u32>) -> u32 {
        iterations
            .unwrap_or(self.default_analysis_iterations)
            .min(self.max_analysis_iterations)
    }

    /// Performance rating for a mean latency in seconds.
    pub fn performance_rating(&self, mean_secs: f64) -> PerformanceRating {
        let t = &self.performance_thresholds;
        if mean_secs < t.excellent {
            PerformanceRating::Excellent
        } else if mean_secs < t.good {
            PerformanceRating::Good
        } else if mean_secs < t.moderate {
            PerformanceRating::Moderate
        } else if mean_secs < t.poor {
            PerformanceRating::Poor
        } else {
            PerformanceRating::VeryPoor
        }
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Latency bucket derived from [`PerformanceThresholds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceRating {
    Excellent,
    Good,
    Moderate,
    Poor,
    VeryPoor,
    /// No successful sample to rate.
    Unknown,
}

/// Case-insensitive CDN / hosting indicator test.
pub fn is_cdn_related(record: &str) -> bool {
    let lower = record.to_lowercase();
    CDN_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

/// Look up a nameserver preset by name.
pub fn preset_nameservers(name: &str) -> Option<&'static [&'static str]> {
    RESOLVER_PRESETS
        .iter()
        .find(|(preset, _)| *preset == name)
        .map(|(_, servers)| *servers)
}
