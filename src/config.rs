//! Runtime configuration (spec §4.8, §7). Deliberately a plain struct with
//! `serde` defaults rather than a file-based config loader — the external
//! config plumbing that would read this from disk is out of scope.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverConfig {
    #[serde(default = "default_time_limit_seconds")]
    pub time_limit_seconds: u64,
    #[serde(default = "default_variable_ceiling")]
    pub variable_ceiling: usize,
    #[serde(default = "default_result_ttl_seconds")]
    pub result_ttl_seconds: u64,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

fn default_time_limit_seconds() -> u64 {
    30
}

fn default_variable_ceiling() -> usize {
    2_000_000
}

fn default_result_ttl_seconds() -> u64 {
    3_600
}

fn default_worker_count() -> usize {
    4
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_seconds: default_time_limit_seconds(),
            variable_ceiling: default_variable_ceiling(),
            result_ttl_seconds: default_result_ttl_seconds(),
            worker_count: default_worker_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let cfg = SolverConfig::default();
        assert_eq!(cfg.time_limit_seconds, 30);
        assert_eq!(cfg.result_ttl_seconds, 3_600);
        assert_eq!(cfg.worker_count, 4);
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let cfg: SolverConfig = serde_json::from_str(r#"{"timeLimitSeconds": 10}"#).unwrap();
        assert_eq!(cfg.time_limit_seconds, 10);
        assert_eq!(cfg.worker_count, 4);
    }
}
