// crates/orchestrator-cli/src/cli_config.rs
// ============================================================================
// Module: CLI Configuration Layer
// Description: Merges the config-file layer with explicit CLI flag overrides.
// Purpose: Own the final layer `orchestrator-core::TestSetConfig` defers to
//          "the only crate that knows about clap".
// Dependencies: clap, orchestrator_core::TestSetConfig
// ============================================================================

//! ## Overview
//! Three layers, lowest to highest precedence: compiled-in defaults (owned
//! by [`orchestrator_core::TestSetConfig::default`]), an optional JSON config
//! file (owned by [`orchestrator_core::TestSetConfig::load`]), and these CLI
//! flag overrides. Every flag is `Option`-typed and left unset by default, so
//! only flags the user actually passed displace the file layer.

use clap::Args;
use orchestrator_core::TestSetConfig;

/// CLI flags that override individual [`TestSetConfig`] fields. Flattened
/// into every subcommand that consults the config.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOverrides {
    /// Overrides `min_reliability`.
    #[arg(long)]
    pub min_reliability: Option<f64>,
    /// Overrides `statistical_significance`.
    #[arg(long)]
    pub statistical_significance: Option<f64>,
    /// Overrides `max_test_percentage`.
    #[arg(long)]
    pub max_test_percentage: Option<f64>,
    /// Overrides `max_hops`.
    #[arg(long)]
    pub max_hops: Option<u32>,
    /// Overrides `max_reruns`.
    #[arg(long)]
    pub max_reruns: Option<u32>,
    /// Overrides `max_failures`.
    #[arg(long)]
    pub max_failures: Option<u32>,
    /// Overrides `max_parallel`.
    #[arg(long)]
    pub max_parallel: Option<u32>,
}

/// Applies `overrides` on top of `base` (the defaults/file-layer config),
/// field by field; an unset override leaves the underlying field untouched.
#[must_use]
pub fn apply_overrides(base: TestSetConfig, overrides: &ConfigOverrides) -> TestSetConfig {
    TestSetConfig {
        min_reliability: overrides.min_reliability.unwrap_or(base.min_reliability),
        statistical_significance: overrides
            .statistical_significance
            .unwrap_or(base.statistical_significance),
        max_test_percentage: overrides
            .max_test_percentage
            .unwrap_or(base.max_test_percentage),
        max_hops: overrides.max_hops.unwrap_or(base.max_hops),
        max_reruns: overrides.max_reruns.unwrap_or(base.max_reruns),
        max_failures: overrides.max_failures.or(base.max_failures),
        max_parallel: overrides.max_parallel.or(base.max_parallel),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn unset_overrides_keep_base_values() {
        let base = TestSetConfig::load(Path::new("/nonexistent/orchestrator.config.json"));
        let merged = apply_overrides(base, &ConfigOverrides::default());
        assert_eq!(merged, base);
    }

    #[test]
    fn set_override_displaces_base_value() {
        let base = TestSetConfig::default();
        let overrides = ConfigOverrides {
            max_hops: Some(7),
            ..ConfigOverrides::default()
        };
        let merged = apply_overrides(base, &overrides);
        assert_eq!(merged.max_hops, 7);
        assert_eq!(merged.max_reruns, base.max_reruns);
    }

    #[test]
    fn optional_fields_prefer_override_when_present() {
        let mut base = TestSetConfig::default();
        base.max_parallel = Some(4);
        let overrides = ConfigOverrides {
            max_parallel: Some(8),
            ..ConfigOverrides::default()
        };
        let merged = apply_overrides(base, &overrides);
        assert_eq!(merged.max_parallel, Some(8));
    }

    #[test]
    fn optional_fields_fall_back_to_base_when_unset() {
        let mut base = TestSetConfig::default();
        base.max_failures = Some(3);
        let merged = apply_overrides(base, &ConfigOverrides::default());
        assert_eq!(merged.max_failures, Some(3));
    }
}
