//! Rich diagnostic error types for the tkg-synth generator.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for a generation run.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum SynthError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] ExportError),

    #[error("failed to start a pool of {threads} worker threads: {message}")]
    #[diagnostic(
        code(tkg::run::pool),
        help("Lower `n_jobs` or the `--jobs` flag.")
    )]
    Pool { threads: usize, message: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(tkg::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(tkg::config::parse),
        help(
            "Check the TOML syntax. `tkg-synth init-config <path>` writes a \
             complete default configuration to start from."
        )
    )]
    Parse { path: String, message: String },

    #[error("invalid value for `{field}`: {message}")]
    #[diagnostic(code(tkg::config::invalid_value), help("Fix `{field}` in the configuration."))]
    InvalidValue { field: String, message: String },

    #[error("invalid distribution parameters: {message}")]
    #[diagnostic(
        code(tkg::config::distribution),
        help(
            "Gamma needs shape > 0 and scale > 0, Poisson needs lambda > 0, \
             Uniform needs low < high and both finite."
        )
    )]
    Distribution { message: String },

    #[error("weighting function returned {actual} weights for {expected} {kind}")]
    #[diagnostic(
        code(tkg::config::weight_count),
        help("A weighting function must return exactly one weight per {kind} id.")
    )]
    WeightCount {
        kind: String,
        expected: usize,
        actual: usize,
    },

    #[error("{kind} weights cannot be sampled from: {message}")]
    #[diagnostic(
        code(tkg::config::weights),
        help("Weights must be finite, non-negative, and not all zero.")
    )]
    Weights { kind: String, message: String },

    #[error(
        "split into {boundary} sets failed because of quantile collision at timestamp {timestamp}"
    )]
    #[diagnostic(
        code(tkg::config::split_collision),
        help(
            "Two split boundaries landed on the same timestamp. Use more time windows, \
             widen the split fractions, or set the colliding fraction to 0."
        )
    )]
    SplitCollision { boundary: String, timestamp: u32 },
}

// ---------------------------------------------------------------------------
// Repair errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RepairError {
    #[error("forced connection needs exactly 2 target indices, got {actual}")]
    #[diagnostic(
        code(tkg::repair::target_count),
        help("Only a single triple (two endpoint positions) can bridge two components.")
    )]
    TargetCount { actual: usize },

    #[error("forced swap was given no target indices")]
    #[diagnostic(
        code(tkg::repair::no_targets),
        help("Pass at least one index of the sampled values to overwrite.")
    )]
    NoTargets,

    #[error("cannot draw a replacement value from an empty pool")]
    #[diagnostic(
        code(tkg::repair::empty_pool),
        help("The allowed values (or both components) must contain at least one value.")
    )]
    EmptyPool,

    #[error("target index {index} is out of bounds for {len} sampled values")]
    #[diagnostic(code(tkg::repair::out_of_bounds))]
    OutOfBounds { index: usize, len: usize },
}

// ---------------------------------------------------------------------------
// Pattern errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PatternError {
    #[error("unsupported hop count {n_hops}: patterns have 1, 2 or 3 antecedents")]
    #[diagnostic(code(tkg::pattern::hops))]
    UnsupportedHops { n_hops: usize },

    #[error("{n_hops}-hop pattern needs {n_hops} time lag specs, got {actual}")]
    #[diagnostic(
        code(tkg::pattern::lag_count),
        help("Provide one (min, max) lag per antecedent in `time_lag_{n_hops}_hop`.")
    )]
    LagCount { n_hops: usize, actual: usize },

    #[error("no new {n_hops}-hop pattern found after {attempts} attempts")]
    #[diagnostic(
        code(tkg::pattern::retries_exhausted),
        help(
            "Every draw was a sub-pattern of an accepted pattern. Increase `max_retries`, \
             add entities or relations, or request fewer patterns."
        )
    )]
    RetriesExhausted { n_hops: usize, attempts: usize },

    #[error("malformed pattern label '{label}': {message}")]
    #[diagnostic(
        code(tkg::pattern::label),
        help("Labels look like `(0,1,2)(2,0,3)=>(0,0,3)|[0,5][1,4]|2`.")
    )]
    Label { label: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Repair(#[from] RepairError),
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExportError {
    #[error("I/O error writing {path}")]
    #[diagnostic(
        code(tkg::export::io),
        help(
            "A filesystem operation failed. Check that the export directory is \
             writable and that the disk is not full."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {what}: {message}")]
    #[diagnostic(code(tkg::export::serialize))]
    Serialize { what: String, message: String },
}

/// Convenience alias for functions returning tkg-synth results.
pub type SynthResult<T> = std::result::Result<T, SynthError>;

/// Result type for configuration handling.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for constraint repair.
pub type RepairResult<T> = std::result::Result<T, RepairError>;

/// Result type for pattern construction and parsing.
pub type PatternResult<T> = std::result::Result<T, PatternError>;

/// Result type for artifact export.
pub type ExportResult<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repair_error_converts_through_pattern_error() {
        let err: PatternError = RepairError::TargetCount { actual: 3 }.into();
        let synth: SynthError = err.into();
        assert!(matches!(
            synth,
            SynthError::Pattern(PatternError::Repair(RepairError::TargetCount { actual: 3 }))
        ));
    }

    #[test]
    fn config_error_converts_to_synth_error() {
        let err = ConfigError::SplitCollision {
            boundary: "train and valid".into(),
            timestamp: 7,
        };
        let synth: SynthError = err.into();
        assert!(matches!(synth, SynthError::Config(ConfigError::SplitCollision { .. })));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = ConfigError::WeightCount {
            kind: "entity".into(),
            expected: 10,
            actual: 9,
        };
        let msg = format!("{err}");
        assert!(msg.contains("10"));
        assert!(msg.contains("9"));

        let err = PatternError::RetriesExhausted {
            n_hops: 2,
            attempts: 10,
        };
        assert!(format!("{err}").contains("2-hop"));
    }
}
