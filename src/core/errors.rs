//! FDH-prefixed error types with structured error codes.
//!
//! Control-plane variants (`FDH-2xxx`) carry the transient/permanent
//! classification that drives retry policy: transient errors are retried
//! with backoff, permanent errors surface immediately.

#![allow(missing_docs)]

use std::path::PathBuf;

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, FdhError>;

/// Top-level error type for the failover drill helper.
#[derive(Debug, Error)]
pub enum FdhError {
    #[error("[FDH-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[FDH-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[FDH-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[FDH-1101] scenario '{scenario}' is not self-restoring: {details}")]
    ScenarioInvariant { scenario: String, details: String },

    #[error("[FDH-2001] control plane throttled request for {resource}: {details}")]
    Throttled { resource: String, details: String },

    #[error("[FDH-2002] control plane timed out for {resource}: {details}")]
    ControlTimeout { resource: String, details: String },

    #[error("[FDH-2003] control plane unavailable for {resource}: {details}")]
    ProviderUnavailable { resource: String, details: String },

    #[error("[FDH-2101] authorization denied for {resource}")]
    AuthDenied { resource: String },

    #[error("[FDH-2102] resource not found: {resource}")]
    ResourceNotFound { resource: String },

    #[error("[FDH-2103] malformed control request for {resource}: {details}")]
    BadRequest { resource: String, details: String },

    #[error("[FDH-2104] control plane rejected request for {resource}: {details}")]
    ProviderRejected { resource: String, details: String },

    #[error("[FDH-3001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[FDH-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[FDH-3101] audit log already flushed for run {run}")]
    LogAlreadyFlushed { run: String },

    #[error("[FDH-3102] archive store failure for {name}: {details}")]
    ArchiveStore { name: String, details: String },

    #[error("[FDH-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl FdhError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "FDH-1001",
            Self::MissingConfig { .. } => "FDH-1002",
            Self::ConfigParse { .. } => "FDH-1003",
            Self::ScenarioInvariant { .. } => "FDH-1101",
            Self::Throttled { .. } => "FDH-2001",
            Self::ControlTimeout { .. } => "FDH-2002",
            Self::ProviderUnavailable { .. } => "FDH-2003",
            Self::AuthDenied { .. } => "FDH-2101",
            Self::ResourceNotFound { .. } => "FDH-2102",
            Self::BadRequest { .. } => "FDH-2103",
            Self::ProviderRejected { .. } => "FDH-2104",
            Self::Serialization { .. } => "FDH-3001",
            Self::Io { .. } => "FDH-3002",
            Self::LogAlreadyFlushed { .. } => "FDH-3101",
            Self::ArchiveStore { .. } => "FDH-3102",
            Self::Runtime { .. } => "FDH-3900",
        }
    }

    /// Whether a retry with backoff may resolve the failure.
    ///
    /// Only control-plane throttling, timeouts, and availability blips
    /// qualify. Authorization failures, missing resources, and malformed
    /// requests will not resolve without external correction.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Throttled { .. } | Self::ControlTimeout { .. } | Self::ProviderUnavailable { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for FdhError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for FdhError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
