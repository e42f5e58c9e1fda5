//! Error types for rem-core

use thiserror::Error;

/// Result type alias using rem-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// The input document an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    /// package.json
    Manifest,
    /// package-lock.json
    Lockfile,
    /// Health metrics table
    Metrics,
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Document::Manifest => write!(f, "manifest"),
            Document::Lockfile => write!(f, "lockfile"),
            Document::Metrics => write!(f, "metrics table"),
        }
    }
}

/// Errors that can occur in rem-core
///
/// Only fatal conditions are errors. Unresolved requirements, missing
/// top-level installs and broken cycles are reported as
/// [`Diagnostic`](crate::Diagnostic)s instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The document is not valid JSON or does not have the expected shape
    #[error("JSON parse error in {document}: {source}")]
    InvalidJson {
        /// Which document failed to parse
        document: Document,
        /// The underlying JSON parsing error
        #[source]
        source: serde_json::Error,
    },

    /// The document parsed but its content cannot be analyzed
    #[error("Invalid {document}: {message}")]
    InvalidInput {
        /// Which document is invalid
        document: Document,
        /// Description of the problem
        message: String,
    },

    /// The manifest declares neither `dependencies` nor `devDependencies`
    #[error("Manifest of {package} declares neither dependencies nor devDependencies")]
    EmptyDependencies {
        /// `name(version)` of the application
        package: String,
    },

    /// The lockfile expands to more nodes than allowed
    #[error("Graph has {node_count} nodes, max allowed is {max_allowed}")]
    GraphTooLarge {
        /// Number of nodes reached when the build stopped
        node_count: usize,
        /// Configured bound
        max_allowed: usize,
    },

    /// The lockfile nests installs deeper than allowed
    #[error("Lockfile nesting depth {depth} exceeds max {max_allowed}")]
    NestingTooDeep {
        /// Depth reached when the build stopped
        depth: usize,
        /// Configured bound
        max_allowed: usize,
    },

    /// Invalid filter parameter
    #[error("Invalid collapse threshold {0}: must be a finite, non-negative number")]
    InvalidThreshold(f64),
}

impl Error {
    pub(crate) fn json(document: Document, source: serde_json::Error) -> Self {
        Self::InvalidJson { document, source }
    }

    pub(crate) fn input(document: Document, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            document,
            message: message.into(),
        }
    }

    /// Whether the error comes from malformed caller input
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::InvalidJson { .. } | Error::InvalidInput { .. })
    }

    /// Whether the error comes from a resource bound being exceeded
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            Error::GraphTooLarge { .. } | Error::NestingTooDeep { .. }
        )
    }
}
