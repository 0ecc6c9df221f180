// 🚨 Fatal Configuration Errors
// Anything here aborts the run. Recoverable conflicts go to the ReportSink instead.

use thiserror::Error;

/// Errors that make the naming run meaningless if ignored.
///
/// Every variant carries the offending key (family, identifier or name)
/// so it can be looked up directly in the source tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    #[error("Malformed accession term \"{term}\" in rule for family \"{family}\"")]
    MalformedRule { family: String, term: String },

    #[error("Prefix \"{prefix}\" resolves for both family \"{first}\" and family \"{second}\"")]
    PrefixCollision {
        prefix: String,
        first: String,
        second: String,
    },

    #[error("Legacy name \"{name}\" has no trailing numeric suffix")]
    MissingNameSuffix { name: String },

    #[error("Numeric suffix of legacy name \"{name}\" is too large")]
    SuffixOutOfRange { name: String },

    #[error("Unrecognized prefix for gene id \"{identifier}\"")]
    UnrecognizedIdentifier { identifier: String },

    #[error("Cannot derive a name prefix for family \"{family}\"")]
    UnresolvablePrefix { family: String },
}

pub type NamingResult<T> = std::result::Result<T, NamingError>;
