//! Security policies for Optimus capabilities.
//!
//! Provides:
//! - **Statement policy**: `sql_fetch` accepts read statements only
//! - **Endpoint allowlist**: `http_request` may only call configured prefixes

pub mod allowlist;
pub mod sql;

pub use allowlist::UrlAllowlist;
pub use sql::SqlPolicy;

/// A request rejected by policy before any side effect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("Only SELECT statements are allowed in sql_fetch tool")]
    StatementNotAllowed,

    #[error("Multiple statements are not allowed in sql_fetch tool")]
    MultipleStatements,

    #[error("URL not allowed by HTTP tool policy: {url} ({reason})")]
    UrlNotAllowed { url: String, reason: String },
}
