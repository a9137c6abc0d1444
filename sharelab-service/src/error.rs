//! Errors surfaced by the retrieval service.

use sharelab_core::data::ProviderError;
use sharelab_core::domain::Query;
use thiserror::Error;

/// Failure of a cache-first retrieval after the query was validated.
///
/// Provider errors never escape on their own; they are always wrapped with the
/// query that triggered them.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Nothing cached for the query and the provider reported itself unavailable.
    #[error("no cached data for {query} and provider '{provider}' is unreachable")]
    Unreachable { query: Query, provider: String },

    /// The provider was asked and failed.
    #[error("fetching {query} failed")]
    FetchFailed {
        query: Query,
        #[source]
        source: ProviderError,
    },
}

impl ServiceError {
    pub fn query(&self) -> &Query {
        match self {
            Self::Unreachable { query, .. } | Self::FetchFailed { query, .. } => query,
        }
    }

    /// The provider error behind a failed fetch, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Unreachable { .. } => None,
            Self::FetchFailed { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::error::Error;

    fn query() -> Query {
        Query::new(
            "AAPL",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn unreachable_message_names_query_and_provider() {
        let err = ServiceError::Unreachable {
            query: query(),
            provider: "offline".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("AAPL [2024-01-01 .. 2024-01-31]"));
        assert!(msg.contains("offline"));
        assert!(err.source().is_none());
        assert!(err.provider_error().is_none());
    }

    #[test]
    fn fetch_failed_chains_provider_error() {
        let err = ServiceError::FetchFailed {
            query: query(),
            source: ProviderError::transport("connection reset"),
        };
        let source = err.source().expect("provider error is the source");
        assert!(source.to_string().contains("connection reset"));
        assert!(matches!(
            err.provider_error(),
            Some(ProviderError::Transport { .. })
        ));
        assert_eq!(err.query().symbol(), "AAPL");
    }
}
