//! Bounded document store calls and document (de)serialization.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use super::error::ChatError;
use crate::ports::StorageError;

/// Default upper bound for one storage round trip.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs one storage call under `limit`, tagging failures with `step`.
pub(crate) async fn bounded<T, F>(limit: Duration, step: &'static str, call: F) -> Result<T, ChatError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(|source| ChatError::storage(step, source)),
        Err(_) => {
            let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(step, timeout_ms = millis, "Storage call timed out");
            Err(ChatError::storage(step, StorageError::Timeout(millis)))
        }
    }
}

pub(crate) fn encode<T: Serialize>(step: &'static str, record: &T) -> Result<Value, ChatError> {
    serde_json::to_value(record).map_err(|e| ChatError::storage(step, e.into()))
}

pub(crate) fn decode<T: DeserializeOwned>(step: &'static str, doc: Value) -> Result<T, ChatError> {
    serde_json::from_value(doc).map_err(|e| ChatError::storage(step, e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let value = bounded(Duration::from_millis(100), "noop", async { Ok::<_, StorageError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let err = bounded(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StorageError>(())
        })
        .await
        .unwrap_err();

        assert_eq!(err.code(), ErrorCode::StorageTimeout);
        assert!(matches!(err, ChatError::Storage { step: "slow", .. }));
    }

    #[tokio::test]
    async fn store_errors_carry_the_step() {
        let err = bounded(Duration::from_secs(1), "count messages", async {
            Err::<u64, _>(StorageError::Connection("refused".into()))
        })
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "Storage error during count messages: connection failed: refused");
    }

    #[test]
    fn decode_failures_are_serialization_errors() {
        let err = decode::<crate::domain::message::Message>("decode message", serde_json::json!({"x": 1}))
            .unwrap_err();
        assert!(matches!(
            err,
            ChatError::Storage {
                source: StorageError::Serialization(_),
                ..
            }
        ));
    }
}
