//! Fallback wrapper (C17): swallow an error, return a provided value (or
//! invoke a provided handler), and record the service as degraded.

use std::future::Future;

use crate::degradation::DegradationManager;

/// Runs `op`; on error, records `service` as degraded in `manager` and
/// returns `fallback`.
pub async fn with_fallback<T, E, F, Fut>(
    manager: &DegradationManager,
    service: &str,
    fallback: T,
    op: F,
) -> T
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match op().await {
        Ok(value) => {
            manager.recover(service);
            value
        }
        Err(err) => {
            manager.degrade(service, err.to_string());
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_op_result_on_success() {
        let manager = DegradationManager::new();
        let value = with_fallback(&manager, "translator", 0, || async { Ok::<_, &str>(5) }).await;
        assert_eq!(value, 5);
        assert!(!manager.is_degraded("translator"));
    }

    #[tokio::test]
    async fn returns_fallback_and_records_degradation_on_error() {
        let manager = DegradationManager::new();
        let value = with_fallback(&manager, "translator", 0, || async { Err::<i32, _>("down") }).await;
        assert_eq!(value, 0);
        assert!(manager.is_degraded("translator"));
    }
}
