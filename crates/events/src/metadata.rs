//! Correlation metadata for provision events.

use std::sync::OnceLock;
use uuid::Uuid;

/// Global correlation ID for the current run.
static CORRELATION_ID: OnceLock<Uuid> = OnceLock::new();

/// Get or create the correlation ID for the current run.
///
/// Every event emitted by one process carries the same ID, so JSON output
/// from several hosts can be told apart.
#[must_use]
pub fn correlation_id() -> Uuid {
    *CORRELATION_ID.get_or_init(Uuid::new_v4)
}

/// Set the correlation ID for the current run.
///
/// Only the first call wins. Returns `true` if the ID was set.
pub fn set_correlation_id(id: Uuid) -> bool {
    CORRELATION_ID.set(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id_is_stable() {
        let first = correlation_id();
        let second = correlation_id();
        assert_eq!(first, second);
        assert!(!set_correlation_id(Uuid::new_v4()));
    }
}
