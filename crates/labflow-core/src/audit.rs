//! Audit sink for activity entries.
//!
//! Recording is fire-and-forget: a failed write is logged and never fails
//! the operation that produced it.

use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::ActivityLogEntry;

/// Audit sink errors.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for activity entries.
pub trait AuditSink {
    fn record(&self, entry: &ActivityLogEntry) -> Result<(), AuditError>;
}

impl AuditSink for Database {
    fn record(&self, entry: &ActivityLogEntry) -> Result<(), AuditError> {
        self.insert_activity(entry)?;
        Ok(())
    }
}

/// Write an entry, logging instead of propagating any failure.
pub fn record_best_effort(sink: &dyn AuditSink, entry: &ActivityLogEntry) {
    match sink.record(entry) {
        Ok(()) => tracing::debug!(
            case_id = entry.case_id.as_deref().unwrap_or("-"),
            action = %entry.action,
            "Recorded activity"
        ),
        Err(e) => tracing::warn!(
            case_id = entry.case_id.as_deref().unwrap_or("-"),
            action = %entry.action,
            "Failed to record activity: {e}"
        ),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::models::Viewer;

    #[test]
    fn test_database_sink_appends() {
        let db = Database::open_in_memory().unwrap();
        let actor = Viewer::admin("user-1", "Alex");
        record_best_effort(&db, &ActivityLogEntry::new(None, &actor, "added doctor"));
        assert_eq!(db.list_activity(None, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_failure_is_swallowed() {
        let actor = Viewer::admin("user-1", "Alex");
        // Must not panic or propagate
        record_best_effort(&FailingSink, &ActivityLogEntry::new(None, &actor, "added doctor"));
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::default();
        let actor = Viewer::tech("user-2", "Sam");
        record_best_effort(&sink, &ActivityLogEntry::new(Some("c1"), &actor, "added material"));
        assert_eq!(sink.entries.borrow().len(), 1);
    }
}
