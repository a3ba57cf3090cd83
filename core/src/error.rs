use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error taxonomy for the session store.
///
/// Variants are grouped by kind rather than identity: the caller branches on
/// the kind (validation, not-found, ambiguous, conflict, transport) while the
/// message carries the human-readable detail, including offending IDs where
/// they exist. Malformed journal records are deliberately absent here; they
/// are counted and skipped during projection and never surface as an error.
///
/// # Examples
///
/// ```rust
/// use iteratr_core::error::StoreError;
///
/// let err = StoreError::duplicate_content("fix the build", "TAS-1");
/// assert!(err.is_conflict());
/// assert!(err.to_string().contains("already exists"));
/// assert!(err.to_string().contains("TAS-1"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Malformed or out-of-range argument, empty required field, unknown enum value
    #[error("Validation error: {0}")]
    Validation(String),

    /// Task/note/message ID or prefix did not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// Prefix matched more than one record
    #[error("Ambiguous: {0}")]
    Ambiguous(String),

    /// Invariant violation against the projected state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Journal publish/replay failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Event payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Validation error for an empty required field
    pub fn empty_field(field: &str) -> Self {
        Self::Validation(format!("Field '{field}' cannot be empty"))
    }

    /// Validation error for an unknown enum value
    pub fn invalid_enum(field: &str, value: &str) -> Self {
        Self::Validation(format!("Unknown {field} value: '{value}'"))
    }

    /// Validation error for an out-of-range priority
    pub fn priority_out_of_range(priority: i64) -> Self {
        Self::Validation(format!(
            "Priority must be between 0 and 4, got {priority}"
        ))
    }

    /// Validation error for a malformed session name
    pub fn invalid_session(name: &str) -> Self {
        Self::Validation(format!(
            "Session name must be alphanumeric (plus '-' or '_'): '{name}'"
        ))
    }

    /// Conflict error for duplicate task content, naming the colliding task
    pub fn duplicate_content(content: &str, id: &str) -> Self {
        Self::Conflict(format!(
            "Task with content '{content}' already exists: {id}"
        ))
    }

    /// Conflict error when another task is already in progress
    pub fn task_in_progress(id: &str) -> Self {
        Self::Conflict(format!(
            "Only one task can be in progress at a time (currently {id})"
        ))
    }

    /// Conflict error when the iteration has already seen a task start
    pub fn iteration_already_started(number: u32) -> Self {
        Self::Conflict(format!(
            "A task already started during this iteration ({number})"
        ))
    }

    /// Conflict error for a task depending on itself
    pub fn self_dependency(id: &str) -> Self {
        Self::Conflict(format!("Task {id} cannot depend on itself"))
    }

    /// Conflict error for a dependency edge that closes a cycle
    pub fn dependency_cycle(id: &str, depends_on: &str) -> Self {
        Self::Conflict(format!(
            "Dependency {id} -> {depends_on} would create a cycle"
        ))
    }

    /// Conflict error for session completion with active tasks remaining
    pub fn tasks_not_terminal(count: usize) -> Self {
        Self::Conflict(format!("{count} task(s) not in terminal state"))
    }

    /// Not-found error for a record kind and identifier
    pub fn not_found(kind: &str, id: &str) -> Self {
        Self::NotFound(format!("{kind} '{id}' not found"))
    }

    /// Validation error for a prefix shorter than the minimum
    pub fn prefix_too_short(prefix: &str, min: usize) -> Self {
        Self::Validation(format!(
            "Prefix '{prefix}' is too short; at least {min} characters required"
        ))
    }

    /// Ambiguous error naming up to the first few candidates
    pub fn ambiguous_prefix(prefix: &str, candidates: &[String]) -> Self {
        Self::Ambiguous(format!(
            "Prefix '{prefix}' matches multiple records: {}",
            candidates.join(", ")
        ))
    }

    /// Check if this error indicates a validation problem
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }

    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Check if this error indicates an ambiguous prefix
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, StoreError::Ambiguous(_))
    }

    /// Check if this error indicates an invariant violation
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    /// Check if this error indicates a journal transport failure
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Transport(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_ids() {
        let err = StoreError::duplicate_content("fix ci", "TAS-3");
        assert!(err.to_string().contains("already exists"));
        assert!(err.to_string().contains("TAS-3"));

        let err = StoreError::task_in_progress("TAS-1");
        assert!(err.to_string().contains("Only one task can be in progress"));
        assert!(err.to_string().contains("TAS-1"));

        let err = StoreError::iteration_already_started(2);
        assert!(err
            .to_string()
            .contains("already started during this iteration"));
    }

    #[test]
    fn test_error_predicates() {
        assert!(StoreError::empty_field("content").is_validation());
        assert!(StoreError::not_found("Task", "TAS-9").is_not_found());
        assert!(
            StoreError::ambiguous_prefix("TAS", &["TAS-1".into(), "TAS-2".into()]).is_ambiguous()
        );
        assert!(StoreError::tasks_not_terminal(2).is_conflict());
        assert!(StoreError::Transport("connection reset".into()).is_transport());
        assert!(!StoreError::Transport("connection reset".into()).is_conflict());
    }

    #[test]
    fn test_not_terminal_count_in_message() {
        let err = StoreError::tasks_not_terminal(3);
        assert_eq!(err.to_string(), "Conflict: 3 task(s) not in terminal state");
    }
}
