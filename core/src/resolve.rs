//! Unique-prefix resolution for record IDs.

use crate::error::{Result, StoreError};

/// Minimum prefix length for task and note IDs.
pub const TASK_PREFIX_MIN: usize = 3;

/// Minimum prefix length for inbox message tokens.
pub const INBOX_PREFIX_MIN: usize = 8;

/// Candidates included in an ambiguity error before truncation.
const MAX_CANDIDATES: usize = 5;

/// Resolve a query against a set of known IDs.
///
/// An exact hit short-circuits. Otherwise the query must meet the minimum
/// prefix length and match exactly one ID; zero matches is not-found, two or
/// more is ambiguous with up to five candidates named in the error.
pub fn resolve_id<'a, I>(ids: I, query: &str, min_len: usize, kind: &str) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let ids: Vec<&str> = ids.into_iter().collect();

    if let Some(exact) = ids.iter().find(|id| **id == query) {
        return Ok(exact.to_string());
    }

    if query.len() < min_len {
        return Err(StoreError::prefix_too_short(query, min_len));
    }

    let mut matches: Vec<String> = ids
        .iter()
        .filter(|id| id.starts_with(query))
        .map(|id| id.to_string())
        .collect();

    match matches.len() {
        0 => Err(StoreError::not_found(kind, query)),
        1 => Ok(matches.remove(0)),
        _ => {
            matches.sort();
            matches.truncate(MAX_CANDIDATES);
            Err(StoreError::ambiguous_prefix(query, &matches))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: [&str; 3] = ["TAS-1", "TAS-12", "TAS-3"];

    #[test]
    fn test_exact_match_wins_over_prefix() {
        // "TAS-1" is both an ID and a prefix of "TAS-12"
        let resolved = resolve_id(IDS, "TAS-1", TASK_PREFIX_MIN, "Task").unwrap();
        assert_eq!(resolved, "TAS-1");
    }

    #[test]
    fn test_unique_prefix_resolves() {
        let resolved = resolve_id(IDS, "TAS-3", TASK_PREFIX_MIN, "Task").unwrap();
        assert_eq!(resolved, "TAS-3");
        let resolved = resolve_id(IDS, "TAS-12", TASK_PREFIX_MIN, "Task").unwrap();
        assert_eq!(resolved, "TAS-12");
    }

    #[test]
    fn test_ambiguous_prefix_names_candidates() {
        let err = resolve_id(IDS, "TAS", TASK_PREFIX_MIN, "Task").unwrap_err();
        assert!(err.is_ambiguous());
        let message = err.to_string();
        assert!(message.contains("TAS-1"));
        assert!(message.contains("TAS-12"));
        assert!(message.contains("TAS-3"));
    }

    #[test]
    fn test_short_prefix_rejected() {
        let err = resolve_id(IDS, "TA", TASK_PREFIX_MIN, "Task").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_no_match_is_not_found() {
        let err = resolve_id(IDS, "NOT-1", TASK_PREFIX_MIN, "Task").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("NOT-1"));
    }

    #[test]
    fn test_inbox_minimum_is_eight() {
        let tokens = ["abcdef0123456789", "abcdefff00000000"];
        let err = resolve_id(tokens, "abcdef", INBOX_PREFIX_MIN, "Message").unwrap_err();
        assert!(err.is_validation());

        let resolved = resolve_id(tokens, "abcdef01", INBOX_PREFIX_MIN, "Message").unwrap();
        assert_eq!(resolved, "abcdef0123456789");

        let err = resolve_id(tokens, "abcdefff11", INBOX_PREFIX_MIN, "Message").unwrap_err();
        assert!(err.is_not_found());
    }
}
