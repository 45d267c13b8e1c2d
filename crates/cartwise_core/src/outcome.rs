//! Discriminated outcome for analysis agents
//!
//! Every L2 agent returns `AgentResult<T>` rather than raising: the
//! orchestrator and API layers pattern-match on the variant and no analysis
//! failure ever unwinds through a request.

use serde::{Deserialize, Serialize};

/// Outcome of one analysis task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AgentResult<T> {
    /// Analysis completed (possibly via a rule-based fallback)
    Ok(T),
    /// The per-task or global deadline fired before the agent finished
    Timeout,
    /// The agent hit an unrecoverable problem (catalog error, missing product)
    Failed(String),
    /// The agent declined to run, e.g. no reviews to analyze
    Skipped(String),
}

impl<T> AgentResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, AgentResult::Ok(_))
    }

    pub fn ok_ref(&self) -> Option<&T> {
        match self {
            AgentResult::Ok(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_ok(self) -> Option<T> {
        match self {
            AgentResult::Ok(value) => Some(value),
            _ => None,
        }
    }

    /// Human-readable reason for a non-Ok outcome.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            AgentResult::Ok(_) => None,
            AgentResult::Timeout => Some("Timeout"),
            AgentResult::Failed(reason) | AgentResult::Skipped(reason) => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AgentResult<U> {
        match self {
            AgentResult::Ok(value) => AgentResult::Ok(f(value)),
            AgentResult::Timeout => AgentResult::Timeout,
            AgentResult::Failed(reason) => AgentResult::Failed(reason),
            AgentResult::Skipped(reason) => AgentResult::Skipped(reason),
        }
    }
}

impl<T> From<crate::Result<T>> for AgentResult<T> {
    fn from(result: crate::Result<T>) -> Self {
        match result {
            Ok(value) => AgentResult::Ok(value),
            Err(crate::Error::Timeout(_)) => AgentResult::Timeout,
            Err(err) => AgentResult::Failed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variants() {
        let ok: AgentResult<u32> = AgentResult::Ok(7);
        assert!(ok.is_ok());
        assert_eq!(ok.ok_ref(), Some(&7));
        assert_eq!(ok.failure_reason(), None);

        let timeout: AgentResult<u32> = AgentResult::Timeout;
        assert_eq!(timeout.failure_reason(), Some("Timeout"));

        let failed: AgentResult<u32> = AgentResult::Failed("catalog down".into());
        assert_eq!(failed.failure_reason(), Some("catalog down"));
    }

    #[test]
    fn test_map_preserves_failure() {
        let skipped: AgentResult<u32> = AgentResult::Skipped("no reviews".into());
        let mapped = skipped.map(|n| n * 2);
        assert_eq!(mapped.failure_reason(), Some("no reviews"));
    }

    #[test]
    fn test_from_result() {
        let out: AgentResult<u32> = Ok::<_, crate::Error>(3).into();
        assert!(out.is_ok());

        let out: AgentResult<u32> =
            Err::<u32, _>(crate::Error::Timeout("price".into())).into();
        assert!(matches!(out, AgentResult::Timeout));
    }

    #[test]
    fn test_serialization_tags() {
        let ok: AgentResult<u32> = AgentResult::Ok(1);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "ok");

        let timeout: AgentResult<u32> = AgentResult::Timeout;
        let json = serde_json::to_value(&timeout).unwrap();
        assert_eq!(json["status"], "timeout");
    }
}
