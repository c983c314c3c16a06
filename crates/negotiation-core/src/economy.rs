//! Economic State Holder
//!
//! Owns the single authoritative [`EconomicState`] of a run. Updates go
//! through an external [`EconomicTransform`]; the candidate it returns is
//! validated against the current state and either committed whole or
//! discarded.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use negotiation_events::{AgentId, EconomicState};

/// Input to an economic transform: who did what, against which state.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    pub actor: AgentId,
    pub action: String,
    pub action_detail: String,
    pub current: EconomicState,
}

impl TransformRequest {
    /// Deterministic text form of the request.
    pub fn render(&self) -> String {
        format!(
            "Acting agent: {}\nAction: {}\nAction detail: {}\n\nCurrent economic data:\n{}",
            self.actor,
            self.action,
            self.action_detail,
            self.current.render()
        )
    }
}

/// Computes the economy that follows an enacted action.
#[async_trait]
pub trait EconomicTransform: Send + Sync {
    /// Returns a candidate successor of `request.current`.
    ///
    /// The candidate is not trusted; the holder validates it before use.
    async fn transform(&self, request: &TransformRequest) -> Result<EconomicState, TransformError>;
}

/// Failure to obtain a candidate state at all.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("transform backend failed: {0}")]
    Backend(String),
    #[error("malformed transform output: {0}")]
    Malformed(String),
}

/// Structural mismatch between a candidate and the current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("candidate is missing entity {0}")]
    MissingEntity(String),
    #[error("candidate introduces unknown entity {0}")]
    UnexpectedEntity(String),
    #[error("candidate entry for {entity} is missing indicator {indicator}")]
    MissingIndicator { entity: String, indicator: String },
}

/// Checks that `candidate` can replace `current`.
///
/// Entity keys must match exactly, and every indicator already present for
/// an entity must still be there. Extra indicators are allowed through.
pub fn validate_candidate(
    candidate: &EconomicState,
    current: &EconomicState,
) -> Result<(), ValidationError> {
    for (key, indicators) in current.entities() {
        let Some(candidate_indicators) = candidate.entity(key) else {
            return Err(ValidationError::MissingEntity(key.clone()));
        };

        if let Some(missing) = indicators
            .keys()
            .find(|name| !candidate_indicators.contains_key(*name))
        {
            return Err(ValidationError::MissingIndicator {
                entity: key.clone(),
                indicator: missing.clone(),
            });
        }
    }

    if let Some((extra, _)) = candidate
        .entities()
        .find(|(key, _)| current.entity(key).is_none())
    {
        return Err(ValidationError::UnexpectedEntity(extra.clone()));
    }

    Ok(())
}

/// Result of [`EconomyHolder::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The candidate replaced the held state
    Committed,
    /// The held state is unchanged
    Rejected(UpdateRejection),
}

impl ApplyOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, ApplyOutcome::Committed)
    }
}

/// Why an update was discarded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UpdateRejection {
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Sole owner of the live economic state.
pub struct EconomyHolder {
    state: EconomicState,
    transform: Arc<dyn EconomicTransform>,
    committed: u32,
    rejected: u32,
}

impl EconomyHolder {
    pub fn new(initial: EconomicState, transform: Arc<dyn EconomicTransform>) -> Self {
        Self {
            state: initial,
            transform,
            committed: 0,
            rejected: 0,
        }
    }

    /// Returns a copy of the current state.
    pub fn read(&self) -> EconomicState {
        self.state.clone()
    }

    /// Updates the state for an action enacted by `actor`.
    ///
    /// Transform failures and invalid candidates leave the state untouched
    /// and are logged as warnings; they never propagate.
    pub async fn apply(&mut self, actor: &str, action: &str, action_detail: &str) -> ApplyOutcome {
        let request = TransformRequest {
            actor: actor.to_string(),
            action: action.to_string(),
            action_detail: action_detail.to_string(),
            current: self.state.clone(),
        };
        debug!(actor, action, "requesting economic transform");

        let outcome = match self.transform.transform(&request).await {
            Ok(candidate) => match validate_candidate(&candidate, &self.state) {
                Ok(()) => {
                    self.state = candidate;
                    ApplyOutcome::Committed
                }
                Err(e) => ApplyOutcome::Rejected(e.into()),
            },
            Err(e) => ApplyOutcome::Rejected(e.into()),
        };

        match &outcome {
            ApplyOutcome::Committed => {
                self.committed += 1;
                info!(actor, action, "economic state updated");
            }
            ApplyOutcome::Rejected(reason) => {
                self.rejected += 1;
                warn!(actor, action, %reason, "economic update discarded, keeping previous state");
            }
        }

        outcome
    }

    /// Number of committed updates so far.
    pub fn committed_updates(&self) -> u32 {
        self.committed
    }

    /// Number of discarded updates so far.
    pub fn rejected_updates(&self) -> u32 {
        self.rejected
    }
}

impl std::fmt::Debug for EconomyHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EconomyHolder")
            .field("state", &self.state)
            .field("committed", &self.committed)
            .field("rejected", &self.rejected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn base() -> EconomicState {
        EconomicState::new()
            .with_entity("us", [("GDP", 21.0), ("inflation", 3.5)])
            .with_entity("china", [("GDP", 18.0), ("inflation", 2.1)])
    }

    /// Returns queued results in order.
    struct Queued(Mutex<Vec<Result<EconomicState, TransformError>>>);

    impl Queued {
        fn new(results: Vec<Result<EconomicState, TransformError>>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(results.into_iter().rev().collect())))
        }
    }

    #[async_trait]
    impl EconomicTransform for Queued {
        async fn transform(&self, _: &TransformRequest) -> Result<EconomicState, TransformError> {
            self.0
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(TransformError::Backend("exhausted".into())))
        }
    }

    #[test]
    fn test_validate_accepts_extra_indicators() {
        let candidate = base().with_entity(
            "us",
            [("GDP", 20.9), ("inflation", 3.6), ("GDP_change_pct", -0.5)],
        );
        assert_eq!(validate_candidate(&candidate, &base()), Ok(()));
    }

    #[test]
    fn test_validate_rejects_missing_entity() {
        let candidate = EconomicState::new().with_entity("us", [("GDP", 21.0), ("inflation", 3.5)]);
        assert_eq!(
            validate_candidate(&candidate, &base()),
            Err(ValidationError::MissingEntity("china".into()))
        );
    }

    #[test]
    fn test_validate_rejects_unknown_entity() {
        let candidate = base().with_entity("mexico", [("GDP", 1.8)]);
        assert_eq!(
            validate_candidate(&candidate, &base()),
            Err(ValidationError::UnexpectedEntity("mexico".into()))
        );
    }

    #[test]
    fn test_validate_rejects_missing_indicator() {
        let candidate = base().with_entity("china", [("GDP", 17.0)]);
        assert_eq!(
            validate_candidate(&candidate, &base()),
            Err(ValidationError::MissingIndicator {
                entity: "china".into(),
                indicator: "inflation".into()
            })
        );
    }

    #[test]
    fn test_request_render_is_deterministic() {
        let request = TransformRequest {
            actor: "us".into(),
            action: "Set/adjust tariffs".into(),
            action_detail: "25% on steel".into(),
            current: base(),
        };
        assert_eq!(
            request.render(),
            "Acting agent: us\nAction: Set/adjust tariffs\nAction detail: 25% on steel\n\nCurrent economic data:\nchina: GDP: 18 inflation: 2.1\nus: GDP: 21 inflation: 3.5"
        );
    }

    #[tokio::test]
    async fn test_apply_commits_valid_candidate() {
        let next = base().with_entity("us", [("GDP", 20.8), ("inflation", 3.7)]);
        let mut holder = EconomyHolder::new(base(), Queued::new(vec![Ok(next.clone())]));

        let outcome = holder.apply("us", "tariff", "steel").await;

        assert!(outcome.is_committed());
        assert_eq!(holder.read(), next);
        assert_eq!(holder.committed_updates(), 1);
    }

    #[tokio::test]
    async fn test_apply_keeps_state_on_transform_failure() {
        let mut holder = EconomyHolder::new(
            base(),
            Queued::new(vec![Err(TransformError::Malformed("not json".into()))]),
        );

        let outcome = holder.apply("us", "tariff", "steel").await;

        assert!(matches!(
            outcome,
            ApplyOutcome::Rejected(UpdateRejection::Transform(_))
        ));
        assert_eq!(holder.read(), base());
        assert_eq!(holder.rejected_updates(), 1);
    }

    #[tokio::test]
    async fn test_read_returns_independent_copy() {
        let holder = EconomyHolder::new(base(), Queued::new(vec![]));
        let mut copy = holder.read();
        copy.adjust_indicator("us", "GDP", 100.0);

        assert_eq!(holder.read(), base());
        assert_eq!(holder.read(), holder.read());
    }
}
