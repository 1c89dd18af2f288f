pub use crate::config::*;
use crate::run_aggregation;

/// A builder for assembling one aggregation run.
///
/// Entries are validated when they are added, so an invalid polarity or an
/// out-of-range score is rejected before it can influence the derived groups.
///
/// ```
/// pub use effect_aggregation::builder::Builder;
/// pub use effect_aggregation::{AggregationRules, SessionScope};
/// # use effect_aggregation::AggregationError;
///
/// let scope = SessionScope { session: "code123".to_string(), team: Some("3".to_string()) };
/// let mut builder = Builder::new(&AggregationRules::DEFAULT_RULES, &scope)?;
///
/// builder.add_submission("row-1", "Anna", "Gezondheid", "minder stress bij inwoners", 4, 1)?;
/// builder.add_submission("row-2", "Bob", "Gezondheid", "meer verkeer overlast", 2, -1)?;
/// builder.add_vote("code123_3_gezondheid_0", 1)?;
///
/// let result = builder.run()?;
/// assert_eq!(result.groups.len(), 2);
///
/// # Ok::<(), AggregationError>(())
/// ```
pub struct Builder {
    pub(crate) _rules: AggregationRules,
    pub(crate) _scope: SessionScope,
    pub(crate) _submissions: Vec<Submission>,
    pub(crate) _votes: Vec<VoteEvent>,
}

impl Builder {
    pub fn new(rules: &AggregationRules, scope: &SessionScope) -> Result<Builder, AggregationError> {
        Ok(Builder {
            _rules: rules.clone(),
            _scope: scope.clone(),
            _submissions: Vec::new(),
            _votes: Vec::new(),
        })
    }

    /// Adds one submission.
    ///
    /// The polarity must be -1 or +1 and the score must lie within the
    /// accepted range. The submission order is significant: it determines the
    /// derived group identifiers.
    pub fn add_submission(
        &mut self,
        id: &str,
        author: &str,
        domain: &str,
        text: &str,
        score: u8,
        polarity: i32,
    ) -> Result<(), AggregationError> {
        if polarity != -1 && polarity != 1 {
            return Err(AggregationError::InvalidPolarity { value: polarity });
        }
        if score < SCORE_MIN || score > SCORE_MAX {
            return Err(AggregationError::ScoreOutOfRange { value: score });
        }
        self._submissions.push(Submission {
            id: id.to_string(),
            author: author.to_string(),
            domain: domain.to_string(),
            text: text.to_string(),
            score,
            polarity,
        });
        Ok(())
    }

    /// Adds one vote event on a group identifier. The value must be -1 or +1.
    pub fn add_vote(&mut self, group_id: &str, value: i32) -> Result<(), AggregationError> {
        if value != -1 && value != 1 {
            return Err(AggregationError::InvalidVote { value });
        }
        self._votes.push(VoteEvent {
            group_id: group_id.to_string(),
            value,
        });
        Ok(())
    }

    pub fn run(&self) -> Result<AggregationResult, AggregationError> {
        run_aggregation(&self._submissions, &self._votes, &self._scope, &self._rules)
    }
}
