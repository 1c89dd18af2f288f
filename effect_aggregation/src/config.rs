// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// Lowest accepted strength score for a submission.
pub const SCORE_MIN: u8 = 1;
/// Highest accepted strength score for a submission.
pub const SCORE_MAX: u8 = 5;

/// Default threshold for the sequence-ratio similarity metric.
pub const DEFAULT_SEQUENCE_THRESHOLD: f64 = 0.6;
/// Default minimum number of shared words for the word-overlap metric.
pub const DEFAULT_MIN_COMMON_WORDS: usize = 5;
/// Default number of top groups retained per polarity bucket.
pub const DEFAULT_TOP_N: usize = 3;

/// One participant's scored statement about one life domain.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Submission {
    /// Row identifier in the durable store. Used for deterministic ordering,
    /// never interpreted.
    pub id: String,
    /// Participant display name.
    pub author: String,
    /// Domain label, e.g. "Gezondheid".
    pub domain: String,
    /// Free text describing the effect.
    pub text: String,
    /// Strength score within [SCORE_MIN, SCORE_MAX].
    pub score: u8,
    /// -1 or +1 at entry time. 0 only ever arises from aggregation.
    pub polarity: i32,
}

/// One signed vote on an effect group.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteEvent {
    pub group_id: String,
    /// +1 for an upvote, -1 for a downvote.
    pub value: i32,
}

/// Identifies the comparison scope a grouping run operates in.
///
/// The scope is baked into every derived group identifier, so votes recorded
/// against an identifier can never collide with another session or team.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SessionScope {
    /// Workshop session code.
    pub session: String,
    /// Sub-group (team) code, when voting happens per team.
    pub team: Option<String>,
}

impl SessionScope {
    /// Derives the identifier of the `index`-th cluster of a domain.
    pub fn group_id(&self, domain_slug: &str, index: usize) -> String {
        match &self.team {
            Some(team) => format!("{}_{}_{}_{}", self.session, team, domain_slug, index),
            None => format!("{}_{}_{}", self.session, domain_slug, index),
        }
    }
}

// ********* Configuration **********

/// The text-similarity metric used to decide whether two submissions describe
/// the same effect.
///
/// Exactly one variant is configured per deployment. The two variants are not
/// equivalent and produce different clusters on the same input, so they are
/// never mixed within one grouping run.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum SimilarityMetric {
    /// Longest-matching-blocks ratio in [0, 1] between the normalized texts.
    /// An item joins a group when the ratio against the group's seed text
    /// meets the threshold.
    SequenceRatio { threshold: f64 },
    /// Number of distinct lowercase words the normalized texts share.
    SharedWords { min_common: usize },
}

impl SimilarityMetric {
    pub const DEFAULT: SimilarityMetric = SimilarityMetric::SequenceRatio {
        threshold: DEFAULT_SEQUENCE_THRESHOLD,
    };
}

/// The rules that govern one aggregation run.
#[derive(PartialEq, Debug, Clone)]
pub struct AggregationRules {
    pub metric: SimilarityMetric,
    /// Number of groups retained per polarity bucket by the top-N selection.
    pub top_n: usize,
}

impl AggregationRules {
    pub const DEFAULT_RULES: AggregationRules = AggregationRules {
        metric: SimilarityMetric::DEFAULT,
        top_n: DEFAULT_TOP_N,
    };
}

// ******** Output data structures *********

/// A cluster of submissions judged similar enough to represent the same
/// effect. Recomputed on every run; only votes and feedback referencing the
/// derived identifier are durable.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct EffectGroup {
    pub group_id: String,
    pub domain: String,
    /// Member texts joined for display.
    pub merged_text: String,
    /// -1, 0 (contested/unknown) or +1, resolved by the two-stage majority.
    pub polarity: i32,
    /// Distinct author names of the member submissions, in member order.
    pub authors: Vec<String>,
    /// Row identifiers of the member submissions, in member order.
    pub member_ids: Vec<String>,
    /// Sum of all vote events recorded against `group_id`.
    pub votes: i64,
}

/// The ranked outcome of an aggregation run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TopSelection {
    /// Top-N groups with polarity +1, highest tally first.
    pub positive: Vec<EffectGroup>,
    /// Top-N groups with polarity -1, highest tally first.
    pub negative: Vec<EffectGroup>,
    /// Groups with unresolved polarity, excluded from both ranked lists and
    /// surfaced for manual review. Not truncated.
    pub unresolved: Vec<EffectGroup>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AggregationResult {
    /// Every derived group, in derivation order (domains sorted, clusters in
    /// seed order within each domain).
    pub groups: Vec<EffectGroup>,
    pub top: TopSelection,
}

/// Errors raised when feeding invalid entries to the engine.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AggregationError {
    /// A direct entry carried a polarity other than -1 or +1.
    InvalidPolarity { value: i32 },
    /// A score outside [SCORE_MIN, SCORE_MAX].
    ScoreOutOfRange { value: u8 },
    /// A vote value other than -1 or +1.
    InvalidVote { value: i32 },
}

impl Error for AggregationError {}

impl Display for AggregationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationError::InvalidPolarity { value } => {
                write!(f, "submission polarity must be -1 or +1, got {}", value)
            }
            AggregationError::ScoreOutOfRange { value } => {
                write!(
                    f,
                    "score must lie within [{}, {}], got {}",
                    SCORE_MIN, SCORE_MAX, value
                )
            }
            AggregationError::InvalidVote { value } => {
                write!(f, "vote value must be -1 or +1, got {}", value)
            }
        }
    }
}
