use crate::workshop::*;

use crate::workshop::store::{SubmissionRow, TeamChoiceRow, VoteRow};
use std::fmt::Display;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Upvotes a participant may spend in one interactive session.
pub const DEFAULT_MAX_UPVOTES: u32 = 10;
/// Downvotes a participant may spend in one interactive session.
pub const DEFAULT_MAX_DOWNVOTES: u32 = 5;
/// How long fetched store rows are reused before they count as stale.
pub const READ_CACHE_TTL: Duration = Duration::from_secs(15);

/// A single-entry cache with an explicit expiry timestamp.
///
/// Different participants' views may diverge by up to the time-to-live; that
/// staleness window is an accepted property of the interaction model, not a
/// bug.
pub struct TtlCache<T> {
    entry: Option<(T, Instant)>,
    ttl: Duration,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> TtlCache<T> {
        TtlCache { entry: None, ttl }
    }

    /// The cached value, or None when absent or past its time-to-live.
    pub fn get(&self) -> Option<&T> {
        match &self.entry {
            Some((value, stored_at)) if stored_at.elapsed() < self.ttl => Some(value),
            _ => None,
        }
    }

    pub fn put(&mut self, value: T) {
        self.entry = Some((value, Instant::now()));
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

/// Why a vote was rejected before any write was attempted.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum VoteRejection {
    /// The group contains a submission authored by the voter.
    OwnSubmission,
    /// The voter already voted on this group in this session.
    AlreadyVoted,
    UpvoteBudgetExhausted { max: u32 },
    DownvoteBudgetExhausted { max: u32 },
}

impl Display for VoteRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteRejection::OwnSubmission => {
                write!(f, "je kunt niet stemmen op je eigen effect")
            }
            VoteRejection::AlreadyVoted => {
                write!(f, "er is al een stem geregistreerd voor dit effect")
            }
            VoteRejection::UpvoteBudgetExhausted { max } => {
                write!(f, "max upvotes bereikt ({})", max)
            }
            VoteRejection::DownvoteBudgetExhausted { max } => {
                write!(f, "max downvotes bereikt ({})", max)
            }
        }
    }
}

/// The per-session state of one participant, passed explicitly to every
/// operation that needs it.
///
/// Budgets and the already-voted set live only here: they are not
/// re-validated against the durable store, so a participant running two
/// concurrent sessions can exceed the caps. A documented limitation.
pub struct SessionContext {
    pub participant: String,
    pub access_code: String,
    /// Stable identifier for this participant's submissions.
    pub submission_id: String,
    pub max_upvotes: u32,
    pub max_downvotes: u32,
    pub upvotes_used: u32,
    pub downvotes_used: u32,
    voted_ids: std::collections::HashSet<String>,
    pub submissions: TtlCache<Vec<SubmissionRow>>,
    pub votes: TtlCache<Vec<VoteRow>>,
    pub teams: TtlCache<Vec<TeamChoiceRow>>,
}

impl SessionContext {
    pub fn new(
        participant: &str,
        access_code: &str,
        submission_id: Option<&str>,
        max_upvotes: u32,
        max_downvotes: u32,
    ) -> SessionContext {
        SessionContext {
            participant: participant.to_string(),
            access_code: access_code.to_string(),
            submission_id: submission_id
                .map(|s| s.to_string())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            max_upvotes,
            max_downvotes,
            upvotes_used: 0,
            downvotes_used: 0,
            voted_ids: std::collections::HashSet::new(),
            submissions: TtlCache::new(READ_CACHE_TTL),
            votes: TtlCache::new(READ_CACHE_TTL),
            teams: TtlCache::new(READ_CACHE_TTL),
        }
    }

    fn is_author_of(&self, group: &EffectGroup) -> bool {
        let me = normalize_text(&self.participant);
        !me.is_empty() && group.authors.iter().any(|a| normalize_text(a) == me)
    }

    /// Checks a vote against the local rules. Nothing is written when this
    /// returns an error; the caller surfaces the rejection to the user.
    pub fn check_vote(&self, group: &EffectGroup, value: i32) -> Result<(), VoteRejection> {
        if self.is_author_of(group) {
            return Err(VoteRejection::OwnSubmission);
        }
        if self.voted_ids.contains(&group.group_id) {
            return Err(VoteRejection::AlreadyVoted);
        }
        if value > 0 && self.upvotes_used >= self.max_upvotes {
            return Err(VoteRejection::UpvoteBudgetExhausted {
                max: self.max_upvotes,
            });
        }
        if value < 0 && self.downvotes_used >= self.max_downvotes {
            return Err(VoteRejection::DownvoteBudgetExhausted {
                max: self.max_downvotes,
            });
        }
        Ok(())
    }

    /// Marks a vote as spent after the write succeeded.
    pub fn record_vote(&mut self, group_id: &str, value: i32) {
        self.voted_ids.insert(group_id.to_string());
        if value > 0 {
            self.upvotes_used += 1;
        } else {
            self.downvotes_used += 1;
        }
        debug!(
            "record_vote: {} up, {} down spent",
            self.upvotes_used, self.downvotes_used
        );
    }

    pub fn has_voted(&self, group_id: &str) -> bool {
        self.voted_ids.contains(group_id)
    }

    /// The groups this participant may still vote on: not their own, not
    /// already voted on in this session.
    pub fn votable<'a>(&self, groups: &'a [EffectGroup]) -> Vec<&'a EffectGroup> {
        groups
            .iter()
            .filter(|g| !self.is_author_of(g) && !self.has_voted(&g.group_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SessionContext {
        SessionContext::new(
            "Anna",
            "code123",
            None,
            DEFAULT_MAX_UPVOTES,
            DEFAULT_MAX_DOWNVOTES,
        )
    }

    fn group(id: &str, authors: &[&str]) -> EffectGroup {
        EffectGroup {
            group_id: id.to_string(),
            domain: "Gezondheid".to_string(),
            merged_text: "tekst".to_string(),
            polarity: 1,
            authors: authors.iter().map(|a| a.to_string()).collect(),
            member_ids: vec![],
            votes: 0,
        }
    }

    #[test]
    fn rejects_vote_on_own_submission() {
        let ctx = ctx();
        let g = group("g1", &["  ANNA ", "Bob"]);
        assert_eq!(ctx.check_vote(&g, 1), Err(VoteRejection::OwnSubmission));
        assert!(ctx.votable(std::slice::from_ref(&g)).is_empty());
    }

    #[test]
    fn rejects_double_vote() {
        let mut ctx = ctx();
        let g = group("g1", &["Bob"]);
        assert_eq!(ctx.check_vote(&g, 1), Ok(()));
        ctx.record_vote("g1", 1);
        assert_eq!(ctx.check_vote(&g, 1), Err(VoteRejection::AlreadyVoted));
        assert!(ctx.votable(std::slice::from_ref(&g)).is_empty());
    }

    #[test]
    fn enforces_upvote_budget() {
        let mut ctx = ctx();
        for i in 0..DEFAULT_MAX_UPVOTES {
            let g = group(&format!("g{}", i), &["Bob"]);
            assert_eq!(ctx.check_vote(&g, 1), Ok(()));
            ctx.record_vote(&g.group_id, 1);
        }
        let extra = group("g-extra", &["Bob"]);
        assert_eq!(
            ctx.check_vote(&extra, 1),
            Err(VoteRejection::UpvoteBudgetExhausted {
                max: DEFAULT_MAX_UPVOTES
            })
        );
        // The downvote budget is untouched.
        assert_eq!(ctx.check_vote(&extra, -1), Ok(()));
    }

    #[test]
    fn enforces_downvote_budget() {
        let mut ctx = ctx();
        for i in 0..DEFAULT_MAX_DOWNVOTES {
            let g = group(&format!("g{}", i), &["Bob"]);
            assert_eq!(ctx.check_vote(&g, -1), Ok(()));
            ctx.record_vote(&g.group_id, -1);
        }
        let extra = group("g-extra", &["Bob"]);
        assert_eq!(
            ctx.check_vote(&extra, -1),
            Err(VoteRejection::DownvoteBudgetExhausted {
                max: DEFAULT_MAX_DOWNVOTES
            })
        );
    }

    #[test]
    fn cache_expires_after_ttl() {
        let mut cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(3600));
        assert_eq!(cache.get(), None);
        cache.put(42);
        assert_eq!(cache.get(), Some(&42));
        cache.invalidate();
        assert_eq!(cache.get(), None);

        // A zero time-to-live is stale immediately.
        let mut cache: TtlCache<u32> = TtlCache::new(Duration::ZERO);
        cache.put(42);
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn fresh_context_generates_submission_id() {
        let c1 = ctx();
        let c2 = ctx();
        assert!(!c1.submission_id.is_empty());
        assert_ne!(c1.submission_id, c2.submission_id);

        let pinned = SessionContext::new("Anna", "code123", Some("fixed-id"), 10, 5);
        assert_eq!(pinned.submission_id, "fixed-id");
    }
}
