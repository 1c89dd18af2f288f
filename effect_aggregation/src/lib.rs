mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};

use std::collections::{HashMap, HashSet};

pub use crate::config::*;

// **** Text helpers ****

/// Lower-cases the text, collapses runs of whitespace to single spaces and
/// strips leading and trailing whitespace.
///
/// Normalization is idempotent: applying it twice gives the same result as
/// applying it once.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

/// Turns a display label into a lowercase dash-separated slug.
///
/// Runs of characters outside `[a-z0-9]` become a single `-`, and leading or
/// trailing dashes are removed. Used for the domain segment of group
/// identifiers.
pub fn slugify(s: &str) -> String {
    let lower = s.trim().to_lowercase();
    let mut out = String::with_capacity(lower.len());
    for c in lower.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

// **** Similarity metrics ****

/// The longest-matching-blocks similarity ratio between two texts, in [0, 1].
///
/// This is `2*M / (len_a + len_b)` where `M` is the total length of the
/// matching blocks found by recursively extracting the longest common
/// substring. Identical texts give 1.0, texts without common characters 0.0.
/// The grouping behavior depends on these exact semantics, so the ratio is
/// implemented here rather than approximated with an edit distance.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let ca: Vec<char> = a.chars().collect();
    let cb: Vec<char> = b.chars().collect();
    if ca.is_empty() && cb.is_empty() {
        return 1.0;
    }
    let matched = matching_total(&ca, &cb);
    (2.0 * matched as f64) / ((ca.len() + cb.len()) as f64)
}

// Longest common block between the two slices: (start_a, start_b, length).
// On equal lengths the earliest block in `a` (then in `b`) wins.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best: (usize, usize, usize) = (0, 0, 0);
    // j2len[j] = length of the common block ending at a[i], b[j].
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for (i, ac) in a.iter().enumerate() {
        let mut next_j2len: HashMap<usize, usize> = HashMap::new();
        for (j, bc) in b.iter().enumerate() {
            if ac == bc {
                let k = match j.checked_sub(1) {
                    Some(pj) => j2len.get(&pj).copied().unwrap_or(0) + 1,
                    None => 1,
                };
                next_j2len.insert(j, k);
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        j2len = next_j2len;
    }
    best
}

fn matching_total(a: &[char], b: &[char]) -> usize {
    let (i, j, k) = longest_match(a, b);
    if k == 0 {
        return 0;
    }
    k + matching_total(&a[..i], &b[..j]) + matching_total(&a[i + k..], &b[j + k..])
}

/// The number of distinct words the two texts share.
pub fn shared_word_count(a: &str, b: &str) -> usize {
    let wa: HashSet<&str> = a.split_whitespace().collect();
    let wb: HashSet<&str> = b.split_whitespace().collect();
    wa.intersection(&wb).count()
}

// Whether `candidate` is similar enough to the seed text of an open group.
// Both arguments are expected to be normalized already.
fn meets_threshold(metric: &SimilarityMetric, seed: &str, candidate: &str) -> bool {
    match metric {
        SimilarityMetric::SequenceRatio { threshold } => {
            sequence_ratio(seed, candidate) >= *threshold
        }
        SimilarityMetric::SharedWords { min_common } => {
            shared_word_count(seed, candidate) >= *min_common
        }
    }
}

// **** Clustering ****

/// Partitions the submissions into clusters of similar texts.
///
/// Items are processed in input order, one domain at a time (domains in
/// sorted order). An unassigned item opens a new group and all later
/// unassigned items of the same domain are compared against that item's
/// normalized text. An item joins a group only when it meets the threshold
/// against the group's seed, never against other members, so the relation is
/// anchored on the seed rather than transitively closed.
///
/// The result covers every input index exactly once and no cluster is empty.
pub fn cluster_by_similarity(
    submissions: &[Submission],
    metric: &SimilarityMetric,
) -> Vec<Vec<usize>> {
    let mut domains: Vec<String> = submissions
        .iter()
        .map(|s| s.domain.clone())
        .filter(|d| !d.trim().is_empty())
        .collect::<HashSet<String>>()
        .into_iter()
        .collect();
    domains.sort();

    let normalized: Vec<String> = submissions.iter().map(|s| normalize_text(&s.text)).collect();

    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut assigned: HashSet<usize> = HashSet::new();
    for dom in domains.iter() {
        let dom_indices: Vec<usize> = submissions
            .iter()
            .enumerate()
            .filter_map(|(idx, s)| if s.domain == *dom { Some(idx) } else { None })
            .collect();
        for (pos, &i) in dom_indices.iter().enumerate() {
            if assigned.contains(&i) {
                continue;
            }
            assigned.insert(i);
            let mut group: Vec<usize> = vec![i];
            let seed = &normalized[i];
            for &j in dom_indices[pos + 1..].iter() {
                if assigned.contains(&j) {
                    continue;
                }
                if meets_threshold(metric, seed, &normalized[j]) {
                    group.push(j);
                    assigned.insert(j);
                }
            }
            debug!(
                "cluster_by_similarity: domain {:?}, seed {}: {} members",
                dom,
                i,
                group.len()
            );
            clusters.push(group);
        }
    }

    // Submissions with a blank domain tag still belong to the partition.
    for (idx, s) in submissions.iter().enumerate() {
        if s.domain.trim().is_empty() && !assigned.contains(&idx) {
            assigned.insert(idx);
            clusters.push(vec![idx]);
        }
    }
    clusters
}

// **** Polarity resolution ****

/// The majority value of a collection of polarities.
///
/// Values outside {-1, 0, +1} are discarded. Returns 0 when the two most
/// frequent values are tied, or when no valid values remain.
pub fn majority_polarity<I>(values: I) -> i32
where
    I: IntoIterator<Item = i32>,
{
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for v in values {
        if v == -1 || v == 0 || v == 1 {
            *counts.entry(v).or_insert(0) += 1;
        }
    }
    if counts.is_empty() {
        return 0;
    }
    let mut sorted: Vec<(i32, usize)> = counts.into_iter().collect();
    sorted.sort_by(|p1, p2| p2.1.cmp(&p1.1).then(p1.0.cmp(&p2.0)));
    if sorted.len() >= 2 && sorted[0].1 == sorted[1].1 {
        return 0;
    }
    sorted[0].0
}

// The first stage of polarity resolution: the majority polarity of every
// distinct normalized text, over all submissions in the comparison set.
fn text_polarity_map(submissions: &[Submission]) -> HashMap<String, i32> {
    let mut by_text: HashMap<String, Vec<i32>> = HashMap::new();
    for s in submissions.iter() {
        let tn = normalize_text(&s.text);
        if tn.is_empty() {
            continue;
        }
        by_text.entry(tn).or_default().push(s.polarity);
    }
    by_text
        .into_iter()
        .map(|(tn, vals)| (tn, majority_polarity(vals)))
        .collect()
}

// **** Vote tally ****

/// Sums the signed vote values per group identifier.
///
/// The tally is always recomputed from the full event list, never kept as a
/// stored counter.
pub fn tally_votes(votes: &[VoteEvent]) -> HashMap<String, i64> {
    let mut tally: HashMap<String, i64> = HashMap::new();
    for v in votes.iter() {
        *tally.entry(v.group_id.clone()).or_insert(0) += v.value as i64;
    }
    tally
}

// **** Top-N selection ****

/// Ranks the groups by vote tally within each polarity bucket.
///
/// Both ranked lists are truncated to `top_n`; ties keep the input order.
/// Groups with unresolved polarity are excluded from the ranked lists and
/// returned separately, untruncated.
pub fn select_top(groups: &[EffectGroup], top_n: usize) -> TopSelection {
    let mut positive: Vec<EffectGroup> = groups.iter().filter(|g| g.polarity == 1).cloned().collect();
    let mut negative: Vec<EffectGroup> = groups.iter().filter(|g| g.polarity == -1).cloned().collect();
    let unresolved: Vec<EffectGroup> = groups.iter().filter(|g| g.polarity == 0).cloned().collect();
    // sort_by is stable, so equal tallies stay in input order.
    positive.sort_by(|g1, g2| g2.votes.cmp(&g1.votes));
    negative.sort_by(|g1, g2| g2.votes.cmp(&g1.votes));
    positive.truncate(top_n);
    negative.truncate(top_n);
    TopSelection {
        positive,
        negative,
        unresolved,
    }
}

// **** Entry point ****

fn checks(submissions: &[Submission], votes: &[VoteEvent]) -> Result<(), AggregationError> {
    for s in submissions.iter() {
        if s.polarity != -1 && s.polarity != 1 {
            return Err(AggregationError::InvalidPolarity { value: s.polarity });
        }
        if s.score < SCORE_MIN || s.score > SCORE_MAX {
            return Err(AggregationError::ScoreOutOfRange { value: s.score });
        }
    }
    for v in votes.iter() {
        if v.value != -1 && v.value != 1 {
            return Err(AggregationError::InvalidVote { value: v.value });
        }
    }
    Ok(())
}

/// Runs the full aggregation for one comparison scope.
///
/// Arguments:
/// * `submissions` the submissions of the scope, in the order that determines
///   the derived group identifiers (callers sort by creation time and row
///   identifier to keep identifiers stable between reads)
/// * `votes` every vote event recorded against identifiers of this scope
/// * `scope` the session and optional team code baked into the identifiers
/// * `rules` the similarity metric and the top-N size
pub fn run_aggregation(
    submissions: &[Submission],
    votes: &[VoteEvent],
    scope: &SessionScope,
    rules: &AggregationRules,
) -> Result<AggregationResult, AggregationError> {
    info!(
        "run_aggregation: processing {} submissions and {} vote events, rules: {:?}",
        submissions.len(),
        votes.len(),
        rules
    );
    checks(submissions, votes)?;

    let clusters = cluster_by_similarity(submissions, &rules.metric);
    debug!("run_aggregation: {} clusters", clusters.len());

    let per_text = text_polarity_map(submissions);
    let tally = tally_votes(votes);

    let mut groups: Vec<EffectGroup> = Vec::new();
    let mut cluster_index: HashMap<String, usize> = HashMap::new();
    for members in clusters.iter() {
        let seed = &submissions[members[0]];
        let slug = slugify(&seed.domain);
        let idx_entry = cluster_index.entry(slug.clone()).or_insert(0);
        let group_id = scope.group_id(&slug, *idx_entry);
        *idx_entry += 1;

        let texts: Vec<String> = members
            .iter()
            .map(|&m| submissions[m].text.clone())
            .filter(|t| !t.trim().is_empty())
            .collect();
        let merged_text = if texts.is_empty() {
            "(geen tekst)".to_string()
        } else {
            texts.join(" / ")
        };

        let mut authors: Vec<String> = Vec::new();
        for &m in members.iter() {
            let a = submissions[m].author.clone();
            if !a.trim().is_empty() && !authors.contains(&a) {
                authors.push(a);
            }
        }

        // Second stage: group-level majority over the per-text results.
        let component_polarities: Vec<i32> = texts
            .iter()
            .map(|t| normalize_text(t))
            .filter(|tn| !tn.is_empty())
            .map(|tn| per_text.get(&tn).copied().unwrap_or(0))
            .collect();
        let polarity = majority_polarity(component_polarities);

        let votes_total = tally.get(&group_id).copied().unwrap_or(0);

        groups.push(EffectGroup {
            group_id,
            domain: seed.domain.clone(),
            merged_text,
            polarity,
            authors,
            member_ids: members.iter().map(|&m| submissions[m].id.clone()).collect(),
            votes: votes_total,
        });
    }

    let top = select_top(&groups, rules.top_n);
    info!(
        "run_aggregation: {} groups ({} positive, {} negative, {} unresolved in top selection)",
        groups.len(),
        top.positive.len(),
        top.negative.len(),
        top.unresolved.len()
    );
    Ok(AggregationResult { groups, top })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(id: &str, author: &str, domain: &str, text: &str, score: u8, polarity: i32) -> Submission {
        Submission {
            id: id.to_string(),
            author: author.to_string(),
            domain: domain.to_string(),
            text: text.to_string(),
            score,
            polarity,
        }
    }

    fn scope() -> SessionScope {
        SessionScope {
            session: "code123".to_string(),
            team: Some("3".to_string()),
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let raw = "  Minder   Stress\tbij  inwoners ";
        let once = normalize_text(raw);
        assert_eq!(once, "minder stress bij inwoners");
        assert_eq!(normalize_text(&once), once);
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   \t\n "), "");
    }

    #[test]
    fn slugify_labels() {
        assert_eq!(slugify("Gezondheid"), "gezondheid");
        assert_eq!(slugify("Materiële welvaart"), "materi-le-welvaart");
        assert_eq!(slugify("Arbeid en vrije tijd"), "arbeid-en-vrije-tijd");
        assert_eq!(slugify("  --  "), "");
    }

    #[test]
    fn group_id_derivation() {
        let sc = scope();
        assert_eq!(sc.group_id("gezondheid", 0), "code123_3_gezondheid_0");
        let no_team = SessionScope {
            session: "code123".to_string(),
            team: None,
        };
        assert_eq!(no_team.group_id("wonen", 2), "code123_wonen_2");
    }

    #[test]
    fn sequence_ratio_bounds() {
        assert_eq!(sequence_ratio("abc", "abc"), 1.0);
        assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
        assert_eq!(sequence_ratio("", ""), 1.0);
        let r = sequence_ratio("abcd", "bcde");
        assert!(r > 0.7 && r < 0.8, "ratio was {}", r);
    }

    #[test]
    fn shared_words_are_distinct() {
        assert_eq!(shared_word_count("de de de buurt", "de buurt"), 2);
        assert_eq!(shared_word_count("a b c", "d e f"), 0);
    }

    #[test]
    fn majority_cases() {
        assert_eq!(majority_polarity(vec![1, 1, -1]), 1);
        assert_eq!(majority_polarity(vec![1, -1]), 0);
        assert_eq!(majority_polarity(vec![]), 0);
        assert_eq!(majority_polarity(vec![7, 42]), 0);
        assert_eq!(majority_polarity(vec![1, 1, 1, -1, -1]), 1);
        assert_eq!(majority_polarity(vec![0, 0, 1]), 0);
    }

    #[test]
    fn clustering_is_a_partition() {
        let subs = vec![
            sub("1", "anna", "Gezondheid", "minder stress bij inwoners", 3, 1),
            sub("2", "bob", "Wonen", "meer woningen beschikbaar", 4, 1),
            sub("3", "clara", "Gezondheid", "stress neemt af bij bewoners", 2, 1),
            sub("4", "dirk", "Wonen", "", 1, -1),
        ];
        let clusters = cluster_by_similarity(&subs, &SimilarityMetric::DEFAULT);
        let mut seen: Vec<usize> = clusters.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert!(clusters.iter().all(|c| !c.is_empty()));
        // No cluster mixes two domains.
        for c in clusters.iter() {
            let doms: HashSet<&str> = c.iter().map(|&i| subs[i].domain.as_str()).collect();
            assert_eq!(doms.len(), 1);
        }
    }

    #[test]
    fn clustering_is_seed_anchored() {
        // a shares 3 words with b, b shares 3 words with c, a shares none
        // with c. With full linkage all three would merge; anchored on the
        // seed, c stays out.
        let subs = vec![
            sub("1", "anna", "Wonen", "groen park voor kinderen in wijk", 3, 1),
            sub("2", "bob", "Wonen", "groen park voor ouderen met bankjes", 3, 1),
            sub("3", "clara", "Wonen", "ouderen met bankjes rustig plein", 3, 1),
        ];
        let metric = SimilarityMetric::SharedWords { min_common: 3 };
        let clusters = cluster_by_similarity(&subs, &metric);
        assert_eq!(clusters, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn identical_texts_always_cluster() {
        let subs = vec![
            sub("1", "anna", "Milieu", "Meer groen in de stad", 3, 1),
            sub("2", "bob", "Milieu", "meer  groen in de stad", 3, 1),
        ];
        let clusters = cluster_by_similarity(&subs, &SimilarityMetric::DEFAULT);
        assert_eq!(clusters, vec![vec![0, 1]]);
    }

    #[test]
    fn tally_is_additive() {
        let votes = vec![
            VoteEvent {
                group_id: "g1".to_string(),
                value: 1,
            },
            VoteEvent {
                group_id: "g1".to_string(),
                value: 1,
            },
            VoteEvent {
                group_id: "g1".to_string(),
                value: -1,
            },
        ];
        let tally = tally_votes(&votes);
        assert_eq!(tally.get("g1"), Some(&1));
        assert_eq!(tally.get("g2"), None);
    }

    fn group(id: &str, polarity: i32, votes: i64) -> EffectGroup {
        EffectGroup {
            group_id: id.to_string(),
            domain: "Gezondheid".to_string(),
            merged_text: id.to_string(),
            polarity,
            authors: vec![],
            member_ids: vec![],
            votes,
        }
    }

    #[test]
    fn top_n_is_stable_on_ties() {
        let groups = vec![
            group("a", 1, 10),
            group("b", 1, 10),
            group("c", 1, 5),
            group("d", 0, 99),
        ];
        let top = select_top(&groups, 2);
        let ids: Vec<&str> = top.positive.iter().map(|g| g.group_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(top.unresolved.len(), 1);
        assert_eq!(top.unresolved[0].group_id, "d");
        // Repeating the selection on identical input gives the same order.
        let again = select_top(&groups, 2);
        assert_eq!(top, again);
    }

    #[test]
    fn rejects_invalid_entries() {
        let bad_polarity = vec![sub("1", "anna", "Wonen", "tekst", 3, 0)];
        let res = run_aggregation(&bad_polarity, &[], &scope(), &AggregationRules::DEFAULT_RULES);
        assert_eq!(res, Err(AggregationError::InvalidPolarity { value: 0 }));

        let bad_score = vec![sub("1", "anna", "Wonen", "tekst", 9, 1)];
        let res = run_aggregation(&bad_score, &[], &scope(), &AggregationRules::DEFAULT_RULES);
        assert_eq!(res, Err(AggregationError::ScoreOutOfRange { value: 9 }));

        let subs = vec![sub("1", "anna", "Wonen", "tekst", 3, 1)];
        let votes = vec![VoteEvent {
            group_id: "x".to_string(),
            value: 2,
        }];
        let res = run_aggregation(&subs, &votes, &scope(), &AggregationRules::DEFAULT_RULES);
        assert_eq!(res, Err(AggregationError::InvalidVote { value: 2 }));
    }

    #[test]
    fn two_stage_polarity_is_not_diluted_by_duplicate_rows() {
        // Three rows of the same text resolve to +1 first; the group-level
        // vote then sees one +1 per member text next to one -1, so the
        // dominant text keeps the group positive despite its mixed rows.
        let subs = vec![
            sub("1", "anna", "Wonen", "meer woningen", 3, 1),
            sub("2", "bob", "Wonen", "meer woningen", 3, 1),
            sub("3", "clara", "Wonen", "meer woningen", 3, -1),
        ];
        let res = run_aggregation(&subs, &[], &scope(), &AggregationRules::DEFAULT_RULES).unwrap();
        assert_eq!(res.groups.len(), 1);
        assert_eq!(res.groups[0].polarity, 1);
    }

    #[test]
    fn full_scenario() {
        let subs = vec![
            sub("1", "Anna", "Gezondheid", "minder stress bij inwoners", 4, 1),
            sub("2", "Bob", "Gezondheid", "stress neemt af bij bewoners", 3, 1),
            sub("3", "Clara", "Gezondheid", "meer verkeer overlast", 2, -1),
        ];
        let sc = scope();
        let rules = AggregationRules {
            metric: SimilarityMetric::SequenceRatio { threshold: 0.6 },
            top_n: 1,
        };

        // First pass, no votes yet: two groups with the expected polarity.
        let res = run_aggregation(&subs, &[], &sc, &rules).unwrap();
        assert_eq!(res.groups.len(), 2);
        let g1 = &res.groups[0];
        let g2 = &res.groups[1];
        assert_eq!(g1.group_id, "code123_3_gezondheid_0");
        assert_eq!(g2.group_id, "code123_3_gezondheid_1");
        assert_eq!(g1.polarity, 1);
        assert_eq!(g2.polarity, -1);
        assert_eq!(
            g1.merged_text,
            "minder stress bij inwoners / stress neemt af bij bewoners"
        );
        assert_eq!(g1.authors, vec!["Anna".to_string(), "Bob".to_string()]);

        // Two upvotes on the pair, one on the single negative group.
        let votes = vec![
            VoteEvent {
                group_id: g1.group_id.clone(),
                value: 1,
            },
            VoteEvent {
                group_id: g1.group_id.clone(),
                value: 1,
            },
            VoteEvent {
                group_id: g2.group_id.clone(),
                value: 1,
            },
        ];
        let res = run_aggregation(&subs, &votes, &sc, &rules).unwrap();
        assert_eq!(res.top.positive.len(), 1);
        assert_eq!(res.top.positive[0].group_id, "code123_3_gezondheid_0");
        assert_eq!(res.top.positive[0].votes, 2);
        assert_eq!(res.top.negative.len(), 1);
        assert_eq!(res.top.negative[0].votes, 1);
    }
}
