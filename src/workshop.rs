use log::{debug, info, warn};

use effect_aggregation::*;
use snafu::{prelude::*, OptionExt, Snafu};

use std::collections::HashSet;
use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::workshop::config_reader::*;
use crate::workshop::session::SessionContext;
use crate::workshop::store::{GroupResultRow, StoreClient, SubmissionRow, TeamChoiceRow, VoteRow};

pub mod domain_info;
pub mod report;
pub mod session;
pub mod store;

#[derive(Debug, Snafu)]
pub enum WerkError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON from {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJsonNumber {},
    #[snafu(display("Error opening workbook {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display(""))]
    EmptyWorkbook {},
    #[snafu(display("Request to the store failed for {url}"))]
    StoreRequest { source: reqwest::Error, url: String },
    #[snafu(display("The store returned status {status} for {url}: {body}"))]
    StoreStatus {
        status: u16,
        url: String,
        body: String,
    },
    #[snafu(display("Session prerequisite missing: {what}. Go back to the entry point and provide it."))]
    MissingPrerequisite { what: String },
    #[snafu(display("Aggregation failed: {source}"))]
    Aggregation { source: AggregationError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type WerkResult<T> = Result<T, WerkError>;

pub mod config_reader {
    use crate::workshop::*;

    /// The session configuration handed to the driver. Field names follow the
    /// camelCase spelling of the configuration files the facilitators share.
    #[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct WorkshopConfig {
        #[serde(rename = "storeUrl")]
        pub store_url: String,
        #[serde(rename = "storeKey")]
        pub store_key: String,
        #[serde(rename = "accessCode")]
        pub access_code: String,
        #[serde(rename = "participantName")]
        pub participant_name: Option<String>,
        /// The participant's stable submission identifier. Generated when
        /// absent; configuring it keeps the upsert natural key stable across
        /// runs.
        #[serde(rename = "submissionId")]
        pub submission_id: Option<String>,
        /// Province code, GR or DR; selects the per-province info links.
        pub province: Option<String>,
        /// Short description of the intervention under discussion.
        pub description: Option<String>,
        /// Longer background text shown alongside the description.
        pub info: Option<String>,
        #[serde(rename = "domainInfoPath")]
        pub domain_info_path: Option<String>,
        #[serde(rename = "similarityMetric")]
        pub similarity_metric: Option<String>,
        #[serde(rename = "similarityThreshold")]
        pub similarity_threshold: Option<f64>,
        #[serde(rename = "minCommonWords")]
        _min_common_words: Option<JSValue>,
        #[serde(rename = "topN")]
        _top_n: Option<JSValue>,
        #[serde(rename = "maxUpvotes")]
        _max_upvotes: Option<JSValue>,
        #[serde(rename = "maxDownvotes")]
        _max_downvotes: Option<JSValue>,
    }

    impl WorkshopConfig {
        pub fn min_common_words(&self) -> WerkResult<Option<usize>> {
            read_opt_js_int(&self._min_common_words)
        }
        pub fn top_n(&self) -> WerkResult<Option<usize>> {
            read_opt_js_int(&self._top_n)
        }
        pub fn max_upvotes(&self) -> WerkResult<Option<usize>> {
            read_opt_js_int(&self._max_upvotes)
        }
        pub fn max_downvotes(&self) -> WerkResult<Option<usize>> {
            read_opt_js_int(&self._max_downvotes)
        }
    }

    /// One entry of the team-feedback file passed with --feedback.
    #[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct FeedbackEntry {
        pub text: String,
        pub domain: Option<String>,
        pub posneg: Option<i32>,
        #[serde(rename = "groupId")]
        pub group_id: Option<String>,
        #[serde(rename = "impactedCohort")]
        pub impacted_cohort: Option<String>,
        #[serde(rename = "impactedPlace")]
        pub impacted_place: Option<String>,
        pub reach: Option<String>,
        #[serde(rename = "onsetYears")]
        pub onset_years: Option<i64>,
        pub adjustments: Option<String>,
    }

    pub fn read_config(path: &str) -> WerkResult<WorkshopConfig> {
        let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
        let config: WorkshopConfig =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
        Ok(config)
    }

    pub fn read_feedback_file(path: &str) -> WerkResult<Vec<FeedbackEntry>> {
        let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
        let entries: Vec<FeedbackEntry> =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
        Ok(entries)
    }

    pub fn read_report_reference(path: &str) -> WerkResult<JSValue> {
        let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
        let js: JSValue =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
        Ok(js)
    }

    fn read_opt_js_int(x: &Option<JSValue>) -> WerkResult<Option<usize>> {
        match x {
            None => Ok(None),
            Some(JSValue::Number(n)) => n
                .as_u64()
                .map(|v| Some(v as usize))
                .context(ParsingJsonNumberSnafu {}),
            Some(JSValue::String(s)) => s
                .parse::<usize>()
                .ok()
                .map(Some)
                .context(ParsingJsonNumberSnafu {}),
            _ => None.context(ParsingJsonNumberSnafu {}),
        }
    }
}

/// Resolves the aggregation rules for this run: configuration overrides win,
/// then the per-session parameters from the meta table, then the defaults.
fn validate_rules(
    config: &WorkshopConfig,
    meta: &Option<store::MetaRow>,
) -> WerkResult<AggregationRules> {
    let metric = match config.similarity_metric.as_deref() {
        None | Some("sequenceRatio") => SimilarityMetric::SequenceRatio {
            threshold: config
                .similarity_threshold
                .unwrap_or(DEFAULT_SEQUENCE_THRESHOLD),
        },
        Some("sharedWords") => SimilarityMetric::SharedWords {
            min_common: config
                .min_common_words()?
                .unwrap_or(DEFAULT_MIN_COMMON_WORDS),
        },
        Some(x) => {
            whatever!(
                "Cannot use similarity metric {:?} (expected sequenceRatio or sharedWords)",
                x
            )
        }
    };
    let top_n = match config.top_n()? {
        Some(n) if n > 0 => n,
        Some(n) => whatever!("topN must be positive, got {}", n),
        None => meta
            .as_ref()
            .and_then(|m| m.top_n)
            .map(|n| n as usize)
            .or_else(|| {
                meta.as_ref()
                    .and_then(|m| m.n_groups)
                    .map(|n| (n as usize).max(1) * 3)
            })
            .unwrap_or(DEFAULT_TOP_N),
    };
    Ok(AggregationRules { metric, top_n })
}

// Extracts the team number from a stored label such as "Groep 3" or "3".
pub(crate) fn parse_team_number(label: &str) -> Option<u32> {
    let digits: String = label
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok()
}

fn parse_submit_spec(spec: &str) -> WerkResult<(String, String, i64, i32)> {
    let parts: Vec<&str> = spec.split('|').collect();
    if parts.len() != 4 {
        whatever!(
            "Cannot parse submission {:?}: expected 'domain|text|score|polarity'",
            spec
        )
    }
    let score = match parts[2].trim().parse::<i64>() {
        Ok(x) => x,
        Err(_) => whatever!("Cannot parse score {:?} in submission spec", parts[2]),
    };
    let polarity = match parts[3].trim() {
        "+1" | "1" => 1,
        "-1" => -1,
        x => whatever!("Polarity must be +1 or -1, got {:?}", x),
    };
    Ok((parts[0].trim().to_string(), parts[1].trim().to_string(), score, polarity))
}

fn parse_vote_spec(spec: &str) -> WerkResult<(String, i32)> {
    let (gid, value) = match spec.rsplit_once('=') {
        Some(p) => p,
        None => whatever!("Cannot parse vote {:?}: expected 'group_id=+1' or 'group_id=-1'", spec),
    };
    let value = match value.trim() {
        "+1" | "1" => 1,
        "-1" => -1,
        x => whatever!("Vote value must be +1 or -1, got {:?}", x),
    };
    if gid.trim().is_empty() {
        whatever!("Cannot parse vote {:?}: empty group identifier", spec)
    }
    Ok((gid.trim().to_string(), value))
}

// Maps a fetched row to an engine submission. Rows without a usable polarity
// are dropped (the store may hold rows from older tool versions).
fn to_submission(row: &SubmissionRow) -> Option<Submission> {
    let polarity = match row.posneg {
        Some(1) => 1,
        Some(-1) => -1,
        _ => return None,
    };
    let score = row
        .score
        .unwrap_or(SCORE_MIN as i64)
        .clamp(SCORE_MIN as i64, SCORE_MAX as i64) as u8;
    Some(Submission {
        id: row.id.map(|i| i.to_string()).unwrap_or_default(),
        author: row.name.clone().unwrap_or_default(),
        domain: row.domain.clone().unwrap_or_default(),
        text: row.text.clone().unwrap_or_default(),
        score,
        polarity,
    })
}

fn require_participant<'a>(config: &'a WorkshopConfig) -> WerkResult<&'a str> {
    match config.participant_name.as_deref() {
        Some(n) if !n.trim().is_empty() => Ok(n),
        _ => MissingPrerequisiteSnafu {
            what: "participant name (participantName in the session configuration)",
        }
        .fail(),
    }
}

pub fn run_werksessie(args: &Args) -> WerkResult<()> {
    let config_path = match &args.config {
        Some(p) => p.clone(),
        None => {
            return MissingPrerequisiteSnafu {
                what: "session configuration (--config)",
            }
            .fail()
        }
    };
    let config = read_config(&config_path)?;
    if config.access_code.trim().is_empty() {
        return MissingPrerequisiteSnafu {
            what: "workshop session code (accessCode)",
        }
        .fail();
    }
    info!(
        "session {:?}, participant {:?}",
        config.access_code, config.participant_name
    );

    let store = StoreClient::new(&config.store_url, &config.store_key)?;

    // Per-session parameters. A missing meta row is not an error, the
    // defaults apply.
    let meta = store.fetch_meta(&config.access_code).unwrap_or_else(|e| {
        warn!("Could not load session parameters: {}", e);
        None
    });
    let rules = validate_rules(&config, &meta)?;
    info!("rules: {:?}", rules);

    let participant = config.participant_name.clone().unwrap_or_default();
    let mut ctx = SessionContext::new(
        &participant,
        &config.access_code,
        config.submission_id.as_deref(),
        config.max_upvotes()?.unwrap_or(session::DEFAULT_MAX_UPVOTES as usize) as u32,
        config
            .max_downvotes()?
            .unwrap_or(session::DEFAULT_MAX_DOWNVOTES as usize) as u32,
    );

    // Writes requested on the command line happen before tabulation so the
    // report reflects them.
    if let Some(label) = &args.choose_team {
        let name = require_participant(&config)?;
        store.upsert_team_choice(&config.access_code, name, label)?;
        ctx.teams.invalidate();
        println!("Team choice recorded: {}", label);
    }
    if let Some(spec) = &args.submit {
        let name = require_participant(&config)?;
        let (domain, text, score, polarity) = parse_submit_spec(spec)?;
        let row = store.upsert_submission(
            &ctx.submission_id,
            &config.access_code,
            name,
            &domain,
            &text,
            score,
            polarity,
        )?;
        ctx.submissions.invalidate();
        println!(
            "Submission recorded for {} (row {})",
            domain,
            row.id.map(|i| i.to_string()).unwrap_or_else(|| "?".to_string())
        );
    }
    if let Some(row_id) = args.delete_submission {
        require_participant(&config)?;
        store.delete_submission(row_id)?;
        ctx.submissions.invalidate();
        println!("Submission {} deleted", row_id);
    }

    // Reads degrade to an empty state: a failed fetch is a warning, the
    // tabulation continues with what is available.
    let submission_rows: Vec<SubmissionRow> = match ctx.submissions.get() {
        Some(rows) => rows.clone(),
        None => {
            let rows = store
                .fetch_submissions(&config.access_code)
                .unwrap_or_else(|e| {
                    warn!("Could not load submissions: {}", e);
                    Vec::new()
                });
            ctx.submissions.put(rows.clone());
            rows
        }
    };
    let team_rows: Vec<TeamChoiceRow> = match ctx.teams.get() {
        Some(rows) => rows.clone(),
        None => {
            let rows = store
                .fetch_team_choices(&config.access_code)
                .unwrap_or_else(|e| {
                    warn!("Could not load team assignments: {}", e);
                    Vec::new()
                });
            ctx.teams.put(rows.clone());
            rows
        }
    };
    let vote_rows: Vec<VoteRow> = match ctx.votes.get() {
        Some(rows) => rows.clone(),
        None => {
            let rows = store.fetch_votes(&config.access_code).unwrap_or_else(|e| {
                warn!("Could not load votes: {}", e);
                Vec::new()
            });
            ctx.votes.put(rows.clone());
            rows
        }
    };

    if submission_rows.is_empty() {
        println!("Nog geen inzendingen.");
        return Ok(());
    }

    // Deterministic ordering before clustering: creation time, then row
    // identifier. Group identifiers then stay stable between reads of
    // unchanged data.
    let mut sorted_rows = submission_rows;
    sorted_rows.sort_by(|r1, r2| {
        let k1 = (r1.timestamp.clone().unwrap_or_default(), r1.id.unwrap_or(0));
        let k2 = (r2.timestamp.clone().unwrap_or_default(), r2.id.unwrap_or(0));
        k1.cmp(&k2)
    });

    // One row per (author, domain, score, text): re-submissions of the same
    // effect must not count twice.
    let mut seen_keys: HashSet<(String, String, i64, String)> = HashSet::new();
    let mut session_submissions: Vec<Submission> = Vec::new();
    let mut dropped = 0usize;
    for row in sorted_rows.iter() {
        let key = (
            normalize_text(&row.name.clone().unwrap_or_default()),
            row.domain.clone().unwrap_or_default(),
            row.score.unwrap_or(0),
            normalize_text(&row.text.clone().unwrap_or_default()),
        );
        if seen_keys.contains(&key) {
            continue;
        }
        seen_keys.insert(key);
        match to_submission(row) {
            Some(s) => session_submissions.push(s),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!("Dropped {} submissions without a usable polarity", dropped);
    }

    // The comparison scope: the participant's team when one is assigned,
    // otherwise the whole session.
    let my_team = team_rows.iter().find(|t| {
        normalize_text(&t.name.clone().unwrap_or_default()) == normalize_text(&participant)
            && !normalize_text(&participant).is_empty()
    });
    let team_label = my_team.and_then(|t| t.group.clone()).unwrap_or_default();
    let team_number = parse_team_number(&team_label);
    let scope = SessionScope {
        session: config.access_code.clone(),
        team: team_number.map(|n| n.to_string()),
    };

    let scoped_submissions: Vec<Submission> = match team_number {
        Some(n) => {
            let members: HashSet<String> = team_rows
                .iter()
                .filter(|t| {
                    t.group
                        .as_deref()
                        .and_then(parse_team_number)
                        .map(|m| m == n)
                        .unwrap_or(false)
                })
                .map(|t| normalize_text(&t.name.clone().unwrap_or_default()))
                .collect();
            info!(
                "Comparison scope: team {:?} ({} members)",
                team_label,
                members.len()
            );
            session_submissions
                .iter()
                .filter(|s| members.contains(&normalize_text(&s.author)))
                .cloned()
                .collect()
        }
        None => {
            debug!("No team assignment for {:?}, scoping to the whole session", participant);
            session_submissions.clone()
        }
    };

    let mut vote_events: Vec<VoteEvent> = Vec::new();
    for row in vote_rows.iter() {
        match (row.group_id.clone(), row.votes) {
            (Some(gid), Some(v)) if v == 1 || v == -1 => vote_events.push(VoteEvent {
                group_id: gid,
                value: v as i32,
            }),
            _ => debug!("Skipping malformed vote row {:?}", row),
        }
    }

    let mut result = run_aggregation(&scoped_submissions, &vote_events, &scope, &rules)
        .context(AggregationSnafu {})?;

    if let Some(spec) = &args.vote {
        require_participant(&config)?;
        if team_number.is_none() {
            return MissingPrerequisiteSnafu {
                what: "team assignment (choose a team before voting)",
            }
            .fail();
        }
        let (gid, value) = parse_vote_spec(spec)?;
        let group = result
            .groups
            .iter()
            .find(|g| g.group_id == gid)
            .whatever_context(format!(
                "No effect group with identifier {:?} in the current tabulation",
                gid
            ))?
            .clone();
        match ctx.check_vote(&group, value) {
            Ok(()) => {
                store.insert_vote(&VoteRow {
                    session: Some(config.access_code.clone()),
                    group: Some(team_label.clone()),
                    group_id: Some(group.group_id.clone()),
                    votes: Some(value as i64),
                    text: Some(group.merged_text.clone()),
                    domein: Some(group.domain.clone()),
                    posneg: Some(store::clamp_posneg(group.polarity) as i64),
                    last_updated: Some(store::utc_now_iso()),
                })?;
                ctx.record_vote(&group.group_id, value);
                println!(
                    "Vote recorded on {} ({} used of {} upvotes, {} of {} downvotes)",
                    group.group_id,
                    ctx.upvotes_used,
                    ctx.max_upvotes,
                    ctx.downvotes_used,
                    ctx.max_downvotes
                );
                // Fold the new event in locally so the report reflects it
                // without waiting out the read cache.
                vote_events.push(VoteEvent {
                    group_id: group.group_id.clone(),
                    value,
                });
                result = run_aggregation(&scoped_submissions, &vote_events, &scope, &rules)
                    .context(AggregationSnafu {})?;
            }
            Err(rejection) => {
                warn!("Vote on {} rejected: {}", gid, rejection);
                println!("Vote not recorded: {}", rejection);
            }
        }
        let open = ctx.votable(&result.groups);
        info!("{} groups remain open for voting", open.len());
    }

    if let Some(path) = &args.feedback {
        require_participant(&config)?;
        if team_label.trim().is_empty() {
            return MissingPrerequisiteSnafu {
                what: "team assignment (choose a team before recording feedback)",
            }
            .fail();
        }
        let entries = read_feedback_file(path)?;
        let mut recorded = 0usize;
        for entry in entries.iter() {
            if let Some(reach) = entry.reach.as_deref() {
                if !report::is_valid_reach(reach) {
                    whatever!(
                        "Unknown reach category {:?}; expected one of {:?}",
                        reach,
                        report::REACH_OPTIONS
                    )
                }
            }
            if let Some(y) = entry.onset_years {
                if !(0..=50).contains(&y) {
                    whatever!("onsetYears must lie within 0..=50, got {}", y)
                }
            }
            let posneg = match entry.posneg {
                Some(p) if p == 1 || p == -1 => Some(p as i64),
                _ => entry
                    .group_id
                    .as_deref()
                    .and_then(|gid| result.groups.iter().find(|g| g.group_id == gid))
                    .map(|g| store::clamp_posneg(g.polarity) as i64),
            };
            store.upsert_group_feedback(&GroupResultRow {
                session: Some(config.access_code.clone()),
                group: Some(team_label.clone()),
                text: Some(entry.text.clone()),
                domein: entry.domain.clone(),
                posneg,
                feedback_group_impact: entry.impacted_cohort.clone(),
                feedback_place_impact: entry.impacted_place.clone(),
                feedback_distance: entry.reach.clone(),
                feedback_improvements: entry.adjustments.clone(),
                feedback_start: entry.onset_years,
                group_id: entry.group_id.clone(),
            })?;
            recorded += 1;
        }
        println!("Feedback recorded ({} items)", recorded);
    }

    let feedback_rows = store
        .fetch_group_results(&config.access_code)
        .unwrap_or_else(|e| {
            warn!("Could not load group feedback: {}", e);
            Vec::new()
        });

    let domain_meta = match config.domain_info_path.as_deref() {
        Some(p) => domain_info::read_domain_info(p, config.province.as_deref().unwrap_or("GR"))
            .unwrap_or_else(|e| {
                warn!("Could not load domain metadata: {}", e);
                Default::default()
            }),
        None => Default::default(),
    };

    let report = report::build_report(
        &config.access_code,
        config.description.as_deref().unwrap_or("-"),
        config.info.as_deref().unwrap_or("-"),
        &session_submissions,
        &result,
        &feedback_rows,
        &team_rows,
        &domain_meta,
    );

    let report_js = serde_json::to_value(&report).context(ParsingJsonSnafu {
        path: "<report>".to_string(),
    })?;
    let pretty_js_report = serde_json::to_string_pretty(&report_js).context(ParsingJsonSnafu {
        path: "<report>".to_string(),
    })?;
    println!("report:{}", pretty_js_report);

    if let Some(out_path) = &args.out {
        fs::write(out_path, &pretty_js_report).context(OpeningFileSnafu {
            path: out_path.as_str(),
        })?;
        info!("Report written to {}", out_path);
    }
    if let Some(doc_path) = &args.report_doc {
        fs::write(doc_path, report::render_markdown(&report)).context(OpeningFileSnafu {
            path: doc_path.as_str(),
        })?;
        info!("Report document written to {}", doc_path);
    }

    // The reference report, if provided for comparison
    if let Some(reference_path) = &args.reference {
        let reference = read_report_reference(reference_path)?;
        let pretty_js_reference =
            serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {
                path: reference_path.as_str(),
            })?;
        if pretty_js_reference != pretty_js_report {
            warn!("Found differences with the reference report");
            print_diff(pretty_js_reference.as_str(), pretty_js_report.as_ref(), "\n");
            whatever!("Difference detected between generated report and reference report")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(extra: &str) -> WorkshopConfig {
        let raw = format!(
            r#"{{"storeUrl": "https://example.test", "storeKey": "k", "accessCode": "code123"{}}}"#,
            extra
        );
        serde_json::from_str(raw.as_str()).unwrap()
    }

    #[test]
    fn rules_default_to_sequence_ratio() {
        let config = config_with("");
        let rules = validate_rules(&config, &None).unwrap();
        assert_eq!(
            rules.metric,
            SimilarityMetric::SequenceRatio {
                threshold: DEFAULT_SEQUENCE_THRESHOLD
            }
        );
        assert_eq!(rules.top_n, DEFAULT_TOP_N);
    }

    #[test]
    fn rules_pick_up_meta_parameters() {
        let config = config_with("");
        let meta = Some(store::MetaRow {
            session: Some("code123".to_string()),
            n_groups: Some(4),
            top_n: None,
        });
        let rules = validate_rules(&config, &meta).unwrap();
        assert_eq!(rules.top_n, 12);

        let meta = Some(store::MetaRow {
            session: Some("code123".to_string()),
            n_groups: Some(4),
            top_n: Some(5),
        });
        assert_eq!(validate_rules(&config, &meta).unwrap().top_n, 5);
    }

    #[test]
    fn rules_accept_top_n_as_string_or_number() {
        let config = config_with(r#", "topN": "7""#);
        assert_eq!(validate_rules(&config, &None).unwrap().top_n, 7);
        let config = config_with(r#", "topN": 4"#);
        assert_eq!(validate_rules(&config, &None).unwrap().top_n, 4);
    }

    #[test]
    fn rules_reject_unknown_metric() {
        let config = config_with(r#", "similarityMetric": "soundex""#);
        assert!(validate_rules(&config, &None).is_err());
    }

    #[test]
    fn rules_select_shared_words() {
        let config = config_with(r#", "similarityMetric": "sharedWords", "minCommonWords": 3"#);
        let rules = validate_rules(&config, &None).unwrap();
        assert_eq!(rules.metric, SimilarityMetric::SharedWords { min_common: 3 });
    }

    #[test]
    fn team_number_parsing() {
        assert_eq!(parse_team_number("Groep 3"), Some(3));
        assert_eq!(parse_team_number("3"), Some(3));
        assert_eq!(parse_team_number("groep12"), Some(12));
        assert_eq!(parse_team_number("geen"), None);
        assert_eq!(parse_team_number(""), None);
    }

    #[test]
    fn submit_spec_parsing() {
        let (domain, text, score, polarity) =
            parse_submit_spec("Gezondheid|minder stress bij inwoners|4|+1").unwrap();
        assert_eq!(domain, "Gezondheid");
        assert_eq!(text, "minder stress bij inwoners");
        assert_eq!(score, 4);
        assert_eq!(polarity, 1);
        assert!(parse_submit_spec("Gezondheid|tekst|x|+1").is_err());
        assert!(parse_submit_spec("Gezondheid|tekst|3|0").is_err());
        assert!(parse_submit_spec("too|few").is_err());
    }

    #[test]
    fn vote_spec_parsing() {
        assert_eq!(
            parse_vote_spec("code123_3_gezondheid_0=+1").unwrap(),
            ("code123_3_gezondheid_0".to_string(), 1)
        );
        assert_eq!(
            parse_vote_spec("code123_3_gezondheid_1=-1").unwrap(),
            ("code123_3_gezondheid_1".to_string(), -1)
        );
        assert!(parse_vote_spec("code123_3_gezondheid_0=2").is_err());
        assert!(parse_vote_spec("no-value").is_err());
    }

    #[test]
    fn submission_row_mapping() {
        let row = SubmissionRow {
            id: Some(12),
            submission_id: Some("s".to_string()),
            session: Some("code123".to_string()),
            name: Some("Anna".to_string()),
            domain: Some("Wonen".to_string()),
            text: Some("meer woningen".to_string()),
            score: Some(9),
            posneg: Some(1),
            timestamp: None,
        };
        let s = to_submission(&row).unwrap();
        assert_eq!(s.score, 5);
        assert_eq!(s.polarity, 1);

        let row = SubmissionRow {
            posneg: Some(0),
            ..row
        };
        assert!(to_submission(&row).is_none());
    }
}
