use crate::workshop::*;

use crate::workshop::domain_info::DomainInfo;
use crate::workshop::store::{GroupResultRow, TeamChoiceRow};
use std::collections::HashMap;

/// The fixed list of life domains a session covers, in report order.
pub const DOMAINS: [&str; 8] = [
    "Welzijn",
    "Materiële welvaart",
    "Gezondheid",
    "Arbeid en vrije tijd",
    "Wonen",
    "Sociaal",
    "Veiligheid",
    "Milieu",
];

/// The reach categories a team can pick in the feedback stage.
pub const REACH_OPTIONS: [&str; 7] = [
    "-- geen antwoord --",
    "de buurt",
    "wijk/dorp",
    "stad of gemeente",
    "provincie",
    "landelijk",
    "internationaal",
];

pub fn is_valid_reach(reach: &str) -> bool {
    REACH_OPTIONS.contains(&reach)
}

// Dutch stopwords for the theme analysis.
const DUTCH_STOPWORDS: [&str; 37] = [
    "de", "het", "een", "en", "of", "maar", "want", "dat", "die", "dit", "er", "je", "jij", "u",
    "we", "wij", "ze", "zij", "ik", "hij", "in", "op", "aan", "met", "voor", "van", "naar", "bij",
    "als", "dan", "niet", "geen", "wel", "ook", "om", "te", "tot",
];

/// How many theme words are reported per domain.
const TOP_WORDS: usize = 15;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DomainScore {
    pub domain: String,
    pub submission_count: usize,
    /// Mean of score x polarity over the domain's submissions, 0 when there
    /// are none.
    pub mean_signed_score: f64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ReportedEffect {
    pub group_id: String,
    pub text: String,
    pub domain: String,
    pub polarity: i32,
    pub votes: i64,
    pub authors: Vec<String>,
}

impl ReportedEffect {
    fn from_group(g: &EffectGroup) -> ReportedEffect {
        ReportedEffect {
            group_id: g.group_id.clone(),
            text: g.merged_text.clone(),
            domain: g.domain.clone(),
            polarity: g.polarity,
            votes: g.votes,
            authors: g.authors.clone(),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OnsetStats {
    pub min: i64,
    pub max: i64,
    pub mean: f64,
}

/// Roll-up of the structured feedback answers for one polarity.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackRollup {
    pub cohorts: Vec<String>,
    pub places: Vec<String>,
    pub reach: Vec<String>,
    pub adjustments: Vec<String>,
    pub onset: Option<OnsetStats>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DomainThemes {
    pub domain: String,
    pub submission_count: usize,
    pub intro_text: String,
    pub top_words: Vec<WordCount>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session: String,
    pub description: String,
    pub info: String,
    pub date: String,
    pub participant_count: usize,
    pub team_count: usize,
    pub domain_scores: Vec<DomainScore>,
    pub top_positive: Vec<ReportedEffect>,
    pub top_negative: Vec<ReportedEffect>,
    /// Groups with contested polarity, listed for manual review.
    pub unresolved: Vec<ReportedEffect>,
    pub positive_feedback: FeedbackRollup,
    pub negative_feedback: FeedbackRollup,
    pub themes: Vec<DomainThemes>,
}

/// Mean signed score (score x polarity) per domain, over the fixed domain
/// list. Domains without submissions report 0.
pub fn mean_signed_scores(submissions: &[Submission]) -> Vec<DomainScore> {
    DOMAINS
        .iter()
        .map(|d| {
            let signed: Vec<f64> = submissions
                .iter()
                .filter(|s| s.domain == *d)
                .map(|s| s.score as f64 * s.polarity as f64)
                .collect();
            let mean = if signed.is_empty() {
                0.0
            } else {
                signed.iter().sum::<f64>() / signed.len() as f64
            };
            DomainScore {
                domain: d.to_string(),
                submission_count: signed.len(),
                mean_signed_score: mean,
            }
        })
        .collect()
}

/// Case-insensitive word frequencies over the texts, with stopwords and
/// punctuation stripped. Sorted by count, then alphabetically.
pub fn word_frequencies<'a, I>(texts: I, top: usize) -> Vec<WordCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for word in normalize_text(text).split_whitespace() {
            let cleaned: String = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_string();
            if cleaned.is_empty() || DUTCH_STOPWORDS.contains(&cleaned.as_str()) {
                continue;
            }
            *counts.entry(cleaned).or_insert(0) += 1;
        }
    }
    let mut res: Vec<WordCount> = counts
        .into_iter()
        .map(|(word, count)| WordCount { word, count })
        .collect();
    res.sort_by(|w1, w2| w2.count.cmp(&w1.count).then(w1.word.cmp(&w2.word)));
    res.truncate(top);
    res
}

fn onset_stats(values: &[i64]) -> Option<OnsetStats> {
    if values.is_empty() {
        return None;
    }
    let min = *values.iter().min().unwrap();
    let max = *values.iter().max().unwrap();
    let mean = values.iter().sum::<i64>() as f64 / values.len() as f64;
    Some(OnsetStats { min, max, mean })
}

// Collects a distinct, order-preserving list of non-empty answers.
fn distinct_answers<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut res: Vec<String> = Vec::new();
    for v in values.into_iter().flatten() {
        let cleaned = v.trim();
        if cleaned.is_empty() || cleaned == "-- geen antwoord --" {
            continue;
        }
        if !res.iter().any(|r| r == cleaned) {
            res.push(cleaned.to_string());
        }
    }
    res
}

pub(crate) fn rollup(rows: &[&GroupResultRow]) -> FeedbackRollup {
    let onset_values: Vec<i64> = rows.iter().filter_map(|r| r.feedback_start).collect();
    FeedbackRollup {
        cohorts: distinct_answers(rows.iter().map(|r| r.feedback_group_impact.as_deref())),
        places: distinct_answers(rows.iter().map(|r| r.feedback_place_impact.as_deref())),
        reach: distinct_answers(rows.iter().map(|r| r.feedback_distance.as_deref())),
        adjustments: distinct_answers(rows.iter().map(|r| r.feedback_improvements.as_deref())),
        onset: onset_stats(&onset_values),
    }
}

pub fn build_report(
    session: &str,
    description: &str,
    info: &str,
    submissions: &[Submission],
    result: &AggregationResult,
    feedback: &[GroupResultRow],
    teams: &[TeamChoiceRow],
    domain_meta: &HashMap<String, DomainInfo>,
) -> SessionReport {
    let participants = distinct_answers(submissions.iter().map(|s| Some(s.author.as_str())));
    let mut team_labels = distinct_answers(teams.iter().map(|t| t.group.as_deref()));
    if team_labels.is_empty() {
        team_labels = distinct_answers(feedback.iter().map(|r| r.group.as_deref()));
    }

    let positive_rows: Vec<&GroupResultRow> = feedback
        .iter()
        .filter(|r| r.posneg == Some(1))
        .collect();
    let negative_rows: Vec<&GroupResultRow> = feedback
        .iter()
        .filter(|r| r.posneg == Some(-1))
        .collect();

    let themes: Vec<DomainThemes> = DOMAINS
        .iter()
        .map(|d| {
            let texts: Vec<&str> = submissions
                .iter()
                .filter(|s| s.domain == *d)
                .map(|s| s.text.as_str())
                .collect();
            DomainThemes {
                domain: d.to_string(),
                submission_count: texts.len(),
                intro_text: domain_meta
                    .get(*d)
                    .map(|m| m.intro_text.clone())
                    .unwrap_or_default(),
                top_words: word_frequencies(texts, TOP_WORDS),
            }
        })
        .collect();

    SessionReport {
        session: session.to_string(),
        description: description.to_string(),
        info: info.to_string(),
        date: chrono::Utc::now().format("%d-%m-%Y").to_string(),
        participant_count: participants.len(),
        team_count: team_labels.len(),
        domain_scores: mean_signed_scores(submissions),
        top_positive: result.top.positive.iter().map(ReportedEffect::from_group).collect(),
        top_negative: result.top.negative.iter().map(ReportedEffect::from_group).collect(),
        unresolved: result.top.unresolved.iter().map(ReportedEffect::from_group).collect(),
        positive_feedback: rollup(&positive_rows),
        negative_feedback: rollup(&negative_rows),
        themes,
    }
}

fn format_onset(stats: &Option<OnsetStats>) -> String {
    match stats {
        None => "geen data".to_string(),
        Some(s) => format!(
            "min: {} jaar, max: {} jaar, gemiddeld: {:.1} jaar",
            s.min, s.max, s.mean
        ),
    }
}

fn push_effect_lines(out: &mut String, effects: &[ReportedEffect]) {
    if effects.is_empty() {
        out.push_str("Geen effecten gevonden.\n");
        return;
    }
    for e in effects.iter() {
        out.push_str(&format!(
            "- {} ({} stemmen, {})\n",
            e.text, e.votes, e.domain
        ));
    }
}

fn push_rollup(out: &mut String, r: &FeedbackRollup) {
    out.push_str(&format!("- Groepen: {}\n", r.cohorts.join(", ")));
    out.push_str(&format!("- Plaatsen: {}\n", r.places.join(", ")));
    out.push_str(&format!("- Reikwijdte: {}\n", r.reach.join(", ")));
    out.push_str(&format!("- Aanpassingen: {}\n", r.adjustments.join(", ")));
    out.push_str(&format!("- Verwachte start effect: {}\n", format_onset(&r.onset)));
}

/// Renders the report as a Markdown document, section for section the way
/// the facilitators hand it out.
pub fn render_markdown(report: &SessionReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Verslag werksessie – {}\n\n", report.description));
    out.push_str(&format!("Datum: {}\n\n", report.date));
    out.push_str(&format!("Thema: {}\n\n", report.description));
    out.push_str(&format!("Informatie: {}\n\n", report.info));
    out.push_str(&format!("Aantal deelnemers: {}\n\n", report.participant_count));
    out.push_str(&format!("Aantal groepen: {}\n\n", report.team_count));

    out.push_str("## 1. Gemiddelde scores per domein\n\n");
    out.push_str(
        "Hieronder zie je hoe positief of negatief elk domein is beoordeeld door de deelnemers.\n\n",
    );
    out.push_str("| Domein | Inzendingen | Gemiddelde score |\n");
    out.push_str("|---|---|---|\n");
    for d in report.domain_scores.iter() {
        out.push_str(&format!(
            "| {} | {} | {:.2} |\n",
            d.domain, d.submission_count, d.mean_signed_score
        ));
    }
    out.push('\n');

    out.push_str("## 2. Hoogst gewaardeerde effecten\n\n");
    out.push_str("### Positief\n\n");
    push_effect_lines(&mut out, &report.top_positive);
    out.push_str("\n### Negatief\n\n");
    push_effect_lines(&mut out, &report.top_negative);
    if !report.unresolved.is_empty() {
        out.push_str("\n### Onbesliste effecten (handmatige controle)\n\n");
        push_effect_lines(&mut out, &report.unresolved);
    }
    out.push('\n');

    out.push_str("## 3. Samenvatting wie waar wanneer\n\n");
    out.push_str("### Positieve effecten\n\n");
    push_rollup(&mut out, &report.positive_feedback);
    out.push_str("\n### Negatieve effecten\n\n");
    push_rollup(&mut out, &report.negative_feedback);
    out.push('\n');

    out.push_str("## 4. Thema-analyse\n\n");
    for theme in report.themes.iter() {
        out.push_str(&format!("### {}\n\n", theme.domain));
        if !theme.intro_text.is_empty() {
            out.push_str(&format!("{}\n\n", theme.intro_text));
        }
        out.push_str(&format!(
            "Aantal inzendingen in dit domein: {}\n\n",
            theme.submission_count
        ));
        if theme.top_words.is_empty() {
            out.push_str("Geen tekst beschikbaar voor dit domein.\n\n");
        } else {
            let words: Vec<String> = theme
                .top_words
                .iter()
                .map(|w| format!("{} ({})", w.word, w.count))
                .collect();
            out.push_str(&format!("Meest genoemde woorden: {}\n\n", words.join(", ")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(author: &str, domain: &str, text: &str, score: u8, polarity: i32) -> Submission {
        Submission {
            id: "1".to_string(),
            author: author.to_string(),
            domain: domain.to_string(),
            text: text.to_string(),
            score,
            polarity,
        }
    }

    #[test]
    fn signed_scores_cover_the_fixed_domain_list() {
        let subs = vec![
            sub("anna", "Gezondheid", "a", 4, 1),
            sub("bob", "Gezondheid", "b", 2, -1),
            sub("clara", "Wonen", "c", 5, 1),
        ];
        let scores = mean_signed_scores(&subs);
        assert_eq!(scores.len(), DOMAINS.len());
        let gezondheid = scores.iter().find(|s| s.domain == "Gezondheid").unwrap();
        assert_eq!(gezondheid.submission_count, 2);
        assert!((gezondheid.mean_signed_score - 1.0).abs() < 1e-9);
        let milieu = scores.iter().find(|s| s.domain == "Milieu").unwrap();
        assert_eq!(milieu.submission_count, 0);
        assert_eq!(milieu.mean_signed_score, 0.0);
    }

    #[test]
    fn word_frequencies_skip_stopwords() {
        let texts = vec!["Minder stress in de wijk", "minder auto's in de wijk!"];
        let words = word_frequencies(texts, 10);
        assert!(words.iter().all(|w| w.word != "de" && w.word != "in"));
        let minder = words.iter().find(|w| w.word == "minder").unwrap();
        assert_eq!(minder.count, 2);
        let wijk = words.iter().find(|w| w.word == "wijk").unwrap();
        assert_eq!(wijk.count, 2);
        // Sorted by count first, then alphabetically.
        assert_eq!(words[0].word, "minder");
        assert_eq!(words[1].word, "wijk");
    }

    #[test]
    fn onset_statistics() {
        assert_eq!(onset_stats(&[]), None);
        let s = onset_stats(&[0, 10, 5]).unwrap();
        assert_eq!(s.min, 0);
        assert_eq!(s.max, 10);
        assert!((s.mean - 5.0).abs() < 1e-9);
    }

    #[test]
    fn rollup_keeps_distinct_answers() {
        let row1 = GroupResultRow {
            feedback_group_impact: Some("jongeren".to_string()),
            feedback_place_impact: Some("centrum".to_string()),
            feedback_distance: Some("wijk/dorp".to_string()),
            feedback_start: Some(5),
            ..Default::default()
        };
        let row2 = GroupResultRow {
            feedback_group_impact: Some("jongeren".to_string()),
            feedback_place_impact: Some("  ".to_string()),
            feedback_distance: Some("-- geen antwoord --".to_string()),
            feedback_start: Some(15),
            ..Default::default()
        };
        let r = rollup(&[&row1, &row2]);
        assert_eq!(r.cohorts, vec!["jongeren".to_string()]);
        assert_eq!(r.places, vec!["centrum".to_string()]);
        assert_eq!(r.reach, vec!["wijk/dorp".to_string()]);
        let onset = r.onset.unwrap();
        assert_eq!((onset.min, onset.max), (5, 15));
        assert!((onset.mean - 10.0).abs() < 1e-9);
    }

    #[test]
    fn reach_validation() {
        assert!(is_valid_reach("de buurt"));
        assert!(is_valid_reach("-- geen antwoord --"));
        assert!(!is_valid_reach("overal"));
    }

    #[test]
    fn markdown_contains_the_sections() {
        let report = SessionReport {
            session: "code123".to_string(),
            description: "nieuwe wijk".to_string(),
            info: "-".to_string(),
            date: "01-01-2026".to_string(),
            participant_count: 3,
            team_count: 1,
            domain_scores: mean_signed_scores(&[sub("anna", "Gezondheid", "a", 4, 1)]),
            top_positive: vec![ReportedEffect {
                group_id: "code123_1_gezondheid_0".to_string(),
                text: "minder stress".to_string(),
                domain: "Gezondheid".to_string(),
                polarity: 1,
                votes: 2,
                authors: vec!["anna".to_string()],
            }],
            top_negative: vec![],
            unresolved: vec![],
            positive_feedback: Default::default(),
            negative_feedback: Default::default(),
            themes: vec![],
        };
        let md = render_markdown(&report);
        assert!(md.contains("# Verslag werksessie – nieuwe wijk"));
        assert!(md.contains("## 1. Gemiddelde scores per domein"));
        assert!(md.contains("minder stress (2 stemmen, Gezondheid)"));
        assert!(md.contains("### Negatief\n\nGeen effecten gevonden."));
        assert!(md.contains("Verwachte start effect: geen data"));
    }
}
