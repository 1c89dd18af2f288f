use crate::workshop::*;

use serde::de::DeserializeOwned;
use std::time::Duration;

// The store serializes individual writes but offers no transaction across a
// look-up-then-write sequence; see the notes on the submission upsert below.

const READ_TIMEOUT: Duration = Duration::from_secs(15);
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// One row of the `submissions` table.
#[derive(Default, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub submission_id: Option<String>,
    pub session: Option<String>,
    pub name: Option<String>,
    pub domain: Option<String>,
    pub text: Option<String>,
    pub score: Option<i64>,
    pub posneg: Option<i64>,
    pub timestamp: Option<String>,
}

/// One row of the `effect_votes` table. Note the historical `domein`
/// spelling: the votes and feedback tables use the Dutch column name while
/// `submissions` uses `domain`.
#[derive(Default, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteRow {
    pub session: Option<String>,
    pub group: Option<String>,
    pub group_id: Option<String>,
    pub votes: Option<i64>,
    pub text: Option<String>,
    pub domein: Option<String>,
    pub posneg: Option<i64>,
    pub last_updated: Option<String>,
}

/// One row of the `groups` table: a participant's team choice.
#[derive(Default, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamChoiceRow {
    pub session: Option<String>,
    pub name: Option<String>,
    pub group: Option<String>,
}

/// Per-session parameters from the `meta` table.
#[derive(Default, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaRow {
    pub session: Option<String>,
    pub n_groups: Option<i64>,
    pub top_n: Option<i64>,
}

/// One row of the `group_results` table: a team's qualitative answers about
/// one top-ranked effect.
#[derive(Default, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupResultRow {
    pub session: Option<String>,
    pub group: Option<String>,
    pub text: Option<String>,
    pub domein: Option<String>,
    pub posneg: Option<i64>,
    pub feedback_group_impact: Option<String>,
    pub feedback_place_impact: Option<String>,
    pub feedback_distance: Option<String>,
    pub feedback_improvements: Option<String>,
    pub feedback_start: Option<i64>,
    pub group_id: Option<String>,
}

// The write payload of the submission upsert. Kept separate from the row so
// the store-generated columns (id, timestamp) never travel back on a write.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct SubmissionPayload {
    pub submission_id: String,
    pub session: String,
    pub domain: String,
    pub text: String,
    pub score: i64,
    pub posneg: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Builds the submission write payload: the score is clamped to the accepted
/// range and blank text becomes a single-space placeholder to satisfy the
/// store's non-null constraint.
pub fn submission_payload(
    submission_id: &str,
    session: &str,
    name: &str,
    domain: &str,
    text: &str,
    score: i64,
    posneg: i32,
) -> SubmissionPayload {
    let cleaned = text.trim();
    SubmissionPayload {
        submission_id: submission_id.to_string(),
        session: session.to_string(),
        domain: domain.to_string(),
        text: if cleaned.is_empty() {
            " ".to_string()
        } else {
            cleaned.to_string()
        },
        score: score.clamp(SCORE_MIN as i64, SCORE_MAX as i64),
        posneg,
        name: if name.trim().is_empty() {
            None
        } else {
            Some(name.to_string())
        },
    }
}

/// Clamps a polarity to {-1, 0, +1}; anything else becomes 0.
pub fn clamp_posneg(v: i32) -> i32 {
    if v == -1 || v == 0 || v == 1 {
        v
    } else {
        0
    }
}

/// The current UTC time in the second-resolution ISO form the store expects.
pub fn utc_now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Blocking client for the hosted REST store.
pub struct StoreClient {
    base: String,
    key: String,
    client: reqwest::blocking::Client,
}

impl StoreClient {
    pub fn new(store_url: &str, key: &str) -> WerkResult<StoreClient> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .context(StoreRequestSnafu {
                url: store_url.to_string(),
            })?;
        Ok(StoreClient {
            base: format!("{}/rest/v1", store_url.trim_end_matches('/')),
            key: key.to_string(),
            client,
        })
    }

    fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> WerkResult<Vec<T>> {
        let url = format!("{}/{}", self.base, table);
        debug!("fetch_rows: GET {} {:?}", url, query);
        let resp = self
            .client
            .get(url.as_str())
            .timeout(READ_TIMEOUT)
            .header("apikey", self.key.as_str())
            .bearer_auth(self.key.as_str())
            .header("Accept", "application/json")
            .query(query)
            .send()
            .context(StoreRequestSnafu { url: url.as_str() })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return StoreStatusSnafu {
                status: status.as_u16(),
                url,
                body,
            }
            .fail();
        }
        resp.json::<Vec<T>>().context(StoreRequestSnafu { url })
    }

    pub fn fetch_submissions(&self, session: &str) -> WerkResult<Vec<SubmissionRow>> {
        self.fetch_rows(
            "submissions",
            &[
                ("select", "*".to_string()),
                ("order", "timestamp.desc".to_string()),
                ("limit", "1000".to_string()),
                ("session", format!("eq.{}", session)),
            ],
        )
    }

    pub fn fetch_votes(&self, session: &str) -> WerkResult<Vec<VoteRow>> {
        self.fetch_rows(
            "effect_votes",
            &[
                ("select", "*".to_string()),
                ("session", format!("eq.{}", session)),
            ],
        )
    }

    pub fn fetch_team_choices(&self, session: &str) -> WerkResult<Vec<TeamChoiceRow>> {
        self.fetch_rows(
            "groups",
            &[
                ("select", "session,name,group".to_string()),
                ("session", format!("eq.{}", session)),
            ],
        )
    }

    pub fn fetch_group_results(&self, session: &str) -> WerkResult<Vec<GroupResultRow>> {
        self.fetch_rows(
            "group_results",
            &[
                ("select", "*".to_string()),
                ("session", format!("eq.{}", session)),
            ],
        )
    }

    pub fn fetch_meta(&self, session: &str) -> WerkResult<Option<MetaRow>> {
        let rows: Vec<MetaRow> = self.fetch_rows(
            "meta",
            &[
                ("select", "session,n_groups,top_n".to_string()),
                ("session", format!("eq.{}", session)),
            ],
        )?;
        Ok(rows.into_iter().next())
    }

    fn expect_row<T: DeserializeOwned>(
        &self,
        resp: reqwest::blocking::Response,
        url: String,
    ) -> WerkResult<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return StoreStatusSnafu {
                status: status.as_u16(),
                url,
                body,
            }
            .fail();
        }
        let mut rows: Vec<T> = resp
            .json()
            .context(StoreRequestSnafu { url: url.as_str() })?;
        if rows.is_empty() {
            whatever!("The store returned no representation for the written row ({})", url)
        }
        Ok(rows.remove(0))
    }

    /// Upserts one submission by its natural key (submission_id, domain,
    /// text): an existing row is patched in place, otherwise a new row is
    /// created.
    ///
    /// The look-up and the write are two requests. Two concurrent identical
    /// writes can both miss the look-up and insert a duplicate row; this is a
    /// known limitation of the store interface.
    pub fn upsert_submission(
        &self,
        submission_id: &str,
        session: &str,
        name: &str,
        domain: &str,
        text: &str,
        score: i64,
        posneg: i32,
    ) -> WerkResult<SubmissionRow> {
        let payload = submission_payload(submission_id, session, name, domain, text, score, posneg);
        let existing: Vec<SubmissionRow> = self.fetch_rows(
            "submissions",
            &[
                ("select", "id".to_string()),
                ("submission_id", format!("eq.{}", payload.submission_id)),
                ("domain", format!("eq.{}", payload.domain)),
                ("text", format!("eq.{}", payload.text)),
            ],
        )?;
        let url = format!("{}/submissions", self.base);
        let resp = match existing.first().and_then(|r| r.id) {
            Some(row_id) => {
                debug!("upsert_submission: patching row {}", row_id);
                self.client
                    .patch(url.as_str())
                    .timeout(WRITE_TIMEOUT)
                    .header("apikey", self.key.as_str())
                    .bearer_auth(self.key.as_str())
                    .header("Prefer", "return=representation")
                    .query(&[("id", format!("eq.{}", row_id))])
                    .json(&payload)
                    .send()
                    .context(StoreRequestSnafu { url: url.as_str() })?
            }
            None => {
                debug!("upsert_submission: inserting new row");
                self.client
                    .post(url.as_str())
                    .timeout(WRITE_TIMEOUT)
                    .header("apikey", self.key.as_str())
                    .bearer_auth(self.key.as_str())
                    .header("Prefer", "return=representation")
                    .json(&payload)
                    .send()
                    .context(StoreRequestSnafu { url: url.as_str() })?
            }
        };
        self.expect_row(resp, url)
    }

    pub fn delete_submission(&self, row_id: i64) -> WerkResult<()> {
        let url = format!("{}/submissions", self.base);
        let resp = self
            .client
            .delete(url.as_str())
            .timeout(WRITE_TIMEOUT)
            .header("apikey", self.key.as_str())
            .bearer_auth(self.key.as_str())
            .query(&[("id", format!("eq.{}", row_id))])
            .send()
            .context(StoreRequestSnafu { url: url.as_str() })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return StoreStatusSnafu {
                status: status.as_u16(),
                url,
                body,
            }
            .fail();
        }
        Ok(())
    }

    /// Upserts the participant's team choice on the (session, name) key.
    /// Falls back to a plain PATCH when the store lacks the uniqueness
    /// constraint and answers 409.
    pub fn upsert_team_choice(&self, session: &str, name: &str, group_label: &str) -> WerkResult<()> {
        let url = format!("{}/groups", self.base);
        let payload = TeamChoiceRow {
            session: Some(session.to_string()),
            name: Some(name.to_string()),
            group: Some(group_label.to_string()),
        };
        let resp = self
            .client
            .post(url.as_str())
            .timeout(WRITE_TIMEOUT)
            .header("apikey", self.key.as_str())
            .bearer_auth(self.key.as_str())
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .query(&[("on_conflict", "session,name".to_string())])
            .json(&payload)
            .send()
            .context(StoreRequestSnafu { url: url.as_str() })?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 409 {
            debug!("upsert_team_choice: no uniqueness constraint, patching instead");
            let patch_resp = self
                .client
                .patch(url.as_str())
                .timeout(WRITE_TIMEOUT)
                .header("apikey", self.key.as_str())
                .bearer_auth(self.key.as_str())
                .header("Prefer", "return=representation")
                .query(&[
                    ("session", format!("eq.{}", session)),
                    ("name", format!("eq.{}", name)),
                ])
                .json(&serde_json::json!({ "group": group_label }))
                .send()
                .context(StoreRequestSnafu { url: url.as_str() })?;
            let patch_status = patch_resp.status();
            if patch_status.is_success() {
                return Ok(());
            }
            let body = patch_resp.text().unwrap_or_default();
            return StoreStatusSnafu {
                status: patch_status.as_u16(),
                url,
                body,
            }
            .fail();
        }
        let body = resp.text().unwrap_or_default();
        StoreStatusSnafu {
            status: status.as_u16(),
            url,
            body,
        }
        .fail()
    }

    /// Appends one vote event. Votes are never updated or deleted; the tally
    /// is recomputed by summation at read time.
    pub fn insert_vote(&self, row: &VoteRow) -> WerkResult<()> {
        let url = format!("{}/effect_votes", self.base);
        let resp = self
            .client
            .post(url.as_str())
            .timeout(WRITE_TIMEOUT)
            .header("apikey", self.key.as_str())
            .bearer_auth(self.key.as_str())
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .context(StoreRequestSnafu { url: url.as_str() })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return StoreStatusSnafu {
                status: status.as_u16(),
                url,
                body,
            }
            .fail();
        }
        Ok(())
    }

    /// Upserts a team's feedback about one effect on the (group, text) key.
    pub fn upsert_group_feedback(&self, row: &GroupResultRow) -> WerkResult<()> {
        let url = format!("{}/group_results", self.base);
        let resp = self
            .client
            .post(url.as_str())
            .timeout(WRITE_TIMEOUT)
            .header("apikey", self.key.as_str())
            .bearer_auth(self.key.as_str())
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .query(&[("on_conflict", "group,text".to_string())])
            .json(row)
            .send()
            .context(StoreRequestSnafu { url: url.as_str() })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return StoreStatusSnafu {
                status: status.as_u16(),
                url,
                body,
            }
            .fail();
        }
        Ok(())
    }
}
