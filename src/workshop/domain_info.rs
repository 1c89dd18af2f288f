use crate::workshop::*;

use calamine::{open_workbook, Reader, Xlsx};
use std::collections::HashMap;

/// Display metadata for one life domain, read from the domain-info workbook.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct DomainInfo {
    pub domain: String,
    /// Introductory text shown above the submission form.
    pub intro_text: String,
    /// Helper questions to prompt participants.
    pub helper_questions: Vec<String>,
    /// "More information" link for the configured province.
    pub info_link: String,
}

// The workbook stores the helper questions as one dash-separated cell.
pub(crate) fn split_questions(raw: &str) -> Vec<String> {
    raw.split('-')
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(String::from)
        .collect()
}

pub(crate) fn pick_link(province: &str, link_gr: &str, link_dr: &str) -> String {
    let chosen = if province == "GR" { link_gr } else { link_dr };
    if chosen.trim().is_empty() {
        "#".to_string()
    } else {
        chosen.trim().to_string()
    }
}

fn cell_str(row: &[calamine::DataType], idx: Option<usize>) -> String {
    match idx.and_then(|i| row.get(i)) {
        Some(calamine::DataType::String(s)) => s.clone(),
        Some(calamine::DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Reads the domain metadata workbook, keyed by domain label.
///
/// A workbook without the expected columns yields an empty map rather than an
/// error: the metadata only enriches the report.
pub fn read_domain_info(path: &str, province: &str) -> WerkResult<HashMap<String, DomainInfo>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = workbook
        .worksheet_range_at(0)
        .context(EmptyWorkbookSnafu {})?
        .context(OpeningExcelSnafu { path })?;

    let header = match wrange.rows().next() {
        Some(h) => h,
        None => return Ok(HashMap::new()),
    };
    debug!("read_domain_info: header: {:?}", header);

    let col = |name: &str| -> Option<usize> {
        header.iter().position(|c| match c {
            calamine::DataType::String(s) => s.trim() == name,
            _ => false,
        })
    };
    let col_domain = col("domein");
    let col_intro = col("introductietekst");
    let col_questions = col("hulpvragen");
    let col_link_gr = col("link_GR");
    let col_link_dr = col("link_DR");
    if col_domain.is_none() {
        warn!("read_domain_info: no 'domein' column in {}", path);
        return Ok(HashMap::new());
    }

    let mut res: HashMap<String, DomainInfo> = HashMap::new();
    for row in wrange.rows().skip(1) {
        let domain = cell_str(row, col_domain).trim().to_string();
        if domain.is_empty() {
            continue;
        }
        let info = DomainInfo {
            domain: domain.clone(),
            intro_text: cell_str(row, col_intro).trim().to_string(),
            helper_questions: split_questions(&cell_str(row, col_questions)),
            info_link: pick_link(
                province,
                &cell_str(row, col_link_gr),
                &cell_str(row, col_link_dr),
            ),
        };
        res.insert(domain, info);
    }
    info!("read_domain_info: {} domains from {}", res.len(), path);
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn questions_split_on_dashes() {
        let qs = split_questions(
            "- Wat verandert er voor inwoners? - Wie merkt dit het eerst? -",
        );
        assert_eq!(
            qs,
            vec![
                "Wat verandert er voor inwoners?".to_string(),
                "Wie merkt dit het eerst?".to_string(),
            ]
        );
        assert!(split_questions("").is_empty());
        assert!(split_questions("- - -").is_empty());
    }

    #[test]
    fn link_follows_province() {
        assert_eq!(pick_link("GR", "https://gr", "https://dr"), "https://gr");
        assert_eq!(pick_link("DR", "https://gr", "https://dr"), "https://dr");
        // Anything that is not GR falls back to the DR link.
        assert_eq!(pick_link("", "https://gr", "https://dr"), "https://dr");
        assert_eq!(pick_link("GR", "  ", "https://dr"), "#");
    }
}
