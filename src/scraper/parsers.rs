use crate::error::ScrapeError;
use crate::models::{PartyInfo, RawCaseRecord};
use scraper::{ElementRef, Html, Selector};

const SUMMARY_ROWS: &str = "#case_summary_table > tbody > tr";
const PARTY_ROWS: &str = "#party_info_table > tbody > tr";

const CASE_NUMBER_LABEL: &str = "CASE NUMBER";

const PLAINTIFF_TAG: &str = "P 1";
const FIRST_DEFENDANT_TAG: &str = "D 1";

// ── Page → rows ───────────────────────────────────────────────────────────────

/// Rendered text of an element: text nodes joined by a space, runs of
/// whitespace (including line breaks) collapsed.
fn visible_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn child_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .map(visible_text)
        .collect()
}

fn select_rows<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(sel) => doc.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

/// One string per case summary row, e.g. `"CASE NUMBER: A1111111"`.
pub fn summary_rows(doc: &Html) -> Vec<String> {
    select_rows(doc, SUMMARY_ROWS)
        .into_iter()
        .map(|tr| child_cells(tr).join(" ").trim().to_string())
        .collect()
}

/// Cell texts of every party table row.
pub fn party_rows(doc: &Html) -> Vec<Vec<String>> {
    select_rows(doc, PARTY_ROWS).into_iter().map(child_cells).collect()
}

/// Trimmed value of the first summary row labelled `label`. Rows without a
/// separator are passed over.
fn summary_value(doc: &Html, label: &str) -> Option<String> {
    summary_rows(doc).into_iter().find_map(|row| {
        let (key, value) = row.split_once(':')?;
        (key.trim().eq_ignore_ascii_case(label)).then(|| value.trim().to_string())
    })
}

/// Case number as displayed on a detail page, if the page shows one.
pub fn displayed_case_id(doc: &Html) -> Option<String> {
    summary_value(doc, CASE_NUMBER_LABEL).filter(|id| !id.is_empty())
}

// ── Rows → fields ─────────────────────────────────────────────────────────────

/// Split `FIELD NAME: value` rows on their first `:`. Labels are upper-cased,
/// both sides trimmed; blank rows are skipped. A non-blank row without a
/// separator makes the whole record malformed.
pub fn parse_summary_rows<S: AsRef<str>>(rows: &[S]) -> Result<RawCaseRecord, ScrapeError> {
    let mut record = RawCaseRecord::new();

    for row in rows {
        let row = row.as_ref().trim();
        if row.is_empty() {
            continue;
        }
        let (label, value) = row.split_once(':').ok_or_else(|| ScrapeError::MalformedRecord {
            case_id: None,
            row: row.to_string(),
        })?;
        record.insert(label.trim().to_uppercase(), value.trim().to_string());
    }

    Ok(record)
}

/// Pick the plaintiff and the defendant out of the party table.
///
/// Rows are `name | address | role | attorney?`. The first "P 1" row is the
/// plaintiff; the first row whose role is "D 1" or mentions "D" is the
/// defendant. Further defendants of multi-defendant cases are dropped.
/// Rows with fewer than three cells are ignored.
pub fn parse_party_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> PartyInfo {
    let mut info = PartyInfo::default();
    let mut plaintiff_claimed = false;
    let mut defendant_claimed = false;

    for row in rows {
        let [name, address, role, rest @ ..] = row.as_slice() else {
            continue;
        };
        let role = role.as_ref().trim();
        let attorney = rest.first().map(|a| a.as_ref().to_string());

        if role == PLAINTIFF_TAG {
            if plaintiff_claimed {
                continue;
            }
            plaintiff_claimed = true;
            info.plaintiff_name = Some(name.as_ref().to_string());
            info.plaintiff_address = Some(address.as_ref().to_string());
            info.plaintiff_attorney = attorney;
        } else if role == FIRST_DEFENDANT_TAG || role.contains('D') {
            if defendant_claimed {
                continue;
            }
            defendant_claimed = true;
            info.defendant_name = Some(name.as_ref().to_string());
            info.defendant_address = Some(address.as_ref().to_string());
            info.defendant_attorney = attorney;
        }
    }

    info
}

/// Parse both tables of a detail page. A malformed summary row is reported
/// together with the case number shown on the page.
pub fn parse_case_page(html: &str) -> Result<(RawCaseRecord, PartyInfo), ScrapeError> {
    let doc = Html::parse_document(html);

    let summary = parse_summary_rows(&summary_rows(&doc)).map_err(|e| match e {
        ScrapeError::MalformedRecord { row, .. } => ScrapeError::MalformedRecord {
            case_id: displayed_case_id(&doc),
            row,
        },
        other => other,
    })?;
    let parties = parse_party_rows(&party_rows(&doc));

    Ok((summary, parties))
}

/// Value of one summary label, tolerating malformed rows elsewhere on the page.
pub fn find_summary_field(html: &str, label: &str) -> Option<String> {
    summary_value(&Html::parse_document(html), label)
}
