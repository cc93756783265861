use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Date format used by the search form and by the site's case pages.
pub const FORM_DATE_FORMAT: &str = "%m/%d/%Y";

// ── Date range ────────────────────────────────────────────────────────────────

/// One search-form submission. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn form_start(&self) -> String {
        self.start.format(FORM_DATE_FORMAT).to_string()
    }

    pub fn form_end(&self) -> String {
        self.end.format(FORM_DATE_FORMAT).to_string()
    }

    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.form_start(), self.form_end())
    }
}

// ── Raw scraped records ───────────────────────────────────────────────────────

/// Case summary table of one detail page: upper-cased label → value.
pub type RawCaseRecord = BTreeMap<String, String>;

/// Parties kept for one case. At most one plaintiff and one defendant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyInfo {
    pub plaintiff_name: Option<String>,
    pub plaintiff_address: Option<String>,
    pub plaintiff_attorney: Option<String>,
    pub defendant_name: Option<String>,
    pub defendant_address: Option<String>,
    pub defendant_attorney: Option<String>,
}

/// One scraped case before normalization. Every column is an optional
/// string, exactly as read from the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseRow {
    pub case_id: Option<String>,
    pub court: Option<String>,
    pub case_caption: Option<String>,
    pub judge: Option<String>,
    pub filed_date: Option<String>,
    pub case_type: Option<String>,
    pub amount: Option<String>,
    pub disposition: Option<String>,
    pub plaintiff_name: Option<String>,
    pub plaintiff_address: Option<String>,
    pub plaintiff_attorney: Option<String>,
    pub defendant_name: Option<String>,
    pub defendant_address: Option<String>,
    pub defendant_attorney: Option<String>,
}

/// Canonical column a case summary label lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryField {
    CaseId,
    Court,
    CaseCaption,
    Judge,
    FiledDate,
    CaseType,
    Amount,
    Disposition,
}

impl SummaryField {
    /// Raw label → canonical field. Labels the site adds later are ignored.
    pub fn from_label(label: &str) -> Option<Self> {
        let field = match label {
            "CASE NUMBER" => Self::CaseId,
            "COURT" => Self::Court,
            "CASE CAPTION" => Self::CaseCaption,
            "JUDGE" => Self::Judge,
            "FILED DATE" => Self::FiledDate,
            "CASE TYPE" => Self::CaseType,
            "AMOUNT" => Self::Amount,
            "DISPOSITION" => Self::Disposition,
            _ => return None,
        };
        Some(field)
    }
}

impl CaseRow {
    /// CSV header, in field order.
    pub const COLUMNS: [&'static str; 14] = [
        "case_id",
        "court",
        "case_caption",
        "judge",
        "filed_date",
        "case_type",
        "amount",
        "disposition",
        "plaintiff_name",
        "plaintiff_address",
        "plaintiff_attorney",
        "defendant_name",
        "defendant_address",
        "defendant_attorney",
    ];

    /// Fold one case's two mappings into a typed row. Party columns are only
    /// written by the party mapping, so summary values are never overwritten.
    pub fn from_scraped(summary: &RawCaseRecord, parties: PartyInfo) -> Self {
        let mut row = CaseRow {
            plaintiff_name: parties.plaintiff_name,
            plaintiff_address: parties.plaintiff_address,
            plaintiff_attorney: parties.plaintiff_attorney,
            defendant_name: parties.defendant_name,
            defendant_address: parties.defendant_address,
            defendant_attorney: parties.defendant_attorney,
            ..Default::default()
        };

        for (label, value) in summary {
            if let Some(field) = SummaryField::from_label(label) {
                *row.summary_slot(field) = Some(value.clone());
            }
        }
        row
    }

    fn summary_slot(&mut self, field: SummaryField) -> &mut Option<String> {
        match field {
            SummaryField::CaseId => &mut self.case_id,
            SummaryField::Court => &mut self.court,
            SummaryField::CaseCaption => &mut self.case_caption,
            SummaryField::Judge => &mut self.judge,
            SummaryField::FiledDate => &mut self.filed_date,
            SummaryField::CaseType => &mut self.case_type,
            SummaryField::Amount => &mut self.amount,
            SummaryField::Disposition => &mut self.disposition,
        }
    }

    /// Mutable view over every column, for whole-row cleanups.
    pub fn columns_mut(&mut self) -> [&mut Option<String>; 14] {
        [
            &mut self.case_id,
            &mut self.court,
            &mut self.case_caption,
            &mut self.judge,
            &mut self.filed_date,
            &mut self.case_type,
            &mut self.amount,
            &mut self.disposition,
            &mut self.plaintiff_name,
            &mut self.plaintiff_address,
            &mut self.plaintiff_attorney,
            &mut self.defendant_name,
            &mut self.defendant_address,
            &mut self.defendant_attorney,
        ]
    }
}

// ── Per-range buffer ──────────────────────────────────────────────────────────

/// Arena of rows for one date range, one slot per enumerated case action in
/// page order. Slots of cases that failed to parse stay empty.
#[derive(Debug, Default)]
pub struct RangeBuffer {
    slots: Vec<CaseRow>,
    failed_cases: Vec<String>,
    /// Unparsable cases whose page did not show a case number.
    unidentified: usize,
}

impl RangeBuffer {
    pub fn with_slots(n: usize) -> Self {
        Self {
            slots: vec![CaseRow::default(); n],
            failed_cases: Vec::new(),
            unidentified: 0,
        }
    }

    pub fn fill(&mut self, index: usize, row: CaseRow) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = row;
        }
    }

    pub fn mark_failed(&mut self, case_id: impl Into<String>) {
        self.failed_cases.push(case_id.into());
    }

    pub fn mark_unidentified(&mut self) {
        self.unidentified += 1;
    }

    /// Unparsable cases, with or without a case number.
    pub fn skipped(&self) -> usize {
        self.failed_cases.len() + self.unidentified
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Mutable state of one run. Grows only by whole, merged range buffers.
#[derive(Debug, Default)]
pub struct ScrapeRunState {
    pub rows: Vec<CaseRow>,
    pub failed_cases: Vec<String>,
    pub unidentified_cases: usize,
}

impl ScrapeRunState {
    pub fn merge(&mut self, buffer: RangeBuffer) {
        self.rows.extend(buffer.slots);
        self.failed_cases.extend(buffer.failed_cases);
        self.unidentified_cases += buffer.unidentified;
    }
}

// ── Normalized output ─────────────────────────────────────────────────────────

/// One eviction filing, as written to the output file. Field order is the
/// column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvictionCase {
    pub case_id: String,
    pub court: Option<String>,
    pub case_caption: Option<String>,
    pub judge: Option<String>,
    pub filed_date: Option<NaiveDate>,
    pub case_type: Option<String>,
    pub amount: Option<i64>,
    pub disposition: Option<String>,
    pub disposition_date: Option<NaiveDate>,
    pub plaintiff_name: Option<String>,
    pub plaintiff_address: Option<String>,
    pub plaintiff_attorney: Option<String>,
    pub defendant_name: Option<String>,
    pub defendant_address: Option<String>,
    pub defendant_attorney: Option<String>,
    pub last_updated: NaiveDate,
}

impl EvictionCase {
    /// CSV header, in field order.
    pub const COLUMNS: [&'static str; 16] = [
        "case_id",
        "court",
        "case_caption",
        "judge",
        "filed_date",
        "case_type",
        "amount",
        "disposition",
        "disposition_date",
        "plaintiff_name",
        "plaintiff_address",
        "plaintiff_attorney",
        "defendant_name",
        "defendant_address",
        "defendant_attorney",
        "last_updated",
    ];
}

impl From<&EvictionCase> for CaseRow {
    /// Project a normalized case back into raw page form.
    fn from(case: &EvictionCase) -> Self {
        let disposition = match (&case.disposition_date, &case.disposition) {
            (Some(date), Some(text)) => Some(format!("{} - {}", date.format(FORM_DATE_FORMAT), text)),
            (Some(date), None) => Some(format!("{} - ", date.format(FORM_DATE_FORMAT))),
            (None, text) => text.clone(),
        };

        CaseRow {
            case_id: Some(case.case_id.clone()),
            court: case.court.clone(),
            case_caption: case.case_caption.clone(),
            judge: case.judge.clone(),
            filed_date: case.filed_date.map(|d| d.format(FORM_DATE_FORMAT).to_string()),
            case_type: case.case_type.clone(),
            amount: case.amount.map(|a| a.to_string()),
            disposition,
            plaintiff_name: case.plaintiff_name.clone(),
            plaintiff_address: case.plaintiff_address.clone(),
            plaintiff_attorney: case.plaintiff_attorney.clone(),
            defendant_name: case.defendant_name.clone(),
            defendant_address: case.defendant_address.clone(),
            defendant_attorney: case.defendant_attorney.clone(),
        }
    }
}
