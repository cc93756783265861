//! In-memory stand-in for the clerk's site, driven through the `Browser`
//! trait. Only compiled for tests.

use crate::error::ScrapeError;
use crate::models::FORM_DATE_FORMAT;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::selectors::{
    BEGIN_DATE, CASE_ACTIONS, CASE_NUMBER, CASE_SEARCH_SUBMIT, CLASSIFICATION, END_DATE,
    PARTIES_BUTTON, PARTY_TABLE, RANGE_TOO_WIDE_ALERT, SEARCH_SUBMIT, SHOW_ALL_ROWS,
    SUMMARY_TABLE,
};
use super::{Browser, BrowserLauncher, By, Result};

pub const SEARCH_URL: &str = "https://clerk.test/records-search/municipal-civil-listing-by-classification/";
pub const CASE_SEARCH_URL: &str = "https://clerk.test/records-search/case-number-search/";

/// Rows shown before "show all" is clicked.
const PAGE_SIZE: usize = 10;

// ── Site content ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FakeCase {
    pub id: String,
    pub filed: NaiveDate,
    summary: Vec<String>,
    parties: Vec<Vec<String>>,
}

impl FakeCase {
    pub fn new(id: &str, filed: NaiveDate) -> Self {
        let summary = vec![
            format!("CASE NUMBER: {}", id),
            "COURT: HAMILTON COUNTY MUNICIPAL COURT".to_string(),
            format!("CASE CAPTION: LANDLORD LLC vs. TENANT {}", id),
            "JUDGE: JUDGE A".to_string(),
            format!("FILED DATE: {}", filed.format(FORM_DATE_FORMAT)),
            "CASE TYPE: G EVICTION".to_string(),
            "AMOUNT: 1500".to_string(),
            "DISPOSITION: ".to_string(),
        ];
        let parties = vec![vec![
            "LANDLORD LLC".to_string(),
            "1 Main St".to_string(),
            "P 1".to_string(),
            "A. COUNSEL".to_string(),
        ]];
        Self { id: id.to_string(), filed, summary, parties }
    }

    pub fn with_defendant(mut self, name: &str, address: &str, tag: &str) -> Self {
        self.parties.push(vec![name.to_string(), address.to_string(), tag.to_string()]);
        self
    }

    pub fn with_disposition(mut self, text: &str) -> Self {
        self.summary.retain(|r| !r.starts_with("DISPOSITION:"));
        self.summary.push(format!("DISPOSITION: {}", text));
        self
    }

    pub fn without_case_number(mut self) -> Self {
        self.summary.retain(|r| !r.starts_with("CASE NUMBER:"));
        self
    }

    /// Add a summary row with no label separator.
    pub fn malformed(mut self) -> Self {
        self.summary.push("GARBLED ROW WITHOUT SEPARATOR".to_string());
        self
    }

    fn render(&self, parties_open: bool) -> String {
        let mut html = String::from(r#"<html><body><div><table id="case_summary_table"><tbody>"#);
        for row in &self.summary {
            match row.split_once(':') {
                Some((label, value)) => {
                    html.push_str(&format!("<tr><td>{}:</td><td>{}</td></tr>", label, value))
                }
                None => html.push_str(&format!("<tr><td>{}</td></tr>", row)),
            }
        }
        html.push_str("</tbody></table>");

        if parties_open {
            html.push_str(r#"<table id="party_info_table"><tbody>"#);
            for party in &self.parties {
                html.push_str("<tr>");
                for cell in party {
                    html.push_str(&format!("<td>{}</td>", cell));
                }
                html.push_str("</tr>");
            }
            html.push_str("</tbody></table>");
        }

        html.push_str("</div></body></html>");
        html
    }
}

#[derive(Debug)]
struct SiteState {
    cases: Vec<FakeCase>,
    max_span_days: i64,
    alert_override: Option<String>,
    /// Alert raised on top of a results page once it has rendered.
    results_alert: Option<String>,
    submissions: Vec<(NaiveDate, NaiveDate, String)>,
    /// 1-based submission numbers that hang instead of answering.
    stalled_submissions: Vec<usize>,
    /// Case id → remaining number of detail opens or lookups that hang.
    stalled_cases: HashMap<String, usize>,
    launch_failures: usize,
    launches: usize,
    quits: usize,
    cookie_clears: usize,
    next_window: u32,
}

/// Shared handle to the fake site; every browser launched from it sees the
/// same cases and failure plan.
#[derive(Debug, Clone)]
pub struct FakeSite(Arc<Mutex<SiteState>>);

impl FakeSite {
    pub fn new(cases: Vec<FakeCase>) -> Self {
        FakeSite(Arc::new(Mutex::new(SiteState {
            cases,
            max_span_days: 6,
            alert_override: None,
            results_alert: None,
            submissions: Vec::new(),
            stalled_submissions: Vec::new(),
            stalled_cases: HashMap::new(),
            launch_failures: 0,
            launches: 0,
            quits: 0,
            cookie_clears: 0,
            next_window: 1,
        })))
    }

    fn state(&self) -> MutexGuard<'_, SiteState> {
        self.0.lock().unwrap()
    }

    /// Longest `end - start` the form accepts before raising its alert.
    pub fn set_max_span_days(&self, days: i64) {
        self.state().max_span_days = days;
    }

    pub fn set_alert_override(&self, text: Option<&str>) {
        self.state().alert_override = text.map(str::to_string);
    }

    pub fn set_results_alert(&self, text: Option<&str>) {
        self.state().results_alert = text.map(str::to_string);
    }

    pub fn stall_submission(&self, nth: usize) {
        self.state().stalled_submissions.push(nth);
    }

    pub fn stall_case(&self, id: &str, times: usize) {
        self.state().stalled_cases.insert(id.to_string(), times);
    }

    pub fn fail_next_launches(&self, n: usize) {
        self.state().launch_failures = n;
    }

    pub fn submissions(&self) -> Vec<(NaiveDate, NaiveDate, String)> {
        self.state().submissions.clone()
    }

    pub fn launches(&self) -> usize {
        self.state().launches
    }

    pub fn quits(&self) -> usize {
        self.state().quits
    }

    pub fn cookie_clears(&self) -> usize {
        self.state().cookie_clears
    }

    fn take_stall(&self, id: &str) -> bool {
        match self.state().stalled_cases.get_mut(id) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }

    fn new_window(&self) -> u32 {
        let mut s = self.state();
        let w = s.next_window;
        s.next_window += 1;
        w
    }
}

// ── Browser ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct Form {
    ccode: String,
    begdate: String,
    enddate: String,
}

#[derive(Debug, Clone)]
enum Page {
    Blank,
    SearchForm(Form),
    Results { cases: Vec<usize>, expanded: bool },
    CaseSearch { number: String },
    Detail { case: usize, parties_open: bool },
    NotFound,
}

#[derive(Debug)]
struct FakeWindow {
    handle: u32,
    history: Vec<Page>,
}

pub struct FakeBrowser {
    site: FakeSite,
    windows: Vec<FakeWindow>,
    focus: Option<u32>,
    alert: Option<String>,
}

fn missing(by: By) -> ScrapeError {
    ScrapeError::NavigationTimeout(format!("{} never appeared", by))
}

fn no_element(by: By) -> ScrapeError {
    ScrapeError::UnknownFailure(format!("no such element: {}", by))
}

impl FakeBrowser {
    fn window_mut(&mut self) -> Result<&mut FakeWindow> {
        let focus = self
            .focus
            .ok_or_else(|| ScrapeError::UnknownFailure("no such window".into()))?;
        self.windows
            .iter_mut()
            .find(|w| w.handle == focus)
            .ok_or_else(|| ScrapeError::UnknownFailure("no such window".into()))
    }

    fn page_mut(&mut self) -> Result<&mut Page> {
        if let Some(text) = &self.alert {
            return Err(ScrapeError::UnknownFailure(format!("unexpected alert open: {}", text)));
        }
        let window = self.window_mut()?;
        window
            .history
            .last_mut()
            .ok_or_else(|| ScrapeError::UnknownFailure("empty history".into()))
    }

    fn navigate(&mut self, page: Page) -> Result<()> {
        self.window_mut()?.history.push(page);
        Ok(())
    }

    fn submit_search(&mut self, form: Form) -> Result<()> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, FORM_DATE_FORMAT)
                .map_err(|e| ScrapeError::UnknownFailure(format!("bad form date {:?}: {}", s, e)))
        };
        let (start, end) = (parse(&form.begdate)?, parse(&form.enddate)?);

        let mut s = self.site.state();
        s.submissions.push((start, end, form.ccode.clone()));
        let nth = s.submissions.len();
        if s.stalled_submissions.contains(&nth) {
            return Err(ScrapeError::NavigationTimeout(format!("submission {} hung", nth)));
        }

        if let Some(text) = s.alert_override.clone() {
            drop(s);
            self.alert = Some(text);
            return Ok(());
        }
        if (end - start).num_days() > s.max_span_days {
            drop(s);
            self.alert = Some(format!("{}. Please narrow your search.", RANGE_TOO_WIDE_ALERT));
            return Ok(());
        }

        let mut cases: Vec<usize> = (0..s.cases.len())
            .filter(|&i| s.cases[i].filed >= start && s.cases[i].filed <= end)
            .collect();
        cases.sort_by_key(|&i| (s.cases[i].filed, s.cases[i].id.clone()));
        let results_alert = s.results_alert.clone();
        drop(s);

        self.navigate(Page::Results { cases, expanded: false })?;
        self.alert = results_alert;
        Ok(())
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    type Element = usize;
    type Window = u32;

    async fn goto(&mut self, url: &str) -> Result<()> {
        let page = match url {
            SEARCH_URL => Page::SearchForm(Form::default()),
            CASE_SEARCH_URL => Page::CaseSearch { number: String::new() },
            _ => Page::NotFound,
        };
        self.alert = None;
        self.navigate(page)
    }

    async fn select_by_value(&mut self, by: By, value: &str) -> Result<()> {
        match self.page_mut()? {
            Page::SearchForm(form) if by == CLASSIFICATION => {
                form.ccode = value.to_string();
                Ok(())
            }
            _ => Err(no_element(by)),
        }
    }

    async fn fill(&mut self, by: By, text: &str) -> Result<()> {
        match self.page_mut()? {
            Page::SearchForm(form) if by == BEGIN_DATE => form.begdate = text.to_string(),
            Page::SearchForm(form) if by == END_DATE => form.enddate = text.to_string(),
            Page::CaseSearch { number } if by == CASE_NUMBER => *number = text.to_string(),
            _ => return Err(no_element(by)),
        }
        Ok(())
    }

    async fn click(&mut self, by: By, _within: Duration) -> Result<()> {
        let page = self.page_mut()?.clone();
        match page {
            Page::SearchForm(form) if by == SEARCH_SUBMIT => self.submit_search(form),
            Page::Results { cases, .. } if by == SHOW_ALL_ROWS && !cases.is_empty() => {
                *self.page_mut()? = Page::Results { cases, expanded: true };
                Ok(())
            }
            Page::Detail { case, .. } if by == PARTIES_BUTTON => {
                *self.page_mut()? = Page::Detail { case, parties_open: true };
                Ok(())
            }
            Page::CaseSearch { number } if by == CASE_SEARCH_SUBMIT => {
                if self.site.take_stall(&number) {
                    return Err(ScrapeError::NavigationTimeout(format!("case {} hung", number)));
                }
                let found = self.site.state().cases.iter().position(|c| c.id == number);
                match found {
                    Some(case) => self.navigate(Page::Detail { case, parties_open: false }),
                    None => self.navigate(Page::NotFound),
                }
            }
            _ => Err(missing(by)),
        }
    }

    async fn wait_for(&mut self, by: By, _within: Duration) -> Result<()> {
        match self.page_mut()? {
            Page::Detail { parties_open: true, .. } if by == PARTY_TABLE => Ok(()),
            Page::Detail { .. } if by == SUMMARY_TABLE => Ok(()),
            _ => Err(missing(by)),
        }
    }

    async fn find_all(&mut self, by: By) -> Result<Vec<usize>> {
        match self.page_mut()? {
            Page::Results { cases, expanded } if by == CASE_ACTIONS => {
                let visible = if *expanded { cases.len() } else { cases.len().min(PAGE_SIZE) };
                Ok(cases[..visible].to_vec())
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn click_element(&mut self, element: &usize, _within: Duration) -> Result<()> {
        match self.page_mut()? {
            Page::Results { cases, .. } if cases.contains(element) => {}
            _ => return Err(ScrapeError::UnknownFailure("stale element reference".into())),
        }

        let id = self.site.state().cases[*element].id.clone();
        if self.site.take_stall(&id) {
            return Err(ScrapeError::NavigationTimeout(format!("case {} hung", id)));
        }

        let handle = self.site.new_window();
        self.windows.push(FakeWindow {
            handle,
            history: vec![Page::Detail { case: *element, parties_open: false }],
        });
        Ok(())
    }

    async fn alert_text(&mut self, _within: Duration) -> Result<Option<String>> {
        Ok(self.alert.clone())
    }

    async fn accept_alert(&mut self) -> Result<()> {
        self.alert
            .take()
            .map(|_| ())
            .ok_or_else(|| ScrapeError::UnknownFailure("no such alert".into()))
    }

    async fn current_window(&mut self) -> Result<u32> {
        Ok(self.window_mut()?.handle)
    }

    async fn windows(&mut self) -> Result<Vec<u32>> {
        Ok(self.windows.iter().map(|w| w.handle).collect())
    }

    async fn switch_to_window(&mut self, window: u32) -> Result<()> {
        if self.windows.iter().any(|w| w.handle == window) {
            self.focus = Some(window);
            Ok(())
        } else {
            Err(ScrapeError::UnknownFailure(format!("no such window {}", window)))
        }
    }

    async fn close_window(&mut self) -> Result<()> {
        let focus = self.window_mut()?.handle;
        self.windows.retain(|w| w.handle != focus);
        self.focus = None;
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String> {
        let page = self.page_mut()?.clone();
        Ok(match page {
            Page::Detail { case, parties_open } => self.site.state().cases[case].render(parties_open),
            _ => "<html><body><p>nothing to see</p></body></html>".to_string(),
        })
    }

    async fn delete_all_cookies(&mut self) -> Result<()> {
        self.site.state().cookie_clears += 1;
        Ok(())
    }

    async fn quit(self) -> Result<()> {
        self.site.state().quits += 1;
        Ok(())
    }
}

pub struct FakeLauncher {
    site: FakeSite,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self { site }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    type Browser = FakeBrowser;

    async fn launch(&self) -> Result<FakeBrowser> {
        {
            let mut s = self.site.state();
            if s.launch_failures > 0 {
                s.launch_failures -= 1;
                return Err(ScrapeError::Session("fake webdriver refused the session".into()));
            }
            s.launches += 1;
        }

        let handle = self.site.new_window();
        Ok(FakeBrowser {
            site: self.site.clone(),
            windows: vec![FakeWindow { handle, history: vec![Page::Blank] }],
            focus: Some(handle),
            alert: None,
        })
    }
}
