//! Parse the account page of the portal into loan records.

use chrono::NaiveDate;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::{error::ParseError, loans::LoanRecord};

static LABEL_TITLE: &str = "Titel";
static LABEL_MEDIA_TYPE: &str = "Medientyp";
static LABEL_DUE_DATE: &str = "Rückgabe am";

static RESERVED_MARKER: &str = "reserv";
static LOGIN_FAILED: [&str; 2] = ["Login fehlgeschlagen", "Login failed"];

macro_rules! selector {
    ($name:ident, $query:expr) => {
        static $name: Lazy<Selector> = Lazy::new(|| Selector::parse($query).unwrap());
    };
}

selector!(BODY, "body");
selector!(LOAN_TABLE, ".SEARCH_LESER");
selector!(TABLE, "table");
selector!(ROW, "tr");
selector!(HEADER_CELL, "th, td");
selector!(CELL, "td");

static DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
            (?P<day>\d{1,2})
            \s*\.\s*
            (?P<month>\d{1,2})
            \s*\.\s*
            (?P<year>\d{4})
        ",
    )
    .unwrap()
});

/// The content of a due date cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueDate {
    pub date: NaiveDate,
    pub reserved: bool,
}

/// Parse the loans of one account.
///
/// A page without loan table has no loans. Rows without a usable due date are skipped with a
/// warning, a table missing one of the needed columns fails as a whole.
pub fn parse(html: &str, account: &str) -> Result<Vec<LoanRecord>, ParseError> {
    let dom = Html::parse_document(html);
    let Some(table) = find_table(&dom) else {
        return Ok(vec![]);
    };
    let mut rows = table.select(&ROW);
    let Some(header) = rows.next() else {
        return Ok(vec![]);
    };
    let columns = Columns::from_header(header)?;
    let mut records = vec![];
    for row in rows {
        let cells: Vec<String> = row.select(&CELL).map(cell_text).collect();
        if cells.is_empty() {
            continue;
        }
        match columns.record(&cells, account) {
            Ok(record) => records.push(record),
            Err(err) => warn!("{account}: skipping loan row {cells:?}: {err}"),
        }
    }
    Ok(records)
}

/// Extract the due date and the reservation flag from a due date cell.
///
/// Only the first date in the text counts.
pub fn parse_due_date(text: &str) -> Result<DueDate, ParseError> {
    let reserved = text.to_lowercase().contains(RESERVED_MARKER);
    let captures = DATE_REGEX
        .captures(text)
        .ok_or_else(|| ParseError::NoDueDate(text.to_string()))?;
    let invalid = || ParseError::InvalidDate(captures[0].to_string());
    let day: u32 = captures["day"].parse().map_err(|_| invalid())?;
    let month: u32 = captures["month"].parse().map_err(|_| invalid())?;
    let year: i32 = captures["year"].parse().map_err(|_| invalid())?;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
    Ok(DueDate { date, reserved })
}

/// Whether the page is the portal's login failure page.
///
/// The portal answers failed logins with status 200, only the leading text of the page tells.
pub fn is_login_failure(html: &str) -> bool {
    let dom = Html::parse_document(html);
    let body = dom.select(&BODY).next().unwrap_or_else(|| dom.root_element());
    let text: String = body.text().collect();
    let text = text.trim_start();
    LOGIN_FAILED.iter().any(|phrase| text.starts_with(phrase))
}

fn find_table(dom: &Html) -> Option<ElementRef<'_>> {
    let marked = dom.select(&LOAN_TABLE).next()?;
    if marked.value().name() == "table" {
        Some(marked)
    } else {
        marked.select(&TABLE).next()
    }
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Cell text with inner whitespace collapsed, for matching header labels.
fn label_text(cell: ElementRef) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Positions of the needed columns.
struct Columns {
    title: usize,
    media_type: usize,
    due_date: usize,
}

impl Columns {
    fn from_header(header: ElementRef) -> Result<Self, ParseError> {
        let labels: Vec<String> = header.select(&HEADER_CELL).map(label_text).collect();
        let position = |label: &'static str| {
            labels
                .iter()
                .position(|text| text == label)
                .ok_or(ParseError::MissingColumn(label))
        };
        Ok(Self {
            title: position(LABEL_TITLE)?,
            media_type: position(LABEL_MEDIA_TYPE)?,
            due_date: position(LABEL_DUE_DATE)?,
        })
    }

    fn record(&self, cells: &[String], account: &str) -> Result<LoanRecord, ParseError> {
        let expected = self.title.max(self.media_type).max(self.due_date) + 1;
        if cells.len() < expected {
            return Err(ParseError::ShortRow {
                found: cells.len(),
                expected,
            });
        }
        let due_date = parse_due_date(&cells[self.due_date])?;
        Ok(LoanRecord {
            account: account.to_string(),
            title: cells[self.title].clone(),
            media_type: cells[self.media_type].clone(),
            due_date: due_date.date,
            reserved: due_date.reserved,
        })
    }
}
