//! Group loans of all accounts by due date.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::loans::{LoanRecord, LoanTable};

static RESERVED_SUFFIX: &str = " RESERVIERT";

/// All loans sharing one due date, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueDateGroup {
    pub due_date: NaiveDate,
    pub records: Vec<LoanRecord>,
}

impl DueDateGroup {
    /// One line `<account>: <title> [<media type>]` per loan.
    pub fn description(&self) -> String {
        render(self)
    }
}

/// Group the table by due date, ascending.
pub fn aggregate(table: &LoanTable) -> Vec<DueDateGroup> {
    let mut groups: BTreeMap<NaiveDate, Vec<LoanRecord>> = BTreeMap::new();
    for record in table.records() {
        groups
            .entry(record.due_date)
            .or_default()
            .push(record.clone());
    }
    groups
        .into_iter()
        .map(|(due_date, records)| DueDateGroup { due_date, records })
        .collect()
}

/// Render the event description of a group.
pub fn render(group: &DueDateGroup) -> String {
    group
        .records
        .iter()
        .map(render_line)
        .collect::<Vec<String>>()
        .join("\n")
}

fn render_line(record: &LoanRecord) -> String {
    let reserved = if record.reserved { RESERVED_SUFFIX } else { "" };
    format!(
        "{}: {} [{}]{}",
        record.account, record.title, record.media_type, reserved
    )
}
