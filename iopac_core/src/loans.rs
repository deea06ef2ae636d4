//! Loan records and the table collecting them over one refresh cycle.

use chrono::NaiveDate;

/// One borrowed or reserved item of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanRecord {
    pub account: String,
    pub title: String,
    pub media_type: String,
    pub due_date: NaiveDate,
    pub reserved: bool,
}

/// The loans of all accounts processed so far, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanTable {
    records: Vec<LoanRecord>,
}

impl LoanTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the records of one account.
    ///
    /// Appending nothing returns the table unchanged.
    #[must_use]
    pub fn append(mut self, records: Vec<LoanRecord>) -> Self {
        self.records.extend(records);
        self
    }

    pub fn records(&self) -> &[LoanRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<Vec<LoanRecord>> for LoanTable {
    fn from_iter<I: IntoIterator<Item = Vec<LoanRecord>>>(iter: I) -> Self {
        iter.into_iter().fold(LoanTable::new(), LoanTable::append)
    }
}

#[cfg(test)]
pub(crate) fn record(account: &str, title: &str, media_type: &str, due_date: &str) -> LoanRecord {
    LoanRecord {
        account: account.to_string(),
        title: title.to_string(),
        media_type: media_type.to_string(),
        due_date: due_date.parse().unwrap(),
        reserved: false,
    }
}
