//! One refresh cycle: fetch every account, group the loans and publish the calendar.

use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::{
    aggregate::aggregate,
    calendar::{render, write_atomic, CalendarEntry, CalendarOptions},
    config::{Account, IopacConfig},
    error::{Error, Result},
    loans::{LoanRecord, LoanTable},
    parser::parse,
    portal::LoanSource,
};

/// An account whose loans are missing from this cycle.
#[derive(Debug)]
pub struct AccountFailure {
    pub account: String,
    pub error: Error,
}

/// What a refresh cycle did.
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Accounts whose page was fetched and parsed.
    pub accounts: usize,
    /// Accounts that could not be fetched or parsed.
    pub failures: Vec<AccountFailure>,
    /// Accounts skipped because of their configuration.
    pub skipped: Vec<Error>,
    pub records: usize,
    pub events: usize,
    pub published: bool,
}

pub struct Refresher<S> {
    source: S,
    config: IopacConfig,
    options: CalendarOptions,
    output: PathBuf,
    publish_partial: bool,
}

impl<S: LoanSource> Refresher<S> {
    pub fn new(
        source: S,
        config: IopacConfig,
        options: CalendarOptions,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            config,
            options,
            output: output.into(),
            publish_partial: false,
        }
    }

    /// Publish the calendar even if some accounts failed.
    ///
    /// By default a calendar missing the loans of failed accounts only replaces a missing file.
    #[must_use]
    pub fn publish_partial(mut self, publish_partial: bool) -> Self {
        self.publish_partial = publish_partial;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Run one refresh cycle.
    ///
    /// Account failures are logged and reported, only a failed write of the calendar is an
    /// error.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        info!("Updating IOPAC data ...");
        let mut report = RefreshReport::default();
        let mut table = LoanTable::new();
        for resolved in self.config.resolve() {
            let account = match resolved {
                Ok(account) => account,
                Err(err) => {
                    error!("{err}");
                    report.skipped.push(err);
                    continue;
                }
            };
            match self.load_account(&account).await {
                Ok(records) => {
                    info!("{}: {} loans", account.name, records.len());
                    report.accounts += 1;
                    table = table.append(records);
                }
                Err(err) => {
                    error!("{}: {err}", account.name);
                    report.failures.push(AccountFailure {
                        account: account.name,
                        error: err,
                    });
                }
            }
        }

        let entries: Vec<CalendarEntry> = aggregate(&table).iter().map(CalendarEntry::from).collect();
        report.records = table.len();
        report.events = entries.len();

        let exists = tokio::fs::try_exists(&self.output).await.unwrap_or(false);
        if !report.failures.is_empty() && !self.publish_partial && exists {
            warn!(
                "{} of {} accounts failed, keeping {}",
                report.failures.len(),
                report.failures.len() + report.accounts,
                self.output.display()
            );
            return Ok(report);
        }

        let ics = render(&entries, &self.options, chrono::Local::now().naive_local());
        let output = self.output.clone();
        tokio::task::spawn_blocking(move || write_atomic(&output, ics.as_bytes()))
            .await
            .map_err(|err| Error::write(&self.output, err.into()))??;
        report.published = true;
        info!(
            "Wrote {} events with {} loans to {}",
            report.events,
            report.records,
            self.output.display()
        );
        Ok(report)
    }

    async fn load_account(&self, account: &Account) -> Result<Vec<LoanRecord>> {
        let html = self.source.fetch_account(account).await?;
        Ok(parse(&html, &account.name)?)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs, path::Path};

    use async_trait::async_trait;

    use crate::{
        calendar::{read_entries, CalendarEntry, CalendarOptions},
        config::{Account, IopacConfig},
        error::{Error, Result},
        portal::LoanSource,
        refresh::Refresher,
    };

    static CONFIG: &str = r#"
Bibliotheken:
  Stadt:
    URL: http://localhost/
Konten:
  A:
    Kundennummer: "1"
    Passwort: pw
    Bibliothek: Stadt
  B:
    Kundennummer: "2"
    Passwort: pw
    Bibliothek: Stadt
  C:
    Kundennummer: "3"
    Passwort: pw
    Bibliothek: Land
"#;

    enum Page {
        Loans(Vec<(&'static str, &'static str, &'static str)>),
        Timeout,
        LoginFailed,
    }

    /// Serves canned pages keyed by account name.
    #[derive(Default)]
    struct FakeSource {
        pages: HashMap<&'static str, Page>,
    }

    impl FakeSource {
        fn with(mut self, account: &'static str, page: Page) -> Self {
            self.pages.insert(account, page);
            self
        }
    }

    #[async_trait]
    impl LoanSource for FakeSource {
        async fn fetch_account(&self, account: &Account) -> Result<String> {
            match self.pages.get(account.name.as_str()) {
                Some(Page::Loans(rows)) => Ok(loan_page(rows)),
                Some(Page::Timeout) => Err(Error::Timeout {
                    url: account.base_url.to_string(),
                }),
                Some(Page::LoginFailed) | None => Err(Error::Authentication {
                    username: account.username.clone(),
                }),
            }
        }
    }

    fn loan_page(rows: &[(&str, &str, &str)]) -> String {
        let rows: String = rows
            .iter()
            .map(|(title, media_type, due_date)| {
                format!("<tr><td>{title}</td><td>{media_type}</td><td>{due_date}</td></tr>")
            })
            .collect();
        format!(
            "<html><body><table class=\"SEARCH_LESER\">\
             <tr><th>Titel&nbsp;</th><th>Medientyp&nbsp;</th><th>Rückgabe am&nbsp;</th></tr>\
             {rows}</table></body></html>"
        )
    }

    fn both_ok() -> FakeSource {
        FakeSource::default()
            .with("A", Page::Loans(vec![("Buch1", "Buch", "15.03.2024")]))
            .with("B", Page::Loans(vec![("Buch2", "DVD", "15.03.2024")]))
    }

    fn refresher(source: FakeSource, output: &Path) -> Refresher<FakeSource> {
        Refresher::new(
            source,
            IopacConfig::from_yaml(CONFIG).unwrap(),
            CalendarOptions::new("Bücherei Rückgabe"),
            output,
        )
    }

    #[tokio::test]
    async fn test_two_accounts_one_event() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("iopac.ics");
        let report = refresher(both_ok(), &output).refresh().await.unwrap();
        assert!(report.published);
        assert_eq!(report.accounts, 2);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.failures.is_empty());
        let entries = read_entries(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(
            entries,
            vec![CalendarEntry {
                date: "2024-03-15".parse().unwrap(),
                description: String::from("A: Buch1 [Buch]\nB: Buch2 [DVD]"),
            }]
        );
    }

    #[tokio::test]
    async fn test_timeout_keeps_previous_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("iopac.ics");
        refresher(both_ok(), &output).refresh().await.unwrap();
        let previous = fs::read(&output).unwrap();

        let source = FakeSource::default()
            .with("A", Page::Loans(vec![("Neu", "Buch", "20.03.2024")]))
            .with("B", Page::Timeout);
        let report = refresher(source, &output).refresh().await.unwrap();
        assert!(!report.published);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].account, "B");
        assert!(matches!(report.failures[0].error, Error::Timeout { .. }));
        assert_eq!(fs::read(&output).unwrap(), previous);
    }

    #[tokio::test]
    async fn test_first_refresh_publishes_partial_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("iopac.ics");
        let source = FakeSource::default()
            .with("A", Page::Loans(vec![("Buch1", "Buch", "15.03.2024")]))
            .with("B", Page::LoginFailed);
        let report = refresher(source, &output).refresh().await.unwrap();
        assert!(report.published);
        assert!(matches!(
            report.failures[0].error,
            Error::Authentication { .. }
        ));
        let entries = read_entries(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(entries[0].description, "A: Buch1 [Buch]");
    }

    #[tokio::test]
    async fn test_publish_partial() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("iopac.ics");
        refresher(both_ok(), &output).refresh().await.unwrap();
        let source = FakeSource::default()
            .with("A", Page::Loans(vec![("Neu", "Buch", "20.03.2024")]))
            .with("B", Page::Timeout);
        let report = refresher(source, &output)
            .publish_partial(true)
            .refresh()
            .await
            .unwrap();
        assert!(report.published);
        let entries = read_entries(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "A: Neu [Buch]");
    }

    #[tokio::test]
    async fn test_account_without_loans() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("iopac.ics");
        let source = FakeSource::default()
            .with("A", Page::Loans(vec![("Buch1", "Buch", "15.03.2024")]))
            .with("B", Page::Loans(vec![]));
        let report = refresher(source, &output).refresh().await.unwrap();
        assert!(report.published);
        assert_eq!(report.accounts, 2);
        assert_eq!(report.records, 1);
        let entries = read_entries(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(entries[0].description, "A: Buch1 [Buch]");
    }

    #[tokio::test]
    async fn test_unwritable_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("missing").join("iopac.ics");
        let result = refresher(both_ok(), &output).refresh().await;
        assert!(matches!(result, Err(Error::Write { .. })));
    }
}
