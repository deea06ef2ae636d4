//! A portal stand-in for tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use iopac_core::{
    config::Account,
    error::{Error, Result},
    portal::LoanSource,
};

pub static CONFIG: &str = r#"
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
"#;

static PAGE: &str = "<html><body><table class=\"SEARCH_LESER\">\
    <tr><th>Titel</th><th>Medientyp</th><th>Rückgabe am</th></tr>\
    <tr><td>Buch1</td><td>Buch</td><td>15.03.2024</td></tr>\
    </table></body></html>";

/// Answers every account with one loan, except a timing out account `B` if asked to.
#[derive(Default)]
pub struct FakeSource {
    timeout_b: bool,
    pub calls: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn timeout() -> Self {
        Self {
            timeout_b: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl LoanSource for FakeSource {
    async fn fetch_account(&self, account: &Account) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.timeout_b && account.name == "B" {
            return Err(Error::Timeout {
                url: account.base_url.to_string(),
            });
        }
        Ok(String::from(PAGE))
    }
}
