//! Accounts and libraries read from the YAML configuration file.
//!
//! ```yaml
//! Bibliotheken:
//!   Stadtbuecherei:
//!     URL: https://opac.example.org/
//! Konten:
//!   Anna:
//!     Kundennummer: "12345"
//!     Passwort: secret
//!     Bibliothek: Stadtbuecherei
//! ```

use std::{collections::BTreeMap, fs::File, path::Path};

use log::warn;
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Library {
    #[serde(rename = "URL", alias = "url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountEntry {
    #[serde(rename = "Bibliothek", alias = "library")]
    pub library: String,

    #[serde(rename = "Kundennummer", alias = "customer_id")]
    pub customer_id: String,

    #[serde(rename = "Passwort", alias = "password")]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IopacConfig {
    #[serde(rename = "Bibliotheken", alias = "libraries", default)]
    pub libraries: BTreeMap<String, Library>,

    #[serde(rename = "Konten", alias = "accounts", default)]
    pub accounts: BTreeMap<String, AccountEntry>,
}

/// A fully resolved account, ready to log in.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub username: String,
    pub password: String,
    pub base_url: Url,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl IopacConfig {
    /// Read the configuration file.
    ///
    /// Accounts referencing unknown libraries are only warned about here, they fail on their own
    /// during each refresh.
    pub fn try_new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let config: IopacConfig = serde_yaml::from_reader(file)?;
        for resolved in config.resolve() {
            if let Err(err) = resolved {
                warn!("{err}");
            }
        }
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Resolve every account against its library, in ascending account name order.
    pub fn resolve(&self) -> Vec<Result<Account>> {
        self.accounts
            .iter()
            .map(|(name, entry)| self.resolve_account(name, entry))
            .collect()
    }

    fn resolve_account(&self, name: &str, entry: &AccountEntry) -> Result<Account> {
        let library = self
            .libraries
            .get(&entry.library)
            .ok_or_else(|| Error::config(name, format!("unknown library {}", entry.library)))?;
        let base_url = Url::parse(&library.url).map_err(|err| {
            Error::config(name, format!("invalid URL {:?} of {}: {err}", library.url, entry.library))
        })?;
        Ok(Account {
            name: name.to_string(),
            username: entry.customer_id.clone(),
            password: entry.password.clone(),
            base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::IopacConfig, error::Error};

    static YAML: &str = r#"
Bibliotheken:
  Stadt:
    URL: https://opac.example.org/
  Kaputt:
    URL: "not a url"
Konten:
  Bert:
    Kundennummer: "222"
    Passwort: geheim
    Bibliothek: Stadt
  Anna:
    Kundennummer: "111"
    Passwort: secret
    Bibliothek: Stadt
  Carl:
    Kundennummer: "333"
    Passwort: pw
    Bibliothek: Land
  Dora:
    Kundennummer: "444"
    Passwort: pw
    Bibliothek: Kaputt
"#;

    #[test]
    fn test_resolve_in_name_order() {
        let config = IopacConfig::from_yaml(YAML).unwrap();
        let resolved = config.resolve();
        assert_eq!(resolved.len(), 4);
        let anna = resolved[0].as_ref().unwrap();
        assert_eq!(anna.name, "Anna");
        assert_eq!(anna.username, "111");
        assert_eq!(anna.password, "secret");
        assert_eq!(anna.base_url.as_str(), "https://opac.example.org/");
        assert_eq!(resolved[1].as_ref().unwrap().name, "Bert");
    }

    #[test]
    fn test_resolve_reports_bad_accounts_individually() {
        let config = IopacConfig::from_yaml(YAML).unwrap();
        let resolved = config.resolve();
        assert!(matches!(&resolved[2], Err(Error::Config { account, .. }) if account == "Carl"));
        assert!(matches!(&resolved[3], Err(Error::Config { account, .. }) if account == "Dora"));
    }

    #[test]
    fn test_english_keys() {
        let config = IopacConfig::from_yaml(
            "libraries:\n  city:\n    url: http://localhost/\naccounts:\n  me:\n    customer_id: \"1\"\n    password: pw\n    library: city\n",
        )
        .unwrap();
        assert_eq!(config.resolve()[0].as_ref().unwrap().username, "1");
    }

    #[test]
    fn test_debug_hides_password() {
        let config = IopacConfig::from_yaml(YAML).unwrap();
        let anna = config.resolve().remove(0).unwrap();
        assert!(!format!("{anna:?}").contains("secret"));
    }
}
