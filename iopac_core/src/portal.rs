//! This client logs into the iOPAC portal and returns the account page.

use std::time::Duration;

use async_trait::async_trait;
use encoding::{all::ISO_8859_1, DecoderTrap, Encoding};
use log::debug;
use url::Url;

use crate::{
    config::Account,
    error::{Error, Result},
    parser::is_login_failure,
};

static ENDPOINT_PATH: &str = "cgi-bin/di.exe";

static FIELD_CUSTOMER_ID: &str = "sleKndNr";
static FIELD_PASSWORD: &str = "slePw";
static FIELD_LOGIN: &str = "pshLogin";
static LOGIN: &str = "Login";

/// Anything that returns the account page of an account.
#[async_trait]
pub trait LoanSource: Send + Sync {
    async fn fetch_account(&self, account: &Account) -> Result<String>;
}

pub struct Portal {
    client: reqwest::Client,
}

impl Portal {
    /// Create a client whose requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Request)?;
        Ok(Self { client })
    }

    /// Log in and return the account page.
    ///
    /// The page is always decoded as ISO-8859-1, whatever the response headers claim. There is
    /// no retry, the next refresh cycle tries again.
    pub async fn fetch(&self, username: &str, password: &str, base_url: &Url) -> Result<String> {
        let url = login_url(base_url)
            .map_err(|err| Error::config(username, format!("invalid login URL: {err}")))?;
        debug!("logging in {username} at {url}");
        let response = self
            .client
            .post(url.clone())
            .form(&[
                (FIELD_CUSTOMER_ID, username),
                (FIELD_PASSWORD, password),
                (FIELD_LOGIN, LOGIN),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.bytes().await?;
        let html = ISO_8859_1
            .decode(&body, DecoderTrap::Replace)
            .map_err(|err| Error::Decode(err.into_owned()))?;
        if is_login_failure(&html) {
            return Err(Error::Authentication {
                username: username.to_string(),
            });
        }
        Ok(html)
    }
}

#[async_trait]
impl LoanSource for Portal {
    async fn fetch_account(&self, account: &Account) -> Result<String> {
        self.fetch(&account.username, &account.password, &account.base_url)
            .await
    }
}

/// Resolve the login endpoint like a browser resolves a relative link.
pub fn login_url(base_url: &Url) -> std::result::Result<Url, url::ParseError> {
    base_url.join(ENDPOINT_PATH)
}
