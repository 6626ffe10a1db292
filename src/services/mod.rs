mod mediastack;
mod newsapi;

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;

use crate::error::Result;

pub use mediastack::MediastackClient;
pub use newsapi::{search_window, NewsApiClient};

/// Inclusive publish-date window sent to a news provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// HTTP client shared by every fetcher: crate user agent, 10 s connect
/// timeout and the configured overall timeout.
pub fn http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("newswatch/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
