//! HTTP submitter used by `salon book` to send a finished wizard to a
//! running `salon serve`.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;

use salon_core::wizard::BookingSubmitter;
use salon_db::models::{Booking, NewBooking};

#[derive(Debug, Deserialize)]
struct CreatedBody {
    booking: Booking,
}

#[derive(Debug, Deserialize)]
struct MaintenanceBody {
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct HttpSubmitter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSubmitter {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn book_url(&self) -> String {
        format!("{}/api/book", self.base_url)
    }

    /// Whether the server reports maintenance mode.
    pub async fn maintenance_enabled(&self) -> Result<bool> {
        let url = format!("{}/api/maintenance", self.base_url);
        let body: MaintenanceBody = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?
            .error_for_status()
            .with_context(|| format!("maintenance check at {url} failed"))?
            .json()
            .await
            .context("failed to decode maintenance response")?;
        Ok(body.enabled)
    }
}

#[async_trait]
impl BookingSubmitter for HttpSubmitter {
    async fn submit(&self, booking: &NewBooking) -> Result<Booking> {
        let url = self.book_url();
        let response = self
            .client
            .post(&url)
            .json(booking)
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?;

        let status = response.status();
        if !status.is_success() {
            // Prefer the server's own message when it sent one.
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => format!("server returned {status}"),
            };
            bail!(message);
        }

        let body: CreatedBody = response
            .json()
            .await
            .context("failed to decode booking response")?;
        Ok(body.booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_url_strips_trailing_slash() {
        let submitter = HttpSubmitter::new("http://127.0.0.1:3000/");
        assert_eq!(submitter.book_url(), "http://127.0.0.1:3000/api/book");
    }
}
