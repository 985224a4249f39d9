//! This module provides a client to connect to the reminders REST service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Response;
use url::Url;

use crate::config::Settings;
use crate::error::ReminderError;
use crate::reminder::{Reminder, ReminderDetails, ReminderId};
use crate::traits::RemoteSource;

/// The name of the reminders collection, relative to the API base
const COLLECTION: &str = "reminders";


/// A remote source that talks to a `/reminders` REST resource
#[derive(Clone, Debug)]
pub struct Client {
    collection_url: Url,
    http: reqwest::Client,
}

impl Client {
    /// Create a client. This does not start a connection
    pub fn new(api_base: &Url, timeout: Duration) -> Result<Self, ReminderError> {
        let collection_url = join_segments(api_base, &[COLLECTION])?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ReminderError::InvalidConfiguration(format!("unable to build an HTTP client: {}", err)))?;

        Ok(Self { collection_url, http })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ReminderError> {
        Self::new(&settings.api_base, settings.remote_timeout)
    }

    /// The URL of the whole collection
    pub fn collection_url(&self) -> &Url {
        &self.collection_url
    }

    /// The URL of a single reminder
    pub fn reminder_url(&self, id: ReminderId) -> Result<Url, ReminderError> {
        join_segments(&self.collection_url, &[&id.to_string()])
    }
}

#[async_trait]
impl RemoteSource for Client {
    async fn list(&self) -> Result<Vec<Reminder>, ReminderError> {
        log::debug!("GET {}", self.collection_url);
        let response = self.http
            .get(self.collection_url.clone())
            .send()
            .await?;

        let reminders: Vec<Reminder> = check_status(response)?.json().await?;
        log::debug!("Got {} reminders from the server", reminders.len());
        Ok(reminders)
    }

    async fn create(&self, details: &ReminderDetails) -> Result<Reminder, ReminderError> {
        log::debug!("POST {} ({})", self.collection_url, details.title());
        let response = self.http
            .post(self.collection_url.clone())
            .json(details)
            .send()
            .await?;

        Ok(check_status(response)?.json().await?)
    }

    async fn replace(&self, id: ReminderId, reminder: &Reminder) -> Result<Reminder, ReminderError> {
        let url = self.reminder_url(id)?;
        log::debug!("PUT {}", url);
        let response = self.http
            .put(url)
            .json(reminder)
            .send()
            .await?;

        Ok(check_status(response)?.json().await?)
    }

    async fn delete(&self, id: ReminderId) -> Result<(), ReminderError> {
        let url = self.reminder_url(id)?;
        log::debug!("DELETE {}", url);
        let response = self.http
            .delete(url)
            .send()
            .await?;

        check_status(response)?;
        Ok(())
    }
}

fn check_status(response: Response) -> Result<Response, ReminderError> {
    if response.status().is_success() == false {
        return Err(ReminderError::RemoteUnavailable(
            format!("Unexpected HTTP status code {:?} for {}", response.status(), response.url())
        ));
    }
    Ok(response)
}

/// Append path segments to `base`, keeping any path it already has (`http://host/api` + `reminders` is `http://host/api/reminders`)
fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, ReminderError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ReminderError::InvalidConfiguration(format!("{} cannot be used as a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> Client {
        Client::new(&Url::parse(base).unwrap(), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn resource_urls() {
        let c = client("http://localhost:4000");
        assert_eq!(c.collection_url().as_str(), "http://localhost:4000/reminders");
        assert_eq!(c.reminder_url(ReminderId::new(12)).unwrap().as_str(), "http://localhost:4000/reminders/12");

        let c = client("https://example.com/api/");
        assert_eq!(c.collection_url().as_str(), "https://example.com/api/reminders");

        let c = client("https://example.com/api");
        assert_eq!(c.reminder_url(ReminderId::new(-3)).unwrap().as_str(), "https://example.com/api/reminders/-3");
    }

    #[test]
    fn unusable_base() {
        let base = Url::parse("mailto:someone@example.com").unwrap();
        assert!(Client::new(&base, Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn unreachable_server_is_remote_unavailable() {
        // Nothing listens on the discard port
        let c = client("http://127.0.0.1:9");
        match c.list().await {
            Err(ReminderError::RemoteUnavailable(_)) => (),
            other => panic!("Unexpected result {:?}", other),
        }
    }
}
