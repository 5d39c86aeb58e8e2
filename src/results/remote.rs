use super::{
    FindResponse, ListResponse, ResultDescriptor, ResultsError, StatusResponse, TimeSlot, codec,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[async_trait]
pub trait RemoteIndex: Send + Sync {
    async fn list(&self) -> Result<Vec<ResultDescriptor>, ResultsError>;

    /// `Ok(None)` is an authoritative "no such result".
    async fn find(
        &self,
        date: NaiveDate,
        slot: TimeSlot,
    ) -> Result<Option<ResultDescriptor>, ResultsError>;

    async fn clear_cache(&self) -> Result<(), ResultsError>;
}

pub struct HttpRemoteIndex {
    client: reqwest::Client,
    api_base: Url,
    timeout: Duration,
}

impl HttpRemoteIndex {
    /// `api_base` is the URL the `list`, `find` and `clear-cache` routes
    /// hang off, e.g. `https://example.com/api/results/`.
    pub fn new(client: reqwest::Client, api_base: Url, timeout: Duration) -> Self {
        let api_base = if api_base.path().ends_with('/') {
            api_base
        } else {
            let mut base = api_base;
            let path = format!("{}/", base.path());
            base.set_path(&path);
            base
        };

        Self {
            client,
            api_base,
            timeout,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, ResultsError> {
        debug!("Index request: {}", url);
        let response = self.client.get(url).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResultsError::RemoteStatus(status.as_u16()));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RemoteIndex for HttpRemoteIndex {
    async fn list(&self) -> Result<Vec<ResultDescriptor>, ResultsError> {
        let url = self.api_base.join("list")?;
        let body: ListResponse = self.get_json(url).await?;
        if !body.success {
            return Err(ResultsError::RemoteFailure("list".to_string()));
        }
        Ok(body.images)
    }

    async fn find(
        &self,
        date: NaiveDate,
        slot: TimeSlot,
    ) -> Result<Option<ResultDescriptor>, ResultsError> {
        let mut url = self.api_base.join("find")?;
        url.query_pairs_mut()
            .append_pair("date", &codec::format_date(date))
            .append_pair("time", &slot.to_string());

        let body: FindResponse = self.get_json(url).await?;
        if !body.success {
            return Err(ResultsError::RemoteFailure(
                body.message.unwrap_or_else(|| "find".to_string()),
            ));
        }

        Ok(if body.found { body.image } else { None })
    }

    async fn clear_cache(&self) -> Result<(), ResultsError> {
        let url = self.api_base.join("clear-cache")?;
        let response = self.client.post(url).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResultsError::RemoteStatus(status.as_u16()));
        }

        let body: StatusResponse = response.json().await?;
        if body.success {
            Ok(())
        } else {
            Err(ResultsError::RemoteFailure(body.message))
        }
    }
}
