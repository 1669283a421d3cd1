use std::path::Path;

use engine_logging::{engine_debug, engine_info};
use futures_util::StreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::Response;
use serde::de::DeserializeOwned;
use url::Url;

use crate::filename::archive_filename;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::types::CrawlAccepted;
use crate::{
    DownloadOutput, FailureKind, PreviewPayload, ServiceError, ServiceSettings, StatusPayload,
    TaskId,
};

/// Client surface of the remote crawl service.
#[async_trait::async_trait]
pub trait CrawlService: Send + Sync {
    async fn start_crawl(&self, url: &str) -> Result<TaskId, ServiceError>;

    async fn status(&self, task_id: &str) -> Result<StatusPayload, ServiceError>;

    async fn preview(&self, task_id: &str) -> Result<PreviewPayload, ServiceError>;

    /// Streams the packaged result into `output_dir`.
    async fn download(
        &self,
        task_id: &str,
        output_dir: &Path,
    ) -> Result<DownloadOutput, ServiceError>;

    async fn cleanup(&self, task_id: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone)]
pub struct HttpCrawlService {
    client: reqwest::Client,
    /// No total deadline: archives may take longer than a JSON call.
    download_client: reqwest::Client,
    base_url: Url,
}

impl HttpCrawlService {
    pub fn new(settings: &ServiceSettings) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ServiceError::new(FailureKind::Network, err.to_string()))?;
        let download_client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.request_timeout)
            .build()
            .map_err(|err| ServiceError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            client,
            download_client,
            base_url: settings.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl CrawlService for HttpCrawlService {
    async fn start_crawl(&self, url: &str) -> Result<TaskId, ServiceError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("url", url)
            .finish();
        let response = self
            .client
            .post(endpoint(&self.base_url, &["crawl"])?)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let accepted: CrawlAccepted = read_json(response).await?;
        engine_info!("Crawl accepted url={} task_id={}", url, accepted.task_id);
        Ok(accepted.task_id)
    }

    async fn status(&self, task_id: &str) -> Result<StatusPayload, ServiceError> {
        let response = self
            .client
            .get(endpoint(&self.base_url, &["status", task_id])?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn preview(&self, task_id: &str) -> Result<PreviewPayload, ServiceError> {
        let response = self
            .client
            .get(endpoint(&self.base_url, &["preview", task_id])?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn download(
        &self,
        task_id: &str,
        output_dir: &Path,
    ) -> Result<DownloadOutput, ServiceError> {
        let response = self
            .download_client
            .get(endpoint(&self.base_url, &["download", task_id])?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let filename = archive_filename(disposition.as_deref(), task_id);

        let writer = AtomicFileWriter::new(output_dir.to_path_buf());
        let mut pending = writer.begin(&filename).map_err(persist_error)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            pending.write_chunk(&chunk).map_err(persist_error)?;
        }
        let byte_len = pending.written();
        let path = pending.commit().map_err(persist_error)?;

        engine_info!(
            "Downloaded archive for task {} ({} bytes) to {:?}",
            task_id,
            byte_len,
            path
        );
        Ok(DownloadOutput { path, byte_len })
    }

    async fn cleanup(&self, task_id: &str) -> Result<(), ServiceError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, &["cleanup", task_id])?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let reply: serde_json::Value = read_json(response).await?;
        engine_debug!("Cleanup response for task {}: {}", task_id, reply);
        Ok(())
    }
}

/// Appends path segments to `base`, percent-encoding each one.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ServiceError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| {
            ServiceError::new(FailureKind::InvalidUrl, format!("{base} cannot be a base url"))
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&body)
        .map_err(|err| ServiceError::new(FailureKind::Decode, err.to_string()))
}

/// Any JSON error body makes a rejection, carrying its `error` text when
/// there is one; anything else is a bare HTTP failure.
async fn error_from_response(response: Response) -> ServiceError {
    let status = response.status();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(err) => return map_reqwest_error(err),
    };
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => ServiceError::new(
            FailureKind::Rejected {
                status: status.as_u16(),
            },
            rejection_text(&value),
        ),
        Err(_) => ServiceError::new(FailureKind::HttpStatus(status.as_u16()), status.to_string()),
    }
}

fn rejection_text(body: &serde_json::Value) -> String {
    match body.get("error") {
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) | None => {
            String::new()
        }
        Some(other) => other.to_string(),
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        return ServiceError::new(FailureKind::Timeout, err.to_string());
    }
    ServiceError::new(FailureKind::Network, err.to_string())
}

fn persist_error(err: PersistError) -> ServiceError {
    ServiceError::new(FailureKind::Persist, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::{endpoint, rejection_text};
    use serde_json::json;
    use url::Url;

    #[test]
    fn rejection_text_reads_error_field_of_any_shape() {
        assert_eq!(rejection_text(&json!({"error": "Invalid URL"})), "Invalid URL");
        assert_eq!(rejection_text(&json!({"error": null})), "");
        assert_eq!(rejection_text(&json!({"error": 42})), "42");
        assert_eq!(rejection_text(&json!({})), "");
        assert_eq!(rejection_text(&json!([])), "");
        assert_eq!(rejection_text(&json!("oops")), "");
    }

    #[test]
    fn endpoint_appends_encoded_segments() {
        let base = Url::parse("http://host:5000/").unwrap();
        assert_eq!(
            endpoint(&base, &["status", "a b/c"]).unwrap().as_str(),
            "http://host:5000/status/a%20b%2Fc"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let base = Url::parse("http://host/crawler/").unwrap();
        assert_eq!(
            endpoint(&base, &["crawl"]).unwrap().as_str(),
            "http://host/crawler/crawl"
        );
        let base = Url::parse("http://host/crawler").unwrap();
        assert_eq!(
            endpoint(&base, &["crawl"]).unwrap().as_str(),
            "http://host/crawler/crawl"
        );
    }

    #[test]
    fn opaque_base_is_rejected() {
        let base = Url::parse("mailto:someone@example.com").unwrap();
        assert!(endpoint(&base, &["crawl"]).is_err());
    }
}
