use std::path::PathBuf;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Root of the crawl service; endpoints are resolved below it.
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Path of the server-sent events stream carrying `status_update` events.
    pub feed_path: String,
    pub feed_reconnect_attempts: u32,
    pub feed_reconnect_delay: Duration,
    /// Directory downloaded archives are written to.
    pub output_dir: PathBuf,
}

impl ServiceSettings {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            ..Self::default()
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://127.0.0.1:5000/").expect("static url is valid"),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            feed_path: "events".to_string(),
            feed_reconnect_attempts: 5,
            feed_reconnect_delay: Duration::from_secs(1),
            output_dir: PathBuf::from("downloads"),
        }
    }
}
