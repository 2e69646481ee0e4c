use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::constants::provider::{DEFAULT_HADOOP_USER, WEBHDFS_API};
use crate::errors::ExtractError;
use crate::source::{ObjectDescriptor, ResourceProvider};
use crate::window::DateTriple;

/// Configuration for the HttpFS gateway provider.
#[derive(Clone, Debug)]
pub struct HttpFsConfig {
    /// Gateway base URL, e.g. `https://gateway:14000`.
    pub url: String,
    /// Optional HTTP basic-auth user.
    pub user: Option<String>,
    /// Optional HTTP basic-auth password.
    pub password: Option<String>,
    /// HDFS path under which day partitions live.
    pub base_path: String,
    /// User name passed as `user.name` to the gateway.
    pub hadoop_user: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl HttpFsConfig {
    /// Build a config with gateway defaults.
    pub fn new(url: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: None,
            password: None,
            base_path: base_path.into(),
            hadoop_user: DEFAULT_HADOOP_USER.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Resource provider backed by the Hadoop HttpFS REST gateway.
///
/// Uses `op=LISTSTATUS` to enumerate a day partition and `op=OPEN` to fetch
/// object bytes. Transport retry policy stays with the gateway; any non-OK
/// response is fatal for the day being listed or opened.
pub struct HttpFsProvider {
    config: HttpFsConfig,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct ListStatusBody {
    #[serde(rename = "FileStatuses")]
    file_statuses: FileStatuses,
}

#[derive(Deserialize)]
struct FileStatuses {
    #[serde(rename = "FileStatus")]
    file_status: Vec<FileStatus>,
}

#[derive(Deserialize)]
struct FileStatus {
    #[serde(rename = "pathSuffix")]
    path_suffix: String,
    #[serde(rename = "type")]
    kind: String,
}

impl HttpFsProvider {
    /// Create a provider from `config`.
    pub fn new(config: HttpFsConfig) -> Result<Self, ExtractError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ExtractError::Configuration(err.to_string()))?;
        Ok(Self { config, client })
    }

    fn day_path(&self, day: DateTriple) -> String {
        format!(
            "{}/year={}/month={}/day={}",
            self.config.base_path.trim_end_matches('/'),
            day.year,
            day.month,
            day.day
        )
    }

    fn request(&self, hdfs_path: &str, op: &str) -> reqwest::blocking::RequestBuilder {
        let mut builder = self
            .client
            .get(format!("{}{}{}", self.config.url, WEBHDFS_API, hdfs_path))
            .query(&[("op", op), ("user.name", self.config.hadoop_user.as_str())]);
        if let Some(user) = &self.config.user {
            builder = builder.basic_auth(user, self.config.password.as_deref());
        }
        builder
    }
}

impl ResourceProvider for HttpFsProvider {
    fn list_day(&self, day: DateTriple) -> Result<Vec<ObjectDescriptor>, ExtractError> {
        let day_path = self.day_path(day);
        debug!(%day, path = %day_path, "listing day partition via httpfs");
        let response = self
            .request(&day_path, "LISTSTATUS")
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| ExtractError::ResourceUnavailable {
                day,
                reason: err.to_string(),
            })?;
        let body: ListStatusBody =
            response
                .json()
                .map_err(|err| ExtractError::ResourceUnavailable {
                    day,
                    reason: format!("liststatus body: {err}"),
                })?;
        Ok(body
            .file_statuses
            .file_status
            .into_iter()
            .filter(|status| status.kind == "FILE")
            .map(|status| ObjectDescriptor::new(format!("{day_path}/{}", status.path_suffix)))
            .collect())
    }

    fn open(&self, object: &ObjectDescriptor) -> Result<Vec<u8>, ExtractError> {
        let response = self
            .request(&object.path, "OPEN")
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| ExtractError::ObjectUnavailable {
                path: object.path.clone(),
                reason: err.to_string(),
            })?;
        let bytes = response
            .bytes()
            .map_err(|err| ExtractError::ObjectUnavailable {
                path: object.path.clone(),
                reason: format!("body read: {err}"),
            })?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_path_uses_partition_layout() {
        let provider = HttpFsProvider::new(HttpFsConfig::new(
            "https://gateway:14000",
            "/project/popularity/",
        ))
        .unwrap();
        let day = DateTriple::new(2018, 5, 27).unwrap();
        assert_eq!(
            provider.day_path(day),
            "/project/popularity/year=2018/month=5/day=27"
        );
    }

    #[test]
    fn liststatus_body_deserializes_gateway_shape() {
        let body: ListStatusBody = serde_json::from_str(
            r#"{"FileStatuses":{"FileStatus":[
                {"pathSuffix":"part-m-00000.avro","type":"FILE"},
                {"pathSuffix":"sub","type":"DIRECTORY"}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(body.file_statuses.file_status.len(), 2);
        assert_eq!(body.file_statuses.file_status[0].kind, "FILE");
    }
}
