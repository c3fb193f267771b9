use crate::{ApiConfig, Downloader, RemoteError};
use sculk_store::{ArtifactFetcher, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use tracing::{debug, warn};

/// Blocking HTTP client shared by the API clients and artifact downloads.
///
/// Transport failures, `429` and `5xx` responses are retried up to
/// `max_attempts` times with no delay between attempts. `404` and other client
/// errors fail immediately.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    user_agent: String,
    max_attempts: u32,
}

enum Attempt {
    Retry(String),
    Fatal(RemoteError),
}

impl HttpClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            user_agent: config.user_agent.clone(),
            max_attempts: config.max_attempts.max(1),
        }
    }

    pub fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>, RemoteError> {
        debug!("GET {url}");
        self.with_retry(url, || {
            let mut req = self.agent.get(url).header("User-Agent", &self.user_agent);
            for (name, value) in headers {
                req = req.header(*name, *value);
            }
            read_body(req.call().map_err(|e| classify(url, e))?)
        })
    }

    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let body = self.get(url, headers)?;
        decode(url, &body)
    }

    /// Like [`HttpClient::get_json`], with `404` mapped to `None`.
    pub fn get_json_opt<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Option<T>, RemoteError> {
        match self.get_json(url, headers) {
            Ok(v) => Ok(Some(v)),
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<T, RemoteError> {
        let payload =
            serde_json::to_vec(body).map_err(|e| RemoteError::Serialization(e.to_string()))?;
        debug!("POST {url} ({} bytes)", payload.len());
        let response = self.with_retry(url, || {
            let mut req = self
                .agent
                .post(url)
                .header("User-Agent", &self.user_agent)
                .header("Content-Type", "application/json");
            for (name, value) in headers {
                req = req.header(*name, *value);
            }
            read_body(req.send(payload.as_slice()).map_err(|e| classify(url, e))?)
        })?;
        decode(url, &response)
    }

    fn with_retry<F>(&self, url: &str, attempt: F) -> Result<Vec<u8>, RemoteError>
    where
        F: Fn() -> Result<Vec<u8>, Attempt>,
    {
        let mut last = String::new();
        for n in 1..=self.max_attempts {
            match attempt() {
                Ok(body) => return Ok(body),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retry(reason)) => {
                    warn!("attempt {n}/{} for {url} failed: {reason}", self.max_attempts);
                    last = reason;
                }
            }
        }
        Err(RemoteError::NetworkExhausted {
            url: url.to_owned(),
            attempts: self.max_attempts,
            last,
        })
    }
}

fn classify(url: &str, err: ureq::Error) -> Attempt {
    match err {
        ureq::Error::StatusCode(404) => Attempt::Fatal(RemoteError::NotFound(url.to_owned())),
        ureq::Error::StatusCode(code) if (400..500).contains(&code) && code != 429 => {
            Attempt::Fatal(RemoteError::Http(format!("HTTP {code} for {url}")))
        }
        ureq::Error::StatusCode(code) => Attempt::Retry(format!("HTTP {code}")),
        other => Attempt::Retry(other.to_string()),
    }
}

fn read_body(resp: ureq::http::Response<ureq::Body>) -> Result<Vec<u8>, Attempt> {
    let mut reader = resp.into_body().into_reader();
    let mut body = Vec::new();
    reader
        .read_to_end(&mut body)
        .map_err(|e| Attempt::Retry(e.to_string()))?;
    Ok(body)
}

fn decode<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, RemoteError> {
    serde_json::from_slice(body)
        .map_err(|e| RemoteError::Serialization(format!("unexpected response from {url}: {e}")))
}

impl Downloader for HttpClient {
    fn download(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        self.get(url, &[])
    }
}

impl ArtifactFetcher for HttpClient {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError> {
        self.download(url).map_err(|e| StoreError::Fetch {
            url: url.to_owned(),
            reason: e.to_string(),
        })
    }
}
