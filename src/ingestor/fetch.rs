//! Raw playlist retrieval for the three source kinds.
//!
//! File sources are read from disk, URL sources are fetched with a plain
//! GET, and Xtream sources are turned into the canonical `get.php` playlist
//! URL first. No parsing happens here.

use async_trait::async_trait;
use reqwest::Client;
use std::io::ErrorKind;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::SyncConfig;
use crate::errors::{AppError, AppResult, SourceError};
use crate::models::SourceKind;

/// Seam between the sync engine and the outside world, so tests and
/// alternative transports can stand in for the real fetcher.
#[async_trait]
pub trait PlaylistFetch: Send + Sync {
    /// Fetch with the regular resync deadline.
    async fn fetch_raw_playlist(&self, kind: &SourceKind) -> AppResult<String>;

    /// Fetch with the shorter connection-test deadline.
    async fn fetch_for_test(&self, kind: &SourceKind) -> AppResult<String>;
}

pub struct PlaylistFetcher {
    client: Client,
    fetch_timeout: Duration,
    test_timeout: Duration,
}

impl PlaylistFetcher {
    pub fn new(config: &SyncConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            test_timeout: Duration::from_secs(config.test_timeout_secs),
        }
    }

    async fn fetch(&self, kind: &SourceKind, timeout: Duration) -> AppResult<String> {
        match kind {
            SourceKind::File { path } => read_playlist_file(path).await,
            SourceKind::Url { url } => {
                if url.trim().is_empty() {
                    return Err(SourceError::invalid_config("url", "URL is required").into());
                }
                debug!("Fetching playlist from {}", url);
                self.fetch_url(url, timeout).await
            }
            SourceKind::Xtream {
                server,
                username,
                password,
            } => {
                let url = build_xtream_url(server, username, password)?;
                debug!("Fetching Xtream playlist from {}", server);
                self.fetch_url(url.as_str(), timeout).await
            }
        }
    }

    async fn fetch_url(&self, url: &str, timeout: Duration) -> AppResult<String> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            warn!("Playlist fetch failed with HTTP {}", status.as_u16());
            let err = match status.as_u16() {
                401 | 403 => SourceError::AuthFailed {
                    status: status.as_u16(),
                },
                code => SourceError::Http {
                    status: code,
                    message: status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string(),
                },
            };
            return Err(err.into());
        }

        let text = response
            .text()
            .await
            .map_err(|e| request_error(url, e))?;
        debug!("Fetched {} bytes of playlist text", text.len());
        Ok(text)
    }
}

#[async_trait]
impl PlaylistFetch for PlaylistFetcher {
    async fn fetch_raw_playlist(&self, kind: &SourceKind) -> AppResult<String> {
        self.fetch(kind, self.fetch_timeout).await
    }

    async fn fetch_for_test(&self, kind: &SourceKind) -> AppResult<String> {
        self.fetch(kind, self.test_timeout).await
    }
}

fn request_error(url: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        SourceError::timeout(url).into()
    } else {
        SourceError::Request {
            message: err.to_string(),
        }
        .into()
    }
}

async fn read_playlist_file(path: &str) -> AppResult<String> {
    if path.trim().is_empty() {
        return Err(SourceError::invalid_config("path", "file path is required").into());
    }
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(SourceError::FileNotFound {
            path: path.to_string(),
        }
        .into()),
        Err(e) => Err(e.into()),
    }
}

/// Build the canonical Xtream-Codes playlist URL:
/// `<server>/get.php?username=..&password=..&type=m3u_plus&output=ts`.
/// A bare host gets `http://` prefixed; a trailing slash is trimmed.
pub fn build_xtream_url(server: &str, username: &str, password: &str) -> AppResult<Url> {
    for (field, value) in [
        ("server", server),
        ("username", username),
        ("password", password),
    ] {
        if value.trim().is_empty() {
            return Err(
                SourceError::invalid_config(field, format!("Xtream {} is required", field)).into(),
            );
        }
    }

    let server = server.trim();
    let lower = server.to_ascii_lowercase();
    let base = if lower.starts_with("http://") || lower.starts_with("https://") {
        server.to_string()
    } else {
        format!("http://{}", server)
    };

    let mut url = Url::parse(&format!("{}/get.php", base.trim_end_matches('/'))).map_err(|e| {
        AppError::from(SourceError::invalid_config(
            "server",
            format!("invalid Xtream server '{}': {}", server, e),
        ))
    })?;

    url.query_pairs_mut()
        .append_pair("username", username)
        .append_pair("password", password)
        .append_pair("type", "m3u_plus")
        .append_pair("output", "ts");

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xtream_url_has_canonical_shape() {
        let url = build_xtream_url("http://host.example:8080", "user", "pass").unwrap();
        assert_eq!(
            url.as_str(),
            "http://host.example:8080/get.php?username=user&password=pass&type=m3u_plus&output=ts"
        );
    }

    #[test]
    fn xtream_url_prefixes_missing_scheme() {
        let url = build_xtream_url("host.example", "u", "p").unwrap();
        assert!(url.as_str().starts_with("http://host.example/get.php?"));
    }

    #[test]
    fn xtream_url_trims_trailing_slash() {
        let url = build_xtream_url("https://host.example/", "u", "p").unwrap();
        assert!(url.as_str().starts_with("https://host.example/get.php?"));
    }

    #[test]
    fn xtream_url_encodes_credentials() {
        let url = build_xtream_url("host.example", "user name", "p&ss").unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("username=user+name"));
        assert!(query.contains("password=p%26ss"));
    }

    #[test]
    fn xtream_url_requires_all_credentials() {
        assert!(build_xtream_url("", "u", "p").is_err());
        assert!(build_xtream_url("host", "", "p").is_err());
        assert!(build_xtream_url("host", "u", " ").is_err());
    }

    #[tokio::test]
    async fn file_fetch_reads_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.m3u");
        std::fs::write(&path, "#EXTM3U\n").unwrap();

        let fetcher = PlaylistFetcher::new(&SyncConfig::default());
        let kind = SourceKind::File {
            path: path.to_string_lossy().into_owned(),
        };
        let text = fetcher.fetch_raw_playlist(&kind).await.unwrap();
        assert_eq!(text, "#EXTM3U\n");
    }

    #[tokio::test]
    async fn file_fetch_rejects_blank_path() {
        let fetcher = PlaylistFetcher::new(&SyncConfig::default());
        let kind = SourceKind::File {
            path: "  ".to_string(),
        };
        let err = fetcher.fetch_raw_playlist(&kind).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Source(SourceError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn file_fetch_reports_missing_file() {
        let fetcher = PlaylistFetcher::new(&SyncConfig::default());
        let kind = SourceKind::File {
            path: "/definitely/not/here.m3u".to_string(),
        };
        let err = fetcher.fetch_raw_playlist(&kind).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Source(SourceError::FileNotFound { .. })
        ));
    }
}
