use std::fmt;
use std::path::PathBuf;

use restform_core::{parse_spec_str, read_spec_file, LoadError, SpecDocument};

/// Where the OpenAPI description comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    Path(PathBuf),
    Url(String),
    /// Document text supplied directly by the host.
    Inline(String),
}

impl SpecSource {
    /// `http(s)://` locations are fetched, anything else is a file path.
    pub fn locate(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            SpecSource::Url(location.to_string())
        } else {
            SpecSource::Path(PathBuf::from(location))
        }
    }

    pub async fn load(&self) -> Result<SpecDocument, LoadError> {
        match self {
            SpecSource::Path(path) => {
                let path = path.clone();
                // Blocking file I/O stays off the async workers.
                tokio::task::spawn_blocking(move || read_spec_file(&path))
                    .await
                    .map_err(|e| LoadError::Io {
                        location: self.to_string(),
                        message: e.to_string(),
                    })?
            }
            SpecSource::Url(url) => {
                let body = fetch(url).await.map_err(|message| LoadError::Io {
                    location: url.clone(),
                    message,
                })?;
                parse_spec_str(&body, url)
            }
            SpecSource::Inline(body) => parse_spec_str(body, "<inline>"),
        }
    }
}

impl fmt::Display for SpecSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecSource::Path(p) => write!(f, "{}", p.display()),
            SpecSource::Url(u) => f.write_str(u),
            SpecSource::Inline(_) => f.write_str("<inline>"),
        }
    }
}

async fn fetch(url: &str) -> Result<String, String> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("restform/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| e.to_string())?;
    let resp = client.get(url).send().await.map_err(|e| e.to_string())?;
    let status = resp.status();
    if !status.is_success() {
        return Err(format!("HTTP {status}"));
    }
    resp.text().await.map_err(|e| e.to_string())
}
