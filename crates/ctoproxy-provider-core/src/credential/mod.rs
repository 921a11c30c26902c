mod pool;

pub use pool::CredentialPool;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;

/// One identity cookie string, sent verbatim as the `Cookie` header.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(cookie: impl AsRef<str>) -> Self {
        Self(Arc::from(cookie.as_ref()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}

/// Parses a credential file: one cookie per line, surrounding whitespace
/// trimmed, blank lines and `#` comments skipped.
pub fn parse_credentials(text: &str) -> Vec<Credential> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Credential::new)
        .collect()
}

/// Where a [`CredentialPool`] reads its credentials from.
///
/// `marker` is cheap and is checked before every dispense; `load` runs only
/// when the marker moved.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn marker(&self) -> io::Result<SystemTime>;
    async fn load(&self) -> io::Result<Vec<Credential>>;
    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct FileCredentialSource {
    path: PathBuf,
}

impl FileCredentialSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialSource for FileCredentialSource {
    async fn marker(&self) -> io::Result<SystemTime> {
        tokio::fs::metadata(&self.path).await?.modified()
    }

    async fn load(&self) -> io::Result<Vec<Credential>> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        Ok(parse_credentials(&text))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
