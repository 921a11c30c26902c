use std::path::PathBuf;
use std::time::SystemTime;

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{Credential, CredentialSource, FileCredentialSource};
use crate::errors::{ClientError, ClientResult};

struct PoolState {
    credentials: Vec<Credential>,
    cursor: usize,
    marker: Option<SystemTime>,
}

/// Round-robin pool over a hot-reloadable credential source.
///
/// The reload check and the dispense happen under one lock, so concurrent
/// callers never observe a half-swapped set and every credential is handed
/// out in turn.
pub struct CredentialPool {
    source: Box<dyn CredentialSource>,
    state: Mutex<PoolState>,
}

impl CredentialPool {
    pub fn new(source: impl CredentialSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            state: Mutex::new(PoolState {
                credentials: Vec::new(),
                cursor: 0,
                marker: None,
            }),
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileCredentialSource::new(path))
    }

    /// Re-reads the source if its marker changed. Returns the size of the
    /// current set.
    pub async fn reload(&self) -> usize {
        let mut state = self.state.lock().await;
        self.reload_locked(&mut state).await;
        state.credentials.len()
    }

    /// Next credential in rotation, reloading first when the source changed.
    pub async fn next(&self) -> ClientResult<Credential> {
        let mut state = self.state.lock().await;
        self.reload_locked(&mut state).await;
        if state.credentials.is_empty() {
            return Err(ClientError::PoolEmpty);
        }
        let index = state.cursor % state.credentials.len();
        state.cursor = (index + 1) % state.credentials.len();
        Ok(state.credentials[index].clone())
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.credentials.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn reload_locked(&self, state: &mut PoolState) {
        let marker = match self.source.marker().await {
            Ok(marker) => marker,
            Err(err) => {
                warn!(
                    event = "credentials_unreadable",
                    source = %self.source.describe(),
                    error = %err,
                    kept = state.credentials.len()
                );
                return;
            }
        };
        if state.marker == Some(marker) {
            return;
        }

        let loaded = match self.source.load().await {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(
                    event = "credentials_reload_failed",
                    source = %self.source.describe(),
                    error = %err,
                    kept = state.credentials.len()
                );
                return;
            }
        };
        state.marker = Some(marker);

        if loaded.is_empty() {
            warn!(
                event = "credentials_empty",
                source = %self.source.describe(),
                kept = state.credentials.len()
            );
            return;
        }

        info!(
            event = "credentials_loaded",
            source = %self.source.describe(),
            count = loaded.len()
        );
        state.credentials = loaded;
        state.cursor = 0;
    }
}
