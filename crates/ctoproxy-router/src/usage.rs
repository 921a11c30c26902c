use std::sync::Arc;

use tiktoken_rs::{CoreBPE, cl100k_base};
use tracing::warn;

use ctoproxy_protocol::openai::chat_completions::CompletionUsage;

/// cl100k token counts for usage reporting. Counts are zero when the
/// encoding could not be loaded.
#[derive(Clone, Default)]
pub struct TokenCounter {
    bpe: Option<Arc<CoreBPE>>,
}

impl TokenCounter {
    pub fn cl100k() -> Self {
        match cl100k_base() {
            Ok(bpe) => Self {
                bpe: Some(Arc::new(bpe)),
            },
            Err(err) => {
                warn!(event = "tokenizer_unavailable", error = %err);
                Self::default()
            }
        }
    }

    pub fn count(&self, text: &str) -> i64 {
        self.bpe
            .as_ref()
            .map(|bpe| bpe.encode_ordinary(text).len() as i64)
            .unwrap_or(0)
    }

    pub fn usage(&self, prompt: &str, completion: &str) -> CompletionUsage {
        CompletionUsage::new(self.count(prompt), self.count(completion))
    }
}
