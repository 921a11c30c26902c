use std::error::Error;

use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use ctoproxy_common::GlobalConfig;
use ctoproxy_core::{SessionController, UpstreamHandles};
use ctoproxy_provider_core::CredentialPool;

/// Terminal chat on the first pooled credential. Every prompt starts a new
/// conversation; `exit`, `quit` or EOF ends the loop.
pub(crate) async fn run(
    config: &GlobalConfig,
    adapter: Option<String>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let pool = CredentialPool::from_file(&config.cookies_file);
    let credential = pool.next().await?;
    let adapter = adapter.unwrap_or_else(|| config.default_adapter.clone());

    let mut controller =
        SessionController::new(credential, UpstreamHandles::from_global(config)?);
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"authenticating...\n").await?;
    controller.authenticate().await?;
    stdout
        .write_all(format!("ready (adapter: {adapter}), type `exit` to quit\n").as_bytes())
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if is_exit(prompt) {
            break;
        }

        if let Err(err) = answer(&mut controller, &mut stdout, prompt, &adapter).await {
            warn!(event = "chat_turn_failed", error = %err);
            stdout.write_all(format!("\n[error] {err}\n").as_bytes()).await?;
        }
    }
    stdout.write_all(b"bye\n").await?;
    stdout.flush().await?;
    Ok(())
}

fn is_exit(prompt: &str) -> bool {
    prompt.eq_ignore_ascii_case("exit") || prompt.eq_ignore_ascii_case("quit")
}

async fn answer(
    controller: &mut SessionController,
    stdout: &mut tokio::io::Stdout,
    prompt: &str,
    adapter: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let conversation_id = controller.create_conversation(prompt, adapter).await?;
    let mut content = controller.stream_response(&conversation_id).await?;
    stdout.write_all(b"\nAssistant: ").await?;
    while let Some(increment) = content.next().await {
        stdout.write_all(increment?.as_bytes()).await?;
        stdout.flush().await?;
    }
    stdout.write_all(b"\n").await?;
    Ok(())
}
