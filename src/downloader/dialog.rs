//! "Save As" checkpoint for scratch-then-prompt downloads

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

/// Asks the user where a finished download should go.
///
/// Returning `None` means the user dismissed the dialog.
#[async_trait]
pub trait SaveDialog: Send + Sync {
    async fn choose_destination(&self, suggested: &Path) -> Option<PathBuf>;
}

/// Never prompts; always takes the suggested path
#[derive(Debug, Clone, Default)]
pub struct AcceptSuggested;

#[async_trait]
impl SaveDialog for AcceptSuggested {
    async fn choose_destination(&self, suggested: &Path) -> Option<PathBuf> {
        Some(suggested.to_path_buf())
    }
}

/// Prompts on the terminal.
///
/// An empty answer accepts the suggestion; `n`, `no`, `cancel` or end of input
/// dismiss the prompt. Anything else is taken as the destination path.
#[derive(Debug, Clone, Default)]
pub struct TerminalSaveDialog;

impl TerminalSaveDialog {
    /// Interpret one line of user input
    pub fn interpret(answer: Option<&str>, suggested: &Path) -> Option<PathBuf> {
        let answer = answer?.trim();
        match answer.to_ascii_lowercase().as_str() {
            "" => Some(suggested.to_path_buf()),
            "n" | "no" | "cancel" => None,
            _ => Some(crate::utils::platform::expand_tilde(answer)),
        }
    }
}

#[async_trait]
impl SaveDialog for TerminalSaveDialog {
    async fn choose_destination(&self, suggested: &Path) -> Option<PathBuf> {
        let mut stdout = tokio::io::stdout();
        let prompt = format!(
            "Save as [{}] (enter to accept, 'n' to cancel): ",
            suggested.display()
        );
        if stdout.write_all(prompt.as_bytes()).await.is_err() {
            return None;
        }
        let _ = stdout.flush().await;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let answer = lines.next_line().await.ok().flatten();
        debug!("Save dialog answer: {:?}", answer);
        Self::interpret(answer.as_deref(), suggested)
    }
}
