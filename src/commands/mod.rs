//! Slash commands available at the `cutout>` prompt.
//!
//! Commands implement the [`Command`] trait and are registered in a
//! [`CommandRegistry`]. The registry handles dispatch, alias resolution,
//! and help generation. Anything that is not a command is treated as a
//! path to upload.

mod download;
mod help;
mod reset;
mod retry;
mod status;

use async_trait::async_trait;
use std::sync::Arc;

use crate::workflow::UploadWorkflow;

/// Inputs that leave the REPL.
const QUIT_WORDS: &[&str] = &["/quit", "/exit", "quit", "exit"];

/// What commands get to look at and act on.
pub struct SessionInfo<'a> {
    pub workflow: &'a UploadWorkflow,
    pub remover: &'a str,
    pub download_dir: &'a str,
}

/// What the REPL should do after a command runs.
pub enum CommandResult {
    /// Not a command; treat the input as a file to upload.
    NotACommand,
    /// Command handled, continue the REPL loop.
    Handled,
    /// Exit the REPL.
    Quit,
}

#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"/download"`.
    fn name(&self) -> &str;

    /// Alternative names, e.g. `&["/h", "/?"]`.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// One-line description for `/help`.
    fn description(&self) -> &str;

    async fn execute(&self, info: &SessionInfo<'_>) -> CommandResult;
}

pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry with all built-in commands.
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(help::HelpCommand),
            Arc::new(status::StatusCommand),
            Arc::new(download::DownloadCommand),
            Arc::new(retry::RetryCommand),
            Arc::new(reset::ResetCommand),
        ];
        Self { commands }
    }

    /// Dispatch input to a matching command, or return `NotACommand`.
    pub async fn dispatch(&self, input: &str, info: &SessionInfo<'_>) -> CommandResult {
        let cmd = input.trim();
        if QUIT_WORDS.contains(&cmd) {
            return CommandResult::Quit;
        }

        for command in &self.commands {
            if cmd == command.name() || command.aliases().contains(&cmd) {
                // /help needs the registry itself
                if command.name() == "/help" {
                    print!("{}", self.help_text());
                    return CommandResult::Handled;
                }
                return command.execute(info).await;
            }
        }

        if cmd.starts_with('/') && !cmd[1..].contains('/') && !std::path::Path::new(cmd).exists() {
            println!("unknown command: {cmd}");
            println!("type /help for available commands");
            return CommandResult::Handled;
        }

        CommandResult::NotACommand
    }

    pub fn help_text(&self) -> String {
        let entries: Vec<(String, &str)> = self
            .commands
            .iter()
            .map(|c| (format_label(c.name(), c.aliases()), c.description()))
            .collect();

        let max_width = entries
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(10);

        let mut out = String::new();
        for (label, desc) in &entries {
            out.push_str(&format!("  {label:<max_width$}  {desc}\n"));
        }
        out.push_str(&format!(
            "  {:<max_width$}  exit\n",
            format_label(QUIT_WORDS[0], &QUIT_WORDS[1..])
        ));
        out.push_str(&format!(
            "  {:<max_width$}  upload an image (drop a file onto the terminal)\n",
            "<path>"
        ));
        out
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_label(name: &str, aliases: &[&str]) -> String {
    if aliases.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, aliases.join(", "))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::remover::mock::{MockRemover, MockStep};
    use crate::saver::memory::MemorySaver;
    use crate::workflow::WorkflowConfig;
    use crate::decoder::ImageCrateDecoder;

    pub(crate) fn test_workflow(steps: Vec<MockStep>) -> (UploadWorkflow, Arc<MemorySaver>) {
        let saver = Arc::new(MemorySaver::new());
        let workflow = UploadWorkflow::new(
            Arc::new(ImageCrateDecoder::default()),
            Arc::new(MockRemover::new(steps)),
            saver.clone(),
            Arc::new(EventBus::default()),
            WorkflowConfig::default(),
        );
        (workflow, saver)
    }

    pub(crate) fn info(workflow: &UploadWorkflow) -> SessionInfo<'_> {
        SessionInfo {
            workflow,
            remover: "mock",
            download_dir: "memory",
        }
    }

    #[test]
    fn all_builtins_registered() {
        let reg = CommandRegistry::new();
        let names = reg.names();
        for name in ["/help", "/status", "/download", "/retry", "/reset"] {
            assert!(names.contains(&name), "missing {name}");
        }
    }

    #[test]
    fn no_duplicate_triggers() {
        let reg = CommandRegistry::new();
        let mut triggers: Vec<&str> = QUIT_WORDS.to_vec();
        for cmd in &reg.commands {
            triggers.push(cmd.name());
            triggers.extend_from_slice(cmd.aliases());
        }
        let mut seen = Vec::new();
        for t in &triggers {
            assert!(!seen.contains(t), "duplicate trigger: {t}");
            seen.push(t);
        }
    }

    #[test]
    fn help_text_includes_all_commands() {
        let reg = CommandRegistry::new();
        let text = reg.help_text();
        for name in reg.names() {
            assert!(text.contains(name), "help missing: {name}");
        }
        assert!(text.contains("<path>"));
    }

    #[tokio::test]
    async fn unknown_slash_command_is_handled() {
        let (workflow, _) = test_workflow(vec![]);
        let reg = CommandRegistry::new();
        assert!(matches!(
            reg.dispatch("/foobar", &info(&workflow)).await,
            CommandResult::Handled
        ));
    }

    #[tokio::test]
    async fn paths_pass_through() {
        let (workflow, _) = test_workflow(vec![]);
        let reg = CommandRegistry::new();
        assert!(matches!(
            reg.dispatch("photo.png", &info(&workflow)).await,
            CommandResult::NotACommand
        ));
        assert!(matches!(
            reg.dispatch("/home/me/photo.png", &info(&workflow)).await,
            CommandResult::NotACommand
        ));
    }

    #[tokio::test]
    async fn quit_words_end_the_session() {
        let (workflow, _) = test_workflow(vec![]);
        let reg = CommandRegistry::new();
        for word in ["/quit", "/exit", "quit", " exit "] {
            assert!(matches!(
                reg.dispatch(word, &info(&workflow)).await,
                CommandResult::Quit
            ));
        }
        assert!(reg.help_text().contains("/quit (/exit, quit, exit)"));
    }

    #[test]
    fn format_label_with_aliases() {
        assert_eq!(format_label("/help", &["/h", "/?"]), "/help (/h, /?)");
        assert_eq!(format_label("/status", &[]), "/status");
    }
}
