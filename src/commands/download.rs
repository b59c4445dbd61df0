use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};

pub struct DownloadCommand;

#[async_trait]
impl Command for DownloadCommand {
    fn name(&self) -> &str {
        "/download"
    }

    fn aliases(&self) -> &[&str] {
        &["/d", "/save"]
    }

    fn description(&self) -> &str {
        "save the processed image"
    }

    async fn execute(&self, info: &SessionInfo<'_>) -> CommandResult {
        match info.workflow.download() {
            Ok(Some(saved)) => println!("  ✓ saved {}", saved.location),
            Ok(None) => println!("  nothing to download yet"),
            Err(e) => eprintln!("  ✗ download failed: {e:#}"),
        }
        CommandResult::Handled
    }
}
