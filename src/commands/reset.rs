use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};

pub struct ResetCommand;

#[async_trait]
impl Command for ResetCommand {
    fn name(&self) -> &str {
        "/reset"
    }

    fn aliases(&self) -> &[&str] {
        &["/clear"]
    }

    fn description(&self) -> &str {
        "discard both images and start over"
    }

    async fn execute(&self, info: &SessionInfo<'_>) -> CommandResult {
        info.workflow.reset();
        println!("  ✓ cleared");
        CommandResult::Handled
    }
}
