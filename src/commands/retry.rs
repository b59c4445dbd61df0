use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};
use crate::workflow::SubmitOutcome;

pub struct RetryCommand;

#[async_trait]
impl Command for RetryCommand {
    fn name(&self) -> &str {
        "/retry"
    }

    fn aliases(&self) -> &[&str] {
        &["/process"]
    }

    fn description(&self) -> &str {
        "run background removal again on the current image"
    }

    async fn execute(&self, info: &SessionInfo<'_>) -> CommandResult {
        match info.workflow.process().await {
            None => println!("  nothing to retry"),
            Some(SubmitOutcome::Completed) => println!("  ✓ done, /download to save"),
            Some(SubmitOutcome::Failed(e)) => eprintln!("  ✗ {e}"),
            Some(SubmitOutcome::Superseded) => println!("  superseded by a newer upload"),
            Some(other) => println!("  {other:?}"),
        }
        CommandResult::Handled
    }
}
