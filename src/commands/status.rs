use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};
use crate::page::render_text;

pub struct StatusCommand;

#[async_trait]
impl Command for StatusCommand {
    fn name(&self) -> &str {
        "/status"
    }

    fn aliases(&self) -> &[&str] {
        &["/s"]
    }

    fn description(&self) -> &str {
        "show the upload state and both previews"
    }

    async fn execute(&self, info: &SessionInfo<'_>) -> CommandResult {
        let snapshot = info.workflow.snapshot();
        println!("  state      {}", snapshot.state.as_str());
        println!("  remover    {}", info.remover);
        println!("  downloads  {}", info.download_dir);
        print!("{}", render_text(&snapshot));
        CommandResult::Handled
    }
}
