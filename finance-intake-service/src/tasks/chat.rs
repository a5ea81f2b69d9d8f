use async_trait::async_trait;
use page_flow::{NextAction, Result, Task, TaskResult};
use tracing::info;

use super::utils::unsupported;
use crate::advisory::AdvisoryRelay;
use crate::models::{ChatTurn, IntakeData, IntakeFlow, Page, PageInput};

fn render_transcript(history: &[ChatTurn]) -> String {
    let mut out = String::from("💬 GPT 상담\n생성된 보고서를 바탕으로 GPT와 상담하세요.\n");
    for turn in history {
        out.push_str(&format!("{}: {}\n", turn.role.label(), turn.content));
    }
    out
}

/// Advisory conversation. Any number of questions, including none, may be asked before moving on.
pub struct ChatTask {
    relay: AdvisoryRelay,
}

impl ChatTask {
    pub fn new(relay: AdvisoryRelay) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl Task<IntakeFlow> for ChatTask {
    fn page(&self) -> Page {
        Page::Chat
    }

    async fn run(&self, data: &mut IntakeData, input: PageInput) -> Result<TaskResult> {
        info!("running task: {:?}", self.page());

        match input {
            PageInput::Ask { message } if !message.trim().is_empty() => {
                let reply = self.relay.ask(&mut data.chat_history, message).await;
                Ok(TaskResult::new(Some(reply), NextAction::WaitForInput))
            }
            // An empty question box is just another render
            PageInput::Ask { .. } | PageInput::View => Ok(TaskResult::new(
                Some(render_transcript(&data.chat_history)),
                NextAction::WaitForInput,
            )),
            PageInput::Confirm => Ok(TaskResult::new_with_status(
                None,
                NextAction::Continue,
                Some(format!(
                    "Advisory chat finished after {} turns - preparing download",
                    data.chat_history.len()
                )),
            )),
            other => Err(unsupported(self.page(), &other)),
        }
    }
}
