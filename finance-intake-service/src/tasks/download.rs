use async_trait::async_trait;
use page_flow::{NextAction, Result, Task, TaskResult};
use tracing::info;

use crate::export::REPORT_FILENAME;
use crate::models::{IntakeData, IntakeFlow, Page, PageInput};

use super::utils::unsupported;

/// Terminal page. The document itself is produced on request by the export route.
pub struct DownloadTask;

#[async_trait]
impl Task<IntakeFlow> for DownloadTask {
    fn page(&self) -> Page {
        Page::Download
    }

    async fn run(&self, data: &mut IntakeData, input: PageInput) -> Result<TaskResult> {
        info!("running task: {:?}", self.page());

        match input {
            PageInput::View | PageInput::Confirm => Ok(TaskResult::new_with_status(
                Some(format!(
                    "📥 최종 보고서 다운로드\n최종 보고서를 PDF로 다운로드하세요: {REPORT_FILENAME}"
                )),
                NextAction::End,
                Some(format!(
                    "Report ready - {} categories, {} advisory turns",
                    data.category_data.len(),
                    data.chat_history.len()
                )),
            )),
            other => Err(unsupported(self.page(), &other)),
        }
    }
}
