use async_trait::async_trait;
use page_flow::{NextAction, Result, Task, TaskResult};
use tracing::info;

use crate::models::{IntakeData, IntakeFlow, Page, PageInput};

use super::utils::unsupported;

/// Human-readable summary of the collected data, one heading per category.
pub fn render_summary(data: &IntakeData) -> String {
    let mut out = String::from("📄 생성된 보고서\n입력된 데이터를 기반으로 보고서를 생성했습니다.\n");
    for record in data.report_sections() {
        out.push_str(&format!("\n## {}\n", record.category()));
        for (label, value) in record.fields() {
            out.push_str(&format!("- **{label}**: {value}\n"));
        }
    }
    out
}

/// Read-only summary page
pub struct ReportTask;

#[async_trait]
impl Task<IntakeFlow> for ReportTask {
    fn page(&self) -> Page {
        Page::Report
    }

    async fn run(&self, data: &mut IntakeData, input: PageInput) -> Result<TaskResult> {
        info!("running task: {:?}", self.page());

        match input {
            PageInput::View => Ok(TaskResult::new(
                Some(render_summary(data)),
                NextAction::WaitForInput,
            )),
            PageInput::Confirm => Ok(TaskResult::new_with_status(
                None,
                NextAction::Continue,
                Some("Report reviewed - starting advisory chat".to_string()),
            )),
            other => Err(unsupported(self.page(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, CategoryRecord};

    #[tokio::test]
    async fn test_summary_lists_investment_fields() {
        let mut data = IntakeData::default();
        data.select([Category::Investment]);
        data.record(CategoryRecord::Investment {
            ticker_name: "ABC".into(),
            share_count: 10,
            price_per_share: 5.5,
        });

        let result = ReportTask.run(&mut data, PageInput::View).await.unwrap();
        let summary = result.response.unwrap();

        let section = summary.split("## 투자 관리").nth(1).unwrap();
        assert!(section.contains("- **종목 이름**: ABC"));
        assert!(section.contains("- **보유 주식 수**: 10"));
        assert!(section.contains("- **주당 가격**: 5.5"));
    }

    #[tokio::test]
    async fn test_confirm_is_unconditional() {
        let mut data = IntakeData::default();
        let result = ReportTask.run(&mut data, PageInput::Confirm).await.unwrap();
        assert_eq!(result.next_action, NextAction::Continue);
    }
}
