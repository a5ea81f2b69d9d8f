use async_trait::async_trait;
use page_flow::{NextAction, Result, Task, TaskResult};
use tracing::{info, warn};

use crate::models::{Category, IntakeData, IntakeFlow, Page, PageInput};

use super::utils::{SELECTION_REQUIRED, unsupported};

fn render_checklist(data: &IntakeData) -> String {
    let mut out = String::from("📋 항목 선택\n원하는 항목을 선택하세요:\n");
    for category in Category::ALL {
        let mark = if data.is_selected(category) { "x" } else { " " };
        out.push_str(&format!("[{mark}] {category}\n"));
    }
    out
}

/// Picks which categories the intake covers
pub struct ChecklistTask;

#[async_trait]
impl Task<IntakeFlow> for ChecklistTask {
    fn page(&self) -> Page {
        Page::Checklist
    }

    async fn run(&self, data: &mut IntakeData, input: PageInput) -> Result<TaskResult> {
        info!("running task: {:?}", self.page());

        match input {
            PageInput::View => Ok(TaskResult::new(
                Some(render_checklist(data)),
                NextAction::WaitForInput,
            )),
            PageInput::SelectCategories { categories } => {
                data.select(categories);
                info!(selected = ?data.selected_categories, "categories selected");
                Ok(TaskResult::new(
                    Some(render_checklist(data)),
                    NextAction::WaitForInput,
                ))
            }
            PageInput::Confirm if data.selected_categories.is_empty() => {
                warn!("checklist confirmed without a selection");
                Ok(TaskResult::rejected(SELECTION_REQUIRED))
            }
            PageInput::Confirm => {
                let stale = data.prune_unselected();
                if !stale.is_empty() {
                    info!(dropped = ?stale, "dropped data for deselected categories");
                }
                Ok(TaskResult::new_with_status(
                    None,
                    NextAction::Continue,
                    Some(format!(
                        "{} categories selected - proceeding to input form",
                        data.selected_categories.len()
                    )),
                ))
            }
            other => Err(unsupported(self.page(), &other)),
        }
    }
}
