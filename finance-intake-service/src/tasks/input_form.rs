use async_trait::async_trait;
use page_flow::{NextAction, Result, Task, TaskResult};
use tracing::{info, warn};

use crate::models::{Category, IntakeData, IntakeFlow, Page, PageInput};

use super::utils::{DATA_REQUIRED, unsupported};

fn render_form(data: &IntakeData) -> String {
    let mut out = String::from("📝 입력 폼\n선택한 항목에 대한 정보를 입력하세요:\n");
    for category in &data.selected_categories {
        out.push_str(&format!("\n## {category}\n"));
        for (label, value) in data.form_values(*category).fields() {
            out.push_str(&format!("- {label}: {value}\n"));
        }
    }
    out
}

/// Collects the values for every selected category.
///
/// Every `update_form` overwrites the stored record for each category it carries, so the stored
/// data always mirrors the latest form state.
pub struct InputFormTask;

#[async_trait]
impl Task<IntakeFlow> for InputFormTask {
    fn page(&self) -> Page {
        Page::InputForm
    }

    async fn run(&self, data: &mut IntakeData, input: PageInput) -> Result<TaskResult> {
        info!("running task: {:?}", self.page());

        match input {
            PageInput::View => Ok(TaskResult::new(
                Some(render_form(data)),
                NextAction::WaitForInput,
            )),
            PageInput::UpdateForm { records } => {
                let mut ignored: Vec<Category> = Vec::new();
                for record in records {
                    let category = record.category();
                    if !data.record(record.clamped()) {
                        ignored.push(category);
                    }
                }

                let mut result =
                    TaskResult::new(Some(render_form(data)), NextAction::WaitForInput);
                if !ignored.is_empty() {
                    warn!(ignored = ?ignored, "form values for unselected categories ignored");
                    let names: Vec<&str> = ignored.iter().map(|c| c.label()).collect();
                    result.warning = Some(format!(
                        "선택하지 않은 항목의 입력은 무시되었습니다: {}",
                        names.join(", ")
                    ));
                }
                Ok(result)
            }
            PageInput::Confirm if data.category_data.is_empty() => {
                warn!("report requested without any category data");
                Ok(TaskResult::rejected(DATA_REQUIRED))
            }
            PageInput::Confirm => {
                data.fill_defaults();
                Ok(TaskResult::new_with_status(
                    None,
                    NextAction::Continue,
                    Some(format!(
                        "Data collected for {} categories - generating report",
                        data.category_data.len()
                    )),
                ))
            }
            other => Err(unsupported(self.page(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryRecord;
    use serde_json::json;

    fn selected(categories: &[Category]) -> IntakeData {
        let mut data = IntakeData::default();
        data.select(categories.iter().copied());
        data
    }

    #[tokio::test]
    async fn test_confirm_without_data_warns() {
        let mut data = selected(&[Category::Tax]);
        let result = InputFormTask.run(&mut data, PageInput::Confirm).await.unwrap();
        assert_eq!(result.next_action, NextAction::WaitForInput);
        assert_eq!(result.warning.as_deref(), Some(DATA_REQUIRED));
    }

    #[tokio::test]
    async fn test_tax_data_then_confirm() {
        let mut data = selected(&[Category::Tax]);
        InputFormTask
            .run(
                &mut data,
                PageInput::UpdateForm {
                    records: vec![CategoryRecord::Tax {
                        annual_income: 5000,
                        tax_rate: 20,
                    }],
                },
            )
            .await
            .unwrap();

        let result = InputFormTask.run(&mut data, PageInput::Confirm).await.unwrap();
        assert_eq!(result.next_action, NextAction::Continue);
        assert_eq!(
            data.category_view(),
            json!({ "세금 관리": { "연소득": 5000, "세율": 20 } })
        );
    }

    #[tokio::test]
    async fn test_update_clamps_and_overwrites() {
        let mut data = selected(&[Category::Pension]);
        for rate in [4.5, 42.0] {
            InputFormTask
                .run(
                    &mut data,
                    PageInput::UpdateForm {
                        records: vec![CategoryRecord::Pension {
                            monthly_contribution: 30,
                            years: 20,
                            annual_interest_rate: rate,
                        }],
                    },
                )
                .await
                .unwrap();
        }
        assert_eq!(
            data.category_data.get(&Category::Pension),
            Some(&CategoryRecord::Pension {
                monthly_contribution: 30,
                years: 20,
                annual_interest_rate: 10.0,
            })
        );
    }

    #[tokio::test]
    async fn test_unselected_records_are_ignored() {
        let mut data = selected(&[Category::Tax]);
        let result = InputFormTask
            .run(
                &mut data,
                PageInput::UpdateForm {
                    records: vec![CategoryRecord::default_for(Category::Insurance)],
                },
            )
            .await
            .unwrap();
        assert!(result.warning.unwrap().contains("보험 관리"));
        assert!(data.category_data.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_fills_untouched_categories() {
        let mut data = selected(&[Category::Tax, Category::Investment]);
        data.record(CategoryRecord::Tax {
            annual_income: 1,
            tax_rate: 1,
        });

        InputFormTask.run(&mut data, PageInput::Confirm).await.unwrap();
        assert_eq!(
            data.category_data.get(&Category::Investment),
            Some(&CategoryRecord::default_for(Category::Investment))
        );
    }

    #[tokio::test]
    async fn test_view_shows_defaults() {
        let mut data = selected(&[Category::Pension]);
        let result = InputFormTask.run(&mut data, PageInput::View).await.unwrap();
        assert!(result.response.unwrap().contains("연 이자율: 3.0"));
    }
}
