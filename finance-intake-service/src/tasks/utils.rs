use page_flow::FlowError;

use crate::models::{Page, PageInput};

pub const SELECTION_REQUIRED: &str = "최소 하나의 항목을 선택해주세요.";
pub const DATA_REQUIRED: &str = "모든 선택 항목에 대해 데이터를 입력해주세요.";

/// The error for an input the page has no control for.
pub fn unsupported(page: Page, input: &PageInput) -> FlowError {
    FlowError::UnsupportedInput {
        page: format!("{page:?}"),
        input: input.kind().to_string(),
    }
}
