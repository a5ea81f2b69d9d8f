// Finance intake wizard pages
pub mod checklist;
pub mod input_form;
pub mod report;
pub mod chat;
pub mod download;

// Shared helpers
pub mod utils;

// Re-export task implementations
pub use checklist::ChecklistTask;
pub use input_form::InputFormTask;
pub use report::ReportTask;
pub use chat::ChatTask;
pub use download::DownloadTask;
