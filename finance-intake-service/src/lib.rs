pub mod advisory;
pub mod config;
pub mod export;
pub mod models;
pub mod service;
pub mod tasks;
pub mod workflow;

pub use config::Config;
pub use service::{AppState, build_router, create_app};
pub use workflow::{build_intake_workflow, create_flow_runner};
