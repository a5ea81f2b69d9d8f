use crate::advisory::AdvisoryRelay;
use crate::models::{IntakeFlow, Page};
use crate::tasks::*;
use page_flow::{FlowRunner, Graph, GraphBuilder, Result, SessionStorage};
use std::sync::Arc;

pub fn build_intake_workflow(relay: AdvisoryRelay) -> Result<Graph<IntakeFlow>> {
    let mut builder = GraphBuilder::new("finance_intake")
        .add_task(Arc::new(ChecklistTask))
        .add_task(Arc::new(InputFormTask))
        .add_task(Arc::new(ReportTask))
        .add_task(Arc::new(ChatTask::new(relay)))
        .add_task(Arc::new(DownloadTask));

    for page in Page::ALL {
        if let Some(next) = page.next() {
            builder = builder.add_edge(page, next);
        }
    }

    builder.set_start_page(Page::Checklist).build()
}

pub fn create_flow_runner(
    relay: AdvisoryRelay,
    session_storage: Arc<dyn SessionStorage<IntakeFlow>>,
) -> Result<FlowRunner<IntakeFlow>> {
    let graph = Arc::new(build_intake_workflow(relay)?);
    Ok(FlowRunner::new(graph, session_storage))
}
