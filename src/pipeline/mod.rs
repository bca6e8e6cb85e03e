pub mod fsm;
mod orchestrator;

pub use fsm::{PipelineEvent, PipelineState, PipelineStateMachine};
pub use orchestrator::Pipeline;
