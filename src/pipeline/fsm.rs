use crate::{Error, Result, error::ErrorKind};
use tracing::{debug, info, warn};
use uuid::Uuid;

// Pipeline states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Staging,
    Invoking,
    Decoding,
    Responding,
    Failed(ErrorKind),
}

// Pipeline events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    BeginStaging,
    FileStaged,
    AnalysisCompleted,
    ResultDecoded,
    ErrorOccurred(ErrorKind),
}

/// Per-request state machine. Strictly forward; nothing is retried.
pub struct PipelineStateMachine {
    run_id: Uuid,
    state: PipelineState,
}

impl PipelineStateMachine {
    pub fn new(run_id: Uuid) -> Self {
        debug!("Creating pipeline FSM for run {}", run_id);
        Self {
            run_id,
            state: PipelineState::Received,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn current_state(&self) -> PipelineState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            PipelineState::Responding | PipelineState::Failed(_)
        )
    }

    pub fn transition(&mut self, event: PipelineEvent) -> Result<()> {
        let old_state = self.state;

        let new_state = match (old_state, event) {
            (PipelineState::Received, PipelineEvent::BeginStaging) => PipelineState::Staging,
            (PipelineState::Staging, PipelineEvent::FileStaged) => PipelineState::Invoking,
            (PipelineState::Invoking, PipelineEvent::AnalysisCompleted) => PipelineState::Decoding,
            (PipelineState::Decoding, PipelineEvent::ResultDecoded) => PipelineState::Responding,
            (state, PipelineEvent::ErrorOccurred(kind)) if !is_terminal_state(state) => {
                PipelineState::Failed(kind)
            }
            _ => {
                warn!(
                    "Invalid pipeline transition from {:?} with event {:?} (run {})",
                    old_state, event, self.run_id
                );
                return Err(Error::fsm(format!(
                    "Invalid transition from {:?} with event {:?}",
                    old_state, event
                )));
            }
        };

        info!(
            "Pipeline state transition: {:?} -> {:?} (event: {:?}, run {})",
            old_state, new_state, event, self.run_id
        );

        self.state = new_state;
        Ok(())
    }
}

fn is_terminal_state(state: PipelineState) -> bool {
    matches!(state, PipelineState::Responding | PipelineState::Failed(_))
}
