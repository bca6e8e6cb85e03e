use async_trait::async_trait;
use finsight::{
    Error, Result,
    analysis::{AnalysisJob, AnalysisRunner, RawOutput},
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the fake analysis unit does when run.
#[derive(Debug, Clone)]
pub enum Outcome {
    Prints(String),
    Exits { code: i32, stderr: String },
    TimesOut { timeout_secs: u64 },
}

/// Fake runner that replays a fixed outcome and records every job it saw.
#[derive(Debug, Clone)]
pub struct MockRunner {
    pub outcome: Outcome,
    pub jobs: Arc<Mutex<Vec<AnalysisJob>>>,
    pub delay: Option<Duration>,
}

impl MockRunner {
    pub fn printing(stdout: &str) -> Self {
        Self::new(Outcome::Prints(stdout.to_string()))
    }

    pub fn failing(code: i32, stderr: &str) -> Self {
        Self::new(Outcome::Exits {
            code,
            stderr: stderr.to_string(),
        })
    }

    pub fn timing_out(timeout_secs: u64) -> Self {
        Self::new(Outcome::TimesOut { timeout_secs })
    }

    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            jobs: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_jobs(&self) -> Vec<AnalysisJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisRunner for MockRunner {
    async fn run(&self, job: &AnalysisJob) -> Result<RawOutput> {
        self.jobs.lock().unwrap().push(job.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.outcome {
            Outcome::Prints(stdout) => Ok(RawOutput {
                stdout: stdout.clone(),
                stderr: String::new(),
                duration: Duration::from_millis(1),
            }),
            Outcome::Exits { code, stderr } => Err(Error::AnalysisFailed {
                exit_code: Some(*code),
                stderr_excerpt: stderr.clone(),
            }),
            Outcome::TimesOut { timeout_secs } => Err(Error::AnalysisTimeout {
                timeout_secs: *timeout_secs,
            }),
        }
    }
}
