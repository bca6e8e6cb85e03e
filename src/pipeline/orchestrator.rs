use super::fsm::{PipelineEvent, PipelineStateMachine};
use crate::{
    Result,
    analysis::{self, AnalysisJob, AnalysisResult, AnalysisRunner, ProcessRunner},
    artifacts::ArtifactStore,
    config::Config,
    upload::{StagedFile, UploadForm, UploadRequest, UploadStager},
};
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

/// Stage -> invoke -> decode -> assemble, for one upload at a time.
///
/// Directories are created once when the pipeline is built. A `Pipeline` is
/// shared across requests; each call to [`Pipeline::handle`] is independent.
pub struct Pipeline {
    stager: UploadStager,
    artifacts: ArtifactStore,
    runner: Arc<dyn AnalysisRunner>,
    accepted_extensions: Vec<String>,
}

impl Pipeline {
    pub fn new(
        stager: UploadStager,
        artifacts: ArtifactStore,
        runner: Arc<dyn AnalysisRunner>,
        accepted_extensions: Vec<String>,
    ) -> Self {
        Self {
            stager,
            artifacts,
            runner,
            accepted_extensions,
        }
    }

    /// Opens both directories and wires a [`ProcessRunner`] from the config.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let stager = UploadStager::open(&config.storage.staging_dir).await?;
        let artifacts =
            ArtifactStore::open(&config.storage.artifact_dir, &config.storage.static_url_prefix)
                .await?;
        let runner = ProcessRunner::new(
            config.analysis.clone(),
            artifacts.dir(),
            artifacts.url_prefix(),
        );

        Ok(Self::new(
            stager,
            artifacts,
            Arc::new(runner),
            config.analysis.accepted_extensions.clone(),
        ))
    }

    pub fn stager(&self) -> &UploadStager {
        &self.stager
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub async fn handle(&self, form: UploadForm) -> Result<AnalysisResult> {
        let run_id = Uuid::new_v4();
        self.handle_run(run_id, form)
            .instrument(info_span!("upload", %run_id))
            .await
    }

    pub async fn handle_run(&self, run_id: Uuid, form: UploadForm) -> Result<AnalysisResult> {
        let mut fsm = PipelineStateMachine::new(run_id);

        match self.run_stages(&mut fsm, form).await {
            Ok(result) => {
                info!("Upload analysis completed");
                Ok(result)
            }
            Err(e) => {
                error!("Upload analysis failed ({}): {}", e.kind(), e);
                if !fsm.is_terminal() {
                    fsm.transition(PipelineEvent::ErrorOccurred(e.kind()))?;
                }
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        fsm: &mut PipelineStateMachine,
        form: UploadForm,
    ) -> Result<AnalysisResult> {
        fsm.transition(PipelineEvent::BeginStaging)?;
        let request = UploadRequest::from_form(form, &self.accepted_extensions)?;
        let staged = self.stager.stage(fsm.run_id(), &request).await?;
        fsm.transition(PipelineEvent::FileStaged)?;

        let job = job_for(fsm.run_id(), &staged, request.target_savings);
        let output = self.runner.run(&job).await?;
        fsm.transition(PipelineEvent::AnalysisCompleted)?;

        let decoded = analysis::decode(&output.stdout)?;
        fsm.transition(PipelineEvent::ResultDecoded)?;

        Ok(self.assemble(decoded))
    }

    /// Rewrites artifact references into servable URLs.
    fn assemble(&self, mut result: AnalysisResult) -> AnalysisResult {
        result.pie_chart = result.pie_chart.map(|p| self.artifacts.public_url(&p));
        result.scatter_plot = result.scatter_plot.map(|p| self.artifacts.public_url(&p));
        result
    }
}

fn job_for(run_id: Uuid, staged: &StagedFile, target_savings: String) -> AnalysisJob {
    AnalysisJob {
        run_id,
        staged_path: staged.absolute_path.clone(),
        target_savings,
    }
}
