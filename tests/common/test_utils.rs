use finsight::{
    analysis::AnalysisRunner,
    artifacts::ArtifactStore,
    config::{AnalysisConfig, Config, LogsConfig, ServerConfig, StorageConfig},
    pipeline::Pipeline,
    upload::{UploadForm, UploadStager},
};
use axum::body::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

pub const MULTIPART_BOUNDARY: &str = "finsight-test-boundary";

/// Payload from the upload walkthrough: a pie chart plus one recommendation.
pub const SAMPLE_RESULT_JSON: &str = r#"{"pieChart":"/static/pie_1.png","savingsRecommendations":[{"TransactionName":"Coffee","Category":"Food","DebitedAmount":4.5,"RecommendedSavings":1.0}]}"#;

/// Payload shaped like a full run of the Python analysis unit.
pub const FULL_RESULT_JSON: &str = r#"{
    "pieChart": "/static/pie_chart_0f3a.png",
    "scatterPlot": "/static/scatter_plot_9c1d.png",
    "savingsRecommendations": [
        {"TransactionName": "SWIGGY", "Category": "Low", "DebitedAmount": 250.0, "RecommendedSavings": 12.5},
        {"TransactionName": "UBER", "Category": "Low", "DebitedAmount": 180.0, "RecommendedSavings": 9.0}
    ],
    "expenseForecast": [
        {"Category": "Low", "Month": "January 2025", "PredictedExpense": 1520.35},
        {"Category": "Low", "Month": "February 2025", "PredictedExpense": 1498.1}
    ]
}"#;

/// Create a temporary directory for test files
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Analysis config that runs `script` with `/bin/sh`.
///
/// Inside the script `$1` is the staged file and `$2` the target savings.
pub fn sh_analysis_config(script: &str, timeout_secs: u64) -> AnalysisConfig {
    AnalysisConfig {
        program: "/bin/sh".to_string(),
        args: vec![
            "-c".to_string(),
            script.to_string(),
            "analysis-unit".to_string(),
        ],
        working_dir: None,
        env: HashMap::new(),
        timeout_secs,
        stderr_excerpt_bytes: 2048,
        accepted_extensions: vec!["xls".to_string(), "xlsx".to_string()],
    }
}

/// Create a test configuration whose directories live under `dir`
pub fn create_test_config(dir: &TempDir, script: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origin: "http://localhost:3000".to_string(),
            max_upload_bytes: 1024 * 1024,
            logs: LogsConfig {
                level: "debug".to_string(),
            },
        },
        storage: StorageConfig {
            staging_dir: dir.path().join("uploads").to_string_lossy().to_string(),
            artifact_dir: dir.path().join("static").to_string_lossy().to_string(),
            static_url_prefix: "/static".to_string(),
            artifact_retention_secs: None,
            upload_retention_secs: None,
            sweep_interval_secs: 300,
        },
        analysis: sh_analysis_config(script, 5),
    }
}

/// Pipeline over temp directories with an injected runner.
pub async fn create_test_pipeline(dir: &TempDir, runner: Arc<dyn AnalysisRunner>) -> Pipeline {
    let stager = UploadStager::open(dir.path().join("uploads"))
        .await
        .expect("staging dir");
    let artifacts = ArtifactStore::open(dir.path().join("static"), "/static")
        .await
        .expect("artifact dir");
    Pipeline::new(
        stager,
        artifacts,
        runner,
        vec!["xls".to_string(), "xlsx".to_string()],
    )
}

pub fn spreadsheet_form(file_name: &str, target_savings: &str) -> UploadForm {
    UploadForm {
        file_name: Some(file_name.to_string()),
        file_bytes: Some(Bytes::from_static(b"PK\x03\x04 fake xlsx bytes")),
        target_savings: Some(target_savings.to_string()),
    }
}

/// Number of regular files directly inside `dir`.
pub fn file_count(dir: &std::path::Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .count(),
        Err(_) => 0,
    }
}

pub enum Part<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        file_name: &'a str,
        bytes: &'a [u8],
    },
}

/// Encodes `parts` as a multipart/form-data body using [`MULTIPART_BOUNDARY`].
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(
                    b"Content-Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\r\n\r\n",
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY)
}
