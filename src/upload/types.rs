use crate::{Error, Result, artifacts::sanitize_file_name};
use axum::body::Bytes;
use std::path::PathBuf;

pub const MISSING_INPUT_MESSAGE: &str = "No file or target savings value provided.";

/// Raw multipart parts as they arrived. Any of them may be missing.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub file_name: Option<String>,
    pub file_bytes: Option<Bytes>,
    pub target_savings: Option<String>,
}

/// A form that has all required parts.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Name as sent by the client.
    pub file_name: String,
    /// Single path component safe to use on disk.
    pub safe_name: String,
    pub file_bytes: Bytes,
    /// Passed verbatim to the analysis unit, which does the numeric parsing.
    pub target_savings: String,
}

impl UploadRequest {
    pub fn from_form(form: UploadForm, accepted_extensions: &[String]) -> Result<Self> {
        let file_name = form.file_name.unwrap_or_default();
        // Browsers send an empty, unnamed file part when nothing was chosen
        let file_bytes = form
            .file_bytes
            .filter(|bytes| !(bytes.is_empty() && file_name.trim().is_empty()));

        let (Some(file_bytes), Some(target_savings)) = (file_bytes, form.target_savings) else {
            return Err(Error::missing_input(MISSING_INPUT_MESSAGE));
        };
        if target_savings.trim().is_empty() {
            return Err(Error::missing_input(MISSING_INPUT_MESSAGE));
        }

        let safe_name = sanitize_file_name(&file_name)
            .ok_or_else(|| Error::invalid_input("Uploaded file has no usable name."))?;

        let extension = safe_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !accepted_extensions
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(&extension))
        {
            return Err(Error::invalid_input(format!(
                "Unsupported file type '{}'. Accepted extensions: {}",
                file_name,
                accepted_extensions.join(", ")
            )));
        }

        Ok(Self {
            file_name,
            safe_name,
            file_bytes,
            target_savings,
        })
    }
}

/// An upload written to the staging directory. Owned by exactly one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub absolute_path: PathBuf,
    pub original_name: String,
}
