//! Generation provider trait and transfer objects

use super::GenerationError;
use crate::models::Attachment;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// Mandatory entry page
pub const INDEX_FILE: &str = "index.html";
/// Mandatory readme
pub const README_FILE: &str = "README.md";
/// Mandatory license text
pub const LICENSE_FILE: &str = "LICENSE";

/// The three files every response must contain
pub const MANDATORY_FILES: [&str; 3] = [INDEX_FILE, README_FILE, LICENSE_FILE];

/// What to generate
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub brief: String,
    pub checks: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub round: u8,
    /// Previous round's markup; only set for round > 1
    pub existing_code: Option<String>,
}

/// A complete generated file set
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    pub index_html: String,
    pub readme_md: String,
    pub license_text: String,
    /// Any further files the model produced, keyed by path
    pub additional_files: BTreeMap<String, String>,
    /// Model that produced the content, or `fallback`
    pub model_used: String,
    pub generation_time: Duration,
}

impl GenerationResponse {
    /// All files keyed by path, mandatory ones included
    pub fn files(&self) -> BTreeMap<String, String> {
        let mut files = self.additional_files.clone();
        files.insert(INDEX_FILE.to_string(), self.index_html.clone());
        files.insert(README_FILE.to_string(), self.readme_md.clone());
        files.insert(LICENSE_FILE.to_string(), self.license_text.clone());
        files
    }

    /// Whether the local synthesis produced the whole response
    pub fn is_fallback(&self) -> bool {
        self.model_used == super::fallback::FALLBACK_MODEL
    }
}

/// A backend able to turn a brief into a static site
///
/// Implementations retry transient failures internally; an `Err` means no
/// usable content could be produced and the caller should try the next
/// provider.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider identifier (e.g., "chat", "inference")
    fn id(&self) -> &str;

    /// Preferred model name
    fn model(&self) -> String;

    /// Generate the file set for `request`
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, GenerationError>;

    /// Lightweight reachability probe; never fails
    async fn health_check(&self) -> bool;
}

/// Shared handle to a provider
pub type SharedProvider = std::sync::Arc<dyn GenerationProvider>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_files_includes_mandatory_and_extra() {
        let mut extra = BTreeMap::new();
        extra.insert("app.js".to_string(), "console.log(1)".to_string());
        let response = GenerationResponse {
            index_html: "<html></html>".into(),
            readme_md: "# App".into(),
            license_text: "MIT".into(),
            additional_files: extra,
            model_used: "m".into(),
            generation_time: Duration::from_millis(5),
        };

        let files = response.files();
        assert_eq!(
            files.keys().cloned().collect::<Vec<_>>(),
            vec!["LICENSE", "README.md", "app.js", "index.html"]
        );
        assert!(!response.is_fallback());
    }
}
