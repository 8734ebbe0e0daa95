//! On-disk and URL layout of one module.

use std::path::PathBuf;

use stepcheck_config::PathsConfig;
use stepcheck_protocols::ComponentId;
use url::form_urlencoded;

use crate::manifest::Manifest;

/// Resolves every path and URL the evaluation run touches for a module.
#[derive(Debug, Clone)]
pub struct ModuleLayout {
    module_id: String,
    modules_dir: PathBuf,
    results_dir: PathBuf,
    viewer_base_url: String,
}

impl ModuleLayout {
    pub fn new(module_id: impl Into<String>, paths: &PathsConfig) -> Self {
        Self {
            module_id: module_id.into(),
            modules_dir: paths.modules_dir.clone(),
            results_dir: paths.results_dir.clone(),
            viewer_base_url: paths.viewer_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// `modules/{module}/manifest.json`
    pub fn manifest_path(&self) -> PathBuf {
        self.modules_dir.join(&self.module_id).join("manifest.json")
    }

    pub fn components_dir(&self) -> PathBuf {
        self.modules_dir.join(&self.module_id).join("components")
    }

    pub fn component_path(&self, manifest: &Manifest, id: ComponentId) -> PathBuf {
        self.components_dir().join(manifest.component_filename(id))
    }

    /// `evaluation_results/{module}_queue`
    pub fn run_dir(&self) -> PathBuf {
        self.results_dir.join(format!("{}_queue", self.module_id))
    }

    pub fn results_file(&self) -> PathBuf {
        self.run_dir().join("evaluation_results.json")
    }

    pub fn evidence_dir(&self, id: ComponentId) -> PathBuf {
        self.run_dir().join(id.evidence_dir_name())
    }

    /// Viewer page that renders a single step of the module. Query values
    /// are form-encoded.
    pub fn viewer_url(&self, id: ComponentId) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("module", &self.module_id)
            .append_pair("question", &id.question_index.to_string())
            .append_pair("step", &id.step_index.to_string())
            .finish();
        format!("{}/module-viewer.html?{}", self.viewer_base_url, query)
    }
}
