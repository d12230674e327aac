use std::sync::Arc;
use std::time::Duration;

use flaute_io::RegionLookup;

use crate::external::{ExternalTool, ProductSpec};

/// External services a pipeline depends on, resolved once at startup.
#[derive(Clone)]
pub struct Collaborators {
    pub lookup: Arc<dyn RegionLookup>,
    pub tool: Arc<dyn ExternalTool>,
}

/// How the external tool is invoked.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    pub program: String,
    pub timeout: Duration,
    pub products: Vec<ProductSpec>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            program: "cdo".to_string(),
            timeout: Duration::from_secs(60 * 60),
            products: Vec::new(),
        }
    }
}
