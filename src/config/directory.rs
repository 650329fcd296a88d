use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Location of the service directories in the coordination tree
///
/// Instances live at `<base_path>/<service>/<instance_id>`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DirectoryConfig {
    /// Absolute path under which every service directory is created
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Service names to observe. Duplicates are tolerated and dropped
    /// when the watcher registry is built.
    #[serde(default)]
    pub services: Vec<String>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            services: Vec::new(),
        }
    }
}

impl DirectoryConfig {
    /// Validates directory configuration
    /// # Errors
    /// Returns `Error::Config` when:
    /// - `base_path` is not absolute, ends with `/` or has empty segments
    /// - a service name is empty or contains `/`
    pub fn validate(&self) -> Result<()> {
        if !self.base_path.starts_with('/') {
            return Err(invalid(format!(
                "directory.base_path must be absolute, got {:?}",
                self.base_path
            )));
        }

        if self.base_path.len() > 1 && self.base_path.ends_with('/') {
            return Err(invalid(format!(
                "directory.base_path must not end with '/', got {:?}",
                self.base_path
            )));
        }

        if self.base_path == "/" || self.base_path[1..].split('/').any(str::is_empty) {
            return Err(invalid(format!(
                "directory.base_path contains an empty segment: {:?}",
                self.base_path
            )));
        }

        for service in &self.services {
            if service.is_empty() {
                return Err(invalid("directory.services contains an empty name".into()));
            }
            if service.contains('/') {
                return Err(invalid(format!(
                    "directory.services entry {service:?} must not contain '/'"
                )));
            }
        }

        Ok(())
    }
}

fn invalid(message: String) -> Error {
    Error::Config(ConfigError::Message(message))
}

fn default_base_path() -> String {
    "/services".to_string()
}
