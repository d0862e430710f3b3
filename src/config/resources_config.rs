use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct ResourcesConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_true")]
    pub watch: bool,
    #[serde(default = "default_true")]
    pub create_defaults: bool,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            watch: default_true(),
            create_defaults: default_true(),
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("config/resources")
}

fn default_true() -> bool {
    true
}
