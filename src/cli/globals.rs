use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_url: String,
    pub store_path: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_url: String, store_path: PathBuf) -> Self {
        Self {
            api_url,
            store_path,
        }
    }

    /// Fallback credential file when `--store` is not given.
    #[must_use]
    pub fn default_store_path() -> PathBuf {
        std::env::temp_dir().join("pdi-session.json")
    }
}
