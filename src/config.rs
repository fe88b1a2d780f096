use std::path::PathBuf;

#[cfg(target_os = "windows")]
pub const DEFAULT_OUTPUT_DIR: &str = r"C:\Users\Public\Pictures\Clipboard";

#[cfg(not(target_os = "windows"))]
pub const DEFAULT_OUTPUT_DIR: &str = "/tmp/clipboard-images";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaverConfig {
    pub output_dir: PathBuf,
}

impl SaverConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl Default for SaverConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}
