use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { file_name: String, path: PathBuf },
    NoImage,
}

/// The single status line printed for a run.
impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveOutcome::Saved { file_name, .. } => write!(f, "Saved: {}", file_name),
            SaveOutcome::NoImage => f.write_str("No image in clipboard."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_line_uses_file_name_only() {
        let outcome = SaveOutcome::Saved {
            file_name: "clipboard_20240307_140509.png".to_string(),
            path: PathBuf::from("/tmp/out/clipboard_20240307_140509.png"),
        };
        assert_eq!(outcome.to_string(), "Saved: clipboard_20240307_140509.png");
    }

    #[test]
    fn no_image_line() {
        assert_eq!(SaveOutcome::NoImage.to_string(), "No image in clipboard.");
    }
}
