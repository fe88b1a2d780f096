mod types;
mod error;
mod config;
mod clock;
mod clipboard;
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
mod dib;
mod image_manager;
mod saver;

use std::error::Error;
use std::io::Write;
use std::process::ExitCode;

pub use clipboard::{ImageSource, SystemClipboard};
pub use clock::{file_name_for, Clock, FixedClock, SystemClock};
pub use config::{SaverConfig, DEFAULT_OUTPUT_DIR};
pub use error::{ClipboardError, DibError, SaveError};
pub use saver::ClipboardImageSaver;
pub use types::SaveOutcome;

/// Logs a fatal error together with its source chain.
fn report(err: &SaveError) {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    log::error!("{}", message);
}

/// Prints the status line for a normal outcome and returns the process exit
/// status. Fatal errors are logged and leave `out` untouched.
fn finish(result: Result<SaveOutcome, SaveError>, out: &mut impl Write) -> u8 {
    match result {
        Ok(outcome) => {
            if let Err(e) = writeln!(out, "{}", outcome) {
                log::warn!("Failed to write status line: {}", e);
            }
            0
        }
        Err(e) => {
            report(&e);
            e.exit_code()
        }
    }
}

pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = SaverConfig::default();
    log::debug!("Output directory: {}", config.output_dir.display());

    let result = ClipboardImageSaver::system(config).run();
    ExitCode::from(finish(result, &mut std::io::stdout().lock()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn printed(result: Result<SaveOutcome, SaveError>) -> (u8, String) {
        let mut out = Vec::new();
        let status = finish(result, &mut out);
        (status, String::from_utf8(out).unwrap())
    }

    #[test]
    fn saved_prints_one_line() {
        let outcome = SaveOutcome::Saved {
            file_name: "clipboard_20240307_140509.png".to_string(),
            path: PathBuf::from("/tmp/clipboard-images/clipboard_20240307_140509.png"),
        };
        assert_eq!(printed(Ok(outcome)), (0, "Saved: clipboard_20240307_140509.png\n".to_string()));
    }

    #[test]
    fn no_image_prints_one_line() {
        assert_eq!(printed(Ok(SaveOutcome::NoImage)), (0, "No image in clipboard.\n".to_string()));
    }

    #[test]
    fn failures_print_nothing_and_exit_by_kind() {
        let create = SaveError::CreateDir {
            path: PathBuf::from("/readonly/out"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        let clipboard = SaveError::from(ClipboardError::Unavailable("no display".to_string()));
        let write = SaveError::Write {
            path: PathBuf::from("/readonly/out/x.png"),
            source: image::ImageError::IoError(std::io::Error::from(std::io::ErrorKind::Other)),
        };

        assert_eq!(printed(Err(create)), (2, String::new()));
        assert_eq!(printed(Err(clipboard)), (3, String::new()));
        assert_eq!(printed(Err(write)), (4, String::new()));
    }
}
