use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DibError {
    #[error("bitmap buffer too short: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("invalid bitmap header size: {0}")]
    HeaderSize(usize),
    #[error("invalid bitmap dimensions: {width}x{height}")]
    Dimensions { width: i32, height: i32 },
    #[error("bitmap palette index {0} is out of range")]
    PaletteIndex(u8),
    #[error("unsupported bitmap: bit_count={bit_count}, compression={compression}")]
    Unsupported { bit_count: u16, compression: u32 },
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard bitmap could not be decoded")]
    Decode(#[from] DibError),
    #[error("clipboard PNG could not be decoded")]
    Png(#[source] image::ImageError),
    #[error("clipboard image buffer does not match {width}x{height}: {len} bytes")]
    Malformed { width: usize, height: usize, len: usize },
}

/// Fatal conditions of a single run. Each maps to its own exit status.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to create output directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read clipboard")]
    Clipboard(#[from] ClipboardError),
    #[error("failed to write image {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl SaveError {
    pub fn exit_code(&self) -> u8 {
        match self {
            SaveError::CreateDir { .. } => 2,
            SaveError::Clipboard(_) => 3,
            SaveError::Write { .. } => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let create = SaveError::CreateDir {
            path: PathBuf::from("/nope"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        let clipboard = SaveError::from(ClipboardError::Unavailable("busy".into()));
        let write = SaveError::Write {
            path: PathBuf::from("/nope/x.png"),
            source: image::ImageError::IoError(std::io::Error::from(std::io::ErrorKind::Other)),
        };

        assert_eq!(create.exit_code(), 2);
        assert_eq!(clipboard.exit_code(), 3);
        assert_eq!(write.exit_code(), 4);
    }

    #[test]
    fn messages_name_the_path() {
        let err = SaveError::CreateDir {
            path: PathBuf::from("/srv/shots"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.to_string(), "failed to create output directory /srv/shots");
    }
}
