use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};

use crate::error::SaveError;

pub struct ImageManager {
    storage_dir: PathBuf,
}

impl ImageManager {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Creates the storage directory and any missing parents. No-op when it
    /// already exists.
    pub fn ensure_storage_dir(&self) -> Result<(), SaveError> {
        fs::create_dir_all(&self.storage_dir).map_err(|e| {
            log::debug!("Failed to create storage directory {}: {}", self.storage_dir.display(), e);
            SaveError::CreateDir {
                path: self.storage_dir.clone(),
                source: e,
            }
        })?;

        log::debug!("Storage directory ready: {}", self.storage_dir.display());
        Ok(())
    }

    /// Encodes `image` as PNG into the storage directory, replacing any file
    /// already there under `file_name`.
    pub fn save_png(&self, image: &RgbaImage, file_name: &str) -> Result<PathBuf, SaveError> {
        let file_path = self.storage_dir.join(file_name);

        if file_path.exists() {
            log::info!("Overwriting existing file: {}", file_path.display());
        }

        image.save_with_format(&file_path, ImageFormat::Png).map_err(|e| {
            log::debug!("Failed to save image to {}: {}", file_path.display(), e);
            SaveError::Write {
                path: file_path.clone(),
                source: e,
            }
        })?;

        log::debug!("Image saved successfully to: {}", file_path.display());
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn creates_nested_dir_and_tolerates_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b");
        let manager = ImageManager::new(&dir);

        manager.ensure_storage_dir().unwrap();
        fs::write(dir.join("notes.txt"), "keep me").unwrap();
        manager.ensure_storage_dir().unwrap();

        assert!(dir.is_dir());
        assert_eq!(fs::read_to_string(dir.join("notes.txt")).unwrap(), "keep me");
    }

    #[test]
    fn dir_creation_fails_under_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let err = ImageManager::new(blocker.join("out")).ensure_storage_dir().unwrap_err();
        assert!(matches!(err, SaveError::CreateDir { .. }));
    }

    #[test]
    fn saves_decodable_png() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = ImageManager::new(tmp.path());
        let img = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 4]));

        let path = manager.save_png(&img, "shot.png").unwrap();

        assert_eq!(path, tmp.path().join("shot.png"));
        let bytes = fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        assert_eq!(image::load_from_memory(&bytes).unwrap().to_rgba8(), img);
    }

    #[test]
    fn save_fails_when_target_is_a_directory() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("shot.png")).unwrap();

        let err = ImageManager::new(tmp.path())
            .save_png(&RgbaImage::new(1, 1), "shot.png")
            .unwrap_err();
        assert!(matches!(err, SaveError::Write { .. }));
    }
}
