use log::info;

use crate::clipboard::{ImageSource, SystemClipboard};
use crate::clock::{file_name_for, Clock, SystemClock};
use crate::config::SaverConfig;
use crate::error::SaveError;
use crate::image_manager::ImageManager;
use crate::types::SaveOutcome;

pub struct ClipboardImageSaver<S, C> {
    image_manager: ImageManager,
    source: S,
    clock: C,
}

impl ClipboardImageSaver<SystemClipboard, SystemClock> {
    pub fn system(config: SaverConfig) -> Self {
        Self::new(config, SystemClipboard, SystemClock)
    }
}

impl<S: ImageSource, C: Clock> ClipboardImageSaver<S, C> {
    pub fn new(config: SaverConfig, source: S, clock: C) -> Self {
        Self {
            image_manager: ImageManager::new(config.output_dir),
            source,
            clock,
        }
    }

    /// Ensures the output directory, reads the clipboard once and writes any
    /// image found as a timestamped PNG.
    pub fn run(&mut self) -> Result<SaveOutcome, SaveError> {
        self.image_manager.ensure_storage_dir()?;

        let Some(image) = self.source.read_image()? else {
            info!("Clipboard holds no image");
            return Ok(SaveOutcome::NoImage);
        };

        let file_name = file_name_for(self.clock.now());
        let path = self.image_manager.save_png(&image, &file_name)?;
        info!("Saved clipboard image to: {}", path.display());

        Ok(SaveOutcome::Saved { file_name, path })
    }
}
