use image::{ImageFormat, RgbaImage};
use log::debug;

use crate::dib;
use crate::error::ClipboardError;

const CF_DIB: u32 = 8;
const CF_DIBV5: u32 = 17;

/// Point-in-time read of an image from some clipboard.
///
/// `Ok(None)` means the clipboard holds no image (empty, text, file lists).
pub trait ImageSource {
    fn read_image(&mut self) -> Result<Option<RgbaImage>, ClipboardError>;
}

/// The OS clipboard. Every call makes exactly one attempt.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ImageSource for SystemClipboard {
    fn read_image(&mut self) -> Result<Option<RgbaImage>, ClipboardError> {
        let image = platform::read_image()?;
        match &image {
            Some(img) => debug!("Clipboard image: {}x{}", img.width(), img.height()),
            None => debug!("No image data in clipboard"),
        }
        Ok(image)
    }
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipFormat {
    /// The registered "PNG" format browsers and image editors publish.
    Png(u32),
    Dib(u32),
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
impl ClipFormat {
    fn id(self) -> u32 {
        match self {
            ClipFormat::Png(id) | ClipFormat::Dib(id) => id,
        }
    }
}

/// PNG wins over the bitmap formats since it keeps transparency intact.
/// `png_id` is 0 when the format could not be registered.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn preferred_format(available: &[u32], png_id: u32) -> Option<ClipFormat> {
    if png_id != 0 && available.contains(&png_id) {
        return Some(ClipFormat::Png(png_id));
    }
    [CF_DIBV5, CF_DIB]
        .into_iter()
        .find(|f| available.contains(f))
        .map(ClipFormat::Dib)
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn decode_format(format: ClipFormat, bytes: &[u8]) -> Result<RgbaImage, ClipboardError> {
    match format {
        ClipFormat::Png(_) => image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map(|img| img.to_rgba8())
            .map_err(ClipboardError::Png),
        ClipFormat::Dib(_) => Ok(dib::decode(bytes)?),
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use image::RgbaImage;
    use log::debug;
    use windows::core::w;
    use windows::Win32::Foundation::HGLOBAL;
    use windows::Win32::System::DataExchange::{
        CloseClipboard, EnumClipboardFormats, GetClipboardData, OpenClipboard,
        RegisterClipboardFormatW,
    };
    use windows::Win32::System::Memory::{GlobalLock, GlobalSize, GlobalUnlock};

    use super::{decode_format, preferred_format};
    use crate::error::ClipboardError;

    struct OpenedClipboard;

    impl Drop for OpenedClipboard {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseClipboard();
            }
        }
    }

    struct LockedGlobal(HGLOBAL);

    impl Drop for LockedGlobal {
        fn drop(&mut self) {
            unsafe {
                let _ = GlobalUnlock(self.0);
            }
        }
    }

    pub fn read_image() -> Result<Option<RgbaImage>, ClipboardError> {
        let png_id = unsafe { RegisterClipboardFormatW(w!("PNG")) };

        unsafe { OpenClipboard(None) }.map_err(|e| {
            debug!("Failed to open clipboard: {}", e);
            ClipboardError::Unavailable(e.to_string())
        })?;
        let _opened = OpenedClipboard;

        let mut formats = Vec::new();
        let mut format = unsafe { EnumClipboardFormats(0) };
        while format != 0 {
            formats.push(format);
            format = unsafe { EnumClipboardFormats(format) };
        }
        debug!("Available formats: {:?} (PNG registered as {})", formats, png_id);

        let Some(chosen) = preferred_format(&formats, png_id) else {
            return Ok(None);
        };

        let handle = unsafe { GetClipboardData(chosen.id()) }.map_err(|e| {
            debug!("Failed to get clipboard data for {:?}: {}", chosen, e);
            ClipboardError::Unavailable(e.to_string())
        })?;
        let global = HGLOBAL(handle.0);

        let ptr = unsafe { GlobalLock(global) } as *const u8;
        if ptr.is_null() {
            return Err(ClipboardError::Unavailable(
                "failed to lock clipboard memory".to_string(),
            ));
        }
        let _locked = LockedGlobal(global);

        let len = unsafe { GlobalSize(global) };
        debug!("Decoding {:?} ({} bytes)", chosen, len);
        let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };

        decode_format(chosen, bytes).map(Some)
    }
}

#[cfg(not(target_os = "windows"))]
mod platform {
    use image::RgbaImage;

    use crate::error::ClipboardError;

    pub fn read_image() -> Result<Option<RgbaImage>, ClipboardError> {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| {
            log::debug!("Failed to open clipboard: {}", e);
            ClipboardError::Unavailable(e.to_string())
        })?;

        match clipboard.get_image() {
            Ok(data) => {
                let (width, height) = (data.width, data.height);
                let bytes = data.bytes.into_owned();
                let len = bytes.len();
                RgbaImage::from_raw(width as u32, height as u32, bytes)
                    .map(Some)
                    .ok_or(ClipboardError::Malformed { width, height, len })
            }
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => {
                log::debug!("Failed to read clipboard image: {}", e);
                Err(ClipboardError::Unavailable(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Cursor;

    const PNG_ID: u32 = 0xC0F1;
    const CF_UNICODETEXT: u32 = 13;
    const CF_HDROP: u32 = 15;

    #[test]
    fn png_only_clipboard_is_an_image() {
        assert_eq!(preferred_format(&[PNG_ID], PNG_ID), Some(ClipFormat::Png(PNG_ID)));
    }

    #[test]
    fn png_beats_bitmaps_and_v5_beats_dib() {
        let all = [CF_DIB, CF_DIBV5, PNG_ID];
        assert_eq!(preferred_format(&all, PNG_ID), Some(ClipFormat::Png(PNG_ID)));
        assert_eq!(preferred_format(&all, 0), Some(ClipFormat::Dib(CF_DIBV5)));
        assert_eq!(preferred_format(&[CF_DIB], PNG_ID), Some(ClipFormat::Dib(CF_DIB)));
    }

    #[test]
    fn text_and_file_lists_are_not_images() {
        assert_eq!(preferred_format(&[CF_UNICODETEXT, CF_HDROP], PNG_ID), None);
        assert_eq!(preferred_format(&[], 0), None);
    }

    #[test]
    fn decodes_png_payload() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([12, 34, 56, 78]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();
        // Clipboard memory blocks may be larger than their payload.
        png.extend_from_slice(&[0; 16]);

        assert_eq!(decode_format(ClipFormat::Png(PNG_ID), &png).unwrap(), img);
    }

    #[test]
    fn bad_png_payload_is_a_clipboard_error() {
        let err = decode_format(ClipFormat::Png(PNG_ID), b"definitely not png").unwrap_err();
        assert!(matches!(err, ClipboardError::Png(_)));
    }

    #[test]
    fn decodes_dib_payload() {
        let mut dib = vec![0u8; 40];
        dib[0] = 40;
        dib[4] = 1;
        dib[8] = 1;
        dib[12] = 1;
        dib[14] = 24;
        dib.extend_from_slice(&[30, 20, 10, 0]);

        let img = decode_format(ClipFormat::Dib(CF_DIB), &dib).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }
}
