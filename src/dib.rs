//! Decoder for packed device-independent bitmaps, the layout Windows hands
//! out for `CF_DIB` and `CF_DIBV5` clipboard data: a BITMAPINFOHEADER (or
//! its V4/V5 extensions), optional masks or color table, then pixel rows.

use image::{Rgba, RgbaImage};
use log::debug;

use crate::error::DibError;

const BITMAPINFOHEADER_SIZE: usize = 40;
const BITMAPV3INFOHEADER_SIZE: usize = 56;
const MAX_DIMENSION: i32 = 10000;

const BI_RGB: u32 = 0;
const BI_RLE8: u32 = 1;
const BI_RLE4: u32 = 2;
const BI_BITFIELDS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Masks {
    red: u32,
    green: u32,
    blue: u32,
    alpha: u32,
}

const RGB555: Masks = Masks {
    red: 0x7C00,
    green: 0x03E0,
    blue: 0x001F,
    alpha: 0,
};
const BGRA8888: Masks = Masks {
    red: 0x00FF_0000,
    green: 0x0000_FF00,
    blue: 0x0000_00FF,
    alpha: 0xFF00_0000,
};

enum Layout {
    Indexed,
    Rle,
    Bgr24,
    Masked(Masks),
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, DibError> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(DibError::Truncated { needed: offset + 2, actual: data.len() })
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, DibError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(DibError::Truncated { needed: offset + 4, actual: data.len() })
}

fn is_contiguous(mask: u32) -> bool {
    if mask == 0 {
        return false;
    }
    let shifted = mask >> mask.trailing_zeros();
    shifted & shifted.wrapping_add(1) == 0
}

/// Extracts the bits under `mask` and scales them to 0..=255.
fn channel(value: u32, mask: u32) -> u8 {
    let bits = mask.count_ones();
    let v = (value & mask) >> mask.trailing_zeros();
    if bits >= 8 {
        (v >> (bits - 8)) as u8
    } else {
        (v * 255 / ((1 << bits) - 1)) as u8
    }
}

pub fn decode(data: &[u8]) -> Result<RgbaImage, DibError> {
    let bi_size = read_u32(data, 0)? as usize;
    if bi_size < BITMAPINFOHEADER_SIZE {
        return Err(DibError::HeaderSize(bi_size));
    }

    let bi_width = read_u32(data, 4)? as i32;
    let bi_height = read_u32(data, 8)? as i32;
    let bi_bit_count = read_u16(data, 14)?;
    let bi_compression = read_u32(data, 16)?;
    let bi_clr_used = read_u32(data, 32)? as usize;

    debug!(
        "DIB info - header: {}, width: {}, height: {}, bit_count: {}, compression: {}",
        bi_size, bi_width, bi_height, bi_bit_count, bi_compression
    );

    if bi_width <= 0
        || bi_height == 0
        || bi_height == i32::MIN
        || bi_width > MAX_DIMENSION
        || bi_height.abs() > MAX_DIMENSION
    {
        return Err(DibError::Dimensions { width: bi_width, height: bi_height });
    }

    let unsupported = DibError::Unsupported {
        bit_count: bi_bit_count,
        compression: bi_compression,
    };
    let top_down = bi_height < 0;

    let layout = match (bi_bit_count, bi_compression) {
        (1 | 4 | 8, BI_RGB) => Layout::Indexed,
        (8, BI_RLE8) | (4, BI_RLE4) if !top_down => Layout::Rle,
        (16, BI_RGB) => Layout::Masked(RGB555),
        (24, BI_RGB) => Layout::Bgr24,
        (32, BI_RGB) => Layout::Masked(BGRA8888),
        (16 | 32, BI_BITFIELDS) => {
            let alpha = if bi_size >= BITMAPV3INFOHEADER_SIZE {
                read_u32(data, 52)?
            } else {
                0
            };
            let masks = Masks {
                red: read_u32(data, 40)?,
                green: read_u32(data, 44)?,
                blue: read_u32(data, 48)?,
                alpha,
            };
            let valid = [masks.red, masks.green, masks.blue].into_iter().all(is_contiguous)
                && (masks.alpha == 0 || is_contiguous(masks.alpha));
            if !valid {
                debug!("Unusable DIB channel masks: {:08x?}", masks);
                return Err(unsupported);
            }
            Layout::Masked(masks)
        }
        _ => return Err(unsupported),
    };

    // A plain BITMAPINFOHEADER keeps its three masks outside the header.
    let masks_len = if bi_size == BITMAPINFOHEADER_SIZE && bi_compression == BI_BITFIELDS {
        12
    } else {
        0
    };
    let palette_len = match (bi_clr_used, &layout) {
        (0, Layout::Indexed | Layout::Rle) => 1usize << bi_bit_count,
        (n, _) => n,
    };
    let palette_offset = bi_size + masks_len;
    let pixel_offset = palette_offset + palette_len * 4;
    if data.len() < pixel_offset {
        return Err(DibError::Truncated { needed: pixel_offset, actual: data.len() });
    }

    let width = bi_width as u32;
    let height = bi_height.unsigned_abs();

    debug!(
        "Image dimensions: {}x{}, palette entries: {}, pixel_offset: {}",
        width, height, palette_len, pixel_offset
    );

    let palette: Vec<Rgba<u8>> = data[palette_offset..pixel_offset]
        .chunks_exact(4)
        .map(|c| Rgba([c[2], c[1], c[0], 255]))
        .collect();
    let pixels = &data[pixel_offset..];

    // Index buffer in storage order: row 0 is the first row in memory.
    let lookup = |indices: Vec<u8>| -> Result<RgbaImage, DibError> {
        let mut img = RgbaImage::new(width, height);
        for (i, &index) in indices.iter().enumerate() {
            let color = palette
                .get(index as usize)
                .copied()
                .ok_or(DibError::PaletteIndex(index))?;
            let (x, row) = (i as u32 % width, i as u32 / width);
            let y = if top_down { row } else { height - 1 - row };
            img.put_pixel(x, y, color);
        }
        Ok(img)
    };

    match layout {
        Layout::Indexed => lookup(unpack_indexed(pixels, width, height, bi_bit_count)?),
        Layout::Rle => lookup(unpack_rle(pixels, width, height, bi_compression == BI_RLE4)?),
        Layout::Bgr24 => unpack_rows(pixels, width, height, top_down, 3, |px| {
            Rgba([px[2], px[1], px[0], 255])
        }),
        Layout::Masked(masks) => {
            let bytes_per_pixel = bi_bit_count as usize / 8;
            let mut img = unpack_rows(pixels, width, height, top_down, bytes_per_pixel, |px| {
                let value = px.iter().rev().fold(0u32, |acc, &b| acc << 8 | b as u32);
                let alpha = if masks.alpha == 0 { 255 } else { channel(value, masks.alpha) };
                Rgba([
                    channel(value, masks.red),
                    channel(value, masks.green),
                    channel(value, masks.blue),
                    alpha,
                ])
            })?;

            // Many producers leave the fourth byte of 32-bit pixels zeroed.
            if masks.alpha != 0 && img.pixels().all(|p| p[3] == 0) {
                debug!("DIB alpha channel is empty, treating image as opaque");
                for pixel in img.pixels_mut() {
                    pixel[3] = 255;
                }
            }
            Ok(img)
        }
    }
}

fn row_size(width: u32, bit_count: usize) -> usize {
    (width as usize * bit_count + 31) / 32 * 4
}

fn unpack_rows(
    pixels: &[u8],
    width: u32,
    height: u32,
    top_down: bool,
    bytes_per_pixel: usize,
    to_rgba: impl Fn(&[u8]) -> Rgba<u8>,
) -> Result<RgbaImage, DibError> {
    let row_size = row_size(width, bytes_per_pixel * 8);
    let needed = row_size * height as usize;
    if pixels.len() < needed {
        return Err(DibError::Truncated { needed, actual: pixels.len() });
    }

    let mut img = RgbaImage::new(width, height);
    for y in 0..height {
        let dib_y = if top_down { y } else { height - 1 - y };
        let row = &pixels[dib_y as usize * row_size..][..row_size];
        for x in 0..width {
            let px = &row[x as usize * bytes_per_pixel..][..bytes_per_pixel];
            img.put_pixel(x, y, to_rgba(px));
        }
    }
    Ok(img)
}

fn unpack_indexed(
    pixels: &[u8],
    width: u32,
    height: u32,
    bit_count: u16,
) -> Result<Vec<u8>, DibError> {
    let bits = bit_count as usize;
    let row_size = row_size(width, bits);
    let needed = row_size * height as usize;
    if pixels.len() < needed {
        return Err(DibError::Truncated { needed, actual: pixels.len() });
    }

    let mask = (1u16 << bits) - 1;
    let mut indices = Vec::with_capacity(width as usize * height as usize);
    for row in pixels[..needed].chunks_exact(row_size) {
        for x in 0..width as usize {
            let bit = x * bits;
            let shift = 8 - bits - bit % 8;
            indices.push(((row[bit / 8] as u16 >> shift) & mask) as u8);
        }
    }
    Ok(indices)
}

/// Expands RLE8/RLE4 data into one index per pixel, bottom row first.
/// Pixels the stream never touches keep index 0.
fn unpack_rle(
    pixels: &[u8],
    width: u32,
    height: u32,
    nibbles: bool,
) -> Result<Vec<u8>, DibError> {
    let (width, height) = (width as usize, height as usize);
    let mut indices = vec![0u8; width * height];
    let (mut x, mut y) = (0usize, 0usize);
    let mut pos = 0usize;

    let next = |pos: &mut usize| -> Result<u8, DibError> {
        let byte = *pixels
            .get(*pos)
            .ok_or(DibError::Truncated { needed: *pos + 1, actual: pixels.len() })?;
        *pos += 1;
        Ok(byte)
    };
    let mut put = |x: usize, y: usize, index: u8| {
        if x < width && y < height {
            indices[y * width + x] = index;
        }
    };
    let nibble = |byte: u8, k: usize| if k % 2 == 0 { byte >> 4 } else { byte & 0x0F };

    loop {
        let count = next(&mut pos)? as usize;
        let value = next(&mut pos)?;
        match (count, value) {
            (0, 0) => {
                x = 0;
                y += 1;
            }
            (0, 1) => break,
            (0, 2) => {
                x += next(&mut pos)? as usize;
                y += next(&mut pos)? as usize;
            }
            (0, n) => {
                let n = n as usize;
                let stored = if nibbles { (n + 1) / 2 } else { n };
                let run: Vec<u8> = (0..stored)
                    .map(|_| next(&mut pos))
                    .collect::<Result<_, _>>()?;
                for k in 0..n {
                    let index = if nibbles { nibble(run[k / 2], k) } else { run[k] };
                    put(x + k, y, index);
                }
                x += n;
                // Absolute runs are padded to a 16-bit boundary.
                if stored % 2 == 1 {
                    next(&mut pos)?;
                }
            }
            (n, byte) => {
                for k in 0..n {
                    put(x + k, y, if nibbles { nibble(byte, k) } else { byte });
                }
                x += n;
            }
        }
    }

    Ok(indices)
}
