//! Texture decoding contract.
//!
//! Decoding VTF data is left to an external library. It hands back raw RGBA data
//! which is normalised here into the layout the scene expects: RGBA32F in `[0, 1]`,
//! rows flipped so the first row is the bottom of the image.

use thiserror::Error;

/// Divisor for the 16-bit float path.
pub const HDR_NORMALIZE: f32 = 65535.0;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("texture decoder failed: {0}")]
    Decode(String),
    #[error("pixel buffer holds {len} values, expected {expected} for a {width}x{height} RGBA image")]
    SizeMismatch {
        len: usize,
        expected: usize,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawPixels {
    Rgba8(Vec<u8>),
    /// Raw IEEE half float bit patterns
    Rgba16F(Vec<u16>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub pixels: RawPixels,
}

pub trait TextureDecoder {
    /// Decode a texture file. `hdr` asks for the 16-bit float conversion.
    fn decode(&self, bytes: &[u8], hdr: bool) -> Result<RawImage, TextureError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// RGBA, row major, bottom row first
    pub pixels: Vec<f32>,
}

impl DecodedImage {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels.get(i..i + 4)?.try_into().ok()
    }
}

pub fn load_texture(
    decoder: &dyn TextureDecoder,
    bytes: &[u8],
    hdr: bool,
) -> Result<DecodedImage, TextureError> {
    let raw = decoder.decode(bytes, hdr)?;
    normalize(raw)
}

pub fn normalize(raw: RawImage) -> Result<DecodedImage, TextureError> {
    let expected = raw.width as usize * raw.height as usize * 4;

    let mut pixels: Vec<f32> = match raw.pixels {
        RawPixels::Rgba8(data) => data.into_iter().map(|c| c as f32 / 255.0).collect(),
        RawPixels::Rgba16F(data) => data
            .into_iter()
            .map(|bits| half_to_f32(bits) / HDR_NORMALIZE)
            .collect(),
    };

    if pixels.len() != expected {
        return Err(TextureError::SizeMismatch {
            len: pixels.len(),
            expected,
            width: raw.width,
            height: raw.height,
        });
    }

    flip_rows(&mut pixels, raw.width as usize * 4);

    Ok(DecodedImage {
        width: raw.width,
        height: raw.height,
        pixels,
    })
}

fn flip_rows(pixels: &mut [f32], stride: usize) {
    if stride == 0 {
        return;
    }
    let rows = pixels.len() / stride;
    for y in 0..rows / 2 {
        let (top, bottom) = pixels.split_at_mut((rows - 1 - y) * stride);
        top[y * stride..(y + 1) * stride].swap_with_slice(&mut bottom[..stride]);
    }
}

fn half_to_f32(bits: u16) -> f32 {
    let sign = ((bits >> 15) as u32) << 31;
    let exp = ((bits >> 10) & 0x1f) as u32;
    let mant = (bits & 0x3ff) as u32;

    let out = match (exp, mant) {
        (0, 0) => sign,
        (0, _) => {
            // subnormal
            let v = mant as f32 * 2f32.powi(-24);
            return if sign != 0 { -v } else { v };
        }
        (0x1f, 0) => sign | 0x7f80_0000,
        (0x1f, _) => sign | 0x7fc0_0000 | (mant << 13),
        _ => sign | ((exp + 112) << 23) | (mant << 13),
    };
    f32::from_bits(out)
}
