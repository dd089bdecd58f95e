use flate2::read::ZlibDecoder;
use std::io::Read;

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

#[derive(Debug, thiserror::Error)]
pub enum PngError {
    #[error("malformed PNG: {0}")]
    Malformed(&'static str),
    #[error(
        "unsupported PNG layout (color type {color_type}, bit depth {bit_depth}, interlace {interlace})"
    )]
    Unsupported {
        color_type: u8,
        bit_depth: u8,
        interlace: u8,
    },
    #[error("corrupt PNG image data: {0}")]
    Inflate(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngHeader {
    pub width: u32,
    pub height: u32,
    bit_depth: u8,
    color_type: u8,
    interlace: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
}

impl ColorSpace {
    pub const fn pdf_name(self) -> &'static str {
        match self {
            Self::Gray => "DeviceGray",
            Self::Rgb => "DeviceRGB",
        }
    }
}

/// 8-bit samples with the alpha channel split off; `alpha` is `None` when
/// the image is fully opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub color: ColorSpace,
    pub pixels: Vec<u8>,
    pub alpha: Option<Vec<u8>>,
}

struct Chunk<'a> {
    kind: [u8; 4],
    data: &'a [u8],
}

pub fn read_header(bytes: &[u8]) -> Result<PngHeader, PngError> {
    header_of(&chunks(bytes)?)
}

/// Decodes non-interlaced 8-bit gray, RGB, palette and alpha images.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, PngError> {
    let chunks = chunks(bytes)?;
    let header = header_of(&chunks)?;
    let channels = match (header.color_type, header.bit_depth, header.interlace) {
        (0, 8, 0) | (3, 8, 0) => 1,
        (4, 8, 0) => 2,
        (2, 8, 0) => 3,
        (6, 8, 0) => 4,
        _ => {
            return Err(PngError::Unsupported {
                color_type: header.color_type,
                bit_depth: header.bit_depth,
                interlace: header.interlace,
            })
        }
    };

    let compressed: Vec<u8> = chunks
        .iter()
        .filter(|chunk| &chunk.kind == b"IDAT")
        .flat_map(|chunk| chunk.data.iter().copied())
        .collect();
    if compressed.is_empty() {
        return Err(PngError::Malformed("no image data"));
    }
    let mut raw = Vec::new();
    ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut raw)?;

    let width = header.width as usize;
    let height = header.height as usize;
    let stride = width
        .checked_mul(channels)
        .ok_or(PngError::Malformed("image too large"))?;
    let expected = stride
        .checked_add(1)
        .and_then(|line| line.checked_mul(height))
        .ok_or(PngError::Malformed("image too large"))?;
    if raw.len() < expected {
        return Err(PngError::Malformed("image data shorter than declared size"));
    }

    let samples = unfilter(&raw, stride, height, channels)?;
    let (color, pixels, alpha) = match header.color_type {
        0 => (ColorSpace::Gray, samples, None),
        2 => (ColorSpace::Rgb, samples, None),
        3 => {
            let palette = chunks
                .iter()
                .find(|chunk| &chunk.kind == b"PLTE")
                .map(|chunk| chunk.data)
                .ok_or(PngError::Malformed("palette image without PLTE chunk"))?;
            let mut pixels = Vec::with_capacity(samples.len() * 3);
            for index in samples {
                let start = usize::from(index) * 3;
                let entry = palette
                    .get(start..start + 3)
                    .ok_or(PngError::Malformed("palette index out of range"))?;
                pixels.extend_from_slice(entry);
            }
            (ColorSpace::Rgb, pixels, None)
        }
        4 => {
            let (gray, alpha) = split_alpha(&samples, 2);
            (ColorSpace::Gray, gray, Some(alpha))
        }
        _ => {
            let (rgb, alpha) = split_alpha(&samples, 4);
            (ColorSpace::Rgb, rgb, Some(alpha))
        }
    };

    Ok(DecodedImage {
        width: header.width,
        height: header.height,
        color,
        pixels,
        alpha: alpha.filter(|alpha| alpha.iter().any(|value| *value != u8::MAX)),
    })
}

fn chunks(bytes: &[u8]) -> Result<Vec<Chunk<'_>>, PngError> {
    let mut rest = bytes
        .strip_prefix(&SIGNATURE)
        .ok_or(PngError::Malformed("missing signature"))?;
    let mut chunks = Vec::new();
    while rest.len() >= 12 {
        let length = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let kind = [rest[4], rest[5], rest[6], rest[7]];
        let end = length
            .checked_add(8)
            .filter(|end| end + 4 <= rest.len())
            .ok_or(PngError::Malformed("chunk runs past end of file"))?;
        chunks.push(Chunk {
            kind,
            data: &rest[8..end],
        });
        rest = &rest[end + 4..];
        if &kind == b"IEND" {
            break;
        }
    }
    Ok(chunks)
}

fn header_of(chunks: &[Chunk<'_>]) -> Result<PngHeader, PngError> {
    let data = chunks
        .first()
        .filter(|chunk| &chunk.kind == b"IHDR" && chunk.data.len() == 13)
        .map(|chunk| chunk.data)
        .ok_or(PngError::Malformed("missing IHDR chunk"))?;
    let width = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let height = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
    if width == 0 || height == 0 {
        return Err(PngError::Malformed("zero-sized image"));
    }
    Ok(PngHeader {
        width,
        height,
        bit_depth: data[8],
        color_type: data[9],
        interlace: data[12],
    })
}

/// Reverses the per-scanline filters; `bpp` is bytes per pixel.
fn unfilter(raw: &[u8], stride: usize, height: usize, bpp: usize) -> Result<Vec<u8>, PngError> {
    let mut out = vec![0_u8; stride * height];
    for row in 0..height {
        let line = &raw[row * (stride + 1)..(row + 1) * (stride + 1)];
        let (filter, line) = (line[0], &line[1..]);
        let (done, rest) = out.split_at_mut(row * stride);
        let current = &mut rest[..stride];
        let previous = (row > 0).then(|| &done[(row - 1) * stride..]);

        for i in 0..stride {
            let left = if i >= bpp { current[i - bpp] } else { 0 };
            let up = previous.map_or(0, |previous| previous[i]);
            let upper_left = if i >= bpp {
                previous.map_or(0, |previous| previous[i - bpp])
            } else {
                0
            };
            let predictor = match filter {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                4 => paeth(left, up, upper_left),
                _ => return Err(PngError::Malformed("unknown scanline filter")),
            };
            current[i] = line[i].wrapping_add(predictor);
        }
    }
    Ok(out)
}

fn paeth(left: u8, up: u8, upper_left: u8) -> u8 {
    let estimate = i16::from(left) + i16::from(up) - i16::from(upper_left);
    let to_left = (estimate - i16::from(left)).abs();
    let to_up = (estimate - i16::from(up)).abs();
    let to_upper_left = (estimate - i16::from(upper_left)).abs();
    if to_left <= to_up && to_left <= to_upper_left {
        left
    } else if to_up <= to_upper_left {
        up
    } else {
        upper_left
    }
}

fn split_alpha(samples: &[u8], channels: usize) -> (Vec<u8>, Vec<u8>) {
    let pixels = samples.len() / channels;
    let mut color = Vec::with_capacity(pixels * (channels - 1));
    let mut alpha = Vec::with_capacity(pixels);
    for pixel in samples.chunks_exact(channels) {
        color.extend_from_slice(&pixel[..channels - 1]);
        alpha.push(pixel[channels - 1]);
    }
    (color, alpha)
}
