use esync_domain::CorruptReason;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, Limits};
use tracing::{debug, warn};

/// Reject decoded images above this pixel count outright, independent of
/// the provider's own (usually much smaller) `max_pixels` budget. This is
/// the spec's hard ceiling, not a library default.
const HARD_PIXEL_CEILING: u64 = 100_000_000;

const MIN_SCALE: f64 = 0.3;
const INITIAL_JPEG_QUALITY: u8 = 90;
const MIN_JPEG_QUALITY: u8 = 60;
const QUALITY_STEP: u8 = 10;

#[derive(Debug, Clone, Copy)]
pub struct NormalizeConfig {
    pub max_pixels: u64,
    pub max_file_size_mb: u64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_pixels: 2_300_000,
            max_file_size_mb: 5,
        }
    }
}

/// Decode limits wide enough that a 100-million-pixel image is rejected by
/// our own budget check (step 2) rather than preempted by the decoder's
/// built-in bomb guard.
fn decode_limits() -> Limits {
    let mut limits = Limits::no_limits();
    limits.max_image_width = Some(25_000);
    limits.max_image_height = Some(25_000);
    limits.max_alloc = Some(600_000_000);
    limits
}

/// Normalize one image per the pipeline policy: decode, reject pathological
/// inputs, resize/re-encode if over budget, otherwise pass through
/// unchanged. Returns the bytes to hand the Embedding Provider, or the typed
/// reason the file is being marked corrupt.
pub fn normalize(bytes: &[u8], filename: &str, config: NormalizeConfig) -> Result<Vec<u8>, CorruptReason> {
    let format = match image::guess_format(bytes) {
        Ok(f) => f,
        Err(_) => {
            debug!(filename, "could not identify image format");
            return Err(CorruptReason::CannotIdentify);
        }
    };

    let mut reader = image::io::Reader::new(std::io::Cursor::new(bytes));
    reader.set_format(format);
    reader.limits(decode_limits());

    let img = match reader.decode() {
        Ok(img) => img,
        Err(image::ImageError::Limits(_)) => {
            warn!(filename, "decoded image exceeded decode limits");
            return Err(CorruptReason::DecompressionBomb);
        }
        Err(e) => {
            debug!(filename, error = %e, "image open error");
            return Err(CorruptReason::OpenError);
        }
    };

    let (width, height) = img.dimensions();
    let pixels = width as u64 * height as u64;

    if pixels > HARD_PIXEL_CEILING {
        warn!(filename, pixels, "image rejected: too large");
        return Err(CorruptReason::TooLarge);
    }

    if pixels <= config.max_pixels {
        return Ok(bytes.to_vec());
    }

    let rgb = to_opaque_rgb(img);
    let scale = (config.max_pixels as f64 / pixels as f64).sqrt().max(MIN_SCALE);
    let new_width = ((width as f64) * scale).round().max(1.0) as u32;
    let new_height = ((height as f64) * scale).round().max(1.0) as u32;

    let resized = image::imageops::resize(&rgb, new_width, new_height, FilterType::Lanczos3);

    encode_under_budget(&DynamicImage::ImageRgb8(resized), config.max_file_size_mb)
        .map_err(|_| CorruptReason::ResizeFailure)
}

fn to_opaque_rgb(img: DynamicImage) -> image::RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    // Composite onto white per the normalization policy.
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut out = image::RgbImage::new(w, h);
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let alpha = a as f32 / 255.0;
        let blend = |channel: u8| -> u8 {
            ((channel as f32) * alpha + 255.0 * (1.0 - alpha)).round() as u8
        };
        out.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

fn encode_under_budget(img: &DynamicImage, max_file_size_mb: u64) -> Result<Vec<u8>, ()> {
    let max_bytes = max_file_size_mb * 1024 * 1024;
    let mut quality = INITIAL_JPEG_QUALITY;

    loop {
        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        let rgb = img.to_rgb8();
        encoder
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
            .map_err(|_| ())?;

        if (buf.len() as u64) <= max_bytes || quality <= MIN_JPEG_QUALITY {
            return Ok(buf);
        }
        quality = quality.saturating_sub(QUALITY_STEP).max(MIN_JPEG_QUALITY);
    }
}

// silence unused import warning when ImageFormat is not referenced directly
#[allow(unused_imports)]
use ImageFormat as _Unused;
