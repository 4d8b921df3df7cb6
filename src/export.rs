use std::{
    io::Cursor,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use tracing::debug;

use crate::{
    assets::text::FontLibrary,
    foundation::error::{StageError, StageResult},
    render::raster::render_stage,
    stage::editor::Stage,
};

/// Raster encodings offered to the export consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn file_extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Options for [`export_raster`].
#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// JPEG quality in `1..=100`; ignored for PNG.
    pub quality: u8,
    /// Creator name stamped into the metadata; blank means "Anonymous".
    pub creator: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            quality: 90,
            creator: None,
        }
    }
}

/// Encoded raster plus metadata handed to the export consumer. The compositor
/// itself persists nothing.
#[derive(Clone, Debug)]
pub struct ExportedMeme {
    pub bytes: Vec<u8>,
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
    pub creator: String,
    pub title: String,
    pub created_at_unix_secs: u64,
}

/// Flatten the stage and encode it. Read-only: the stage is left untouched.
pub fn export_raster(
    stage: &Stage,
    fonts: &mut FontLibrary,
    options: &ExportOptions,
) -> StageResult<ExportedMeme> {
    if options.format == ExportFormat::Jpeg && !(1..=100).contains(&options.quality) {
        return Err(StageError::validation("jpeg quality must be in 1..=100"));
    }

    let frame = render_stage(stage, fonts)?;
    let mut data = frame.data;
    unpremultiply_rgba8_in_place(&mut data);

    let img = image::RgbaImage::from_raw(frame.width, frame.height, data)
        .ok_or_else(|| StageError::validation("frame byte length mismatch"))?;

    let bytes = match options.format {
        ExportFormat::Png => {
            let mut buf = Vec::new();
            image::DynamicImage::ImageRgba8(img)
                .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .context("encode png")?;
            buf
        }
        ExportFormat::Jpeg => {
            // JPEG has no alpha channel; flatten to RGB first.
            let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();
            let mut buf = Vec::new();
            let mut cursor = Cursor::new(&mut buf);
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, options.quality);
            encoder.encode_image(&rgb).context("encode jpeg")?;
            buf
        }
    };

    let creator = options
        .creator
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Anonymous")
        .to_string();
    let title = format!("Meme by {creator}");
    let created_at_unix_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    debug!(
        format = ?options.format,
        bytes = bytes.len(),
        creator = %creator,
        "stage exported"
    );

    Ok(ExportedMeme {
        bytes,
        format: options.format,
        width: frame.width,
        height: frame.height,
        creator,
        title,
        created_at_unix_secs,
    })
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        for c in 0..3 {
            let v = (u16::from(px[c]) * 255 + a / 2) / a;
            px[c] = v.min(255) as u8;
        }
    }
}
