use std::sync::Arc;

use crate::{
    assets::fetch::ImageFetcher,
    foundation::error::{StageError, StageResult},
};

/// Decoded raster image in premultiplied RGBA8 form.
///
/// Bitmaps are cheap to clone; pixel data is shared behind an [`Arc`].
#[derive(Clone, Debug)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> StageResult<Bitmap> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| StageError::image_load(format!("decode image: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(Bitmap {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Fetch then decode; any failure is an [`StageError::ImageLoad`] and leaves
/// the caller's state untouched.
pub fn fetch_bitmap(fetcher: &dyn ImageFetcher, source: &str) -> StageResult<Bitmap> {
    let bytes = fetcher.fetch(source).map_err(|e| match e {
        StageError::ImageLoad(_) => e,
        other => StageError::image_load(format!("fetch '{source}': {other}")),
    })?;
    decode_image(&bytes)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
