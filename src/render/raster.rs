use std::sync::Arc;

use crate::{
    assets::decode::Bitmap,
    assets::text::FontLibrary,
    foundation::core::{Affine, Rgba8},
    foundation::error::{StageError, StageResult},
    stage::editor::Stage,
    stage::object::{Drawable, DrawableContent},
};

/// A flattened raster frame in row-major premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

/// Flatten the stage into a single raster image honoring current z-order.
///
/// Pure with respect to the stage: objects are drawn back-to-front, front-most
/// last. `fonts` is a scratch shaping context for text blocks; laying out text
/// with no registered fonts is an error rather than a silently blank caption.
#[tracing::instrument(skip(stage, fonts))]
pub fn render_stage(stage: &Stage, fonts: &mut FontLibrary) -> StageResult<Frame> {
    let size = stage.size();
    let width: u16 = size
        .width
        .try_into()
        .map_err(|_| StageError::validation("stage width exceeds u16"))?;
    let height: u16 = size
        .height
        .try_into()
        .map_err(|_| StageError::validation("stage height exceeds u16"))?;

    let mut ctx = vello_cpu::RenderContext::new(width, height);
    for drawable in stage.objects() {
        draw(&mut ctx, drawable, size.width, size.height, fonts)?;
    }
    ctx.flush();

    let mut pixmap = vello_cpu::Pixmap::new(width, height);
    ctx.render_to_pixmap(&mut pixmap);

    Ok(Frame {
        width: size.width,
        height: size.height,
        data: pixmap.data_as_u8_slice().to_vec(),
        premultiplied: true,
    })
}

fn draw(
    ctx: &mut vello_cpu::RenderContext,
    drawable: &Drawable,
    stage_w: u32,
    stage_h: u32,
    fonts: &mut FontLibrary,
) -> StageResult<()> {
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

    match &drawable.content {
        DrawableContent::Background { fill } => {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(color_to_cpu(*fill));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(stage_w),
                f64::from(stage_h),
            ));
        }
        DrawableContent::Template { bitmap }
        | DrawableContent::UserImage { bitmap }
        | DrawableContent::Asset { bitmap, .. } => {
            let paint = bitmap_paint(bitmap)?;
            let transform = Affine::translate(drawable.position.to_vec2())
                * Affine::scale(drawable.scale);
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_paint(paint);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(bitmap.width),
                f64::from(bitmap.height),
            ));
        }
        DrawableContent::Text { content, style, .. } => {
            let shaped = fonts.layout_block(content, style)?;
            let font = vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(shaped.font_bytes.as_ref().clone()),
                0,
            );

            let transform = Affine::translate(drawable.position.to_vec2())
                * Affine::scale(drawable.scale);
            ctx.set_transform(affine_to_cpu(transform));

            for line in shaped.layout.lines() {
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };

                    let brush = run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        brush.r, brush.g, brush.b, brush.a,
                    ));

                    let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
        }
    }

    Ok(())
}

fn color_to_cpu(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bitmap_paint(bitmap: &Bitmap) -> StageResult<vello_cpu::Image> {
    let w: u16 = bitmap
        .width
        .try_into()
        .map_err(|_| StageError::validation("bitmap width exceeds u16"))?;
    let h: u16 = bitmap
        .height
        .try_into()
        .map_err(|_| StageError::validation("bitmap height exceeds u16"))?;
    let expected = bitmap.width as usize * bitmap.height as usize * 4;
    if bitmap.rgba8_premul.len() != expected {
        return Err(StageError::validation("bitmap byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(bitmap.width as usize * bitmap.height as usize);
    for px in bitmap.rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
