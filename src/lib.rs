//! Memestage is a layered meme-canvas compositor.
//!
//! A [`Stage`] owns an ordered back-to-front stack of visual objects (a fixed
//! background fill, template images, user text, uploaded images, and branding
//! assets) and re-enforces a layering policy after every mutation: the
//! background stays at rank 0, templates sit directly above it, and user
//! content always renders on top.
//!
//! # Pipeline overview
//!
//! 1. **Fetch**: an [`ImageFetcher`] supplies encoded bytes for a source URL
//! 2. **Decode**: bytes become a premultiplied-RGBA8 [`Bitmap`]
//! 3. **Compose**: `Stage` operations place, move, restyle, and remove objects
//! 4. **Render**: [`render_stage`] flattens the stack on the CPU
//! 5. **Export**: [`export_raster`] encodes PNG/JPEG bytes plus metadata
//!
//! Key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **No IO after fetch**: image bytes are loaded and decoded before any
//!   stack mutation, so a failed load can never leave a partial insert.
//! - **Direct ranks**: the layering invariant is restored by recomputing the
//!   order, not by replaying relative z-order primitives.
//! - **Premultiplied RGBA8** end-to-end; straight alpha only at encode time.
#![forbid(unsafe_code)]

mod assets;
mod catalog;
mod export;
mod foundation;
mod render;
mod stage;

pub use assets::decode::{Bitmap, decode_image, fetch_bitmap};
pub use assets::fetch::{FsFetcher, ImageFetcher, MemoryFetcher, normalize_rel_path};
pub use assets::text::{FontLibrary, ShapedText, TextBrushRgba8};
pub use catalog::model::{AssetKind, AssetRecord, TemplateRecord};
pub use catalog::source::{Catalog, CatalogSource, JsonDirSource};
pub use export::{ExportFormat, ExportOptions, ExportedMeme, export_raster};
pub use foundation::core::{Affine, Point, Rect, Rgba8, StageSize, Vec2};
pub use foundation::error::{StageError, StageResult};
pub use render::raster::{Frame, render_stage};
pub use stage::editor::{
    InitialTemplate, Stage, StageOptions, default_asset_scale, fit_scale,
};
pub use stage::object::{
    Drawable, DrawableContent, FontSlant, FontWeight, LayerClass, ObjectId, ObjectPatch,
    TextAlign, TextStyle, TextStylePatch,
};
