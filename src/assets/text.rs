use std::{borrow::Cow, collections::HashMap, sync::Arc};

use crate::{
    foundation::error::{StageError, StageResult},
    stage::object::{FontSlant, FontWeight, TextAlign, TextStyle},
};

/// RGBA8 brush color used by Parley text layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// A laid-out text block plus the backing font bytes needed to rasterize it.
#[derive(Clone)]
pub struct ShapedText {
    pub layout: Arc<parley::Layout<TextBrushRgba8>>,
    pub font_bytes: Arc<Vec<u8>>,
}

impl std::fmt::Debug for ShapedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapedText")
            .field("layout_ptr", &Arc::as_ptr(&self.layout))
            .field("font_bytes_len", &self.font_bytes.len())
            .finish()
    }
}

#[derive(Clone)]
struct RegisteredFamily {
    family: String,
    bytes: Arc<Vec<u8>>,
}

/// Registry of loaded font files and stateful Parley contexts.
///
/// Families are registered from raw font bytes; text blocks reference them by
/// family name. An unknown family falls back to the first registered font so a
/// meme never silently loses its captions.
pub struct FontLibrary {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    by_name: HashMap<String, usize>,
    families: Vec<RegisteredFamily>,
}

impl Default for FontLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl FontLibrary {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            by_name: HashMap::new(),
            families: Vec::new(),
        }
    }

    /// Register a font file; returns the primary family name detected from the
    /// font data.
    pub fn register_font(&mut self, bytes: Vec<u8>) -> StageResult<String> {
        let bytes = Arc::new(bytes);
        let registered = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.as_ref().clone()), None);
        let family_id = registered
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| StageError::validation("no font families registered from font bytes"))?;

        let family = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| StageError::validation("registered font family has no name"))?
            .to_string();

        let idx = self.families.len();
        self.families.push(RegisteredFamily {
            family: family.clone(),
            bytes,
        });
        self.by_name.insert(family.to_ascii_lowercase(), idx);
        Ok(family)
    }

    /// Register every `.ttf`/`.otf`/`.ttc` file found in `dir`. Unreadable
    /// files are skipped.
    pub fn register_fonts_from_dir(&mut self, dir: &std::path::Path) -> StageResult<usize> {
        let Ok(rd) = std::fs::read_dir(dir) else {
            return Ok(0);
        };

        let mut count = 0;
        for entry in rd.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
                continue;
            };
            let ext = ext.to_ascii_lowercase();
            if ext != "ttf" && ext != "otf" && ext != "ttc" {
                continue;
            }
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            if self.register_font(bytes).is_ok() {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Resolve a family name to its registered form, if known.
    pub fn resolve_family(&self, family: &str) -> Option<&str> {
        self.by_name
            .get(&family.to_ascii_lowercase())
            .map(|&idx| self.families[idx].family.as_str())
    }

    /// Shape and lay out a text block according to `style`.
    pub fn layout_block(&mut self, text: &str, style: &TextStyle) -> StageResult<ShapedText> {
        if !style.size_px.is_finite() || style.size_px <= 0.0 {
            return Err(StageError::validation("text size_px must be finite and > 0"));
        }
        if self.families.is_empty() {
            return Err(StageError::validation(
                "no fonts registered; register_font must be called before laying out text",
            ));
        }

        let idx = self
            .by_name
            .get(&style.font_family.to_ascii_lowercase())
            .copied()
            .unwrap_or(0);
        let family = self.families[idx].family.clone();
        let font_bytes = self.families[idx].bytes.clone();

        let brush = TextBrushRgba8 {
            r: style.fill.r,
            g: style.fill.g,
            b: style.fill.b,
            a: style.fill.a,
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(style.size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley_weight(style.weight),
        ));
        builder.push_default(parley::style::StyleProperty::FontStyle(parley_slant(
            style.slant,
        )));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        if let Some(w) = style.max_width_px {
            layout.break_all_lines(Some(w));
            layout.align(
                Some(w),
                parley_alignment(style.align),
                parley::AlignmentOptions::default(),
            );
        } else {
            layout.break_all_lines(None);
        }

        Ok(ShapedText {
            layout: Arc::new(layout),
            font_bytes,
        })
    }
}

fn parley_weight(weight: FontWeight) -> parley::style::FontWeight {
    match weight {
        FontWeight::Normal => parley::style::FontWeight::NORMAL,
        FontWeight::Bold => parley::style::FontWeight::BOLD,
    }
}

fn parley_slant(slant: FontSlant) -> parley::style::FontStyle {
    match slant {
        FontSlant::Normal => parley::style::FontStyle::Normal,
        FontSlant::Italic => parley::style::FontStyle::Italic,
    }
}

fn parley_alignment(align: TextAlign) -> parley::Alignment {
    match align {
        TextAlign::Left => parley::Alignment::Start,
        TextAlign::Center => parley::Alignment::Center,
        TextAlign::Right => parley::Alignment::End,
    }
}
