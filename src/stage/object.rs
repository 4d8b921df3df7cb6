use crate::{
    assets::decode::Bitmap,
    catalog::model::AssetKind,
    foundation::core::{Point, Rgba8},
};

/// Stable per-stage object identifier.
///
/// Ids are handed out from a monotonically increasing counter, so they double
/// as the insertion-order record consulted by undo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSlant {
    #[default]
    Normal,
    Italic,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Styling for a text block.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextStyle {
    #[serde(default = "TextStyle::default_family")]
    pub font_family: String,
    #[serde(default = "TextStyle::default_size_px")]
    pub size_px: f32,
    #[serde(default = "TextStyle::default_fill")]
    pub fill: Rgba8,
    #[serde(default)]
    pub weight: FontWeight,
    #[serde(default)]
    pub slant: FontSlant,
    #[serde(default)]
    pub align: TextAlign,
    /// Optional max line width in pixels; enables wrapping and alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width_px: Option<f32>,
}

impl TextStyle {
    fn default_family() -> String {
        "Arial".to_string()
    }

    fn default_size_px() -> f32 {
        32.0
    }

    fn default_fill() -> Rgba8 {
        Rgba8::BLACK
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: Self::default_family(),
            size_px: Self::default_size_px(),
            fill: Self::default_fill(),
            weight: FontWeight::Normal,
            slant: FontSlant::Normal,
            align: TextAlign::Left,
            max_width_px: None,
        }
    }
}

/// Tagged content variant carried by each [`Drawable`].
#[derive(Clone, Debug)]
pub enum DrawableContent {
    /// Fixed background fill. Exactly one exists, always at rank 0.
    Background { fill: Rgba8 },
    /// Base meme image, constrained to sit directly above the background.
    Template { bitmap: Bitmap },
    /// User-uploaded overlay image.
    UserImage { bitmap: Bitmap },
    /// Decorative branding asset (logo, profile picture).
    Asset {
        bitmap: Bitmap,
        kind: Option<AssetKind>,
    },
    /// Editable text block.
    Text {
        content: String,
        style: TextStyle,
        /// While `true`, delete/backspace edits content rather than
        /// destroying the object.
        editing: bool,
    },
}

/// Back-to-front layering class. The stack invariant keeps classes ordered
/// `Background < Template < Overlay` at all times.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayerClass {
    Background,
    Template,
    Overlay,
}

/// A visual object placed on the stage.
#[derive(Clone, Debug)]
pub struct Drawable {
    pub id: ObjectId,
    /// Top-left position in stage coordinates.
    pub position: Point,
    /// Uniform scale applied to the natural dimensions.
    pub scale: f64,
    pub content: DrawableContent,
}

impl Drawable {
    pub fn is_background(&self) -> bool {
        matches!(self.content, DrawableContent::Background { .. })
    }

    pub fn is_template(&self) -> bool {
        matches!(self.content, DrawableContent::Template { .. })
    }

    pub fn layer_class(&self) -> LayerClass {
        match self.content {
            DrawableContent::Background { .. } => LayerClass::Background,
            DrawableContent::Template { .. } => LayerClass::Template,
            _ => LayerClass::Overlay,
        }
    }

    /// Natural (unscaled) dimensions. Text blocks report zero; their extent is
    /// only known once laid out.
    pub fn natural_size(&self) -> (f64, f64) {
        match &self.content {
            DrawableContent::Background { .. } => (0.0, 0.0),
            DrawableContent::Template { bitmap }
            | DrawableContent::UserImage { bitmap }
            | DrawableContent::Asset { bitmap, .. } => {
                (f64::from(bitmap.width), f64::from(bitmap.height))
            }
            DrawableContent::Text { .. } => (0.0, 0.0),
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self.content {
            DrawableContent::Background { .. } => "background",
            DrawableContent::Template { .. } => "template",
            DrawableContent::UserImage { .. } => "image",
            DrawableContent::Asset { .. } => "asset",
            DrawableContent::Text { .. } => "text",
        }
    }
}

/// Partial update applied by `Stage::modify_object`.
///
/// Text and style fields are ignored for non-text drawables, mirroring how the
/// editor UI only offers restyle controls for the active text block.
#[derive(Clone, Debug, Default)]
pub struct ObjectPatch {
    pub position: Option<Point>,
    pub scale: Option<f64>,
    pub text: Option<String>,
    pub style: Option<TextStylePatch>,
}

/// Partial restyle of a text block; `None` fields are left unchanged.
#[derive(Clone, Debug, Default)]
pub struct TextStylePatch {
    pub font_family: Option<String>,
    pub size_px: Option<f32>,
    pub fill: Option<Rgba8>,
    pub weight: Option<FontWeight>,
    pub slant: Option<FontSlant>,
    pub align: Option<TextAlign>,
    pub max_width_px: Option<f32>,
}

impl TextStylePatch {
    pub fn apply_to(&self, style: &mut TextStyle) {
        if let Some(family) = &self.font_family {
            style.font_family = family.clone();
        }
        if let Some(size) = self.size_px {
            style.size_px = size;
        }
        if let Some(fill) = self.fill {
            style.fill = fill;
        }
        if let Some(weight) = self.weight {
            style.weight = weight;
        }
        if let Some(slant) = self.slant {
            style.slant = slant;
        }
        if let Some(align) = self.align {
            style.align = align;
        }
        if let Some(w) = self.max_width_px {
            style.max_width_px = Some(w);
        }
    }
}
