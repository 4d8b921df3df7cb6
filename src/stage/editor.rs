use tracing::{debug, warn};

use crate::{
    assets::decode::{Bitmap, fetch_bitmap},
    assets::fetch::ImageFetcher,
    catalog::model::AssetKind,
    foundation::core::{Point, Rgba8, StageSize},
    foundation::error::{StageError, StageResult},
    stage::object::{Drawable, DrawableContent, LayerClass, ObjectId, ObjectPatch, TextStyle},
};

/// Fraction of the stage a template may occupy when first placed.
const TEMPLATE_FIT_FRACTION: f64 = 0.8;
/// Default uniform scale for user-uploaded images.
const USER_IMAGE_SCALE: f64 = 0.5;
/// Default placement for user uploads, near the top-left.
const USER_IMAGE_POSITION: Point = Point::new(50.0, 50.0);
/// Default placement for new text blocks.
const TEXT_POSITION: Point = Point::new(100.0, 100.0);
/// Inset from the top-right corner for decorative assets.
const ASSET_INSET: f64 = 20.0;

/// Optional construction-time behavior for [`Stage::with_options`].
#[derive(Clone, Debug, Default)]
pub struct StageOptions {
    /// Template to place immediately after construction, as handed over by a
    /// navigation/query-parameter collaborator. Load failure is logged and the
    /// stage starts empty, same as an abandoned explicit add.
    pub initial_template: Option<InitialTemplate>,
}

/// A `(name, url)` pair identifying a template to preload.
#[derive(Clone, Debug)]
pub struct InitialTemplate {
    pub name: String,
    pub url: String,
}

/// The layered canvas compositor.
///
/// Owns an ordered back-to-front stack of [`Drawable`]s and re-enforces the
/// layering invariant after every mutation: the background fill at rank 0,
/// template images contiguously above it, all user content on top. Rather than
/// replaying relative reorder primitives, ranks are recomputed directly with a
/// stable partition; the mechanism is idempotent and order-independent.
///
/// A stage owns exactly one background, created by the constructor; double
/// initialization is unrepresentable.
#[derive(Clone, Debug)]
pub struct Stage {
    size: StageSize,
    objects: Vec<Drawable>,
    selection: Option<ObjectId>,
    next_id: u64,
}

impl Stage {
    /// Create a stage with the background fill installed at rank 0.
    pub fn new(width: u32, height: u32, background: Rgba8) -> StageResult<Self> {
        let size = StageSize::new(width, height)?;
        Ok(Self {
            size,
            objects: vec![Drawable {
                id: ObjectId(0),
                position: Point::ZERO,
                scale: 1.0,
                content: DrawableContent::Background { fill: background },
            }],
            selection: None,
            next_id: 1,
        })
    }

    /// Create a stage and honor construction-time options.
    pub fn with_options(
        width: u32,
        height: u32,
        background: Rgba8,
        options: StageOptions,
        fetcher: &dyn ImageFetcher,
    ) -> StageResult<Self> {
        let mut stage = Self::new(width, height, background)?;
        if let Some(initial) = options.initial_template
            && let Err(e) = stage.add_template(fetcher, &initial.url)
        {
            warn!(
                name = %initial.name,
                url = %initial.url,
                error = %e,
                "initial template load abandoned"
            );
        }
        Ok(stage)
    }

    pub fn size(&self) -> StageSize {
        self.size
    }

    /// The stack in back-to-front rank order.
    pub fn objects(&self) -> &[Drawable] {
        &self.objects
    }

    /// Objects above the background, as shown in a layers panel.
    pub fn overlay_objects(&self) -> impl Iterator<Item = &Drawable> {
        self.objects.iter().filter(|d| !d.is_background())
    }

    pub fn get(&self, id: ObjectId) -> Option<&Drawable> {
        self.objects.iter().find(|d| d.id == id)
    }

    /// Current rank (back-to-front index) of an object.
    pub fn rank_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|d| d.id == id)
    }

    /// Place a template image: fitted within [`TEMPLATE_FIT_FRACTION`] of the
    /// stage without upscaling, centered, ranked directly above the background.
    ///
    /// A fetch or decode failure abandons the add and leaves the stack
    /// untouched.
    pub fn add_template(
        &mut self,
        fetcher: &dyn ImageFetcher,
        source: &str,
    ) -> StageResult<ObjectId> {
        let bitmap = self.load_or_abandon(fetcher, source, "template")?;

        let max_w = f64::from(self.size.width) * TEMPLATE_FIT_FRACTION;
        let max_h = f64::from(self.size.height) * TEMPLATE_FIT_FRACTION;
        let scale = fit_scale(bitmap.width, bitmap.height, max_w, max_h);
        let position = Point::new(
            (f64::from(self.size.width) - f64::from(bitmap.width) * scale) / 2.0,
            (f64::from(self.size.height) - f64::from(bitmap.height) * scale) / 2.0,
        );

        Ok(self.insert(position, scale, DrawableContent::Template { bitmap }))
    }

    /// Insert a text block at the default position, front of the stack.
    pub fn add_text(&mut self, content: impl Into<String>, style: TextStyle) -> ObjectId {
        self.insert(
            TEXT_POSITION,
            1.0,
            DrawableContent::Text {
                content: content.into(),
                style,
                editing: false,
            },
        )
    }

    /// Place a user-uploaded image near the top-left, front of the stack.
    pub fn add_user_image(
        &mut self,
        fetcher: &dyn ImageFetcher,
        source: &str,
    ) -> StageResult<ObjectId> {
        let bitmap = self.load_or_abandon(fetcher, source, "user image")?;
        Ok(self.insert(
            USER_IMAGE_POSITION,
            USER_IMAGE_SCALE,
            DrawableContent::UserImage { bitmap },
        ))
    }

    /// Place a decorative asset in the top-right corner, front of the stack.
    pub fn add_asset(
        &mut self,
        fetcher: &dyn ImageFetcher,
        source: &str,
        kind: Option<AssetKind>,
    ) -> StageResult<ObjectId> {
        let bitmap = self.load_or_abandon(fetcher, source, "asset")?;

        let scale = default_asset_scale(kind);
        let position = Point::new(
            f64::from(self.size.width) - f64::from(bitmap.width) * scale - ASSET_INSET,
            ASSET_INSET,
        );
        Ok(self.insert(position, scale, DrawableContent::Asset { bitmap, kind }))
    }

    /// Move an object, then re-enforce the layering invariant. Templates are
    /// re-ranked back above the background; they never drift above user
    /// content, even transiently.
    pub fn move_object(&mut self, id: ObjectId, position: Point) -> StageResult<()> {
        let obj = self.get_mut_guarded(id, "moved")?;
        obj.position = position;
        self.restack(id);
        Ok(())
    }

    /// Apply a patch (resize, restyle, recolor), then re-enforce the layering
    /// invariant exactly as [`Stage::move_object`] does.
    pub fn modify_object(&mut self, id: ObjectId, patch: &ObjectPatch) -> StageResult<()> {
        let obj = self.get_mut_guarded(id, "modified")?;
        if let Some(position) = patch.position {
            obj.position = position;
        }
        if let Some(scale) = patch.scale {
            obj.scale = scale;
        }
        if let DrawableContent::Text { content, style, .. } = &mut obj.content {
            if let Some(text) = &patch.text {
                *content = text.clone();
            }
            if let Some(style_patch) = &patch.style {
                style_patch.apply_to(style);
            }
        }
        self.restack(id);
        Ok(())
    }

    /// Delete an object. The background cannot be removed.
    pub fn remove_object(&mut self, id: ObjectId) -> StageResult<()> {
        let idx = self
            .rank_of(id)
            .ok_or_else(|| StageError::validation(format!("unknown object id {}", id.0)))?;
        if self.objects[idx].is_background() {
            return Err(StageError::invariant("the background cannot be removed"));
        }
        let removed = self.objects.remove(idx);
        if self.selection == Some(id) {
            self.selection = None;
        }
        debug!(id = id.0, kind = removed.kind_label(), "object removed");
        Ok(())
    }

    /// Remove the most-recently-added non-background object. No-op when only
    /// the background remains.
    pub fn undo_last(&mut self) -> Option<ObjectId> {
        let last = self
            .objects
            .iter()
            .filter(|d| !d.is_background())
            .max_by_key(|d| d.id)?
            .id;
        // Cannot fail: the id was just found and is not the background.
        self.remove_object(last).ok()?;
        Some(last)
    }

    /// Make an object the active selection. The background is never
    /// selectable.
    pub fn select_object(&mut self, id: ObjectId) -> StageResult<()> {
        let obj = self
            .get(id)
            .ok_or_else(|| StageError::validation(format!("unknown object id {}", id.0)))?;
        if obj.is_background() {
            return Err(StageError::invariant("the background cannot be selected"));
        }
        self.selection = Some(id);
        Ok(())
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Put a text block into its editing state, where delete/backspace edit
    /// content instead of destroying the object.
    pub fn begin_text_edit(&mut self, id: ObjectId) -> StageResult<()> {
        self.set_text_editing(id, true)
    }

    pub fn end_text_edit(&mut self, id: ObjectId) -> StageResult<()> {
        self.set_text_editing(id, false)
    }

    /// Delete the active selection. Returns `false` (no-op) when nothing is
    /// selected or the selected text block is being edited.
    pub fn delete_active_selection(&mut self) -> bool {
        let Some(id) = self.selection else {
            return false;
        };
        if let Some(Drawable {
            content: DrawableContent::Text { editing: true, .. },
            ..
        }) = self.get(id)
        {
            return false;
        }
        self.remove_object(id).is_ok()
    }

    fn set_text_editing(&mut self, id: ObjectId, editing: bool) -> StageResult<()> {
        let obj = self
            .objects
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StageError::validation(format!("unknown object id {}", id.0)))?;
        match &mut obj.content {
            DrawableContent::Text { editing: e, .. } => {
                *e = editing;
                Ok(())
            }
            _ => Err(StageError::validation(format!(
                "object {} is not a text block",
                id.0
            ))),
        }
    }

    fn load_or_abandon(
        &self,
        fetcher: &dyn ImageFetcher,
        source: &str,
        what: &str,
    ) -> StageResult<Bitmap> {
        fetch_bitmap(fetcher, source).inspect_err(|e| {
            warn!(source, error = %e, "{what} load abandoned, stack unchanged");
        })
    }

    fn insert(&mut self, position: Point, scale: f64, content: DrawableContent) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push(Drawable {
            id,
            position,
            scale,
            content,
        });
        self.restack(id);
        self.selection = Some(id);
        let obj = self.objects.iter().find(|d| d.id == id);
        debug!(
            id = id.0,
            kind = obj.map(|d| d.kind_label()).unwrap_or(""),
            rank = self.rank_of(id),
            "object inserted"
        );
        id
    }

    fn get_mut_guarded(&mut self, id: ObjectId, verb: &str) -> StageResult<&mut Drawable> {
        let idx = self
            .rank_of(id)
            .ok_or_else(|| StageError::validation(format!("unknown object id {}", id.0)))?;
        if self.objects[idx].is_background() {
            return Err(StageError::invariant(format!(
                "the background cannot be {verb}"
            )));
        }
        Ok(&mut self.objects[idx])
    }

    /// Re-enforce the layering invariant after a mutation of `affected`.
    ///
    /// Ranks are recomputed directly: a stable partition restores
    /// `[background][templates..][overlays..]`, then the affected object is
    /// placed where a fresh mutation should leave it: a template drops to
    /// rank 1, anything else rises to the front. Applying this after any
    /// single mutation restores the global invariant regardless of the
    /// stack's prior arrangement.
    fn restack(&mut self, affected: ObjectId) {
        self.objects.sort_by_key(Drawable::layer_class);

        let Some(idx) = self.rank_of(affected) else {
            return;
        };
        match self.objects[idx].layer_class() {
            LayerClass::Background => {}
            LayerClass::Template => {
                let obj = self.objects.remove(idx);
                self.objects.insert(1, obj);
            }
            LayerClass::Overlay => {
                let obj = self.objects.remove(idx);
                self.objects.push(obj);
            }
        }
    }
}

/// Uniform scale fitting `img` within `max_w` x `max_h` without upscaling.
pub fn fit_scale(img_w: u32, img_h: u32, max_w: f64, max_h: f64) -> f64 {
    let sx = max_w / f64::from(img_w.max(1));
    let sy = max_h / f64::from(img_h.max(1));
    sx.min(sy).min(1.0)
}

/// Default placement scale for decorative assets by kind.
pub fn default_asset_scale(kind: Option<AssetKind>) -> f64 {
    match kind {
        Some(AssetKind::Logo) => 0.15,
        Some(AssetKind::Pfp) => 0.25,
        None => 0.2,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/editor.rs"]
mod tests;
