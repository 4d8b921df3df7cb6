use std::io::Cursor;

use super::*;
use crate::{
    assets::fetch::MemoryFetcher,
    stage::object::{TextAlign, TextStylePatch},
};

fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn fetcher() -> MemoryFetcher {
    let mut f = MemoryFetcher::new();
    f.insert("wide.png", png(1600, 300, [10, 20, 30, 255]));
    f.insert("small.png", png(100, 50, [40, 50, 60, 255]));
    f.insert("cat.png", png(40, 40, [200, 100, 0, 255]));
    f.insert("logo.png", png(100, 100, [0, 0, 0, 255]));
    f
}

fn stage() -> Stage {
    Stage::new(800, 600, Rgba8::opaque(245, 245, 245)).unwrap()
}

/// Property from the layering rules: background at rank 0, templates
/// contiguous directly above it, nothing interleaved.
fn assert_stack_invariant(stage: &Stage) {
    let objects = stage.objects();
    assert!(objects[0].is_background(), "rank 0 must be the background");
    assert_eq!(
        objects.iter().filter(|d| d.is_background()).count(),
        1,
        "exactly one background"
    );
    let classes: Vec<LayerClass> = objects.iter().map(|d| d.layer_class()).collect();
    let mut sorted = classes.clone();
    sorted.sort();
    assert_eq!(classes, sorted, "layer classes out of order: {classes:?}");
}

#[test]
fn new_stage_has_only_background() {
    let s = stage();
    assert_eq!(s.objects().len(), 1);
    assert!(s.objects()[0].is_background());
    assert_eq!(s.selection(), None);
    assert_stack_invariant(&s);
}

#[test]
fn template_is_fitted_and_centered() {
    let mut s = stage();
    let id = s.add_template(&fetcher(), "wide.png").unwrap();

    // min(640/1600, 480/300, 1) = 0.4
    let t = s.get(id).unwrap();
    assert!((t.scale - 0.4).abs() < 1e-9);
    assert!((t.position.x - 80.0).abs() < 1e-9);
    assert!((t.position.y - 240.0).abs() < 1e-9);
    assert_eq!(s.rank_of(id), Some(1));
    assert_eq!(s.selection(), Some(id));
}

#[test]
fn fit_scale_never_upscales() {
    assert_eq!(fit_scale(100, 50, 640.0, 480.0), 1.0);
    assert!((fit_scale(1600, 300, 640.0, 480.0) - 0.4).abs() < 1e-9);
    assert!((fit_scale(300, 1600, 640.0, 480.0) - 0.3).abs() < 1e-9);
}

#[test]
fn template_added_after_content_sits_below_it() {
    let mut s = stage();
    let f = fetcher();
    let text = s.add_text("top text", TextStyle::default());
    let template = s.add_template(&f, "wide.png").unwrap();

    assert_eq!(s.rank_of(template), Some(1));
    assert_eq!(s.rank_of(text), Some(2));
    assert_stack_invariant(&s);
}

#[test]
fn multiple_templates_stay_contiguous_above_background() {
    let mut s = stage();
    let f = fetcher();
    let t1 = s.add_template(&f, "wide.png").unwrap();
    let text = s.add_text("caption", TextStyle::default());
    let t2 = s.add_template(&f, "small.png").unwrap();

    // The freshly re-ranked template lands at rank 1.
    assert_eq!(s.rank_of(t2), Some(1));
    assert_eq!(s.rank_of(t1), Some(2));
    assert_eq!(s.rank_of(text), Some(3));
    assert_eq!(s.overlay_objects().count(), 3);
    assert_stack_invariant(&s);
}

#[test]
fn moving_a_template_reranks_it_above_background() {
    let mut s = stage();
    let f = fetcher();
    let template = s.add_template(&f, "wide.png").unwrap();
    s.add_text("caption", TextStyle::default());
    s.add_user_image(&f, "cat.png").unwrap();

    s.move_object(template, Point::new(5.0, 5.0)).unwrap();
    assert_eq!(s.rank_of(template), Some(1));
    assert_eq!(s.get(template).unwrap().position, Point::new(5.0, 5.0));
    assert_stack_invariant(&s);
}

#[test]
fn resizing_a_template_also_reranks_it() {
    let mut s = stage();
    let f = fetcher();
    let template = s.add_template(&f, "wide.png").unwrap();
    s.add_text("caption", TextStyle::default());

    let patch = ObjectPatch {
        scale: Some(0.9),
        ..ObjectPatch::default()
    };
    s.modify_object(template, &patch).unwrap();
    assert_eq!(s.rank_of(template), Some(1));
    assert!((s.get(template).unwrap().scale - 0.9).abs() < 1e-9);
    assert_stack_invariant(&s);
}

#[test]
fn modifying_an_overlay_brings_it_to_front() {
    let mut s = stage();
    let f = fetcher();
    let first = s.add_user_image(&f, "cat.png").unwrap();
    let second = s.add_user_image(&f, "small.png").unwrap();
    assert!(s.rank_of(first) < s.rank_of(second));

    s.move_object(first, Point::new(0.0, 0.0)).unwrap();
    assert_eq!(s.rank_of(first), Some(s.objects().len() - 1));
    assert_stack_invariant(&s);
}

#[test]
fn invariant_holds_after_arbitrary_op_sequences() {
    let mut s = stage();
    let f = fetcher();

    let t1 = s.add_template(&f, "wide.png").unwrap();
    assert_stack_invariant(&s);
    let text = s.add_text("one", TextStyle::default());
    assert_stack_invariant(&s);
    let img = s.add_user_image(&f, "cat.png").unwrap();
    assert_stack_invariant(&s);
    s.move_object(t1, Point::new(1.0, 2.0)).unwrap();
    assert_stack_invariant(&s);
    let t2 = s.add_template(&f, "small.png").unwrap();
    assert_stack_invariant(&s);
    s.modify_object(
        text,
        &ObjectPatch {
            text: Some("two".to_string()),
            ..ObjectPatch::default()
        },
    )
    .unwrap();
    assert_stack_invariant(&s);
    let asset = s.add_asset(&f, "logo.png", Some(AssetKind::Logo)).unwrap();
    assert_stack_invariant(&s);
    s.move_object(t2, Point::new(9.0, 9.0)).unwrap();
    assert_stack_invariant(&s);
    s.modify_object(
        img,
        &ObjectPatch {
            scale: Some(0.25),
            ..ObjectPatch::default()
        },
    )
    .unwrap();
    assert_stack_invariant(&s);
    s.remove_object(asset).unwrap();
    assert_stack_invariant(&s);
}

#[test]
fn undo_removes_most_recently_added_first() {
    let mut s = stage();
    let f = fetcher();
    let text = s.add_text("caption", TextStyle::default());
    let template = s.add_template(&f, "wide.png").unwrap();
    let img = s.add_user_image(&f, "cat.png").unwrap();

    // The template ranks at 1 but was added second; undo follows insertion
    // order, not rank order.
    assert_eq!(s.undo_last(), Some(img));
    assert_eq!(s.undo_last(), Some(template));
    assert_eq!(s.undo_last(), Some(text));
    assert_eq!(s.undo_last(), None);
    assert_eq!(s.objects().len(), 1);
    assert!(s.objects()[0].is_background());
}

#[test]
fn background_cannot_be_removed_moved_or_selected() {
    let mut s = stage();
    let background = s.objects()[0].id;

    let err = s.remove_object(background).unwrap_err();
    assert!(matches!(err, StageError::InvariantViolation(_)));
    assert_eq!(s.objects().len(), 1);

    let err = s.move_object(background, Point::new(1.0, 1.0)).unwrap_err();
    assert!(matches!(err, StageError::InvariantViolation(_)));
    assert_eq!(s.objects()[0].position, Point::ZERO);

    let err = s.select_object(background).unwrap_err();
    assert!(matches!(err, StageError::InvariantViolation(_)));
    assert_eq!(s.selection(), None);
}

#[test]
fn unknown_ids_are_validation_errors() {
    let mut s = stage();
    let ghost = ObjectId(999);
    assert!(matches!(
        s.remove_object(ghost).unwrap_err(),
        StageError::Validation(_)
    ));
    assert!(matches!(
        s.select_object(ghost).unwrap_err(),
        StageError::Validation(_)
    ));
    assert!(matches!(
        s.move_object(ghost, Point::ZERO).unwrap_err(),
        StageError::Validation(_)
    ));
}

#[test]
fn failed_image_load_leaves_stack_unchanged() {
    let mut s = stage();
    let f = MemoryFetcher::new();

    let err = s.add_template(&f, "missing.png").unwrap_err();
    assert!(matches!(err, StageError::ImageLoad(_)));
    assert_eq!(s.objects().len(), 1);
    assert_eq!(s.selection(), None);

    assert!(s.add_user_image(&f, "missing.png").is_err());
    assert!(s.add_asset(&f, "missing.png", None).is_err());
    assert_eq!(s.objects().len(), 1);
}

#[test]
fn delete_active_selection_is_suppressed_while_editing_text() {
    let mut s = stage();
    let text = s.add_text("editable", TextStyle::default());
    assert_eq!(s.selection(), Some(text));

    s.begin_text_edit(text).unwrap();
    assert!(!s.delete_active_selection());
    assert!(s.get(text).is_some());

    s.end_text_edit(text).unwrap();
    assert!(s.delete_active_selection());
    assert!(s.get(text).is_none());
    assert_eq!(s.selection(), None);
}

#[test]
fn delete_active_selection_without_selection_is_a_noop() {
    let mut s = stage();
    assert!(!s.delete_active_selection());

    let text = s.add_text("x", TextStyle::default());
    s.clear_selection();
    assert!(!s.delete_active_selection());
    assert!(s.get(text).is_some());
}

#[test]
fn removing_the_selected_object_clears_the_selection() {
    let mut s = stage();
    let f = fetcher();
    let img = s.add_user_image(&f, "cat.png").unwrap();
    assert_eq!(s.selection(), Some(img));
    s.remove_object(img).unwrap();
    assert_eq!(s.selection(), None);
}

#[test]
fn asset_defaults_depend_on_kind() {
    assert_eq!(default_asset_scale(Some(AssetKind::Logo)), 0.15);
    assert_eq!(default_asset_scale(Some(AssetKind::Pfp)), 0.25);
    assert_eq!(default_asset_scale(None), 0.2);

    let mut s = stage();
    let logo = s
        .add_asset(&fetcher(), "logo.png", Some(AssetKind::Logo))
        .unwrap();
    let d = s.get(logo).unwrap();
    // 100px logo at scale 0.15, inset 20 from the right edge of 800.
    assert!((d.position.x - (800.0 - 100.0 * 0.15 - 20.0)).abs() < 1e-9);
    assert!((d.position.y - 20.0).abs() < 1e-9);
}

#[test]
fn user_image_defaults() {
    let mut s = stage();
    let img = s.add_user_image(&fetcher(), "cat.png").unwrap();
    let d = s.get(img).unwrap();
    assert_eq!(d.scale, 0.5);
    assert_eq!(d.position, Point::new(50.0, 50.0));
    assert_eq!(s.rank_of(img), Some(s.objects().len() - 1));
}

#[test]
fn text_patch_updates_content_and_style() {
    let mut s = stage();
    let text = s.add_text("before", TextStyle::default());
    let patch = ObjectPatch {
        text: Some("after".to_string()),
        style: Some(TextStylePatch {
            align: Some(TextAlign::Center),
            ..TextStylePatch::default()
        }),
        ..ObjectPatch::default()
    };
    s.modify_object(text, &patch).unwrap();

    let DrawableContent::Text { content, style, .. } = &s.get(text).unwrap().content else {
        panic!("expected a text drawable");
    };
    assert_eq!(content, "after");
    assert_eq!(style.align, TextAlign::Center);
}

#[test]
fn text_fields_are_ignored_for_image_objects() {
    let mut s = stage();
    let img = s.add_user_image(&fetcher(), "cat.png").unwrap();
    let patch = ObjectPatch {
        text: Some("nope".to_string()),
        scale: Some(0.75),
        ..ObjectPatch::default()
    };
    s.modify_object(img, &patch).unwrap();
    assert_eq!(s.get(img).unwrap().scale, 0.75);
    assert!(matches!(
        s.get(img).unwrap().content,
        DrawableContent::UserImage { .. }
    ));
}

#[test]
fn with_options_preloads_a_template() {
    let f = fetcher();
    let options = StageOptions {
        initial_template: Some(InitialTemplate {
            name: "Wide".to_string(),
            url: "wide.png".to_string(),
        }),
    };
    let s = Stage::with_options(800, 600, Rgba8::WHITE, options, &f).unwrap();
    assert_eq!(s.objects().len(), 2);
    assert!(s.objects()[1].is_template());
}

#[test]
fn with_options_survives_a_broken_template_url() {
    let options = StageOptions {
        initial_template: Some(InitialTemplate {
            name: "Ghost".to_string(),
            url: "missing.png".to_string(),
        }),
    };
    let s = Stage::with_options(800, 600, Rgba8::WHITE, options, &MemoryFetcher::new()).unwrap();
    assert_eq!(s.objects().len(), 1);
}
