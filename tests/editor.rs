//! End-to-end scenarios driving the assembled editor through its public
//! API: pointer gestures in, composited pixels out.

use image::Rgba;
use rasterstudio::canvas::{Layer, LayerKind, ShapeData};
use rasterstudio::context::{Editor, EditorConfig};
use rasterstudio::surface::{Interpolation, Surface};
use rasterstudio::text::TextStyle;
use rasterstudio::tools::{Modifiers, OptionValue, ToolKind};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn editor(width: u32, height: u32) -> Editor {
    Editor::new(EditorConfig {
        width,
        height,
        max_history: 30,
    })
}

fn none() -> Modifiers {
    Modifiers::default()
}

/// Drag from `from` to `to` with a couple of intermediate moves.
fn drag(editor: &mut Editor, from: (f32, f32), to: (f32, f32)) {
    editor.pointer_down(from.0, from.1, 1.0, none());
    let mid = ((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0);
    editor.pointer_move(mid.0, mid.1, 1.0, none());
    editor.pointer_move(to.0, to.1, 1.0, none());
    editor.pointer_up(to.0, to.1, 1.0, none());
}

#[test]
fn brush_stroke_then_undo_restores_white_canvas() {
    let mut e = editor(100, 100);
    e.set_tool(ToolKind::Brush);
    assert!(e.set_tool_option(ToolKind::Brush, "size", OptionValue::Number(20.0)));

    drag(&mut e, (50.0, 50.0), (60.0, 50.0));

    // The stroke landed and pushed exactly one history entry.
    let painted = e.composite();
    assert_ne!(painted.get_pixel(50, 50), WHITE);
    assert_eq!(e.history().len(), 2);

    assert!(e.undo().unwrap());
    let restored = e.composite();
    for y in 0..100 {
        for x in 0..100 {
            assert_eq!(restored.get_pixel(x, y), WHITE, "pixel ({}, {})", x, y);
        }
    }
}

#[test]
fn brush_spacing_covers_the_whole_stroke_line() {
    let mut e = editor(140, 60);
    e.set_tool(ToolKind::Brush);
    e.set_tool_option(ToolKind::Brush, "size", OptionValue::Number(20.0));
    e.set_tool_option(ToolKind::Brush, "spacing", OptionValue::Number(25.0));

    // One straight segment: dabs every 5 units from x=20 to x=120.
    e.pointer_down(20.0, 30.0, 1.0, none());
    e.pointer_move(120.0, 30.0, 1.0, none());
    e.pointer_up(120.0, 30.0, 1.0, none());

    let out = e.composite();
    for x in (20..=120).step_by(5) {
        assert_ne!(out.get_pixel(x, 30), WHITE, "no dab coverage at x={}", x);
    }
    // Well off the stroke stays untouched.
    assert_eq!(out.get_pixel(70, 55), WHITE);
}

#[test]
fn flood_fill_via_tool_and_undo() {
    let mut e = editor(10, 10);
    e.set_tool(ToolKind::Fill);
    e.set_tool_option(ToolKind::Fill, "tolerance", OptionValue::Number(0.0));

    e.pointer_down(5.0, 5.0, 1.0, none());
    e.pointer_up(5.0, 5.0, 1.0, none());

    let filled = e.composite();
    assert_eq!(filled.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    assert_eq!(filled.get_pixel(9, 9), Rgba([0, 0, 0, 255]));

    e.undo().unwrap();
    assert_eq!(e.composite().get_pixel(0, 0), WHITE);
}

#[test]
fn marquee_selection_masks_delete() {
    let mut e = editor(40, 40);
    e.set_tool(ToolKind::Marquee);
    drag(&mut e, (10.0, 10.0), (30.0, 30.0));
    assert!(e.selection().is_active());

    e.delete_selection().unwrap();
    let out = e.composite();
    // Inside the marquee the background layer is punched out.
    assert_eq!(out.get_pixel(20, 20)[3], 0);
    // Outside it is still opaque white.
    assert_eq!(out.get_pixel(5, 5), WHITE);

    // Undo restores the deleted pixels.
    e.undo().unwrap();
    assert_eq!(e.composite().get_pixel(20, 20), WHITE);
}

#[test]
fn crop_then_undo_restores_dimensions_and_pixels() {
    let mut e = editor(80, 60);
    // Paint a marker pixel outside the future crop so we can verify it
    // comes back.
    e.doc_mut()
        .active_layer_mut()
        .as_surface_mut()
        .unwrap()
        .fill_rect(70, 50, 4, 4, Rgba([1, 2, 3, 255]));
    e.push_history("Marker");

    e.set_tool(ToolKind::Crop);
    // Drag a fresh crop rect and apply it through the options button.
    drag(&mut e, (10.0, 10.0), (50.0, 40.0));
    assert!(e.set_tool_option(ToolKind::Crop, "apply", OptionValue::Trigger));

    assert_eq!((e.doc().width(), e.doc().height()), (40, 30));
    // Every layer got re-sliced: the marker is gone.
    let cropped = e.composite();
    assert_eq!(cropped.get_pixel(0, 0), WHITE);

    e.undo().unwrap();
    assert_eq!((e.doc().width(), e.doc().height()), (80, 60));
    assert_eq!(e.composite().get_pixel(71, 51), Rgba([1, 2, 3, 255]));
}

#[test]
fn transform_resamples_from_original_buffer() {
    let mut e = editor(60, 60);
    // Checkerboard layer whose detail degrades badly under compounding.
    let mut board = Layer::new_raster("board", 40, 40);
    {
        let s = board.as_surface_mut().unwrap();
        for y in 0..40 {
            for x in 0..40 {
                let on = (x / 2 + y / 2) % 2 == 0;
                s.put_pixel(
                    x,
                    y,
                    if on {
                        Rgba([0, 0, 0, 255])
                    } else {
                        Rgba([255, 255, 255, 255])
                    },
                );
            }
        }
    }
    let original = board.as_surface().unwrap().clone();
    let id = e.add_layer(board);
    e.set_active_layer(id).unwrap();

    e.set_tool(ToolKind::Move);
    // Grab the south-east handle at (40, 40), shrink to half, then pull
    // back out to the original size — all in one gesture.
    e.pointer_down(40.0, 40.0, 1.0, none());
    e.pointer_move(20.0, 20.0, 1.0, none());
    e.pointer_move(40.0, 40.0, 1.0, none());
    e.pointer_up(40.0, 40.0, 1.0, none());

    let layer = e.doc().layer(id).unwrap();
    let result = layer.as_surface().unwrap();
    assert_eq!((result.width(), result.height()), (40, 40));

    // Baseline for what compounding would have produced.
    let compounded = original
        .resized(20, 20, Interpolation::Bilinear)
        .resized(40, 40, Interpolation::Bilinear);

    let error_of = |candidate: &Surface| -> u64 {
        let mut sum = 0u64;
        for y in 0..40 {
            for x in 0..40 {
                let a = candidate.get_pixel(x, y);
                let b = original.get_pixel(x, y);
                for c in 0..3 {
                    sum += (a[c] as i64 - b[c] as i64).unsigned_abs();
                }
            }
        }
        sum
    };

    // Resampling from the original must beat the compounded path.
    assert!(
        error_of(result) < error_of(&compounded),
        "single-pass {} vs compounded {}",
        error_of(result),
        error_of(&compounded)
    );
}

#[test]
fn cancel_asymmetry_brush_keeps_pixels_shape_does_not() {
    let mut e = editor(50, 50);

    // Shape gesture canceled mid-drag leaves the document untouched.
    e.set_tool(ToolKind::Shape);
    e.pointer_down(5.0, 5.0, 1.0, none());
    e.pointer_move(30.0, 30.0, 1.0, none());
    e.cancel_gesture();
    assert_eq!(e.doc().layer_count(), 1);
    assert_eq!(e.composite().get_pixel(10, 10), WHITE);
    assert_eq!(e.history().len(), 1);

    // Brush pixels painted during the drag stay after cancel.
    e.set_tool(ToolKind::Brush);
    e.pointer_down(10.0, 10.0, 1.0, none());
    e.pointer_move(20.0, 10.0, 1.0, none());
    e.cancel_gesture();
    assert_ne!(e.composite().get_pixel(10, 10), WHITE);
    // But no history entry was pushed for the aborted stroke.
    assert_eq!(e.history().len(), 1);
}

#[test]
fn shape_tool_creates_a_shape_layer() {
    let mut e = editor(50, 50);
    e.set_tool(ToolKind::Shape);
    e.set_tool_option(ToolKind::Shape, "fillColor", OptionValue::Color(Rgba([0, 0, 255, 255])));
    drag(&mut e, (10.0, 10.0), (30.0, 25.0));

    assert_eq!(e.doc().layer_count(), 2);
    let layer = &e.doc().layers()[1];
    match &layer.kind {
        LayerKind::Shape { shape, .. } => match shape {
            ShapeData::Rectangle { x, y, width, height, .. } => {
                assert_eq!((*x, *y, *width, *height), (10.0, 10.0, 20.0, 15.0));
            }
            other => panic!("expected rectangle, got {:?}", other),
        },
        other => panic!("expected shape layer, got {:?}", other.type_name()),
    }
    assert_eq!(e.composite().get_pixel(20, 20), Rgba([0, 0, 255, 255]));
}

#[test]
fn text_tool_lifecycle() {
    let mut e = editor(100, 100);
    e.set_tool(ToolKind::Text);

    // Click creates an empty editing layer.
    e.pointer_down(20.0, 20.0, 1.0, none());
    e.pointer_up(20.0, 20.0, 1.0, none());
    assert_eq!(e.doc().layer_count(), 2);

    for ch in "hi".chars() {
        e.text_input(ch);
    }
    e.text_backspace();
    e.text_input('i');
    e.text_commit();

    assert_eq!(e.doc().layer_count(), 2);
    match &e.doc().layers()[1].kind {
        LayerKind::Text { content, .. } => assert_eq!(content, "hi"),
        other => panic!("expected text layer, got {:?}", other.type_name()),
    }

    // A fresh click elsewhere starts an empty layer; committing it with
    // no content discards it again.
    e.pointer_down(80.0, 80.0, 1.0, none());
    e.pointer_up(80.0, 80.0, 1.0, none());
    assert_eq!(e.doc().layer_count(), 3);
    e.text_commit();
    assert_eq!(e.doc().layer_count(), 2);
}

#[test]
fn history_capacity_at_editor_level() {
    let mut e = editor(8, 8);
    // Baseline entry exists; push until one past capacity.
    for i in 0..30 {
        e.doc_mut()
            .active_layer_mut()
            .as_surface_mut()
            .unwrap()
            .fill(Rgba([i as u8, 0, 0, 255]));
        e.push_history(&format!("step {}", i));
    }
    assert_eq!(e.history().len(), 30);
    let states = e.history().states();
    assert!(states.last().unwrap().is_current);
    // The oldest entry was evicted: the first label is no longer the
    // baseline.
    assert_eq!(states[0].label, "step 0");
}

#[test]
fn zero_opacity_layers_reproduce_bottom_layer() {
    let mut e = editor(12, 12);
    let baseline = e.composite();
    for i in 0..3 {
        let layer = Layer::new_raster_filled(format!("L{}", i), 12, 12, Rgba([200, 10, 10, 255]));
        let id = e.add_layer(layer);
        e.set_layer_opacity(id, 0).unwrap();
    }
    assert_eq!(e.composite(), baseline);
}

#[test]
fn temporary_hand_tool_pans_and_restores() {
    let mut e = editor(64, 64);
    e.set_tool(ToolKind::Brush);
    e.activate_temporary_tool(ToolKind::Hand);

    e.pointer_down(10.0, 10.0, 1.0, none());
    e.pointer_move(25.0, 18.0, 1.0, none());
    e.pointer_up(25.0, 18.0, 1.0, none());
    assert_eq!(e.viewport().pan_x, 15.0);
    assert_eq!(e.viewport().pan_y, 8.0);

    e.release_temporary_tool();
    assert_eq!(e.current_tool(), ToolKind::Brush);
    // Panning never touches the document or history.
    assert_eq!(e.history().len(), 1);
}

#[test]
fn project_round_trip_through_editor() {
    let mut e = editor(30, 20);
    e.set_tool(ToolKind::Brush);
    drag(&mut e, (5.0, 5.0), (20.0, 12.0));
    let mut text = Layer::new_text("label", "yo", TextStyle::default());
    text.position = (2.0, 2.0);
    e.add_layer(text);

    let json = rasterstudio::io::save_project(e.doc(), "session", e.fonts()).unwrap();
    let (restored, name) = rasterstudio::io::load_project(&json).unwrap();
    assert_eq!(name, "session");
    assert_eq!(restored.layer_count(), e.doc().layer_count());
    assert_eq!(
        restored.layers()[0].as_surface().unwrap(),
        e.doc().layers()[0].as_surface().unwrap()
    );
}

#[test]
fn eyedropper_updates_foreground_color() {
    let mut e = editor(20, 20);
    e.doc_mut()
        .active_layer_mut()
        .as_surface_mut()
        .unwrap()
        .fill_rect(0, 0, 10, 10, Rgba([10, 20, 30, 255]));
    e.set_tool(ToolKind::Eyedropper);
    e.pointer_down(5.0, 5.0, 1.0, none());
    e.pointer_up(5.0, 5.0, 1.0, none());
    assert_eq!(e.colors().foreground, Rgba([10, 20, 30, 255]));

    // Alt-click writes the background color instead.
    let alt = Modifiers { shift: false, alt: true };
    e.pointer_down(15.0, 15.0, 1.0, alt);
    e.pointer_up(15.0, 15.0, 1.0, alt);
    assert_eq!(e.colors().background, WHITE);
}
