use super::*;
use super::state::FileOperationResult;
use crate::runs::tests::MemoryStorage;
use crate::viewport::{ScreenPoint, Transform};
use eframe::egui;

const SCREEN: egui::Vec2 = egui::vec2(1200.0, 800.0);

fn raw_input(events: Vec<egui::Event>) -> egui::RawInput {
    let mut raw = egui::RawInput::default();
    raw.screen_rect = Some(egui::Rect::from_min_size(egui::Pos2::ZERO, SCREEN));
    raw.events = events;
    raw
}

/// Runs one headless frame drawing only the canvas.
fn canvas_frame(ctx: &egui::Context, app: &mut FineTuneApp, events: Vec<egui::Event>) -> egui::FullOutput {
    ctx.run(raw_input(events), |ctx| {
        egui::CentralPanel::default().show(ctx, |ui| {
            app.draw_canvas(ui);
        });
    })
}

fn filled_app() -> FineTuneApp {
    let mut app = FineTuneApp::default();
    let rows = [("0", "0", "0"), ("1", "0", "10"), ("0.5", "1", "20")];
    for (row, (x, y, h)) in app.form.anchors.iter_mut().zip(rows) {
        row.x = x.into();
        row.y = y.into();
        row.heading = h.into();
    }
    app.form.segments = vec!["0.2".into(), "0.2".into()];
    app
}

#[test]
fn compute_reports_field_errors_and_keeps_previous_result() {
    let mut app = filled_app();
    assert!(app.compute());
    let previous = app.result.clone();

    app.form.anchors[1].y = "abc".into();
    app.form.anchors[2].heading.clear();
    assert!(!app.compute());
    assert_eq!(app.field_errors.len(), 2);
    assert_eq!(app.field_errors[0].field(), Some(Field::AnchorY(1)));
    assert_eq!(app.field_errors[1].field(), Some(Field::AnchorHeading(2)));
    assert_eq!(app.result, previous);

    app.form.anchors[1].y = "0".into();
    app.form.anchors[2].heading = "20".into();
    assert!(app.compute());
    assert!(app.field_errors.is_empty());
}

#[test]
fn compute_produces_sequence_and_resets_view() {
    let mut app = filled_app();
    app.canvas.controller.on_wheel(1.0, ScreenPoint::new(10.0, 10.0));
    assert!(app.compute());

    let result = app.result.as_ref().expect("result after compute");
    assert_eq!(result.sequence.len(), 3);
    assert_eq!(result.statistics.count, 3);
    assert!((result.statistics.mean_heading - 10.0).abs() < 1e-9);
    assert_eq!(app.canvas.controller.transform(), Transform::default());

    let visible = app.canvas.controller.visible_world_rect();
    for p in app.plotted_points() {
        assert!(visible.contains(p), "{p:?} not visible");
    }
}

#[test]
fn millimeter_input_is_plotted_in_meters() {
    let mut app = filled_app();
    app.form.unit = InputUnit::Millimeters;
    for row in &mut app.form.anchors {
        row.x = "1000".into();
    }
    assert!(app.compute());
    assert!(app.anchors.iter().all(|a| (a.x - 1.0).abs() < 1e-12));
}

#[test]
fn custom_points_follow_recompute() {
    let mut app = filled_app();
    app.add_custom_point();
    assert!(app.custom_points[0].resolved.is_none());

    assert!(app.compute());
    let first = app.custom_points[0].resolved.expect("resolved after compute");
    let origin = app.result.as_ref().map(|r| r.sequence[0]);
    assert_eq!(Some(first), origin);

    app.custom_points[0].reference_index = 99;
    app.refresh_custom_points();
    let last = app.result.as_ref().and_then(|r| r.sequence.last().copied());
    assert_eq!(app.custom_points[0].resolved, last);

    let id = app.custom_points[0].id;
    app.remove_custom_point(id);
    assert!(app.custom_points.is_empty());
}

#[test]
fn saved_runs_are_plotted_only_while_visible() {
    let mut app = filled_app();
    assert_eq!(app.save_current_run(0.0), None);
    assert!(app.compute());

    app.run_panel.new_run_name = "  first  ".into();
    let id = app.save_current_run(0.0).expect("run saved");
    assert_eq!(app.runs.get(id).map(|r| r.name.as_str()), Some("first"));
    assert!(app.run_panel.new_run_name.is_empty());

    let with_run = app.plot_series().len();
    app.runs.toggle_visibility(id, 0.0);
    assert_eq!(app.plot_series().len(), with_run - 1);
    assert!(app
        .plot_series()
        .iter()
        .all(|s| s.kind != SeriesKind::SavedRun));

    let second = app.save_current_run(0.0).expect("second run");
    assert_eq!(app.runs.get(second).map(|r| r.name.as_str()), Some("Run 2"));
}

#[test]
fn app_save_persists_preferences_and_runs() {
    let mut storage = MemoryStorage::default();
    let mut app = filled_app();
    app.display.show_grid = false;
    assert!(app.compute());
    app.save_current_run(0.0);
    assert!(app.runs.has_pending_write());

    eframe::App::save(&mut app, &mut storage);
    assert!(!app.runs.has_pending_write());
    assert!(storage.values.contains_key(APP_STATE_KEY));

    let restored = FineTuneApp::new(Some(&storage as &dyn eframe::Storage));
    assert!(!restored.display.show_grid);
    assert_eq!(restored.runs.len(), 1);
    assert_eq!(restored.form.anchors[1].heading, "10");
    assert!(restored.result.is_none());
}

#[test]
fn corrupt_app_state_falls_back_to_defaults() {
    let mut storage = MemoryStorage::default();
    eframe::Storage::set_string(&mut storage, APP_STATE_KEY, "{not json".into());
    let app = FineTuneApp::new(Some(&storage as &dyn eframe::Storage));
    assert!(app.display.show_grid);
    assert_eq!(app.form.segments.len(), app.form.anchors.len() - 1);
}

#[test]
fn imported_runs_merge_and_failures_are_reported() {
    let mut source = filled_app();
    assert!(source.compute());
    source.save_current_run(0.0);
    let json = source.runs.export_json().expect("export");

    let mut app = FineTuneApp::default();
    app.apply_file_result(
        FileOperationResult::RunsLoaded("runs.json".into(), json.clone()),
        0.0,
    );
    assert_eq!(app.runs.len(), 1);
    app.apply_file_result(
        FileOperationResult::RunsLoaded("runs.json".into(), json),
        0.0,
    );
    assert_eq!(app.runs.len(), 1);

    app.apply_file_result(
        FileOperationResult::RunsLoaded("bad.json".into(), "[1, 2".into()),
        0.0,
    );
    assert_eq!(app.runs.len(), 1);
    assert!(app
        .file
        .status
        .as_deref()
        .is_some_and(|s| s.contains("bad.json")));
}

#[test]
fn canvas_draws_grid_and_points() {
    let mut app = filled_app();
    assert!(app.compute());
    let ctx = egui::Context::default();
    let output = canvas_frame(&ctx, &mut app, Vec::new());
    assert!(output.shapes.len() > 10);

    let empty = canvas_frame(&ctx, &mut FineTuneApp::default(), Vec::new());
    assert!(output.shapes.len() > empty.shapes.len());
}

#[test]
fn hovering_a_point_reports_its_label() {
    let mut app = filled_app();
    assert!(app.compute());
    let ctx = egui::Context::default();
    canvas_frame(&ctx, &mut app, Vec::new());

    let first = app.plot_series()
        .into_iter()
        .find(|s| s.kind == SeriesKind::Sequence)
        .map(|s| s.points[0].position)
        .expect("sequence series");
    let screen = app.canvas.controller.world_to_screen(first);
    let hit = app.find_point_near(screen, 2.0).expect("point under cursor");
    assert!(hit.starts_with("Sequence: 1\n"), "{hit}");
    assert!(hit.contains('°'));

    let far = ScreenPoint::new(-500.0, -500.0);
    assert!(app.find_point_near(far, 2.0).is_none());
}

#[test]
fn hovering_a_saved_run_names_the_run() {
    let mut app = filled_app();
    assert!(app.compute());
    app.run_panel.new_run_name = "baseline".into();
    app.save_current_run(0.0).expect("run saved");
    app.display.show_inputs = false;
    app.form.segments = vec!["0.5".into(), "0.5".into()];
    assert!(app.compute());
    let ctx = egui::Context::default();
    canvas_frame(&ctx, &mut app, Vec::new());

    let series = app.plot_series();
    let run = series
        .iter()
        .find(|s| s.kind == SeriesKind::SavedRun)
        .expect("saved run series");
    assert_eq!(run.name, "baseline");
    let screen = app.canvas.controller.world_to_screen(run.points[2].position);
    let hit = app.find_point_near(screen, 2.0).expect("run point under cursor");
    assert!(hit.starts_with("baseline: #3\n"), "{hit}");
}

#[test]
fn pinch_over_canvas_zooms_about_cursor() {
    let mut app = filled_app();
    assert!(app.compute());
    let ctx = egui::Context::default();
    let cursor = egui::pos2(600.0, 400.0);
    canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(cursor)]);

    let origin = app.canvas.controller.canvas_size();
    let anchor = ScreenPoint::new(
        cursor.x as f64 - (SCREEN.x as f64 - origin.width) / 2.0,
        cursor.y as f64 - (SCREEN.y as f64 - origin.height) / 2.0,
    );
    let before = app.canvas.controller.screen_to_world(anchor);
    canvas_frame(&ctx, &mut app, vec![egui::Event::Zoom(1.5)]);

    assert!((app.canvas.controller.zoom() - 1.5).abs() < 1e-6);
    let after = app.canvas.controller.screen_to_world(anchor);
    assert!((after.x - before.x).abs() < 1e-6 && (after.y - before.y).abs() < 1e-6);
}

#[test]
fn arrow_keys_pan_while_canvas_is_hovered() {
    let mut app = filled_app();
    assert!(app.compute());
    let ctx = egui::Context::default();
    canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(egui::pos2(600.0, 400.0))]);

    canvas_frame(
        &ctx,
        &mut app,
        vec![egui::Event::Key {
            key: egui::Key::ArrowLeft,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: egui::Modifiers::NONE,
        }],
    );
    assert!(app.canvas.controller.transform().pan.x > 0.0);

    canvas_frame(
        &ctx,
        &mut app,
        vec![egui::Event::Key {
            key: egui::Key::Home,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: egui::Modifiers::NONE,
        }],
    );
    assert_eq!(app.canvas.controller.transform(), Transform::default());
}

#[test]
fn dragging_the_canvas_pans() {
    let mut app = filled_app();
    assert!(app.compute());
    let ctx = egui::Context::default();
    let start = egui::pos2(500.0, 400.0);

    canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(start)]);
    canvas_frame(
        &ctx,
        &mut app,
        vec![egui::Event::PointerButton {
            pos: start,
            button: egui::PointerButton::Primary,
            pressed: true,
            modifiers: egui::Modifiers::NONE,
        }],
    );
    for step in 1..=3 {
        let pos = start + egui::vec2(30.0 * step as f32, 0.0);
        canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(pos)]);
    }
    canvas_frame(
        &ctx,
        &mut app,
        vec![egui::Event::PointerButton {
            pos: start + egui::vec2(90.0, 0.0),
            button: egui::PointerButton::Primary,
            pressed: false,
            modifiers: egui::Modifiers::NONE,
        }],
    );

    let pan = app.canvas.controller.transform().pan;
    assert!(pan.x > 0.0, "pan {pan:?}");
    assert!(pan.y.abs() < 1e-9);
    assert!(!app.canvas.is_panning);
}
