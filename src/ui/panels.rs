use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::session::AnnotationId;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – labels, channels, annotation list
// ---------------------------------------------------------------------------

/// One deferred mutation gathered while walking the widgets. Applying them
/// after the loop keeps the widget code free of borrow gymnastics.
enum PendingOp {
    SetLabel(String),
    MarkBad(String),
    UnmarkBad(String),
    EditBounds(AnnotationId, f64, f64),
    Delete(AnnotationId),
}

/// Render the left panel: active label, channel list, annotation list.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    let Some(session) = &state.session else {
        ui.label("No recording loaded.");
        return;
    };

    let annotating = session.modes.annotating;
    let active_label = session.active_label().to_string();

    // Snapshots so the session isn't borrowed while widgets run.
    let labels: Vec<String> = session
        .annotations()
        .labels()
        .into_iter()
        .map(str::to_string)
        .collect();
    let channels: Vec<(String, bool)> = session
        .buffer()
        .channel_names()
        .map(|name| (name.to_string(), session.is_channel_bad(name)))
        .collect();
    let annotations: Vec<(AnnotationId, String, f64, f64)> = session
        .annotations()
        .iter()
        .map(|a| (a.id, a.label.clone(), a.onset, a.end()))
        .collect();

    let mut pending: Vec<PendingOp> = Vec::new();

    ui.heading("Annotation");
    ui.separator();

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Label:");
        let edit = ui.text_edit_singleline(&mut state.label_entry);
        if edit.lost_focus() && !state.label_entry.is_empty() && state.label_entry != active_label {
            pending.push(PendingOp::SetLabel(state.label_entry.clone()));
        }
    });

    ui.horizontal_wrapped(|ui: &mut Ui| {
        for label in &labels {
            let color = state.label_colors.color_for(label);
            if ui
                .selectable_label(*label == active_label, RichText::new(label).color(color))
                .clicked()
            {
                pending.push(PendingOp::SetLabel(label.clone()));
            }
        }
    });

    ui.separator();
    ui.heading("Channels");
    ui.label("Checked channels are excluded from analysis.");

    ScrollArea::vertical()
        .id_salt("channel_list")
        .max_height(ui.available_height() * 0.4)
        .auto_shrink([false, true])
        .show(ui, |ui: &mut Ui| {
            for (i, (name, bad)) in channels.iter().enumerate() {
                let color = if *bad {
                    Color32::GRAY
                } else {
                    state
                        .channel_colors
                        .get(i)
                        .copied()
                        .unwrap_or(Color32::LIGHT_BLUE)
                };
                let mut checked = *bad;
                if ui
                    .checkbox(&mut checked, RichText::new(name).color(color))
                    .changed()
                {
                    pending.push(if checked {
                        PendingOp::MarkBad(name.clone())
                    } else {
                        PendingOp::UnmarkBad(name.clone())
                    });
                }
            }
        });

    ui.separator();
    ui.heading("Annotations");

    ScrollArea::vertical()
        .id_salt("annotation_list")
        .auto_shrink([false, true])
        .show(ui, |ui: &mut Ui| {
            if annotations.is_empty() {
                ui.label("None yet — enable Annotate and drag on the plot.");
            }
            for (id, label, onset, end) in &annotations {
                ui.horizontal(|ui: &mut Ui| {
                    let color = state.label_colors.color_for(label);
                    ui.label(RichText::new(label).color(color).strong());

                    if annotating {
                        // Draggable bounds; edits go through the session so
                        // the nesting policy and merge invariant apply.
                        let mut new_onset = *onset;
                        let mut new_end = *end;
                        let onset_resp = ui.add(
                            egui::DragValue::new(&mut new_onset)
                                .speed(0.05)
                                .suffix(" s"),
                        );
                        ui.label("–");
                        let end_resp =
                            ui.add(egui::DragValue::new(&mut new_end).speed(0.05).suffix(" s"));
                        if onset_resp.changed() || end_resp.changed() {
                            pending.push(PendingOp::EditBounds(*id, new_onset, new_end));
                        }
                    } else {
                        ui.label(format!("{onset:.2} – {end:.2} s"));
                    }

                    if ui.small_button("✕").clicked() {
                        pending.push(PendingOp::Delete(*id));
                    }
                });
            }
        });

    for op in pending {
        match op {
            PendingOp::SetLabel(label) => {
                state.label_entry = label.clone();
                if let Some(session) = &mut state.session {
                    session.set_active_label(label);
                }
                state.rebuild_label_colors();
            }
            PendingOp::MarkBad(name) => {
                state.run(|s| s.mark_channel_bad(&name));
            }
            PendingOp::UnmarkBad(name) => {
                state.run(|s| s.unmark_channel_bad(&name));
            }
            PendingOp::EditBounds(id, onset, end) => {
                state.run(|s| s.edit_annotation_bounds(id, onset, end));
            }
            PendingOp::Delete(id) => {
                state.run(|s| s.delete_annotation(id));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar: file actions, mode toggles, status line.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        let has_session = state.session.is_some();

        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open recording…").clicked() {
                open_recording_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui
                .add_enabled(has_session, egui::Button::new("Save annotations…"))
                .clicked()
            {
                save_annotations_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(has_session, egui::Button::new("Load annotations…"))
                .clicked()
            {
                load_annotations_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui
                .add_enabled(has_session, egui::Button::new("Save bad channels…"))
                .clicked()
            {
                save_bad_channels_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(has_session, egui::Button::new("Load bad channels…"))
                .clicked()
            {
                load_bad_channels_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(session) = &mut state.session {
            // Independent toggles; Butterfly/Zen combine freely with
            // Annotate. Annotate alone gates creation/editing.
            let modes = &mut session.modes;
            if ui
                .selectable_label(modes.annotating, "Annotate")
                .clicked()
            {
                modes.annotating = !modes.annotating;
            }
            if ui.selectable_label(modes.butterfly, "Butterfly").clicked() {
                modes.butterfly = !modes.butterfly;
            }
            if ui.selectable_label(modes.zen, "Zen").clicked() {
                modes.zen = !modes.zen;
            }
            if ui.selectable_label(modes.snap, "Snap").clicked() {
                modes.snap = !modes.snap;
            }

            ui.separator();
            ui.label(format!(
                "{}  ·  {} annotations  ·  {} bad",
                session.buffer(),
                session.annotations().len(),
                session.bad_channels().len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_recording_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open recording")
        .add_filter("Supported files", &["parquet", "pq", "json", "csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        match crate::data::loader::load_file(&path) {
            Ok(buffer) => {
                log::info!("Loaded {buffer}");
                state.set_buffer(buffer);
            }
            Err(e) => {
                log::error!("Failed to load recording: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

fn save_annotations_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Save annotations")
        .add_filter("Annotations, onsets relative (txt)", &["txt"])
        .add_filter("Annotations, onsets absolute (csv)", &["csv"])
        .save_file();

    if let Some(path) = file {
        // The save dialog already confirmed replacement.
        if state.run(|s| s.save_annotations(&path, true)) {
            log::info!("Saved annotations to {}", path.display());
        }
    }
}

fn load_annotations_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Load annotations")
        .add_filter("Annotation files", &["txt", "csv"])
        .pick_file();

    if let Some(path) = file {
        if state.run(|s| s.load_annotations(&path)) {
            log::info!("Loaded annotations from {}", path.display());
        }
    }
}

fn save_bad_channels_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Save bad channels")
        .add_filter("Bad-channel list", &["bads", "txt"])
        .save_file();

    if let Some(path) = file {
        if state.run(|s| s.save_bad_channels(&path, true)) {
            log::info!("Saved bad channels to {}", path.display());
        }
    }
}

fn load_bad_channels_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Load bad channels")
        .add_filter("Bad-channel list", &["bads", "txt"])
        .pick_file();

    if let Some(path) = file {
        if state.run(|s| s.load_bad_channels(&path)) {
            log::info!("Loaded bad channels from {}", path.display());
        }
    }
}
