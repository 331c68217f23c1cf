use eframe::egui::{Color32, Stroke, Ui};
use egui_plot::{Line, Plot, PlotPoint, PlotPoints, Polygon, Text};

use crate::color::span_fill;
use crate::state::AppState;

/// Drags shorter than this create no annotation (accidental clicks).
const MIN_DRAG_SECS: f64 = 1e-3;

// ---------------------------------------------------------------------------
// Trace plot (central panel)
// ---------------------------------------------------------------------------

/// Render the multi-channel trace plot and, while annotation mode is active,
/// turn click-drags into `create_annotation` calls on the session.
pub fn trace_plot(ui: &mut Ui, state: &mut AppState) {
    let Some(session) = &state.session else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a recording to view traces  (File → Open…)");
        });
        return;
    };

    let buffer = session.buffer();
    let n_channels = buffer.n_channels();
    let spacing = state.trace_spacing;
    let butterfly = session.modes.butterfly;
    let annotating = session.modes.annotating;

    // Vertical extent the annotation spans should cover.
    let (y_lo, y_hi) = if butterfly {
        (-spacing, spacing)
    } else {
        (-spacing, n_channels as f64 * spacing)
    };

    // Snapshot everything the closure draws; the session stays borrowed only
    // up to here so gesture handling below can mutate it.
    struct TraceRow {
        name: String,
        color: Color32,
        points: Vec<[f64; 2]>,
    }
    let traces: Vec<TraceRow> = buffer
        .channels()
        .iter()
        .enumerate()
        .map(|(i, ch)| {
            let bad = session.is_channel_bad(&ch.name);
            let offset = if butterfly {
                0.0
            } else {
                (n_channels - 1 - i) as f64 * spacing
            };
            TraceRow {
                name: if bad {
                    format!("{} (bad)", ch.name)
                } else {
                    ch.name.clone()
                },
                color: if bad {
                    Color32::GRAY
                } else {
                    state
                        .channel_colors
                        .get(i)
                        .copied()
                        .unwrap_or(Color32::LIGHT_BLUE)
                },
                points: ch
                    .samples
                    .iter()
                    .enumerate()
                    .map(|(s, &v)| [buffer.time_at(s), v + offset])
                    .collect(),
            }
        })
        .collect();

    struct SpanRow {
        onset: f64,
        end: f64,
        label: String,
        fill: Color32,
    }
    let spans: Vec<SpanRow> = session
        .annotations()
        .iter()
        .map(|a| {
            let base = state.label_colors.color_for(&a.label);
            // Excluded intervals read darker than ordinary event marks.
            let alpha = if a.excluded { 90 } else { 50 };
            SpanRow {
                onset: a.onset,
                end: a.end(),
                label: a.label.clone(),
                fill: span_fill(base, alpha),
            }
        })
        .collect();

    let preview_anchor = state.drag_anchor;
    let active_color = state.label_colors.color_for(session.active_label());
    let buffer_len = buffer.duration_secs();

    let inner = Plot::new("trace_plot")
        .legend(egui_plot::Legend::default())
        .x_axis_label("Time [s]")
        .y_axis_label("Amplitude")
        .allow_boxed_zoom(!annotating)
        .allow_drag(!annotating)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for span in &spans {
                let corners: PlotPoints = vec![
                    [span.onset, y_lo],
                    [span.end, y_lo],
                    [span.end, y_hi],
                    [span.onset, y_hi],
                ]
                .into();
                plot_ui.polygon(
                    Polygon::new(corners)
                        .fill_color(span.fill)
                        .stroke(Stroke::new(1.0, span.fill)),
                );
                plot_ui.text(Text::new(
                    PlotPoint::new(span.onset, y_hi),
                    span.label.clone(),
                ));
            }

            for trace in &traces {
                let points: PlotPoints = trace.points.clone().into();
                plot_ui.line(Line::new(points).name(&trace.name).color(trace.color).width(1.0));
            }

            // Live preview of the span being dragged out.
            let pointer = plot_ui.pointer_coordinate();
            if let (Some(anchor), Some(p)) = (preview_anchor, pointer) {
                let (lo, hi) = (anchor.min(p.x), anchor.max(p.x));
                let corners: PlotPoints =
                    vec![[lo, y_lo], [hi, y_lo], [hi, y_hi], [lo, y_hi]].into();
                plot_ui.polygon(
                    Polygon::new(corners)
                        .fill_color(span_fill(active_color, 30))
                        .stroke(Stroke::new(1.0, active_color)),
                );
            }

            (plot_ui.response().clone(), pointer)
        });

    let (response, pointer) = inner.inner;

    // ---- Drag-to-annotate gesture ----
    if annotating {
        if response.drag_started() {
            state.drag_anchor = pointer.map(|p| p.x);
        }
        if response.drag_stopped() {
            if let (Some(anchor), Some(p)) = (state.drag_anchor.take(), pointer) {
                let lo = anchor.min(p.x).clamp(0.0, buffer_len);
                let hi = anchor.max(p.x).clamp(0.0, buffer_len);
                if hi - lo >= MIN_DRAG_SECS {
                    if state.run(|s| s.create_with_active_label(lo, hi - lo)) {
                        log::info!("annotated [{lo:.3}, {hi:.3}) s");
                    }
                }
            } else {
                state.drag_anchor = None;
            }
        }
    } else {
        state.drag_anchor = None;
    }
}
