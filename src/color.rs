use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Translucent variant for annotation span fills.
pub fn span_fill(c: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(c.r(), c.g(), c.b(), alpha)
}

// ---------------------------------------------------------------------------
// Label colors: annotation label → Color32
// ---------------------------------------------------------------------------

/// Maps annotation labels to distinct, stable colours.
///
/// Excluded ("bad"-prefixed) labels get a fixed red so artifact intervals
/// read the same across recordings; other labels cycle through the palette.
#[derive(Debug, Clone, Default)]
pub struct LabelColors {
    mapping: BTreeMap<String, Color32>,
}

const EXCLUDED_COLOR: Color32 = Color32::from_rgb(214, 64, 52);

impl LabelColors {
    /// Rebuild the map from the session's current label set.
    pub fn rebuild<'a>(&mut self, labels: impl IntoIterator<Item = &'a str>) {
        use crate::session::annotations::label_is_excluded;

        let labels: Vec<&str> = labels.into_iter().collect();
        let normal: Vec<&str> = labels
            .iter()
            .copied()
            .filter(|l| !label_is_excluded(l))
            .collect();
        let palette = generate_palette(normal.len());

        self.mapping.clear();
        for (label, color) in normal.iter().zip(palette) {
            self.mapping.insert(label.to_string(), color);
        }
        for label in labels {
            if label_is_excluded(label) {
                self.mapping.insert(label.to_string(), EXCLUDED_COLOR);
            }
        }
    }

    /// Look up the colour for a label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping.get(label).copied().unwrap_or(Color32::GRAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excluded_labels_are_red_others_distinct() {
        let mut colors = LabelColors::default();
        colors.rebuild(["BAD_blink", "stimulus", "rest"]);
        assert_eq!(colors.color_for("BAD_blink"), EXCLUDED_COLOR);
        assert_ne!(colors.color_for("stimulus"), colors.color_for("rest"));
    }

    #[test]
    fn unknown_label_falls_back_to_gray() {
        let colors = LabelColors::default();
        assert_eq!(colors.color_for("nope"), Color32::GRAY);
    }
}
