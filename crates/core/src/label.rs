use serde::{Deserialize, Serialize};

use crate::model::Rect;

const ELLIPSIS: char = '…';

/// Measures rendered text width in canvas pixels.
pub trait TextMeasure {
    fn text_width(&self, text: &str) -> f64;
}

impl<F: Fn(&str) -> f64> TextMeasure for F {
    fn text_width(&self, text: &str) -> f64 {
        self(text)
    }
}

/// Approximation for headless use: every character has the same advance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedWidthMeasure {
    pub char_width: f64,
}

impl Default for FixedWidthMeasure {
    fn default() -> Self {
        Self { char_width: 7.0 }
    }
}

impl TextMeasure for FixedWidthMeasure {
    fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.char_width
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub name_min_width: f64,
    pub name_min_height: f64,
    pub value_min_width: f64,
    pub value_min_height: f64,
    /// Horizontal space kept free on each side of a label.
    pub padding: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            name_min_width: 30.0,
            name_min_height: 16.0,
            value_min_width: 50.0,
            value_min_height: 34.0,
            padding: 4.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellLabels {
    pub name: Option<String>,
    pub value: Option<String>,
}

/// Decides which labels a cell of size `rect` can carry.
///
/// The value label is only shown together with the name label.
pub fn fit_labels(
    rect: Rect,
    name: &str,
    value_text: &str,
    config: &LabelConfig,
    measure: &dyn TextMeasure,
) -> CellLabels {
    let (w, h) = (rect.width(), rect.height());
    if w <= config.name_min_width || h <= config.name_min_height {
        return CellLabels::default();
    }
    let available = w - 2.0 * config.padding;
    let name = truncate_to_width(name, available, measure);
    let value = if name.is_some() && w > config.value_min_width && h > config.value_min_height {
        truncate_to_width(value_text, available, measure)
    } else {
        None
    };
    CellLabels { name, value }
}

/// Drops trailing characters and appends an ellipsis until the text fits.
/// `None` when not even a single character plus ellipsis fits.
pub fn truncate_to_width(text: &str, available: f64, measure: &dyn TextMeasure) -> Option<String> {
    if text.is_empty() || available <= 0.0 {
        return None;
    }
    if measure.text_width(text) <= available {
        return Some(text.to_string());
    }
    let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).skip(1).collect();
    for &end in boundaries.iter().rev() {
        let mut candidate = text[..end].trim_end().to_string();
        if candidate.is_empty() {
            continue;
        }
        candidate.push(ELLIPSIS);
        if measure.text_width(&candidate) <= available {
            return Some(candidate);
        }
    }
    None
}
