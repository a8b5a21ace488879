use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::render::{CellKey, RenderCell};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HoverEvent {
    Enter(CellKey),
    Leave(CellKey),
}

/// Tracks which cell the pointer is over.
///
/// Only the latest target is stored, so a pointer that skips over cells or
/// leaves the canvas between two samples still produces exactly one leave.
#[derive(Debug, Default)]
pub struct HoverState {
    current: Option<CellKey>,
}

impl HoverState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&CellKey> {
        self.current.as_ref()
    }

    pub fn is_hovered(&self, key: &CellKey) -> bool {
        self.current.as_ref() == Some(key)
    }

    pub fn update(&mut self, next: Option<CellKey>) -> Vec<HoverEvent> {
        if self.current == next {
            return Vec::new();
        }
        let mut events = Vec::with_capacity(2);
        if let Some(prev) = self.current.take() {
            events.push(HoverEvent::Leave(prev));
        }
        if let Some(next) = next {
            events.push(HoverEvent::Enter(next.clone()));
            self.current = Some(next);
        }
        events
    }

    pub fn clear(&mut self) -> Vec<HoverEvent> {
        self.update(None)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverStyle {
    pub stroke: Rgba,
    pub stroke_width: f64,
    pub hover_stroke: Rgba,
    pub hover_stroke_width: f64,
    pub match_stroke: Rgba,
    pub fill_opacity: f64,
    pub hover_fill_opacity: f64,
}

impl Default for HoverStyle {
    fn default() -> Self {
        Self {
            stroke: Rgba::WHITE,
            stroke_width: 1.0,
            hover_stroke: Rgba::from_hex(0x222222),
            hover_stroke_width: 3.0,
            match_stroke: Rgba::from_hex(0xffd400),
            fill_opacity: 0.8,
            hover_fill_opacity: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellStyle {
    pub fill: Rgba,
    pub stroke: Rgba,
    pub stroke_width: f64,
    pub text: Rgba,
}

/// Resolved paint for a cell. `opacity` is the animation opacity and scales
/// every channel's alpha.
pub fn cell_style(cell: &RenderCell, hovered: bool, opacity: f64, style: &HoverStyle) -> CellStyle {
    let (fill_opacity, stroke, stroke_width) = if hovered {
        (style.hover_fill_opacity, style.hover_stroke, style.hover_stroke_width)
    } else if cell.matched {
        (style.fill_opacity, style.match_stroke, style.hover_stroke_width)
    } else {
        (style.fill_opacity, style.stroke, style.stroke_width)
    };
    CellStyle {
        fill: cell.color.with_alpha(fill_opacity * opacity),
        stroke: stroke.with_alpha(opacity),
        stroke_width,
        text: cell.color.contrasting_text().with_alpha(opacity),
    }
}
