use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{Point, Rect, Size};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TooltipMode {
    /// Offset from the pointer, flipped to the other side near an edge.
    FollowPointer { offset_x: f64, offset_y: f64 },
    /// Pinned to a corner of the canvas.
    CanvasCorner { corner: Corner, inset: f64 },
}

impl Default for TooltipMode {
    fn default() -> Self {
        TooltipMode::FollowPointer {
            offset_x: 12.0,
            offset_y: 12.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TooltipContent {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TooltipAnchor {
    /// Hovered cell in canvas coordinates.
    pub cell: Rect,
    /// Pointer in screen coordinates, when known.
    pub pointer: Option<Point>,
}

/// Top-left screen position for a tooltip of `size`, kept inside `viewport`.
///
/// `canvas_screen` is where the canvas sits on screen; canvas coordinates
/// are offsets from its top-left corner.
pub fn position_tooltip(
    mode: TooltipMode,
    anchor: TooltipAnchor,
    canvas_screen: Rect,
    viewport: Rect,
    size: Size,
) -> Point {
    match mode {
        TooltipMode::FollowPointer { offset_x, offset_y } => {
            let p = anchor.pointer.unwrap_or_else(|| {
                let c = anchor.cell.center();
                Point::new(canvas_screen.x0 + c.x, canvas_screen.y0 + c.y)
            });
            let mut x = p.x + offset_x;
            if x + size.width > viewport.x1 {
                x = p.x - offset_x - size.width;
            }
            let mut y = p.y + offset_y;
            if y + size.height > viewport.y1 {
                y = p.y - offset_y - size.height;
            }
            clamp_into(Point::new(x, y), size, viewport)
        }
        TooltipMode::CanvasCorner { corner, inset } => {
            let c = canvas_screen;
            let p = match corner {
                Corner::TopLeft => Point::new(c.x0 + inset, c.y0 + inset),
                Corner::TopRight => Point::new(c.x1 - inset - size.width, c.y0 + inset),
                Corner::BottomLeft => Point::new(c.x0 + inset, c.y1 - inset - size.height),
                Corner::BottomRight => {
                    Point::new(c.x1 - inset - size.width, c.y1 - inset - size.height)
                }
            };
            let visible = canvas_screen.intersect(&viewport);
            let bounds = if visible.is_empty() { viewport } else { visible };
            clamp_into(p, size, bounds)
        }
    }
}

// Oversized tooltips stick to the top-left edge of `bounds`.
fn clamp_into(p: Point, size: Size, bounds: Rect) -> Point {
    let max_x = (bounds.x1 - size.width).max(bounds.x0);
    let max_y = (bounds.y1 - size.height).max(bounds.y0);
    Point::new(p.x.clamp(bounds.x0, max_x), p.y.clamp(bounds.y0, max_y))
}

/// Where the engine publishes tooltip changes. Passed in at construction so
/// several engines never fight over one shared panel.
pub trait TooltipSurface {
    fn show(&mut self, content: TooltipContent, anchor: TooltipAnchor, now: Duration);
    fn hide(&mut self, now: Duration);
}

/// Headless engines have nothing to show.
impl TooltipSurface for () {
    fn show(&mut self, _content: TooltipContent, _anchor: TooltipAnchor, _now: Duration) {}
    fn hide(&mut self, _now: Duration) {}
}

/// Single tooltip with a two-state show/hide and a short fade.
///
/// Showing new content while visible swaps it in place; a show during a
/// fade-out reverses the fade from the current opacity.
#[derive(Clone, Debug)]
pub struct TooltipPanel {
    content: Option<TooltipContent>,
    anchor: Option<TooltipAnchor>,
    visible: bool,
    fade: Duration,
    from_opacity: f64,
    changed_at: Duration,
}

impl TooltipPanel {
    pub fn new(fade: Duration) -> Self {
        Self {
            content: None,
            anchor: None,
            visible: false,
            fade,
            from_opacity: 0.0,
            changed_at: Duration::ZERO,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn content(&self) -> Option<&TooltipContent> {
        self.content.as_ref()
    }

    pub fn anchor(&self) -> Option<TooltipAnchor> {
        self.anchor
    }

    pub fn opacity(&self, now: Duration) -> f64 {
        let target = if self.visible { 1.0 } else { 0.0 };
        if self.fade.is_zero() {
            return target;
        }
        let t = (now.saturating_sub(self.changed_at).as_secs_f64() / self.fade.as_secs_f64())
            .clamp(0.0, 1.0);
        self.from_opacity + (target - self.from_opacity) * t
    }

    pub fn is_fading(&self, now: Duration) -> bool {
        now.saturating_sub(self.changed_at) < self.fade
    }

    /// Screen position for the current content, `None` once fully hidden.
    pub fn placement(
        &self,
        mode: TooltipMode,
        canvas_screen: Rect,
        viewport: Rect,
        size: Size,
        now: Duration,
    ) -> Option<Point> {
        if self.opacity(now) <= 0.0 {
            return None;
        }
        let anchor = self.anchor?;
        Some(position_tooltip(mode, anchor, canvas_screen, viewport, size))
    }
}

impl TooltipSurface for TooltipPanel {
    fn show(&mut self, content: TooltipContent, anchor: TooltipAnchor, now: Duration) {
        self.content = Some(content);
        self.anchor = Some(anchor);
        if !self.visible {
            self.from_opacity = self.opacity(now);
            self.changed_at = now;
            self.visible = true;
        }
    }

    fn hide(&mut self, now: Duration) {
        if self.visible {
            self.from_opacity = self.opacity(now);
            self.changed_at = now;
            self.visible = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Rect = Rect::new(0.0, 0.0, 800.0, 600.0);
    const CANVAS: Rect = Rect::new(100.0, 100.0, 500.0, 400.0);
    const SIZE: Size = Size::new(120.0, 40.0);

    fn content(name: &str) -> TooltipContent {
        TooltipContent {
            name: name.to_string(),
            value: "1".to_string(),
        }
    }

    fn at_pointer(x: f64, y: f64) -> TooltipAnchor {
        TooltipAnchor {
            cell: Rect::new(0.0, 0.0, 10.0, 10.0),
            pointer: Some(Point::new(x, y)),
        }
    }

    #[test]
    fn follows_pointer_with_offset() {
        let p = position_tooltip(TooltipMode::default(), at_pointer(200.0, 200.0), CANVAS, VIEWPORT, SIZE);
        assert_eq!(p, Point::new(212.0, 212.0));
    }

    #[test]
    fn flips_near_the_right_and_bottom_edges() {
        let p = position_tooltip(TooltipMode::default(), at_pointer(790.0, 590.0), CANVAS, VIEWPORT, SIZE);
        assert_eq!(p, Point::new(790.0 - 12.0 - 120.0, 590.0 - 12.0 - 40.0));
    }

    #[test]
    fn clamps_inside_viewport() {
        let p = position_tooltip(TooltipMode::default(), at_pointer(50.0, 5.0), CANVAS, Rect::new(0.0, 0.0, 100.0, 50.0), SIZE);
        // Flipped above and left of the pointer, then pulled back on screen.
        assert_eq!(p, Point::new(0.0, 0.0));
    }

    #[test]
    fn without_pointer_uses_cell_center() {
        let anchor = TooltipAnchor {
            cell: Rect::new(0.0, 0.0, 40.0, 20.0),
            pointer: None,
        };
        let p = position_tooltip(TooltipMode::default(), anchor, CANVAS, VIEWPORT, SIZE);
        assert_eq!(p, Point::new(132.0, 122.0));
    }

    #[test]
    fn corner_mode_pins_to_canvas() {
        let mode = TooltipMode::CanvasCorner {
            corner: Corner::BottomRight,
            inset: 8.0,
        };
        let p = position_tooltip(mode, at_pointer(0.0, 0.0), CANVAS, VIEWPORT, SIZE);
        assert_eq!(p, Point::new(500.0 - 8.0 - 120.0, 400.0 - 8.0 - 40.0));
    }

    #[test]
    fn rapid_hover_changes_swap_content_without_restarting_fade() {
        let fade = Duration::from_millis(100);
        let mut panel = TooltipPanel::new(fade);
        panel.show(content("a"), at_pointer(0.0, 0.0), Duration::ZERO);
        panel.show(content("b"), at_pointer(0.0, 0.0), Duration::from_millis(50));
        assert_eq!(panel.content().unwrap().name, "b");
        assert_eq!(panel.opacity(Duration::from_millis(100)), 1.0);
    }

    #[test]
    fn hide_fades_out_then_has_no_placement() {
        let fade = Duration::from_millis(100);
        let mut panel = TooltipPanel::new(fade);
        panel.show(content("a"), at_pointer(10.0, 10.0), Duration::ZERO);
        panel.hide(Duration::from_millis(200));
        let mid = panel.opacity(Duration::from_millis(250));
        assert!(mid > 0.0 && mid < 1.0);
        assert!(panel
            .placement(TooltipMode::default(), CANVAS, VIEWPORT, SIZE, Duration::from_millis(300))
            .is_none());
    }
}
