use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Rgba = Rgba::rgb(0x00, 0x00, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self::rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    pub fn with_alpha(self, alpha: f64) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    pub fn lerp(self, to: Rgba, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Self {
            r: mix(self.r, to.r),
            g: mix(self.g, to.g),
            b: mix(self.b, to.b),
            a: mix(self.a, to.a),
        }
    }

    /// Relative luminance in `[0, 1]` (Rec. 709 weights, no gamma).
    pub fn luminance(self) -> f64 {
        (0.2126 * self.r as f64 + 0.7152 * self.g as f64 + 0.0722 * self.b as f64) / 255.0
    }

    /// Black or white, whichever reads better on top of this color.
    pub fn contrasting_text(self) -> Rgba {
        if self.luminance() > 0.5 {
            Rgba::BLACK
        } else {
            Rgba::WHITE
        }
    }

    /// `#rrggbb` form used by the exporters.
    pub fn to_hex_string(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Ten-color categorical palette (Tableau 10).
pub const CATEGORY10: [Rgba; 10] = [
    Rgba::from_hex(0x1f77b4),
    Rgba::from_hex(0xff7f0e),
    Rgba::from_hex(0x2ca02c),
    Rgba::from_hex(0xd62728),
    Rgba::from_hex(0x9467bd),
    Rgba::from_hex(0x8c564b),
    Rgba::from_hex(0xe377c2),
    Rgba::from_hex(0x7f7f7f),
    Rgba::from_hex(0xbcbd22),
    Rgba::from_hex(0x17becf),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorMode {
    /// Fixed palette cycled by sibling index.
    Categorical,
    /// Gradient keyed by `ln(value + 1)` relative to the largest value shown.
    LogScale { low: Rgba, high: Rgba },
}

impl Default for ColorMode {
    fn default() -> Self {
        ColorMode::Categorical
    }
}

/// Deterministic node-to-color mapping for one render pass.
#[derive(Clone, Debug)]
pub struct ColorAssigner {
    mode: ColorMode,
    log_max: f64,
}

impl ColorAssigner {
    /// `max_value` is the largest leaf value in the view being colored.
    pub fn new(mode: ColorMode, max_value: f64) -> Self {
        Self {
            mode,
            log_max: max_value.max(0.0).ln_1p(),
        }
    }

    pub fn color(&self, sibling_index: usize, value: f64) -> Rgba {
        match &self.mode {
            ColorMode::Categorical => CATEGORY10[sibling_index % CATEGORY10.len()],
            ColorMode::LogScale { low, high } => {
                let t = if self.log_max > 0.0 {
                    value.max(0.0).ln_1p() / self.log_max
                } else {
                    0.0
                };
                low.lerp(*high, t)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorical_cycles() {
        let c = ColorAssigner::new(ColorMode::Categorical, 100.0);
        assert_eq!(c.color(0, 1.0), CATEGORY10[0]);
        assert_eq!(c.color(10, 1.0), CATEGORY10[0]);
        assert_eq!(c.color(3, 1.0), CATEGORY10[3]);
    }

    #[test]
    fn log_scale_spreads_small_values() {
        let low = Rgba::rgb(0, 0, 0);
        let high = Rgba::rgb(200, 200, 200);
        let c = ColorAssigner::new(ColorMode::LogScale { low, high }, 1_000_000.0);
        assert_eq!(c.color(0, 0.0), low);
        assert_eq!(c.color(0, 1_000_000.0), high);
        // On a linear scale 1000 would be indistinguishable from zero.
        assert!(c.color(0, 1000.0).r > 90);
    }

    #[test]
    fn log_scale_with_nothing_positive_is_low() {
        let low = Rgba::rgb(1, 2, 3);
        let c = ColorAssigner::new(
            ColorMode::LogScale {
                low,
                high: Rgba::WHITE,
            },
            0.0,
        );
        assert_eq!(c.color(0, 5.0), low);
    }

    #[test]
    fn text_contrast() {
        assert_eq!(Rgba::WHITE.contrasting_text(), Rgba::BLACK);
        assert_eq!(Rgba::from_hex(0x1f77b4).contrasting_text(), Rgba::WHITE);
        assert_eq!(Rgba::from_hex(0x1f77b4).to_hex_string(), "#1f77b4");
    }
}
