use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::ColorMode;
use crate::error::{Result, TreemapError};
use crate::human::ValueFormat;
use crate::interaction::HoverStyle;
use crate::label::LabelConfig;
use crate::render::AnimationConfig;
use crate::tooltip::TooltipMode;
use crate::treemap::Padding;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TooltipConfig {
    pub mode: TooltipMode,
    pub fade_ms: u64,
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            mode: TooltipMode::default(),
            fade_ms: 120,
        }
    }
}

impl TooltipConfig {
    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }
}

/// Everything tunable about the engine. Every field has a default, so a
/// config file only needs to name what it changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub padding: Padding,
    pub labels: LabelConfig,
    pub color: ColorMode,
    pub value_format: ValueFormat,
    pub tooltip: TooltipConfig,
    pub animation: AnimationConfig,
    pub hover: HoverStyle,
    /// Window for coalescing consecutive resizes; zero applies them at once.
    pub resize_debounce_ms: u64,
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let p = self.padding;
        if !(p.outer.is_finite() && p.inner.is_finite() && p.outer >= 0.0 && p.inner >= 0.0) {
            return Err(TreemapError::InvalidConfig(format!(
                "padding must be finite and non-negative, got outer={} inner={}",
                p.outer, p.inner
            )));
        }
        let opacities = [self.hover.fill_opacity, self.hover.hover_fill_opacity];
        if opacities.iter().any(|o| !(0.0..=1.0).contains(o)) {
            return Err(TreemapError::InvalidConfig(
                "fill opacities must lie in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tooltip::Corner;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_config_overrides_named_fields() {
        let config = EngineConfig::from_json(
            r#"{
                "padding": { "outer": 2 },
                "color": { "kind": "log_scale", "low": { "r": 0, "g": 0, "b": 0, "a": 255 },
                           "high": { "r": 255, "g": 0, "b": 0, "a": 255 } },
                "value_format": "bytes",
                "tooltip": { "mode": { "mode": "canvas_corner", "corner": "top_right", "inset": 4 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.padding.outer, 2.0);
        assert_eq!(config.padding.inner, 0.0);
        assert_eq!(config.value_format, ValueFormat::Bytes);
        assert_eq!(
            config.tooltip.mode,
            TooltipMode::CanvasCorner {
                corner: Corner::TopRight,
                inset: 4.0
            }
        );
        assert_eq!(config.tooltip.fade_ms, 120);
    }

    #[test]
    fn negative_padding_is_rejected() {
        let err = EngineConfig::from_json(r#"{ "padding": { "outer": -1 } }"#).unwrap_err();
        assert!(matches!(err, TreemapError::InvalidConfig(_)));
    }
}
