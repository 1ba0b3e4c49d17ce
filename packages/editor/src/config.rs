use serde::{Deserialize, Serialize};

/// Editor tuning, loaded from the `editor` section of the project config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum undo entries kept per session (0 = unlimited)
    #[serde(default = "default_max_undo_levels")]
    pub max_undo_levels: usize,

    #[serde(default)]
    pub placement: PlacementConfig,
}

/// Drop-zone geometry for pointer drags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementConfig {
    /// Pointer ratios below this land `before` the candidate
    #[serde(default = "default_before_ratio")]
    pub before_ratio: f64,

    /// Pointer ratios above this land `after` the candidate
    #[serde(default = "default_after_ratio")]
    pub after_ratio: f64,

    /// Horizontal width of one nesting level, in pixels
    #[serde(default = "default_indent_unit")]
    pub indent_unit: f64,

    /// Pointer travel needed before a drag is armed, in pixels
    #[serde(default = "default_arm_threshold")]
    pub arm_threshold: f64,

    /// Allow `before`/`after` drops to climb to coarser ancestors
    #[serde(default = "default_climb")]
    pub climb: bool,
}

fn default_max_undo_levels() -> usize {
    100
}

fn default_before_ratio() -> f64 {
    0.35
}

fn default_after_ratio() -> f64 {
    0.65
}

fn default_indent_unit() -> f64 {
    24.0
}

fn default_arm_threshold() -> f64 {
    4.0
}

fn default_climb() -> bool {
    true
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo_levels: default_max_undo_levels(),
            placement: PlacementConfig::default(),
        }
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            before_ratio: default_before_ratio(),
            after_ratio: default_after_ratio(),
            indent_unit: default_indent_unit(),
            arm_threshold: default_arm_threshold(),
            climb: default_climb(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let json = r#"{
            "maxUndoLevels": 20,
            "placement": { "indentUnit": 16, "climb": false }
        }"#;

        let config = EditorConfig::from_json(json).unwrap();
        assert_eq!(config.max_undo_levels, 20);
        assert_eq!(config.placement.indent_unit, 16.0);
        assert!(!config.placement.climb);
        assert_eq!(config.placement.before_ratio, 0.35);
        assert_eq!(config.placement.after_ratio, 0.65);
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::from_json("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.max_undo_levels, 100);
        assert_eq!(config.placement.arm_threshold, 4.0);
    }
}
