use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::PartialParams;

/// Selector entry shown when the catalog could not be loaded or is empty.
pub const DEFAULT_PRESET: &str = "default";

/// Preset name to partial parameter object, in server document order.
///
/// Entries are kept as served. A malformed entry still lists its name but
/// never resolves to parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetCatalog {
    presets: IndexMap<String, Value>,
}

impl PresetCatalog {

    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Parameters of `name`, or `None` when absent or not an object.
    pub fn get(&self, name: &str) -> Option<PartialParams> {
        let object = self.presets.get(name)?.as_object()?;
        Some(
            object
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

/// Entries for the preset selector. Falls back to a lone `default`.
pub fn preset_choices(names: &[String]) -> Vec<String> {
    if names.is_empty() {
        return vec![DEFAULT_PRESET.to_string()];
    }
    names.to_vec()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{preset_choices, PresetCatalog};

    const CATALOG: &str = r##"{
        "default": {"size": 1024, "seed": null},
        "warm-dusk": {"tone_lo": "#1b0f0a", "tone_hi": "#f48b45", "tone_strength": 0.95},
        "bold-grid": {"grid_n": 28, "line_alpha": 0.3, "line_density": 60}
    }"##;

    #[test]
    fn catalog_keeps_document_order() -> anyhow::Result<()> {
        let catalog = PresetCatalog::from_json_str(CATALOG)?;
        assert_eq!(catalog.names(), vec!["default", "warm-dusk", "bold-grid"]);
        assert_eq!(catalog.len(), 3);
        Ok(())
    }

    #[test]
    fn catalog_lookup_returns_partial_object() -> anyhow::Result<()> {
        let catalog = PresetCatalog::from_json_str(CATALOG)?;
        let bold = catalog.get("bold-grid").unwrap_or_default();
        assert_eq!(bold.get("grid_n"), Some(&json!(28)));
        assert!(!catalog.contains("neon"));
        assert!(catalog.get("neon").is_none());
        Ok(())
    }

    #[test]
    fn malformed_entry_keeps_the_other_names() -> anyhow::Result<()> {
        let catalog = PresetCatalog::from_json_str(
            r#"{"broken": 3, "geo-lines": {"arc_count": 7}, "listy": [1, 2]}"#,
        )?;
        assert_eq!(catalog.names(), vec!["broken", "geo-lines", "listy"]);
        assert!(catalog.contains("broken"));
        assert_eq!(catalog.get("broken"), None);
        assert_eq!(catalog.get("listy"), None);
        let geo = catalog.get("geo-lines").unwrap_or_default();
        assert_eq!(geo.get("arc_count"), Some(&json!(7)));
        Ok(())
    }

    #[test]
    fn catalog_must_be_an_object() {
        assert!(PresetCatalog::from_json_str("[]").is_err());
        assert!(PresetCatalog::from_json_str("\"default\"").is_err());
    }

    #[test]
    fn preset_choices_fall_back_to_default() {
        assert_eq!(preset_choices(&[]), vec!["default"]);
        let names = vec!["geo-lines".to_string(), "warm-dusk".to_string()];
        assert_eq!(preset_choices(&names), names);
    }
}
