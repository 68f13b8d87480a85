// Application configuration model
// Persisted as a flat JSON object in <root>/config/config.json

use serde::{Deserialize, Serialize};

/// Global toggles shared by the control panel and every note window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub hidden: bool,
    pub editable: bool,
    pub opacity: f64,
    pub expanded: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hidden: false,
            editable: true,
            opacity: 1.0,
            expanded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"opacity":0.5}"#).unwrap();
        assert_eq!(config.opacity, 0.5);
        assert!(config.editable);
        assert!(!config.hidden);
        assert!(!config.expanded);
    }

    #[test]
    fn test_config_serializes_flat() {
        let json = serde_json::to_string(&AppConfig::default()).unwrap();
        assert_eq!(json, r#"{"hidden":false,"editable":true,"opacity":1.0,"expanded":false}"#);
    }
}
