//! Panel configuration model.

use serde::{Deserialize, Serialize};

/// Root configuration for the panel core.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
    /// Local HR identity used for sending and notification suppression.
    pub hr: HrIdentity,
    /// Store collection names and channel sizing.
    pub store: StoreConfig,
}

/// The fixed HR identity of this panel instance.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HrIdentity {
    /// Sender id written into outbound messages.
    pub sender_id: String,
    /// Display name written into conversation participant lists.
    pub display_name: String,
}

impl Default for HrIdentity {
    fn default() -> Self {
        Self {
            sender_id: "HR".to_string(),
            display_name: "HR".to_string(),
        }
    }
}

/// Store collection names and channel sizing.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Root collection of conversation records.
    pub conversations_collection: String,
    /// Collection of feedback records (doubles as the employee roster).
    pub feedback_collection: String,
    /// Buffer size of the event channels towards the presentation layer.
    pub event_channel_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            conversations_collection: "conversations".to_string(),
            feedback_collection: "feedback".to_string(),
            event_channel_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PanelConfig::default();
        assert_eq!(config.hr.sender_id, "HR");
        assert_eq!(config.store.conversations_collection, "conversations");
        assert_eq!(config.store.feedback_collection, "feedback");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: PanelConfig = toml::from_str(
            r#"
            [hr]
            display_name = "People Team"
            "#,
        )
        .unwrap();

        assert_eq!(config.hr.display_name, "People Team");
        assert_eq!(config.hr.sender_id, "HR");
        assert_eq!(config.store.feedback_collection, "feedback");
    }
}
