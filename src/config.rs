//! Engine settings shared by every node of a model.
use crate::store::GraphError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Force independent deferred values on the rayon pool in `compute_all`.
    pub parallel: bool,
    /// Batch size used by `generate` when the caller gives none.
    pub default_batch_size: Option<usize>,
    /// Base seed given to newly created nodes.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { parallel: true, default_batch_size: None, seed: 0 }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let config: Self = serde_json::from_str(json).map_err(|e| GraphError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if self.default_batch_size == Some(0) {
            return Err(GraphError::Config("default_batch_size must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{ "seed": 42 }"#).unwrap();
        assert_eq!(config, EngineConfig { seed: 42, ..Default::default() });
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(EngineConfig::from_json("{ seed: }"), Err(GraphError::Config(_))));
        assert!(matches!(
            EngineConfig::from_json(r#"{ "default_batch_size": 0 }"#),
            Err(GraphError::Config(_))
        ));
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = EngineConfig { parallel: false, default_batch_size: Some(16), seed: 7 };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }
}
