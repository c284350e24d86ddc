use crate::session::{THRESHOLD_MAX, THRESHOLD_MIN};
use std::env;

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub environment: Environment,
    pub model_path: String,
    pub label_path: String,
    pub threshold: f32,
}

impl ExecutorConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::build(
            Environment::from_env(),
            env::var("MODEL_PATH").ok(),
            env::var("LABEL_PATH").ok(),
            env::var("THRESHOLD").ok(),
        ))
    }

    fn build(
        environment: Environment,
        model_path: Option<String>,
        label_path: Option<String>,
        threshold: Option<String>,
    ) -> Self {
        let model_path = model_path.unwrap_or_else(|| "/models/mobilenet_v2.nnc".to_string());
        let label_path = label_path.unwrap_or_else(|| "/models/labels.txt".to_string());

        let threshold = threshold
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.5f32)
            .clamp(THRESHOLD_MIN, THRESHOLD_MAX);

        Self {
            environment,
            model_path,
            label_path,
            threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_when_nothing_is_set() {
        let config = ExecutorConfig::build(Environment::Development, None, None, None);

        assert_eq!(config.model_path, "/models/mobilenet_v2.nnc");
        assert_eq!(config.label_path, "/models/labels.txt");
        assert_eq!(config.threshold, 0.5);
    }

    #[test]
    fn test_threshold_is_clamped_to_contract_range() {
        let config = ExecutorConfig::build(
            Environment::Development,
            None,
            None,
            Some("4.0".to_string()),
        );
        assert_eq!(config.threshold, THRESHOLD_MAX, "4.0 must clamp to 0.95");

        let config = ExecutorConfig::build(
            Environment::Development,
            None,
            None,
            Some("-1.0".to_string()),
        );
        assert_eq!(config.threshold, THRESHOLD_MIN);
    }

    #[test]
    fn test_unparseable_threshold_falls_back_to_default() {
        let config = ExecutorConfig::build(
            Environment::Development,
            None,
            None,
            Some("not-a-number".to_string()),
        );
        assert_eq!(config.threshold, 0.5);
    }

    #[test]
    fn test_explicit_paths_are_kept() {
        let config = ExecutorConfig::build(
            Environment::Production,
            Some("/opt/models/posenet.nnc".to_string()),
            Some("/opt/models/coco.txt".to_string()),
            None,
        );

        assert_eq!(config.model_path, "/opt/models/posenet.nnc");
        assert_eq!(config.label_path, "/opt/models/coco.txt");
        assert!(config.environment.is_production());
    }
}
