use crate::errors::LabelError;
use crate::labels::ClassLabelTable;
use common::{env_or, env_parse};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_BOXES: usize = 40;

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub model_server_url: String,
    pub model_name: String,
    pub signature_name: String,
    pub request_timeout_ms: u64,
    pub confidence_threshold: f32,
    pub max_boxes: usize,
    /// Inline `id=label` list; `None` uses the built-in labels.
    pub class_labels: Option<String>,
    /// Label file, takes precedence over `class_labels`.
    pub class_labels_file: Option<String>,
}

impl InferenceConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            model_server_url: env_or("MODEL_SERVER_URL", "http://localhost:8501"),
            model_name: env_or("MODEL_NAME", "detector"),
            signature_name: env_or("MODEL_SIGNATURE", "serving_default"),
            request_timeout_ms: env_parse("MODEL_TIMEOUT_MS", 30_000),
            confidence_threshold: env_parse("CONFIDENCE_THRESHOLD", DEFAULT_CONFIDENCE_THRESHOLD),
            max_boxes: env_parse("MAX_BOXES", DEFAULT_MAX_BOXES),
            class_labels: std::env::var("CLASS_LABELS").ok(),
            class_labels_file: std::env::var("CLASS_LABELS_FILE").ok(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            anyhow::bail!(
                "CONFIDENCE_THRESHOLD must be within [0, 1], got {}",
                self.confidence_threshold
            );
        }
        if self.max_boxes == 0 {
            anyhow::bail!("MAX_BOXES must be at least 1");
        }
        if self.model_name.trim().is_empty() {
            anyhow::bail!("MODEL_NAME must not be empty");
        }
        Ok(())
    }

    /// Build the label table this configuration names.
    pub fn load_class_labels(&self) -> Result<ClassLabelTable, LabelError> {
        if let Some(path) = &self.class_labels_file {
            return ClassLabelTable::from_file(path);
        }
        match &self.class_labels {
            Some(entries) => ClassLabelTable::parse(entries),
            None => Ok(ClassLabelTable::default_table().clone()),
        }
    }

    /// Create default configuration for testing
    #[cfg(test)]
    pub fn test_default() -> Self {
        Self {
            model_server_url: "http://localhost:8501".to_string(),
            model_name: "detector".to_string(),
            signature_name: "serving_default".to_string(),
            request_timeout_ms: 1_000,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_boxes: DEFAULT_MAX_BOXES,
            class_labels: None,
            class_labels_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const VARS: [&str; 8] = [
        "MODEL_SERVER_URL",
        "MODEL_NAME",
        "MODEL_SIGNATURE",
        "MODEL_TIMEOUT_MS",
        "CONFIDENCE_THRESHOLD",
        "MAX_BOXES",
        "CLASS_LABELS",
        "CLASS_LABELS_FILE",
    ];

    fn clear_vars() {
        for var in VARS {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_vars();
        let config = InferenceConfig::from_env().unwrap();

        assert_eq!(config.model_server_url, "http://localhost:8501");
        assert_eq!(config.model_name, "detector");
        assert_eq!(config.signature_name, "serving_default");
        assert_eq!(config.request_timeout_ms, 30_000);
        assert_eq!(config.confidence_threshold, 0.7);
        assert_eq!(config.max_boxes, 40);
        assert_eq!(config.class_labels, None);
        assert_eq!(config.class_labels_file, None);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_vars();
        let mut labels = tempfile::NamedTempFile::new().unwrap();
        writeln!(labels, "3=pallet").unwrap();

        unsafe {
            std::env::set_var("MODEL_SERVER_URL", "http://tf-serving:8501");
            std::env::set_var("MODEL_NAME", "boxes");
            std::env::set_var("MODEL_SIGNATURE", "detect");
            std::env::set_var("MODEL_TIMEOUT_MS", "2500");
            std::env::set_var("CONFIDENCE_THRESHOLD", "0.55");
            std::env::set_var("MAX_BOXES", "not-a-number");
            std::env::set_var("CLASS_LABELS_FILE", labels.path());
        }

        let config = InferenceConfig::from_env().unwrap();
        assert_eq!(config.model_server_url, "http://tf-serving:8501");
        assert_eq!(config.model_name, "boxes");
        assert_eq!(config.signature_name, "detect");
        assert_eq!(config.request_timeout_ms, 2500);
        assert_eq!(config.confidence_threshold, 0.55);
        assert_eq!(config.max_boxes, 40, "Unparseable value falls back");
        assert_eq!(config.load_class_labels().unwrap().label(3), "pallet");

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_invalid_policy() {
        clear_vars();

        unsafe { std::env::set_var("CONFIDENCE_THRESHOLD", "1.5") };
        let err = InferenceConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("CONFIDENCE_THRESHOLD"));

        unsafe {
            std::env::remove_var("CONFIDENCE_THRESHOLD");
            std::env::set_var("MAX_BOXES", "0");
        }
        assert!(InferenceConfig::from_env().is_err());

        clear_vars();
    }

    #[test]
    fn test_default_policy_constants() {
        let config = InferenceConfig::test_default();
        assert_eq!(config.confidence_threshold, 0.7);
        assert_eq!(config.max_boxes, 40);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_policy() {
        let mut config = InferenceConfig::test_default();
        config.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = InferenceConfig::test_default();
        config.max_boxes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_class_labels_prefers_inline_over_default() {
        let mut config = InferenceConfig::test_default();
        assert_eq!(config.load_class_labels().unwrap().label(1), "box");

        config.class_labels = Some("1=crate,9=pallet".to_string());
        let table = config.load_class_labels().unwrap();
        assert_eq!(table.label(1), "crate");
        assert_eq!(table.label(2), "#2");

        config.class_labels_file = Some("/nonexistent/labels.txt".to_string());
        assert!(matches!(
            config.load_class_labels(),
            Err(LabelError::Io { .. })
        ));
    }
}
