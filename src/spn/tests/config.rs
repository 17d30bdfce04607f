use crate::assert_err;
use crate::spn::{GDLearningConfig, InferenceType, LearningInferenceType, LearningType, SpnError};

#[test]
fn test_defaults() {
    let config = GDLearningConfig::default();
    assert_eq!(config.learning_rate, 0.1);
    assert!(config.log);
    assert_eq!(config.value_inference_type, None);
    assert_eq!(config.learning_type, LearningType::Discriminative);
    assert_eq!(config.learning_inference_type, LearningInferenceType::Hard);
    assert_eq!(config.add_random, None);
    assert!(config.validate().is_ok());

    // 缺省字段取默认值
    assert_eq!(GDLearningConfig::from_json_str("{}").unwrap(), config);
}

#[test]
fn test_from_json() {
    let config = GDLearningConfig::from_json_str(
        r#"{
            "learning_rate": 0.05,
            "log": false,
            "value_inference_type": "marginal",
            "learning_type": "generative",
            "learning_inference_type": "soft_em",
            "seed": 7
        }"#,
    )
    .unwrap();
    assert_eq!(config.learning_rate, 0.05);
    assert!(!config.log);
    assert_eq!(config.value_inference_type, Some(InferenceType::Marginal));
    assert_eq!(config.learning_type, LearningType::Generative);
    assert_eq!(config.learning_inference_type, LearningInferenceType::SoftEm);
    assert_eq!(config.seed, Some(7));

    let soft = GDLearningConfig::from_json_str(r#"{"learning_inference_type": "soft"}"#).unwrap();
    assert_eq!(soft.learning_inference_type, LearningInferenceType::Gradient);
}

#[test]
fn test_json_round_trip() {
    let config = GDLearningConfig {
        learning_rate: 0.25,
        learning_inference_type: LearningInferenceType::HardUnweighted,
        add_random: Some(0.5),
        ..Default::default()
    };
    let json = config.to_json_string().unwrap();
    assert!(json.contains("\"hard_unweighted\""));
    assert_eq!(GDLearningConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_invalid_config() {
    assert_err!(GDLearningConfig::from_json_str("{"), SpnError::Config(_));
    assert_err!(
        GDLearningConfig::from_json_str(r#"{"learning_type": "unsupervised"}"#),
        SpnError::Config(_)
    );
    assert_err!(
        GDLearningConfig::from_json_str(r#"{"learning_rate": 0}"#),
        SpnError::InvalidConfig("学习率必须为正数，但得到 0")
    );
    assert_err!(
        GDLearningConfig::from_json_str(r#"{"learning_rate": -0.5}"#),
        SpnError::InvalidConfig("学习率必须为正数，但得到 -0.5")
    );
    let config = GDLearningConfig {
        add_random: Some(-1.),
        ..Default::default()
    };
    assert_err!(config.validate(), SpnError::InvalidConfig(_));
}
