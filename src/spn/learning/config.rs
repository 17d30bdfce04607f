/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : GDLearning 的配置，可从 JSON 读取；缺省字段取默认值
 */

use super::types::{LearningInferenceType, LearningType};
use crate::spn::inference::InferenceType;
use crate::spn::SpnError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GDLearningConfig {
    pub learning_rate: f32,
    /// 是否在对数空间中推断
    pub log: bool,
    /// 求值方式；`None`表示由信号提供者决定
    pub value_inference_type: Option<InferenceType>,
    pub learning_type: LearningType,
    pub learning_inference_type: LearningInferenceType,
    /// 硬路径选子项时加的均匀噪声上界
    pub add_random: Option<f32>,
    /// 噪声的随机种子
    pub seed: Option<u64>,
}

impl Default for GDLearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            log: true,
            value_inference_type: None,
            learning_type: LearningType::default(),
            learning_inference_type: LearningInferenceType::default(),
            add_random: None,
            seed: None,
        }
    }
}

impl GDLearningConfig {
    /// 从 JSON 字符串读取并校验
    pub fn from_json_str(json: &str) -> Result<Self, SpnError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SpnError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, SpnError> {
        serde_json::to_string_pretty(self).map_err(|e| SpnError::Config(e.to_string()))
    }

    /// 学习率须为有限正数；`add_random`若给出须为有限正数
    pub fn validate(&self) -> Result<(), SpnError> {
        if !(self.learning_rate > 0.0) || !self.learning_rate.is_finite() {
            return Err(SpnError::InvalidConfig(format!(
                "学习率必须为正数，但得到 {}",
                self.learning_rate
            )));
        }
        if let Some(r) = self.add_random {
            if !(r > 0.0) || !r.is_finite() {
                return Err(SpnError::InvalidConfig(format!(
                    "add_random必须为正数，但得到 {r}"
                )));
            }
        }
        Ok(())
    }
}
