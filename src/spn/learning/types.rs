use serde::{Deserialize, Serialize};

/// 判别式学习以“正趟信号 − 实际趟信号”为更新方向；生成式学习只用正趟信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningType {
    #[default]
    Discriminative,
    Generative,
}

/// 学习信号的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningInferenceType {
    /// 硬 EM：MPE 路径上的计数
    #[default]
    Hard,
    /// 硬 EM，选子项时忽略权重
    HardUnweighted,
    /// 软 EM：按后验比例分配的计数
    SoftEm,
    /// 梯度
    #[serde(alias = "soft")]
    Gradient,
}
