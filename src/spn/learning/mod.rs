/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 学习：以某种学习信号（梯度、硬/软 EM 计数）为网络中每个可学习的节点累积更新量，
 *                 再一次性提交到网络参数上
 */

mod config;
mod gd;
mod types;

pub use config::GDLearningConfig;
pub use gd::{GDLearning, LeafParamRecord, OpGroup, ParamRecord};
pub use types::{LearningInferenceType, LearningType};
