/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 和积网络：图与节点、推断（求值与传信号）以及学习
 */

mod graph;
mod inference;
mod learning;
mod nodes;

#[cfg(test)]
mod tests;

pub use graph::{GraphInner, Scope, SpnError, SpnGraph};
pub use inference::{
    Feed, Gradient, InferenceType, MpePath, NodeTable, PassContext, PassResult, SignalRule,
    SignalTable, ValueTable,
};
pub use learning::{
    GDLearning, GDLearningConfig, LeafParamRecord, LearningInferenceType, LearningType, OpGroup,
    ParamRecord,
};
pub use nodes::{Input, NodeId, WeightsInit};
