/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 和积网络（图、推断与学习）的错误类型
 */

use crate::errors::TensorError;
use crate::spn::NodeId;
use thiserror::Error;

/// 和积网络相关操作的错误类型
#[derive(Error, Debug, PartialEq)]
pub enum SpnError {
    /// 配置非法（如学习率不为正），在构造时即报错，从不静默修正
    #[error("配置非法：{0}")]
    InvalidConfig(String),
    /// 配置解析失败（JSON 格式或字段有误）
    #[error("配置解析失败：{0}")]
    Config(String),
    /// 遍历时发现环：和积网络必须是有向无环图，出现环说明调用方构图有误
    #[error("从节点{0:?}出发的遍历中发现了环")]
    CycleDetected(NodeId),
    #[error("节点{0:?}不存在")]
    NodeNotFound(NodeId),
    #[error("节点名重复：{0}")]
    DuplicateNodeName(String),
    /// 已登记的可学习节点在信号表中没有条目：信号提供者与累加器登记不同步
    #[error("节点{name}（{node:?}）在信号表中没有信号，信号提供者与累加器登记不同步")]
    MissingSignal { node: NodeId, name: String },
    #[error("叶节点{name}（{node:?}）没有被喂入数据")]
    MissingFeed { node: NodeId, name: String },
    #[error("喂入的数据非法：{0}")]
    InvalidFeed(String),
    /// 网络结构有误（输入为空、下标越界、尺寸不能整除等）
    #[error("网络结构有误：{0}")]
    StructureError(String),
    #[error("形状不匹配：预期{expected:?}，实际得到{got:?}。{message}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    #[error("非法操作：{0}")]
    InvalidOperation(String),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}
