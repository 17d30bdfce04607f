/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 和积网络的节点：节点 ID、输入边以及包装具体节点的句柄
 */

pub(crate) mod raw_node;

pub(crate) use raw_node::{IndicatorLeaf, NodeType, NormalLeaf, Products, Sums, TraitNode, Weights};
pub use raw_node::WeightsInit;

use crate::spn::inference::{PassContext, SignalRule};
use crate::spn::SpnError;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// 节点在图中的唯一标识。学习器中的记录只持有 ID（相当于弱引用），
/// 节点本身始终归图所有
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// 一条输入边：选取子节点输出中的若干列；`indices`为`None`表示选取全部列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub node: NodeId,
    pub indices: Option<Vec<usize>>,
}

impl Input {
    /// 选取子节点的全部输出
    pub const fn all(node: NodeId) -> Self {
        Self {
            node,
            indices: None,
        }
    }

    /// 选取子节点输出中的指定列
    pub fn with_indices(node: NodeId, indices: &[usize]) -> Self {
        Self {
            node,
            indices: Some(indices.to_vec()),
        }
    }

    /// 本输入的宽度（选取的列数），`node_out_size`为子节点的输出宽度
    pub fn width(&self, node_out_size: usize) -> usize {
        self.indices
            .as_ref()
            .map_or(node_out_size, |indices| indices.len())
    }
}

impl From<NodeId> for Input {
    fn from(node: NodeId) -> Self {
        Self::all(node)
    }
}

pub(crate) struct NodeHandle {
    id: NodeId,
    raw_node: NodeType,
}

impl NodeHandle {
    pub(crate) fn new<T: Into<NodeType>>(id: NodeId, raw_node: T) -> Self {
        Self {
            id,
            raw_node: raw_node.into(),
        }
    }

    pub(crate) const fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        self.raw_node.name()
    }

    pub(crate) const fn node_type(&self) -> &NodeType {
        &self.raw_node
    }

    pub(crate) fn node_type_mut(&mut self) -> &mut NodeType {
        &mut self.raw_node
    }

    pub(crate) fn out_size(&self) -> usize {
        self.raw_node.out_size()
    }

    pub(crate) fn inputs(&self) -> Vec<Input> {
        self.raw_node.inputs()
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.raw_node.is_leaf()
    }

    pub(crate) fn is_param(&self) -> bool {
        self.raw_node.is_param()
    }

    pub(crate) fn compute_value(
        &self,
        inputs: &[Tensor],
        feed: Option<&Tensor>,
        pass: &PassContext,
    ) -> Result<Tensor, SpnError> {
        self.raw_node.compute_value(inputs, feed, pass)
    }

    pub(crate) fn compute_input_signals(
        &self,
        signal: &Tensor,
        inputs: &[Tensor],
        pass: &PassContext,
        rule: &SignalRule,
        rng: &mut StdRng,
    ) -> Result<Vec<Tensor>, SpnError> {
        self.raw_node
            .compute_input_signals(signal, inputs, pass, rule, rng)
    }
}

impl std::fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "节点[id={}, name={}]", self.id.0, self.name())
    }
}
