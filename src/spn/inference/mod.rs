/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 推断：一次求值（自底向上）加一次传信号（自顶向下）。
 *                 `MpePath`传的是（硬/软）计数，`Gradient`传的是根值对各节点输出的导数。
 *                 两者都有“正”与“实际”两趟：正趟不带条件（潜变量指示被边缘化），
 *                 实际趟以喂入的潜变量指示（标签）为条件。每趟算一次后缓存，直到被显式丢弃。
 */

mod gradient;
mod mpe_path;

pub use gradient::Gradient;
pub use mpe_path::MpePath;

use crate::spn::graph::GraphInner;
use crate::spn::{NodeId, SpnError};
use crate::tensor::Tensor;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 求值时和节点的归约方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceType {
    /// 求和（边缘推断）
    Marginal,
    /// 取最大（最可能解释，MPE）
    Mpe,
}

/// 一趟推断的上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassContext {
    /// 是否在对数空间中计算
    pub log: bool,
    pub inference_type: InferenceType,
    /// 潜变量指示是否参与（即是否以喂入的标签为条件）
    pub conditioned: bool,
}

/// 自顶向下传信号的规则
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalRule {
    /// 每个和把收到的计数整体交给得分最大的子项
    HardPath {
        /// 选子项时忽略权重（值输入含叶节点的和不受影响）
        use_unweighted: bool,
        /// 选子项前给每个得分加上[0, r)上的均匀噪声
        add_random: Option<f32>,
    },
    /// 每个和按后验比例把计数分给各子项（软 EM）
    SoftPath,
    /// 反向模式求导
    Derivative,
}

/// 一个批次的数据：叶节点（含潜变量指示）ID到`[batch, num_vars]`张量的映射
pub type Feed = HashMap<NodeId, Tensor>;

/// 节点ID到（批量化）张量的映射
#[derive(Debug, Clone, Default)]
pub struct NodeTable(HashMap<NodeId, Tensor>);

/// 自底向上求得的各节点值
pub type ValueTable = NodeTable;
/// 自顶向下求得的各节点信号，形状与节点的批量化输出一致
pub type SignalTable = NodeTable;

impl NodeTable {
    pub fn get(&self, node: NodeId) -> Option<&Tensor> {
        self.0.get(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.0.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Tensor)> {
        self.0.iter()
    }

    pub(crate) fn insert(&mut self, node: NodeId, tensor: Tensor) {
        self.0.insert(node, tensor);
    }

    pub(crate) fn get_mut(&mut self, node: NodeId) -> Option<&mut Tensor> {
        self.0.get_mut(&node)
    }
}

/// 一趟推断的结果
#[derive(Debug, Clone)]
pub struct PassResult {
    root: NodeId,
    values: ValueTable,
    signals: SignalTable,
}

impl PassResult {
    pub const fn values(&self) -> &ValueTable {
        &self.values
    }

    pub const fn signals(&self) -> &SignalTable {
        &self.signals
    }

    /// 根节点的值
    pub fn root_value(&self) -> Option<&Tensor> {
        self.values.get(self.root)
    }
}

/// 提供者共用的缓存：绑定的根、正/实际两趟结果及其计算次数
#[derive(Debug)]
pub(crate) struct PassCache {
    root: Option<NodeId>,
    positive: Option<PassResult>,
    actual: Option<PassResult>,
    positive_pass_count: usize,
    actual_pass_count: usize,
    rng: StdRng,
}

impl PassCache {
    pub(crate) fn new(seed: Option<u64>) -> Self {
        Self {
            root: None,
            positive: None,
            actual: None,
            positive_pass_count: 0,
            actual_pass_count: 0,
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
        }
    }

    /// 提供者只服务于第一次被问到的根
    fn bind_root(&mut self, root: NodeId) -> Result<(), SpnError> {
        match self.root {
            None => {
                self.root = Some(root);
                Ok(())
            }
            Some(bound) if bound == root => Ok(()),
            Some(bound) => Err(SpnError::InvalidOperation(format!(
                "该信号提供者已绑定到根节点{bound:?}，不能再用于根节点{root:?}"
            ))),
        }
    }

    fn run(
        graph: &GraphInner,
        root: NodeId,
        feed: &Feed,
        pass: &PassContext,
        rule: &SignalRule,
        rng: &mut StdRng,
    ) -> Result<PassResult, SpnError> {
        let values = graph.compute_values(root, feed, pass)?;
        let signals = graph.compute_signals(root, &values, pass, rule, rng)?;
        Ok(PassResult {
            root,
            values,
            signals,
        })
    }

    /// 确保正趟已算过（未算过才计算），返回其结果
    pub(crate) fn ensure_positive(
        &mut self,
        graph: &GraphInner,
        root: NodeId,
        feed: &Feed,
        pass: PassContext,
        rule: &SignalRule,
    ) -> Result<&PassResult, SpnError> {
        self.bind_root(root)?;
        let result = match self.positive.take() {
            Some(result) => result,
            None => {
                tracing::debug!(?root, ?rule, log = pass.log, "计算正趟信号");
                let result = Self::run(graph, root, feed, &pass, rule, &mut self.rng)?;
                self.positive_pass_count += 1;
                result
            }
        };
        Ok(self.positive.insert(result))
    }

    /// 确保实际趟已算过（未算过才计算），返回其结果
    pub(crate) fn ensure_actual(
        &mut self,
        graph: &GraphInner,
        root: NodeId,
        feed: &Feed,
        pass: PassContext,
        rule: &SignalRule,
    ) -> Result<&PassResult, SpnError> {
        self.bind_root(root)?;
        let result = match self.actual.take() {
            Some(result) => result,
            None => {
                tracing::debug!(?root, ?rule, log = pass.log, "计算实际趟信号");
                let result = Self::run(graph, root, feed, &pass, rule, &mut self.rng)?;
                self.actual_pass_count += 1;
                result
            }
        };
        Ok(self.actual.insert(result))
    }

    pub(crate) const fn positive(&self) -> Option<&PassResult> {
        self.positive.as_ref()
    }

    pub(crate) const fn actual(&self) -> Option<&PassResult> {
        self.actual.as_ref()
    }

    pub(crate) const fn positive_pass_count(&self) -> usize {
        self.positive_pass_count
    }

    pub(crate) const fn actual_pass_count(&self) -> usize {
        self.actual_pass_count
    }

    /// 丢弃两趟的缓存（计算次数保留），下次访问时重新计算
    pub(crate) fn discard(&mut self) {
        self.positive = None;
        self.actual = None;
    }
}
