/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : GDLearning：为网络中每个可学习的节点维护一个累加器。
 *
 * 用法：
 * ```ignore
 * let mut learning = GDLearning::new(&graph, root, config)?;
 * learning.feed(batch);
 * learning.accumulate_updates()?;   // 可反复调用，也可跨批次调用
 * learning.update_spn()?;           // 把累加器提交到网络参数
 * learning.reset_accumulators();    // 累加器清零，时机由调用方决定
 * ```
 */

use super::config::GDLearningConfig;
use super::types::{LearningInferenceType, LearningType};
use crate::spn::graph::{GraphInner, SpnGraph};
use crate::spn::inference::{Feed, Gradient, MpePath, SignalTable};
use crate::spn::nodes::NodeType;
use crate::spn::{NodeId, SpnError};
use crate::tensor::Tensor;
use std::cell::RefCell;
use std::rc::Rc;

/// 权重节点的累加器，形状与权重一致
#[derive(Debug, Clone)]
pub struct ParamRecord {
    node: NodeId,
    name_scope: String,
    accum: Tensor,
}

impl ParamRecord {
    pub const fn node(&self) -> NodeId {
        self.node
    }

    pub fn name_scope(&self) -> &str {
        &self.name_scope
    }

    pub const fn accum(&self) -> &Tensor {
        &self.accum
    }
}

/// 正态叶节点的两个累加器，形状分别与`loc`、`scale`一致
#[derive(Debug, Clone)]
pub struct LeafParamRecord {
    node: NodeId,
    name_scope: String,
    loc_accum: Tensor,
    scale_accum: Tensor,
}

impl LeafParamRecord {
    pub const fn node(&self) -> NodeId {
        self.node
    }

    pub fn name_scope(&self) -> &str {
        &self.name_scope
    }

    pub const fn loc_accum(&self) -> &Tensor {
        &self.loc_accum
    }

    pub const fn scale_accum(&self) -> &Tensor {
        &self.scale_accum
    }
}

/// 一组已执行的操作的句柄，不携带数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpGroup {
    name: &'static str,
    num_ops: usize,
}

impl OpGroup {
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn num_ops(&self) -> usize {
        self.num_ops
    }
}

/// 学习信号的来源，构造时选定一次
#[derive(Debug)]
enum SignalSource {
    MpePath(MpePath),
    Gradient(Gradient),
}

impl SignalSource {
    fn ensure_positive(&mut self, graph: &GraphInner, root: NodeId, feed: &Feed) -> Result<(), SpnError> {
        match self {
            Self::MpePath(p) => p.get_mpe_path(graph, root, feed).map(|_| ()),
            Self::Gradient(g) => g.get_gradients(graph, root, feed).map(|_| ()),
        }
    }

    fn ensure_actual(&mut self, graph: &GraphInner, root: NodeId, feed: &Feed) -> Result<(), SpnError> {
        match self {
            Self::MpePath(p) => p.get_mpe_path_actual(graph, root, feed).map(|_| ()),
            Self::Gradient(g) => g.get_actual_gradients(graph, root, feed).map(|_| ()),
        }
    }

    fn positive(&self) -> Option<&SignalTable> {
        match self {
            Self::MpePath(p) => p.counts(),
            Self::Gradient(g) => g.gradients(),
        }
    }

    fn actual(&self) -> Option<&SignalTable> {
        match self {
            Self::MpePath(p) => p.actual_counts(),
            Self::Gradient(g) => g.actual_gradients(),
        }
    }

    fn value(&self) -> Option<&Tensor> {
        match self {
            Self::MpePath(p) => p.value(),
            Self::Gradient(g) => g.value(),
        }
    }

    /// 信号是否为线性空间的导数（此时叶节点的增量还要乘以密度）
    fn is_linear_derivative(&self) -> bool {
        match self {
            Self::MpePath(_) => false,
            Self::Gradient(g) => !g.log(),
        }
    }

    fn discard(&mut self) {
        match self {
            Self::MpePath(p) => p.discard(),
            Self::Gradient(g) => g.discard(),
        }
    }
}

pub struct GDLearning {
    graph: Rc<RefCell<GraphInner>>,
    root: NodeId,
    config: GDLearningConfig,
    source: SignalSource,
    param_records: Vec<ParamRecord>,
    leaf_param_records: Vec<LeafParamRecord>,
    feed: Option<Feed>,
}

impl std::fmt::Debug for GDLearning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GDLearning")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("param_records", &self.param_records.len())
            .field("leaf_param_records", &self.leaf_param_records.len())
            .finish_non_exhaustive()
    }
}

impl GDLearning {
    /// 按配置中的`learning_inference_type`选定信号提供者：
    /// 硬/硬且忽略权重/软 EM 用`MpePath`，梯度用`Gradient`
    pub fn new(graph: &SpnGraph, root: NodeId, config: GDLearningConfig) -> Result<Self, SpnError> {
        config.validate()?;
        let source = match config.learning_inference_type {
            LearningInferenceType::Gradient => {
                SignalSource::Gradient(Gradient::new(config.log, config.value_inference_type))
            }
            inference_type => {
                let mpe_path = MpePath::new(
                    config.log,
                    config.value_inference_type,
                    inference_type == LearningInferenceType::HardUnweighted,
                    inference_type == LearningInferenceType::SoftEm,
                    config.add_random,
                );
                SignalSource::MpePath(match config.seed {
                    Some(seed) => mpe_path.with_seed(seed),
                    None => mpe_path,
                })
            }
        };
        Self::build(graph, root, config, source)
    }

    /// 使用已有的`MpePath`（其推断设置优先于配置）
    pub fn with_mpe_path(
        graph: &SpnGraph,
        root: NodeId,
        mpe_path: MpePath,
        config: GDLearningConfig,
    ) -> Result<Self, SpnError> {
        config.validate()?;
        if config.learning_inference_type == LearningInferenceType::Gradient {
            return Err(SpnError::InvalidConfig(
                "学习信号为梯度时不能使用MpePath".to_string(),
            ));
        }
        Self::build(graph, root, config, SignalSource::MpePath(mpe_path))
    }

    /// 使用已有的`Gradient`（其推断设置优先于配置）
    pub fn with_gradient(
        graph: &SpnGraph,
        root: NodeId,
        gradient: Gradient,
        config: GDLearningConfig,
    ) -> Result<Self, SpnError> {
        config.validate()?;
        if config.learning_inference_type != LearningInferenceType::Gradient {
            return Err(SpnError::InvalidConfig(format!(
                "学习信号为{:?}时不能使用Gradient",
                config.learning_inference_type
            )));
        }
        Self::build(graph, root, config, SignalSource::Gradient(gradient))
    }

    fn build(
        graph: &SpnGraph,
        root: NodeId,
        config: GDLearningConfig,
        source: SignalSource,
    ) -> Result<Self, SpnError> {
        let graph = graph.inner_rc();
        let mut param_records = Vec::new();
        let mut leaf_param_records = Vec::new();
        let mut has_latent_indicators = false;
        {
            let g = graph.borrow();
            g.traverse_graph(root, |id| {
                let node = g.get_node(id)?;
                match node.node_type() {
                    NodeType::Weights(w) => param_records.push(ParamRecord {
                        node: id,
                        name_scope: node.name().to_string(),
                        accum: Tensor::zeros(&w.shape()),
                    }),
                    NodeType::NormalLeaf(leaf) if leaf.learn_distribution_parameters() => {
                        leaf_param_records.push(LeafParamRecord {
                            node: id,
                            name_scope: node.name().to_string(),
                            loc_accum: leaf.loc().zeros_like(),
                            scale_accum: leaf.scale().zeros_like(),
                        });
                    }
                    NodeType::Sums(sums) => {
                        has_latent_indicators |= sums.latent_indicators().is_some();
                    }
                    _ => {}
                }
                Ok(())
            })?;
        }
        tracing::debug!(
            ?root,
            params = param_records.len(),
            leaf_params = leaf_param_records.len(),
            learning_type = ?config.learning_type,
            learning_inference_type = ?config.learning_inference_type,
            "建立累加器"
        );
        if config.learning_type == LearningType::Discriminative && !has_latent_indicators {
            tracing::warn!(
                ?root,
                "判别式学习但网络中没有潜变量指示：实际趟与正趟相同，更新量恒为 0"
            );
        }
        Ok(Self {
            graph,
            root,
            config,
            source,
            param_records,
            leaf_param_records,
            feed: None,
        })
    }

    /// 绑定一个批次的数据，并丢弃信号提供者已缓存的结果
    pub fn feed(&mut self, feed: Feed) {
        self.source.discard();
        self.feed = Some(feed);
    }

    /// 计算本批次每个可学习节点的更新量（乘以学习率后）累加到其累加器上。
    /// 判别式学习时，更新方向为正趟信号减去实际趟信号
    pub fn accumulate_updates(&mut self) -> Result<OpGroup, SpnError> {
        let feed = self.feed.as_ref().ok_or_else(|| {
            SpnError::InvalidOperation("累积更新量前须先调用feed绑定一个批次的数据".to_string())
        })?;
        let graph = self.graph.borrow();
        let discriminative = self.config.learning_type == LearningType::Discriminative;
        let learning_rate = self.config.learning_rate;

        self.source.ensure_positive(&graph, self.root, feed)?;
        if discriminative {
            self.source.ensure_actual(&graph, self.root, feed)?;
        }
        let not_computed = || {
            SpnError::InvalidOperation("信号未能计算。不该触及本错误，否则说明crate代码有问题".to_string())
        };
        let positive = self.source.positive().ok_or_else(not_computed)?;
        let actual = if discriminative {
            Some(self.source.actual().ok_or_else(not_computed)?)
        } else {
            None
        };

        for record in &mut self.param_records {
            let node = graph.get_node(record.node)?;
            let NodeType::Weights(weights) = node.node_type() else {
                return Err(graph.wrong_node_type(record.node, "权重节点"));
            };
            let signal = lookup_signal(positive, record.node, &record.name_scope)?;
            let actual_signal = actual
                .map(|table| lookup_signal(table, record.node, &record.name_scope))
                .transpose()?;
            let update = weights.compute_update(signal, actual_signal)?;
            record.accum += &(&update * learning_rate);
        }

        let linear_derivative = self.source.is_linear_derivative();
        for record in &mut self.leaf_param_records {
            let node = graph.get_node(record.node)?;
            let NodeType::NormalLeaf(leaf) = node.node_type() else {
                return Err(graph.wrong_node_type(record.node, "正态叶节点"));
            };
            let mut signal = lookup_signal(positive, record.node, &record.name_scope)?.clone();
            if let Some(table) = actual {
                signal = &signal - lookup_signal(table, record.node, &record.name_scope)?;
            }
            let evidence = feed.get(&record.node).ok_or_else(|| SpnError::MissingFeed {
                node: record.node,
                name: record.name_scope.clone(),
            })?;
            let (loc_delta, scale_delta) =
                leaf.compute_gradient(&signal, evidence, linear_derivative)?;
            record.loc_accum += &(&loc_delta * learning_rate);
            record.scale_accum += &(&scale_delta * learning_rate);
        }

        let num_ops = self.param_records.len() + 2 * self.leaf_param_records.len();
        tracing::debug!(num_ops, discriminative, "累积更新量");
        Ok(OpGroup {
            name: "accumulate_updates",
            num_ops,
        })
    }

    /// 把累加器提交到网络参数：对数空间存储的权重用`update_log`，否则用`update`；
    /// 正态叶节点用`assign_add`。累加器不清零；参数变了，已缓存的信号随之丢弃
    pub fn update_spn(&mut self) -> Result<OpGroup, SpnError> {
        {
            let mut graph = self.graph.borrow_mut();
            for record in &self.param_records {
                let node = graph.get_node_mut(record.node)?;
                match node.node_type_mut() {
                    NodeType::Weights(weights) if weights.is_log() => weights.update_log(&record.accum)?,
                    NodeType::Weights(weights) => weights.update(&record.accum)?,
                    _ => return Err(graph.wrong_node_type(record.node, "权重节点")),
                }
            }
            for record in &self.leaf_param_records {
                let node = graph.get_node_mut(record.node)?;
                match node.node_type_mut() {
                    NodeType::NormalLeaf(leaf) => {
                        leaf.assign_add(&record.loc_accum, &record.scale_accum)?;
                    }
                    _ => return Err(graph.wrong_node_type(record.node, "正态叶节点")),
                }
            }
        }
        self.source.discard();
        let num_ops = self.param_records.len() + self.leaf_param_records.len();
        tracing::debug!(num_ops, "提交更新");
        Ok(OpGroup {
            name: "update_spn",
            num_ops,
        })
    }

    /// 把所有累加器清零，不影响网络参数
    pub fn reset_accumulators(&mut self) -> OpGroup {
        for record in &mut self.param_records {
            record.accum.fill(0.0);
        }
        for record in &mut self.leaf_param_records {
            record.loc_accum.fill(0.0);
            record.scale_accum.fill(0.0);
        }
        OpGroup {
            name: "reset_accumulators",
            num_ops: self.param_records.len() + 2 * self.leaf_param_records.len(),
        }
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓访问器↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub fn param_records(&self) -> &[ParamRecord] {
        &self.param_records
    }

    pub fn leaf_param_records(&self) -> &[LeafParamRecord] {
        &self.leaf_param_records
    }

    /// 某个权重节点的累加器
    pub fn accumulator(&self, weights: NodeId) -> Option<&Tensor> {
        self.param_records
            .iter()
            .find(|record| record.node == weights)
            .map(|record| &record.accum)
    }

    /// 根（求和层）的权重节点的累加器
    pub fn root_accum(&self) -> Result<Option<&Tensor>, SpnError> {
        let weights = self.graph.borrow().get_sums_weights(self.root)?;
        Ok(self.accumulator(weights))
    }

    /// 正趟求得的根节点值（尚未计算时为`None`）
    pub fn value(&self) -> Option<&Tensor> {
        self.source.value()
    }

    pub fn mpe_path(&self) -> Option<&MpePath> {
        match &self.source {
            SignalSource::MpePath(p) => Some(p),
            SignalSource::Gradient(_) => None,
        }
    }

    pub fn gradient(&self) -> Option<&Gradient> {
        match &self.source {
            SignalSource::Gradient(g) => Some(g),
            SignalSource::MpePath(_) => None,
        }
    }

    pub const fn root(&self) -> NodeId {
        self.root
    }

    pub const fn learning_rate(&self) -> f32 {
        self.config.learning_rate
    }

    pub const fn learning_type(&self) -> LearningType {
        self.config.learning_type
    }

    pub const fn config(&self) -> &GDLearningConfig {
        &self.config
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑访问器↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
}

fn lookup_signal<'a>(table: &'a SignalTable, node: NodeId, name: &str) -> Result<&'a Tensor, SpnError> {
    table.get(node).ok_or_else(|| SpnError::MissingSignal {
        node,
        name: name.to_string(),
    })
}
