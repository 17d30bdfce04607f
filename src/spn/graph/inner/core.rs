/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : GraphInner 创建、基础访问器与参数查询
 */

use super::GraphInner;
use crate::spn::nodes::{Input, NodeHandle, NodeType};
use crate::spn::{NodeId, SpnError};
use crate::tensor::Tensor;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;

impl GraphInner {
    // ========== 创建 ==========

    pub fn new() -> Self {
        Self::with_name("default_spn")
    }

    /// 创建一个带固定种子的图（确保权重初始化可重复）
    pub fn new_with_seed(seed: u64) -> Self {
        Self::with_name_and_seed("default_spn", seed)
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: HashMap::new(),
            next_id: 0,
            rng: None,
        }
    }

    pub fn with_name_and_seed(name: &str, seed: u64) -> Self {
        Self {
            rng: Some(StdRng::seed_from_u64(seed)),
            ..Self::with_name(name)
        }
    }

    // ========== 基础访问器 ==========

    /// 设置/重置图的随机种子
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = Some(StdRng::seed_from_u64(seed));
    }

    pub const fn has_seed(&self) -> bool {
        self.rng.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> Vec<NodeId> {
        let mut ids = self.nodes.keys().copied().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn get_node(&self, id: NodeId) -> Result<&NodeHandle, SpnError> {
        self.nodes.get(&id).ok_or(SpnError::NodeNotFound(id))
    }

    pub(crate) fn get_node_mut(&mut self, id: NodeId) -> Result<&mut NodeHandle, SpnError> {
        self.nodes.get_mut(&id).ok_or(SpnError::NodeNotFound(id))
    }

    pub fn get_node_name(&self, id: NodeId) -> Result<&str, SpnError> {
        Ok(self.get_node(id)?.name())
    }

    /// 节点（批量化）输出的列数
    pub fn get_node_out_size(&self, id: NodeId) -> Result<usize, SpnError> {
        Ok(self.get_node(id)?.out_size())
    }

    /// 节点的输入边，顺序与其求值时的输入顺序一致
    pub fn get_node_inputs(&self, id: NodeId) -> Result<Vec<Input>, SpnError> {
        Ok(self.get_node(id)?.inputs())
    }

    pub fn is_leaf(&self, id: NodeId) -> Result<bool, SpnError> {
        Ok(self.get_node(id)?.is_leaf())
    }

    pub fn is_param(&self, id: NodeId) -> Result<bool, SpnError> {
        Ok(self.get_node(id)?.is_param())
    }

    // ========== 求和层相关 ==========

    /// 求和层的权重节点
    pub fn get_sums_weights(&self, sums: NodeId) -> Result<NodeId, SpnError> {
        match self.get_node(sums)?.node_type() {
            NodeType::Sums(s) => Ok(s.weights()),
            _ => Err(self.wrong_node_type(sums, "求和层")),
        }
    }

    /// 求和层的潜变量指示节点（若有）
    pub fn get_latent_indicators(&self, sums: NodeId) -> Result<Option<NodeId>, SpnError> {
        match self.get_node(sums)?.node_type() {
            NodeType::Sums(s) => Ok(s.latent_indicators()),
            _ => Err(self.wrong_node_type(sums, "求和层")),
        }
    }

    /// 该节点是否被某个求和层用作潜变量指示
    pub(in crate::spn::graph) fn is_latent_indicators(&self, id: NodeId) -> bool {
        self.nodes.values().any(|node| match node.node_type() {
            NodeType::Sums(s) => s.latent_indicators() == Some(id),
            _ => false,
        })
    }

    // ========== 参数查询 ==========

    /// 权重节点的存储值（未归一化；对数空间存储时为对数值）
    pub fn get_weights_variable(&self, weights: NodeId) -> Result<Tensor, SpnError> {
        match self.get_node(weights)?.node_type() {
            NodeType::Weights(w) => Ok(w.variable().clone()),
            _ => Err(self.wrong_node_type(weights, "权重节点")),
        }
    }

    /// 权重节点按行归一化后的（线性空间）权重
    pub fn get_weights_value(&self, weights: NodeId) -> Result<Tensor, SpnError> {
        match self.get_node(weights)?.node_type() {
            NodeType::Weights(w) => {
                let variable = if w.is_log() {
                    w.variable().exp()
                } else {
                    w.variable().clone()
                };
                let (rows, cols) = variable.rows_cols()?;
                let mut value = variable.clone();
                for r in 0..rows {
                    let total: f32 = (0..cols).map(|c| variable[[r, c]]).sum();
                    for c in 0..cols {
                        value[[r, c]] = variable[[r, c]] / total;
                    }
                }
                Ok(value)
            }
            _ => Err(self.wrong_node_type(weights, "权重节点")),
        }
    }

    /// 权重节点是否在对数空间中存储
    pub fn is_log_weights(&self, weights: NodeId) -> Result<bool, SpnError> {
        match self.get_node(weights)?.node_type() {
            NodeType::Weights(w) => Ok(w.is_log()),
            _ => Err(self.wrong_node_type(weights, "权重节点")),
        }
    }

    /// 用给定的（线性空间、须全为正的）值替换权重节点的参数
    pub fn set_weights(&mut self, weights: NodeId, value: &Tensor) -> Result<(), SpnError> {
        let node = self.get_node_mut(weights)?;
        let name = node.name().to_string();
        match node.node_type_mut() {
            NodeType::Weights(w) => {
                if value.shape() != w.shape() {
                    return Err(SpnError::ShapeMismatch {
                        expected: w.shape().to_vec(),
                        got: value.shape().to_vec(),
                        message: format!("权重节点{name}的新值形状有误"),
                    });
                }
                *w = crate::spn::nodes::Weights::new(&name, value, w.is_log())?;
                Ok(())
            }
            _ => Err(SpnError::InvalidOperation(format!("节点{name}不是权重节点"))),
        }
    }

    /// 正态叶节点当前的`(loc, scale)`
    pub fn get_leaf_params(&self, leaf: NodeId) -> Result<(Tensor, Tensor), SpnError> {
        match self.get_node(leaf)?.node_type() {
            NodeType::NormalLeaf(l) => Ok((l.loc().clone(), l.scale().clone())),
            _ => Err(self.wrong_node_type(leaf, "正态叶节点")),
        }
    }

    pub(crate) fn wrong_node_type(&self, id: NodeId, expected: &str) -> SpnError {
        match self.get_node(id) {
            Ok(node) => SpnError::InvalidOperation(format!("{node}不是{expected}")),
            Err(e) => e,
        }
    }

    // ========== 内部工具 ==========

    pub(in crate::spn::graph) fn generate_valid_node_id(&mut self) -> NodeId {
        // 生成唯一的节点ID
        self.next_id += 1;
        NodeId(self.next_id)
    }

    pub(in crate::spn::graph) fn check_duplicate_node_name(&self, name: &str) -> Result<(), SpnError> {
        if self.nodes.values().any(|node| node.name() == name) {
            return Err(SpnError::DuplicateNodeName(format!(
                "节点{}在图{}中重复",
                name,
                self.name()
            )));
        }
        Ok(())
    }

    pub(in crate::spn::graph) fn generate_valid_new_node_name(
        &self,
        base_name: &str,
        node_type: &str,
    ) -> Result<String, SpnError> {
        if !base_name.is_empty() {
            self.check_duplicate_node_name(base_name)?;
            return Ok(base_name.to_string());
        }

        let mut counter = 1;
        loop {
            let name = format!("{node_type}_{counter}");
            if self.check_duplicate_node_name(&name).is_ok() {
                return Ok(name);
            }
            counter += 1;
        }
    }
}
