/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : SpnGraph 句柄（用户级 API）
 */

use super::error::SpnError;
use super::inner::GraphInner;
use crate::spn::nodes::{Input, WeightsInit};
use crate::spn::NodeId;
use crate::tensor::Tensor;
use std::cell::RefCell;
use std::rc::Rc;

/// SpnGraph - 和积网络图句柄
///
/// # 设计原则
/// - 是 `Rc<RefCell<GraphInner>>` 的薄封装
/// - Clone 语义：多个 SpnGraph（以及学习器）引用同一个 GraphInner
#[derive(Clone)]
pub struct SpnGraph {
    inner: Rc<RefCell<GraphInner>>,
}

impl Default for SpnGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SpnGraph {
    // ==================== 创建 ====================

    pub fn new() -> Self {
        Self::from_inner(GraphInner::new())
    }

    /// 创建带种子的图（权重的随机初始化可重复）
    pub fn new_with_seed(seed: u64) -> Self {
        Self::from_inner(GraphInner::new_with_seed(seed))
    }

    pub fn from_inner(inner: GraphInner) -> Self {
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// 获取内部 GraphInner 的不可变引用
    pub fn inner(&self) -> std::cell::Ref<'_, GraphInner> {
        self.inner.borrow()
    }

    /// 获取内部 GraphInner 的可变引用
    pub fn inner_mut(&self) -> std::cell::RefMut<'_, GraphInner> {
        self.inner.borrow_mut()
    }

    /// 获取内部 Rc
    pub(crate) fn inner_rc(&self) -> Rc<RefCell<GraphInner>> {
        Rc::clone(&self.inner)
    }

    // ==================== 构建 ====================

    pub fn indicator_leaf(&self, num_vars: usize, num_vals: usize, name: &str) -> Result<NodeId, SpnError> {
        self.inner
            .borrow_mut()
            .new_indicator_leaf_node(num_vars, num_vals, Some(name))
    }

    pub fn normal_leaf(
        &self,
        loc: &Tensor,
        scale: &Tensor,
        learn_distribution_parameters: bool,
        name: &str,
    ) -> Result<NodeId, SpnError> {
        self.inner
            .borrow_mut()
            .new_normal_leaf_node(loc, scale, learn_distribution_parameters, Some(name))
    }

    pub fn sums(
        &self,
        values: &[Input],
        num_sums: usize,
        weights_init: WeightsInit,
        log_weights: bool,
        name: &str,
    ) -> Result<NodeId, SpnError> {
        self.inner
            .borrow_mut()
            .new_sums_node(values, num_sums, weights_init, log_weights, Some(name))
    }

    pub fn sum(
        &self,
        values: &[Input],
        weights_init: WeightsInit,
        log_weights: bool,
        name: &str,
    ) -> Result<NodeId, SpnError> {
        self.inner
            .borrow_mut()
            .new_sum_node(values, weights_init, log_weights, Some(name))
    }

    pub fn products(&self, values: &[Input], num_prods: usize, name: &str) -> Result<NodeId, SpnError> {
        self.inner
            .borrow_mut()
            .new_products_node(values, num_prods, Some(name))
    }

    pub fn product(&self, values: &[Input], name: &str) -> Result<NodeId, SpnError> {
        self.inner.borrow_mut().new_product_node(values, Some(name))
    }

    pub fn generate_latent_indicators(&self, sums: NodeId) -> Result<NodeId, SpnError> {
        self.inner.borrow_mut().generate_latent_indicators(sums)
    }

    pub fn add_values(&self, products: NodeId, values: &[Input]) -> Result<(), SpnError> {
        self.inner.borrow_mut().add_values(products, values)
    }

    // ==================== 查询 ====================

    pub fn get_sums_weights(&self, sums: NodeId) -> Result<NodeId, SpnError> {
        self.inner.borrow().get_sums_weights(sums)
    }

    pub fn get_weights_value(&self, weights: NodeId) -> Result<Tensor, SpnError> {
        self.inner.borrow().get_weights_value(weights)
    }

    pub fn get_weights_variable(&self, weights: NodeId) -> Result<Tensor, SpnError> {
        self.inner.borrow().get_weights_variable(weights)
    }

    pub fn get_leaf_params(&self, leaf: NodeId) -> Result<(Tensor, Tensor), SpnError> {
        self.inner.borrow().get_leaf_params(leaf)
    }

    pub fn is_valid(&self, root: NodeId) -> Result<bool, SpnError> {
        self.inner.borrow().is_valid(root)
    }
}
