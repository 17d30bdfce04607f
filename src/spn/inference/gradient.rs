/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 梯度：根节点的值（对数空间时为对数值）对每个节点输出的偏导数，
 *                 以反向模式在整个有向无环图上求得
 */

use super::{Feed, InferenceType, PassCache, PassContext, SignalRule, SignalTable};
use crate::spn::graph::GraphInner;
use crate::spn::{NodeId, SpnError};
use crate::tensor::Tensor;

#[derive(Debug)]
pub struct Gradient {
    log: bool,
    value_inference_type: InferenceType,
    cache: PassCache,
}

impl Gradient {
    /// `value_inference_type`为`None`时按边缘推断求值
    pub fn new(log: bool, value_inference_type: Option<InferenceType>) -> Self {
        Self {
            log,
            value_inference_type: value_inference_type.unwrap_or(InferenceType::Marginal),
            cache: PassCache::new(None),
        }
    }

    pub const fn log(&self) -> bool {
        self.log
    }

    pub const fn value_inference_type(&self) -> InferenceType {
        self.value_inference_type
    }

    fn pass(&self, conditioned: bool) -> PassContext {
        PassContext {
            log: self.log,
            inference_type: self.value_inference_type,
            conditioned,
        }
    }

    /// 正趟梯度（不带条件），只在第一次调用时计算
    pub fn get_gradients(
        &mut self,
        graph: &GraphInner,
        root: NodeId,
        feed: &Feed,
    ) -> Result<&SignalTable, SpnError> {
        let pass = self.pass(false);
        let result = self
            .cache
            .ensure_positive(graph, root, feed, pass, &SignalRule::Derivative)?;
        Ok(result.signals())
    }

    /// 实际趟梯度（以喂入的潜变量指示为条件），只在第一次调用时计算
    pub fn get_actual_gradients(
        &mut self,
        graph: &GraphInner,
        root: NodeId,
        feed: &Feed,
    ) -> Result<&SignalTable, SpnError> {
        let pass = self.pass(true);
        let result = self
            .cache
            .ensure_actual(graph, root, feed, pass, &SignalRule::Derivative)?;
        Ok(result.signals())
    }

    pub fn gradients(&self) -> Option<&SignalTable> {
        self.cache.positive().map(|result| result.signals())
    }

    pub fn actual_gradients(&self) -> Option<&SignalTable> {
        self.cache.actual().map(|result| result.signals())
    }

    pub fn value(&self) -> Option<&Tensor> {
        self.cache.positive().and_then(|result| result.root_value())
    }

    pub fn positive_pass_count(&self) -> usize {
        self.cache.positive_pass_count()
    }

    pub fn actual_pass_count(&self) -> usize {
        self.cache.actual_pass_count()
    }

    pub fn discard(&mut self) {
        self.cache.discard();
    }
}
