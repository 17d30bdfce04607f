/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : MPE 路径：自顶向下传“计数”。根的每个样本带着计数 1 出发，
 *                 每个和把计数交给得分最大的子项（硬 EM），或按后验比例分给各子项（软 EM），
 *                 每个乘积把计数原样交给所有输入。权重节点收到的计数即其更新量的来源。
 */

use super::{Feed, InferenceType, PassCache, PassContext, SignalRule, SignalTable};
use crate::spn::graph::GraphInner;
use crate::spn::{NodeId, SpnError};
use crate::tensor::Tensor;

#[derive(Debug)]
pub struct MpePath {
    log: bool,
    value_inference_type: InferenceType,
    use_unweighted: bool,
    soft: bool,
    add_random: Option<f32>,
    cache: PassCache,
}

impl MpePath {
    /// `value_inference_type`为`None`时，硬路径按 MPE 求值，软路径按边缘推断求值
    pub fn new(
        log: bool,
        value_inference_type: Option<InferenceType>,
        use_unweighted: bool,
        soft: bool,
        add_random: Option<f32>,
    ) -> Self {
        let default_inference_type = if soft {
            InferenceType::Marginal
        } else {
            InferenceType::Mpe
        };
        Self {
            log,
            value_inference_type: value_inference_type.unwrap_or(default_inference_type),
            use_unweighted,
            soft,
            add_random,
            cache: PassCache::new(None),
        }
    }

    /// 固定`add_random`噪声的随机种子
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.cache = PassCache::new(Some(seed));
        self
    }

    pub const fn log(&self) -> bool {
        self.log
    }

    pub const fn value_inference_type(&self) -> InferenceType {
        self.value_inference_type
    }

    pub const fn use_unweighted(&self) -> bool {
        self.use_unweighted
    }

    pub const fn soft(&self) -> bool {
        self.soft
    }

    pub const fn add_random(&self) -> Option<f32> {
        self.add_random
    }

    fn rule(&self) -> SignalRule {
        if self.soft {
            SignalRule::SoftPath
        } else {
            SignalRule::HardPath {
                use_unweighted: self.use_unweighted,
                add_random: self.add_random,
            }
        }
    }

    fn pass(&self, conditioned: bool) -> PassContext {
        PassContext {
            log: self.log,
            inference_type: self.value_inference_type,
            conditioned,
        }
    }

    /// 正趟计数（不带条件），只在第一次调用时计算
    pub fn get_mpe_path(
        &mut self,
        graph: &GraphInner,
        root: NodeId,
        feed: &Feed,
    ) -> Result<&SignalTable, SpnError> {
        let (pass, rule) = (self.pass(false), self.rule());
        let result = self.cache.ensure_positive(graph, root, feed, pass, &rule)?;
        Ok(result.signals())
    }

    /// 实际趟计数（以喂入的潜变量指示为条件），只在第一次调用时计算
    pub fn get_mpe_path_actual(
        &mut self,
        graph: &GraphInner,
        root: NodeId,
        feed: &Feed,
    ) -> Result<&SignalTable, SpnError> {
        let (pass, rule) = (self.pass(true), self.rule());
        let result = self.cache.ensure_actual(graph, root, feed, pass, &rule)?;
        Ok(result.signals())
    }

    /// 已缓存的正趟计数
    pub fn counts(&self) -> Option<&SignalTable> {
        self.cache.positive().map(|result| result.signals())
    }

    /// 已缓存的实际趟计数
    pub fn actual_counts(&self) -> Option<&SignalTable> {
        self.cache.actual().map(|result| result.signals())
    }

    /// 正趟求得的根节点值
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
