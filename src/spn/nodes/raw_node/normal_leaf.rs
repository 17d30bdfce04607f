/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 正态分布叶节点（location-scale 叶节点）：每个连续变量有`num_components`个一元正态分量，
 *                 位置参数`loc`与尺度参数`scale`的形状均为`[num_vars, num_components]`。
 *                 `learn_distribution_parameters`为 true 时，学习器会为其建立两个累加器。
 */

use super::{TraitNode, check_feed_shape};
use crate::spn::inference::PassContext;
use crate::spn::SpnError;
use crate::tensor::Tensor;

/// 尺度参数的默认下限
pub(crate) const DEFAULT_MIN_SCALE: f32 = 1e-3;

const HALF_LN_2PI: f32 = 0.918_938_5;

#[derive(Debug, Clone)]
pub(crate) struct NormalLeaf {
    name: String,
    num_vars: usize,
    num_components: usize,
    loc: Tensor,
    scale: Tensor,
    learn_distribution_parameters: bool,
    min_scale: f32,
}

impl NormalLeaf {
    pub(crate) fn new(
        name: &str,
        loc: Tensor,
        scale: Tensor,
        learn_distribution_parameters: bool,
    ) -> Result<Self, SpnError> {
        let (num_vars, num_components) = loc.rows_cols()?;
        if num_vars == 0 || num_components == 0 {
            return Err(SpnError::StructureError(format!(
                "正态叶节点{name}的变量数与分量数都须大于0"
            )));
        }
        if !loc.is_same_shape(&scale) {
            return Err(SpnError::ShapeMismatch {
                expected: loc.shape().to_vec(),
                got: scale.shape().to_vec(),
                message: format!("正态叶节点{name}的scale须与loc形状一致"),
            });
        }
        if scale.view().iter().any(|&s| !(s > 0.0)) {
            return Err(SpnError::StructureError(format!(
                "正态叶节点{name}的scale须全部为正数"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            num_vars,
            num_components,
            loc,
            scale,
            learn_distribution_parameters,
            min_scale: DEFAULT_MIN_SCALE,
        })
    }

    pub(crate) fn set_min_scale(&mut self, min_scale: f32) -> Result<(), SpnError> {
        if !(min_scale > 0.0) {
            return Err(SpnError::InvalidConfig(format!(
                "尺度参数下限须为正数，但得到{min_scale}"
            )));
        }
        self.min_scale = min_scale;
        Ok(())
    }

    pub(crate) const fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub(crate) const fn num_components(&self) -> usize {
        self.num_components
    }

    pub(crate) const fn learn_distribution_parameters(&self) -> bool {
        self.learn_distribution_parameters
    }

    pub(crate) const fn loc(&self) -> &Tensor {
        &self.loc
    }

    pub(crate) const fn scale(&self) -> &Tensor {
        &self.scale
    }

    fn log_pdf(&self, x: f32, v: usize, k: usize) -> f32 {
        let loc = self.loc[[v, k]];
        let scale = self.scale[[v, k]];
        let z = (x - loc) / scale;
        -HALF_LN_2PI - scale.ln() - 0.5 * z * z
    }

    /// 由（已修正过的）信号计算位置与尺度参数的增量。
    ///
    /// 信号形状为`[batch, num_vars * num_components]`，`evidence`为本批次喂入的数据。
    /// 增量是“信号加权的对数密度梯度”在批次上的和：
    /// - d/d loc = (x - loc) / scale²
    /// - d/d scale = (x - loc)² / scale³ - 1 / scale
    ///
    /// 缺失（NaN）的数据不贡献增量。
    ///
    /// `linear_derivative`为 true 时，信号是线性空间的导数 dS/d pdf，
    /// 每一项还要乘以该样本的密度 pdf(x)；计数信号与对数空间的导数则不需要。
    pub(crate) fn compute_gradient(
        &self,
        signal: &Tensor,
        evidence: &Tensor,
        linear_derivative: bool,
    ) -> Result<(Tensor, Tensor), SpnError> {
        let batch = check_feed_shape(&self.name, evidence, self.num_vars)?;
        let expected = [batch, self.out_size()];
        if signal.shape() != expected {
            return Err(SpnError::ShapeMismatch {
                expected: expected.to_vec(),
                got: signal.shape().to_vec(),
                message: format!("正态叶节点{}收到的信号形状有误", self.name),
            });
        }

        let mut loc_delta = self.loc.zeros_like();
        let mut scale_delta = self.scale.zeros_like();
        for b in 0..batch {
            for v in 0..self.num_vars {
                let x = evidence[[b, v]];
                if x.is_nan() {
                    continue;
                }
                for k in 0..self.num_components {
                    let mut s = signal[[b, v * self.num_components + k]];
                    if s == 0.0 {
                        continue;
                    }
                    if linear_derivative {
                        s *= self.log_pdf(x, v, k).exp();
                    }
                    let loc = self.loc[[v, k]];
                    let scale = self.scale[[v, k]];
                    let d = x - loc;
                    loc_delta[[v, k]] += s * d / (scale * scale);
                    scale_delta[[v, k]] += s * (d * d / (scale * scale * scale) - 1.0 / scale);
                }
            }
        }
        Ok((loc_delta, scale_delta))
    }

    /// 把两个增量加到位置与尺度参数上；尺度参数不低于`min_scale`
    pub(crate) fn assign_add(
        &mut self,
        loc_delta: &Tensor,
        scale_delta: &Tensor,
    ) -> Result<(), SpnError> {
        for (delta, target) in [(loc_delta, &self.loc), (scale_delta, &self.scale)] {
            if !delta.is_same_shape(target) {
                return Err(SpnError::ShapeMismatch {
                    expected: target.shape().to_vec(),
                    got: delta.shape().to_vec(),
                    message: format!("正态叶节点{}的参数增量形状有误", self.name),
                });
            }
        }
        self.loc += loc_delta;
        self.scale += scale_delta;
        let min_scale = self.min_scale;
        self.scale = self.scale.map(|s| s.max(min_scale));
        Ok(())
    }
}

impl TraitNode for NormalLeaf {
    fn name(&self) -> &str {
        &self.name
    }

    fn out_size(&self) -> usize {
        self.num_vars * self.num_components
    }

    fn is_leaf(&self) -> bool {
        true
    }

    fn compute_value(
        &self,
        _inputs: &[Tensor],
        feed: Option<&Tensor>,
        pass: &PassContext,
    ) -> Result<Tensor, SpnError> {
        let feed = feed.ok_or_else(|| SpnError::InvalidOperation(format!(
            "正态叶节点{}在没有数据的情况下被求值。不该触及本错误，否则说明crate代码有问题",
            self.name
        )))?;
        let batch = check_feed_shape(&self.name, feed, self.num_vars)?;

        let mut value = Tensor::zeros(&[batch, self.out_size()]);
        for b in 0..batch {
            for v in 0..self.num_vars {
                let x = feed[[b, v]];
                for k in 0..self.num_components {
                    // NaN 表示缺失：密度按 1（对数为 0）计，即边缘化
                    let log_pdf = if x.is_nan() { 0.0 } else { self.log_pdf(x, v, k) };
                    value[[b, v * self.num_components + k]] =
                        if pass.log { log_pdf } else { log_pdf.exp() };
                }
            }
        }
        Ok(value)
    }
}
