/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 求和层：`num_sums`个加权和，第`s`个和作用于拼接后输入的第`s`段（每段`sum_size`列）。
 *                 权重由一个独立的权重节点提供；可选地挂一个潜变量指示叶节点，
 *                 在“带条件”的推断中用于选定每个和的子节点（如判别式学习时喂入类别标签）。
 *
 *                 输入顺序固定为：[权重, 潜变量指示（可选）, 各值输入...]
 */

use super::{TraitNode, check_signal_shape, concat_inputs, split_cols};
use crate::spn::inference::{InferenceType, PassContext, SignalRule};
use crate::spn::nodes::Input;
use crate::spn::{NodeId, SpnError};
use crate::tensor::{Tensor, arg_max, log_sum_exp};
use rand::Rng;
use rand::rngs::StdRng;

#[derive(Debug, Clone)]
pub(crate) struct Sums {
    name: String,
    num_sums: usize,
    sum_size: usize,
    weights: NodeId,
    latent_indicators: Option<NodeId>,
    values: Vec<Input>,
    /// 值输入中是否有叶节点；有则硬路径永远使用权重（忽略`use_unweighted`）
    has_leaf_inputs: bool,
}

/// 按输入顺序拆好的求和层输入
struct SumInputs<'a> {
    /// 归一化后的权重，`[num_sums, sum_size]`
    weights: &'a Tensor,
    /// 潜变量指示的值，`[batch, num_sums * sum_size]`
    latent: Option<&'a Tensor>,
    /// 拼接后的值输入，`[batch, num_sums * sum_size]`
    x: Tensor,
    widths: Vec<usize>,
}

impl Sums {
    pub(crate) fn new(
        name: &str,
        num_sums: usize,
        sum_size: usize,
        weights: NodeId,
        values: Vec<Input>,
        has_leaf_inputs: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            num_sums,
            sum_size,
            weights,
            latent_indicators: None,
            values,
            has_leaf_inputs,
        }
    }

    pub(crate) const fn num_sums(&self) -> usize {
        self.num_sums
    }

    pub(crate) const fn sum_size(&self) -> usize {
        self.sum_size
    }

    pub(crate) const fn weights(&self) -> NodeId {
        self.weights
    }

    pub(crate) const fn latent_indicators(&self) -> Option<NodeId> {
        self.latent_indicators
    }

    pub(crate) fn set_latent_indicators(&mut self, node: NodeId) {
        self.latent_indicators = Some(node);
    }

    pub(crate) fn values(&self) -> &[Input] {
        &self.values
    }

    fn split_inputs<'a>(&self, inputs: &'a [Tensor]) -> Result<SumInputs<'a>, SpnError> {
        let offset = 1 + usize::from(self.latent_indicators.is_some());
        if inputs.len() != offset + self.values.len() {
            return Err(SpnError::InvalidOperation(format!(
                "求和层{}应有{}个输入，但收到{}个",
                self.name,
                offset + self.values.len(),
                inputs.len()
            )));
        }
        let weights = &inputs[0];
        if weights.shape() != [self.num_sums, self.sum_size] {
            return Err(SpnError::ShapeMismatch {
                expected: vec![self.num_sums, self.sum_size],
                got: weights.shape().to_vec(),
                message: format!("求和层{}的权重形状有误", self.name),
            });
        }
        let (x, widths) = concat_inputs(&inputs[offset..])?;
        let (_, cols) = x.rows_cols()?;
        if cols != self.num_sums * self.sum_size {
            return Err(SpnError::StructureError(format!(
                "求和层{}的输入共{cols}列，不等于{}×{}",
                self.name, self.num_sums, self.sum_size
            )));
        }
        let latent = if self.latent_indicators.is_some() {
            let latent = &inputs[1];
            if !latent.is_same_shape(&x) {
                return Err(SpnError::ShapeMismatch {
                    expected: x.shape().to_vec(),
                    got: latent.shape().to_vec(),
                    message: format!("求和层{}的潜变量指示须与拼接后的输入形状一致", self.name),
                });
            }
            Some(latent)
        } else {
            None
        };
        Ok(SumInputs {
            weights,
            latent,
            x,
            widths,
        })
    }

    /// 第`b`个样本第`s`个和的第`j`个子项的得分（对数空间为`x + lw + iv`，线性空间为`x · w · iv`）。
    /// 潜变量指示只在带条件的推断中参与
    fn score(
        &self,
        parts: &SumInputs,
        pass: &PassContext,
        index: (usize, usize, usize),
        use_weights: bool,
    ) -> f32 {
        let (b, s, j) = index;
        let col = s * self.sum_size + j;
        let x = parts.x[[b, col]];
        let w = use_weights.then(|| parts.weights[[s, j]]);
        let iv = parts
            .latent
            .filter(|_| pass.conditioned)
            .map(|latent| latent[[b, col]]);
        if pass.log {
            x + w.unwrap_or(0.0) + iv.unwrap_or(0.0)
        } else {
            x * w.unwrap_or(1.0) * iv.unwrap_or(1.0)
        }
    }

    fn scores(
        &self,
        parts: &SumInputs,
        pass: &PassContext,
        b: usize,
        s: usize,
        use_weights: bool,
    ) -> Vec<f32> {
        (0..self.sum_size)
            .map(|j| self.score(parts, pass, (b, s, j), use_weights))
            .collect()
    }

    /// 每个子项占该和的“后验比例”：对数空间为 softmax，线性空间为得分占总和的比例。
    /// 该和的值为 0（对数为负无穷）时全部为 0
    fn responsibilities(scores: &[f32], log: bool) -> Vec<f32> {
        if log {
            let norm = log_sum_exp(scores);
            if norm == f32::NEG_INFINITY {
                return vec![0.0; scores.len()];
            }
            scores.iter().map(|s| (s - norm).exp()).collect()
        } else {
            let total: f32 = scores.iter().sum();
            if total == 0.0 {
                return vec![0.0; scores.len()];
            }
            scores.iter().map(|s| s / total).collect()
        }
    }

    fn one_hot(scores: &[f32]) -> Vec<f32> {
        let winner = arg_max(scores).unwrap_or(0);
        (0..scores.len())
            .map(|j| if j == winner { 1.0 } else { 0.0 })
            .collect()
    }
}

impl TraitNode for Sums {
    fn name(&self) -> &str {
        &self.name
    }

    fn out_size(&self) -> usize {
        self.num_sums
    }

    fn inputs(&self) -> Vec<Input> {
        let mut inputs = vec![Input::all(self.weights)];
        if let Some(latent) = self.latent_indicators {
            inputs.push(Input::all(latent));
        }
        inputs.extend(self.values.iter().cloned());
        inputs
    }

    fn compute_value(
        &self,
        inputs: &[Tensor],
        _feed: Option<&Tensor>,
        pass: &PassContext,
    ) -> Result<Tensor, SpnError> {
        let parts = self.split_inputs(inputs)?;
        let (batch, _) = parts.x.rows_cols()?;
        let mut value = Tensor::zeros(&[batch, self.num_sums]);
        for b in 0..batch {
            for s in 0..self.num_sums {
                let scores = self.scores(&parts, pass, b, s, true);
                value[[b, s]] = match (pass.inference_type, pass.log) {
                    (InferenceType::Marginal, true) => log_sum_exp(&scores),
                    (InferenceType::Marginal, false) => scores.iter().sum(),
                    (InferenceType::Mpe, _) => {
                        scores.iter().copied().fold(f32::NEG_INFINITY, f32::max)
                    }
                };
            }
        }
        Ok(value)
    }

    fn compute_input_signals(
        &self,
        signal: &Tensor,
        inputs: &[Tensor],
        pass: &PassContext,
        rule: &SignalRule,
        rng: &mut StdRng,
    ) -> Result<Vec<Tensor>, SpnError> {
        let parts = self.split_inputs(inputs)?;
        let (batch, cols) = parts.x.rows_cols()?;
        check_signal_shape(&self.name, signal, batch, self.num_sums)?;

        let mut x_signal = Tensor::zeros(&[batch, cols]);
        let mut w_signal = Tensor::zeros(&[batch, cols]);
        let mut iv_signal = Tensor::zeros(&[batch, cols]);
        for b in 0..batch {
            for s in 0..self.num_sums {
                let incoming = signal[[b, s]];
                let base = s * self.sum_size;
                match rule {
                    SignalRule::HardPath {
                        use_unweighted,
                        add_random,
                    } => {
                        // 忽略权重与随机噪声只用于对数空间的硬路径
                        let use_weights =
                            !(*use_unweighted && pass.log) || self.has_leaf_inputs;
                        let mut scores = self.scores(&parts, pass, b, s, use_weights);
                        if let Some(r) = add_random.filter(|r| pass.log && *r > 0.0) {
                            for score in &mut scores {
                                *score += rng.gen_range(0.0..r);
                            }
                        }
                        let col = base + arg_max(&scores).unwrap_or(0);
                        x_signal[[b, col]] += incoming;
                        w_signal[[b, col]] += incoming;
                        iv_signal[[b, col]] += incoming;
                    }
                    SignalRule::SoftPath => {
                        let scores = self.scores(&parts, pass, b, s, true);
                        for (j, r) in Self::responsibilities(&scores, pass.log).into_iter().enumerate() {
                            x_signal[[b, base + j]] += incoming * r;
                            w_signal[[b, base + j]] += incoming * r;
                            iv_signal[[b, base + j]] += incoming * r;
                        }
                    }
                    SignalRule::Derivative => {
                        let scores = self.scores(&parts, pass, b, s, true);
                        let gates = match (pass.inference_type, pass.log) {
                            (InferenceType::Mpe, _) => Self::one_hot(&scores),
                            (InferenceType::Marginal, true) => {
                                Self::responsibilities(&scores, true)
                            }
                            (InferenceType::Marginal, false) => vec![1.0; self.sum_size],
                        };
                        // 不带条件时潜变量指示不参与求值，导数为 0
                        let iv_used = pass.conditioned && parts.latent.is_some();
                        for (j, gate) in gates.into_iter().enumerate() {
                            let col = base + j;
                            let g = incoming * gate;
                            if pass.log {
                                x_signal[[b, col]] += g;
                                w_signal[[b, col]] += g;
                                if iv_used {
                                    iv_signal[[b, col]] += g;
                                }
                            } else {
                                let x = parts.x[[b, col]];
                                let w = parts.weights[[s, j]];
                                let iv = parts
                                    .latent
                                    .filter(|_| iv_used)
                                    .map_or(1.0, |latent| latent[[b, col]]);
                                x_signal[[b, col]] += g * w * iv;
                                w_signal[[b, col]] += g * x * iv;
                                if iv_used {
                                    iv_signal[[b, col]] += g * x * w;
                                }
                            }
                        }
                    }
                }
            }
        }

        let mut signals = vec![w_signal];
        if self.latent_indicators.is_some() {
            signals.push(iv_signal);
        }
        signals.extend(split_cols(&x_signal, &parts.widths)?);
        Ok(signals)
    }
}
