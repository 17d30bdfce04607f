/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 权重节点：求和层唯一的可学习参数，形状为`[num_sums, sum_size]`，
 *                 可在线性空间或对数空间中存储。存储值不要求归一化，
 *                 节点求值时按行归一化（对数空间即减去 log-sum-exp）。
 */

use super::TraitNode;
use crate::spn::inference::PassContext;
use crate::spn::SpnError;
use crate::tensor::{Tensor, log_sum_exp};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 权重更新后的下限，保证线性空间权重为正、对数空间权重有限
pub(crate) const WEIGHT_FLOOR: f32 = 1e-12;

/// 权重的初始值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightsInit {
    /// 所有权重取同一个（正的）常数
    Constant(f32),
    /// 在[min, max)上均匀采样
    RandomUniform { min: f32, max: f32 },
}

impl Default for WeightsInit {
    fn default() -> Self {
        Self::Constant(1.0)
    }
}

impl WeightsInit {
    /// 生成形状为`shape`的线性空间初始权重
    pub(crate) fn generate<R: Rng>(&self, shape: &[usize], rng: &mut R) -> Result<Tensor, SpnError> {
        let (min, max) = match *self {
            Self::Constant(value) => (value, value),
            Self::RandomUniform { min, max } => (min, max),
        };
        if !(min > 0.0) {
            return Err(SpnError::InvalidConfig(format!(
                "权重初始值须为正数，但下限为{min}"
            )));
        }
        Ok(Tensor::new_uniform(min, max, shape, rng)?)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Weights {
    name: String,
    num_sums: usize,
    sum_size: usize,
    /// 是否在对数空间中存储
    log: bool,
    variable: Tensor,
}

impl Weights {
    /// `init`为线性空间的初始权重（须全为正），形状即本节点的参数形状
    pub(crate) fn new(name: &str, init: &Tensor, log: bool) -> Result<Self, SpnError> {
        let (num_sums, sum_size) = init.rows_cols()?;
        if init.view().iter().any(|&w| !(w > 0.0)) {
            return Err(SpnError::StructureError(format!(
                "权重节点{name}的初始权重须全部为正数"
            )));
        }
        let variable = if log { init.ln() } else { init.clone() };
        Ok(Self {
            name: name.to_string(),
            num_sums,
            sum_size,
            log,
            variable,
        })
    }

    pub(crate) const fn is_log(&self) -> bool {
        self.log
    }

    /// 参数（存储值）本身，未归一化；对数空间存储时为对数值
    pub(crate) const fn variable(&self) -> &Tensor {
        &self.variable
    }

    pub(crate) fn shape(&self) -> [usize; 2] {
        [self.num_sums, self.sum_size]
    }

    /// 按行归一化后的对数权重
    fn normalized_log(&self) -> Tensor {
        let log_variable = if self.log {
            self.variable.clone()
        } else {
            self.variable.ln()
        };
        let mut out = log_variable.clone();
        for s in 0..self.num_sums {
            let row: Vec<f32> = (0..self.sum_size).map(|j| log_variable[[s, j]]).collect();
            let norm = log_sum_exp(&row);
            for j in 0..self.sum_size {
                out[[s, j]] = row[j] - norm;
            }
        }
        out
    }

    /// 由信号计算本节点的更新量：信号形状为`[batch, num_sums * sum_size]`，
    /// 判别式学习时先逐元素减去`actual`，再在批次上求和并还原为参数形状
    pub(crate) fn compute_update(
        &self,
        signal: &Tensor,
        actual: Option<&Tensor>,
    ) -> Result<Tensor, SpnError> {
        let (_, cols) = signal.rows_cols()?;
        if cols != self.num_sums * self.sum_size {
            return Err(SpnError::ShapeMismatch {
                expected: vec![signal.shape()[0], self.num_sums * self.sum_size],
                got: signal.shape().to_vec(),
                message: format!("权重节点{}收到的信号形状有误", self.name),
            });
        }
        let corrected = match actual {
            Some(actual) => {
                if !actual.is_same_shape(signal) {
                    return Err(SpnError::ShapeMismatch {
                        expected: signal.shape().to_vec(),
                        got: actual.shape().to_vec(),
                        message: format!("权重节点{}的actual信号须与信号形状一致", self.name),
                    });
                }
                signal - actual
            }
            None => signal.clone(),
        };
        Ok(corrected.sum_axis0().reshape(&self.shape())?)
    }

    /// 线性空间存储的更新：直接相加
    pub(crate) fn update(&mut self, delta: &Tensor) -> Result<(), SpnError> {
        if self.log {
            return Err(SpnError::InvalidOperation(format!(
                "权重节点{}在对数空间中存储，应使用update_log",
                self.name
            )));
        }
        self.check_delta(delta)?;
        self.variable += delta;
        self.variable = self.variable.map(|w| w.max(WEIGHT_FLOOR));
        Ok(())
    }

    /// 对数空间存储的更新：lw ← ln(exp(lw) + delta)，归一化留给求值时完成
    pub(crate) fn update_log(&mut self, delta: &Tensor) -> Result<(), SpnError> {
        if !self.log {
            return Err(SpnError::InvalidOperation(format!(
                "权重节点{}在线性空间中存储，应使用update",
                self.name
            )));
        }
        self.check_delta(delta)?;
        for s in 0..self.num_sums {
            for j in 0..self.sum_size {
                let w = self.variable[[s, j]].exp() + delta[[s, j]];
                self.variable[[s, j]] = w.max(WEIGHT_FLOOR).ln();
            }
        }
        Ok(())
    }

    fn check_delta(&self, delta: &Tensor) -> Result<(), SpnError> {
        if delta.shape() != self.shape() {
            return Err(SpnError::ShapeMismatch {
                expected: self.shape().to_vec(),
                got: delta.shape().to_vec(),
                message: format!("权重节点{}的更新量形状有误", self.name),
            });
        }
        Ok(())
    }
}

impl TraitNode for Weights {
    fn name(&self) -> &str {
        &self.name
    }

    fn out_size(&self) -> usize {
        self.num_sums * self.sum_size
    }

    fn is_param(&self) -> bool {
        true
    }

    fn compute_value(
        &self,
        _inputs: &[Tensor],
        _feed: Option<&Tensor>,
        pass: &PassContext,
    ) -> Result<Tensor, SpnError> {
        let normalized = self.normalized_log();
        Ok(if pass.log { normalized } else { normalized.exp() })
    }
}
