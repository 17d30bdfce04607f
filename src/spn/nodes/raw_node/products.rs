/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 乘积层：`num_prods`个乘积，第`p`个乘积作用于拼接后输入的第`p`段（每段`prod_size`列）
 */

use super::{TraitNode, check_signal_shape, concat_inputs, split_cols};
use crate::spn::inference::{PassContext, SignalRule};
use crate::spn::nodes::Input;
use crate::spn::SpnError;
use crate::tensor::Tensor;
use rand::rngs::StdRng;

#[derive(Debug, Clone)]
pub(crate) struct Products {
    name: String,
    num_prods: usize,
    prod_size: usize,
    values: Vec<Input>,
}

impl Products {
    pub(crate) fn new(name: &str, num_prods: usize, prod_size: usize, values: Vec<Input>) -> Self {
        Self {
            name: name.to_string(),
            num_prods,
            prod_size,
            values,
        }
    }

    pub(crate) const fn num_prods(&self) -> usize {
        self.num_prods
    }

    pub(crate) const fn prod_size(&self) -> usize {
        self.prod_size
    }

    pub(crate) fn values(&self) -> &[Input] {
        &self.values
    }

    /// 追加输入；`prod_size`为追加后每个乘积的大小，由调用方（图）校验
    pub(crate) fn add_values(&mut self, inputs: Vec<Input>, prod_size: usize) {
        self.values.extend(inputs);
        self.prod_size = prod_size;
    }

    fn concat_values(&self, inputs: &[Tensor]) -> Result<(Tensor, Vec<usize>), SpnError> {
        if inputs.len() != self.values.len() {
            return Err(SpnError::InvalidOperation(format!(
                "乘积层{}应有{}个输入，但收到{}个",
                self.name,
                self.values.len(),
                inputs.len()
            )));
        }
        let (x, widths) = concat_inputs(inputs)?;
        let (_, cols) = x.rows_cols()?;
        if cols != self.num_prods * self.prod_size {
            return Err(SpnError::StructureError(format!(
                "乘积层{}的输入共{cols}列，不等于{}×{}",
                self.name, self.num_prods, self.prod_size
            )));
        }
        Ok((x, widths))
    }
}

impl TraitNode for Products {
    fn name(&self) -> &str {
        &self.name
    }

    fn out_size(&self) -> usize {
        self.num_prods
    }

    fn inputs(&self) -> Vec<Input> {
        self.values.clone()
    }

    fn compute_value(
        &self,
        inputs: &[Tensor],
        _feed: Option<&Tensor>,
        pass: &PassContext,
    ) -> Result<Tensor, SpnError> {
        let (x, _) = self.concat_values(inputs)?;
        let (batch, _) = x.rows_cols()?;
        let mut value = Tensor::zeros(&[batch, self.num_prods]);
        for b in 0..batch {
            for p in 0..self.num_prods {
                let group = (0..self.prod_size).map(|j| x[[b, p * self.prod_size + j]]);
                value[[b, p]] = if pass.log {
                    group.sum()
                } else {
                    group.product()
                };
            }
        }
        Ok(value)
    }

    /// 路径类信号与对数空间的导数原样传给每个输入；
    /// 线性空间的导数为上游信号乘以同组其余输入之积
    fn compute_input_signals(
        &self,
        signal: &Tensor,
        inputs: &[Tensor],
        pass: &PassContext,
        rule: &SignalRule,
        _rng: &mut StdRng,
    ) -> Result<Vec<Tensor>, SpnError> {
        let (x, widths) = self.concat_values(inputs)?;
        let (batch, cols) = x.rows_cols()?;
        check_signal_shape(&self.name, signal, batch, self.num_prods)?;

        let linear_derivative = matches!(rule, SignalRule::Derivative) && !pass.log;
        let mut x_signal = Tensor::zeros(&[batch, cols]);
        for b in 0..batch {
            for p in 0..self.num_prods {
                let incoming = signal[[b, p]];
                let base = p * self.prod_size;
                for j in 0..self.prod_size {
                    x_signal[[b, base + j]] = if linear_derivative {
                        let others: f32 = (0..self.prod_size)
                            .filter(|&k| k != j)
                            .map(|k| x[[b, base + k]])
                            .product();
                        incoming * others
                    } else {
                        incoming
                    };
                }
            }
        }
        split_cols(&x_signal, &widths)
    }
}
