/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 指示变量叶节点（indicator leaf）：每个离散变量的每个取值对应一列输出，
 *                 数据等于该取值（或缺失）时为 1，否则为 0。
 *                 挂在求和层上作为潜变量指示时，可喂入类别标签以做判别式学习。
 */

use super::{TraitNode, check_feed_shape};
use crate::spn::inference::PassContext;
use crate::spn::SpnError;
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
pub(crate) struct IndicatorLeaf {
    name: String,
    num_vars: usize,
    num_vals: usize,
}

impl IndicatorLeaf {
    pub(crate) fn new(name: &str, num_vars: usize, num_vals: usize) -> Result<Self, SpnError> {
        if num_vars == 0 || num_vals == 0 {
            return Err(SpnError::StructureError(format!(
                "指示变量叶节点{name}的变量数与取值数都须大于0，但得到{num_vars}和{num_vals}"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            num_vars,
            num_vals,
        })
    }

    pub(crate) const fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub(crate) const fn num_vals(&self) -> usize {
        self.num_vals
    }
}

impl TraitNode for IndicatorLeaf {
    fn name(&self) -> &str {
        &self.name
    }

    fn out_size(&self) -> usize {
        self.num_vars * self.num_vals
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
            "指示变量叶节点{}在没有数据的情况下被求值。不该触及本错误，否则说明crate代码有问题",
            self.name
        )))?;
        let batch = check_feed_shape(&self.name, feed, self.num_vars)?;

        let (on, off) = if pass.log {
            (0.0, f32::NEG_INFINITY)
        } else {
            (1.0, 0.0)
        };
        let mut value = Tensor::full(off, &[batch, self.out_size()]);
        for b in 0..batch {
            for v in 0..self.num_vars {
                let x = feed[[b, v]];
                // 负数表示缺失：该变量的所有取值都“打开”（即边缘化）
                if x < 0.0 {
                    for k in 0..self.num_vals {
                        value[[b, v * self.num_vals + k]] = on;
                    }
                    continue;
                }
                if x.fract() != 0.0 || x >= self.num_vals as f32 {
                    return Err(SpnError::InvalidFeed(format!(
                        "指示变量叶节点{}的第{b}个样本第{v}个变量取值为{x}，应为[0, {})内的整数或负数（缺失）",
                        self.name, self.num_vals
                    )));
                }
                value[[b, v * self.num_vals + x as usize]] = on;
            }
        }
        Ok(value)
    }
}
