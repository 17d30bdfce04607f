mod indicator_leaf;
mod normal_leaf;
mod products;
mod sums;
mod weights;

pub(crate) use indicator_leaf::IndicatorLeaf;
pub(crate) use normal_leaf::NormalLeaf;
pub(crate) use products::Products;
pub(crate) use sums::Sums;
pub use weights::WeightsInit;
pub(crate) use weights::Weights;

use super::Input;
use crate::spn::inference::{PassContext, SignalRule};
use crate::spn::SpnError;
use crate::tensor::Tensor;
use enum_dispatch::enum_dispatch;
use rand::rngs::StdRng;

#[enum_dispatch]
#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓叶节点↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    IndicatorLeaf(IndicatorLeaf),
    NormalLeaf(NormalLeaf),
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑叶节点↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
    Weights(Weights),
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓算子↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    Sums(Sums),
    Products(Products),
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑算子↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
}

#[enum_dispatch(NodeType)]
pub(crate) trait TraitNode {
    fn name(&self) -> &str;

    /// 本节点（批量化）输出的列数。权重节点的“输出”按`num_sums * sum_size`计
    fn out_size(&self) -> usize;

    /// 本节点的输入边，顺序与`compute_value`/`compute_input_signals`中`inputs`的顺序一致
    fn inputs(&self) -> Vec<Input> {
        Vec::new()
    }

    /// 是否为需要喂入数据的叶节点
    fn is_leaf(&self) -> bool {
        false
    }

    /// 是否持有一个可学习的权重张量
    fn is_param(&self) -> bool {
        false
    }

    /// 根据（已按输入边选好列的）输入值计算本节点的值。叶节点使用`feed`
    fn compute_value(
        &self,
        inputs: &[Tensor],
        feed: Option<&Tensor>,
        pass: &PassContext,
    ) -> Result<Tensor, SpnError>;

    /// 由本节点收到的信号计算传给每条输入边的信号（宽度与该输入边选取的列数一致）。
    /// 没有输入的节点返回空列表
    fn compute_input_signals(
        &self,
        _signal: &Tensor,
        _inputs: &[Tensor],
        _pass: &PassContext,
        _rule: &SignalRule,
        _rng: &mut StdRng,
    ) -> Result<Vec<Tensor>, SpnError> {
        Ok(Vec::new())
    }
}

/// 校验叶节点的喂入数据形状为`[batch, num_vars]`，返回 batch 大小
pub(super) fn check_feed_shape(
    name: &str,
    feed: &Tensor,
    num_vars: usize,
) -> Result<usize, SpnError> {
    match feed.shape() {
        &[batch, vars] if vars == num_vars => Ok(batch),
        shape => Err(SpnError::ShapeMismatch {
            expected: vec![0, num_vars],
            got: shape.to_vec(),
            message: format!("叶节点{name}的数据须为[batch, {num_vars}]的二阶张量"),
        }),
    }
}

/// 把若干输入值按列拼接，同时返回各输入的宽度（供反向时切分信号）
pub(super) fn concat_inputs(inputs: &[Tensor]) -> Result<(Tensor, Vec<usize>), SpnError> {
    let refs = inputs.iter().collect::<Vec<_>>();
    let widths = inputs
        .iter()
        .map(|t| t.rows_cols().map(|(_, cols)| cols))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((Tensor::concat_cols(&refs)?, widths))
}

/// `concat_inputs`的逆操作：按宽度把张量切分为若干列块
pub(super) fn split_cols(tensor: &Tensor, widths: &[usize]) -> Result<Vec<Tensor>, SpnError> {
    let mut offset = 0;
    let mut parts = Vec::with_capacity(widths.len());
    for &width in widths {
        let indices = (offset..offset + width).collect::<Vec<_>>();
        parts.push(tensor.gather_cols(&indices)?);
        offset += width;
    }
    Ok(parts)
}

/// 校验本节点收到的信号形状为`[batch, out_size]`
pub(super) fn check_signal_shape(
    name: &str,
    signal: &Tensor,
    batch: usize,
    out_size: usize,
) -> Result<(), SpnError> {
    if signal.shape() != [batch, out_size] {
        return Err(SpnError::ShapeMismatch {
            expected: vec![batch, out_size],
            got: signal.shape().to_vec(),
            message: format!("节点{name}收到的信号形状有误"),
        });
    }
    Ok(())
}
