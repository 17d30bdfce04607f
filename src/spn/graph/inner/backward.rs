/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : GraphInner 自顶向下传信号（计数或导数）
 */

use super::GraphInner;
use crate::spn::inference::{PassContext, SignalRule, SignalTable, ValueTable};
use crate::spn::{NodeId, SpnError};
use crate::tensor::Tensor;
use rand::rngs::StdRng;

impl GraphInner {
    /// 从根节点出发（根的信号为全 1）把信号传给每个可达节点，父节点先于子节点。
    ///
    /// 每个节点把收到的信号按`rule`换算成各输入边的信号，
    /// 再按输入边选取的列散布累加到子节点上，因此被多个父节点（或同一父节点多次）引用的节点
    /// 收到的是各路信号之和。权重节点的信号形状为`[batch, num_sums * sum_size]`。
    pub fn compute_signals(
        &self,
        root: NodeId,
        values: &ValueTable,
        pass: &PassContext,
        rule: &SignalRule,
        rng: &mut StdRng,
    ) -> Result<SignalTable, SpnError> {
        let order = self.topological_order(root)?;
        let root_value = values.get(root).ok_or_else(|| {
            SpnError::InvalidOperation(format!("根节点{root:?}尚未求值，无法传信号"))
        })?;
        let mut signals = SignalTable::default();
        signals.insert(root, Tensor::ones(root_value.shape()));

        for &id in order.iter().rev() {
            let node = self.get_node(id)?;
            let Some(signal) = signals.get(id).cloned() else {
                continue;
            };
            let inputs = self.gather_inputs(node, values)?;
            let input_signals = node.compute_input_signals(&signal, &inputs, pass, rule, rng)?;
            if input_signals.is_empty() {
                continue;
            }
            let (batch, _) = signal.rows_cols()?;
            for (input, input_signal) in node.inputs().iter().zip(input_signals) {
                let child_out = self.get_node(input.node)?.out_size();
                if signals.get(input.node).is_none() {
                    signals.insert(input.node, Tensor::zeros(&[batch, child_out]));
                }
                let child_signal = signals
                    .get_mut(input.node)
                    .ok_or(SpnError::NodeNotFound(input.node))?;
                match &input.indices {
                    Some(indices) => child_signal.scatter_cols_add(&input_signal, indices)?,
                    None => child_signal.try_add_assign(&input_signal)?,
                }
            }
        }
        Ok(signals)
    }
}
