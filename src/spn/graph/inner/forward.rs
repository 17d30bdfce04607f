/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : GraphInner 自底向上求值
 */

use super::GraphInner;
use crate::spn::inference::{Feed, PassContext, ValueTable};
use crate::spn::nodes::NodeHandle;
use crate::spn::{NodeId, SpnError};
use crate::tensor::Tensor;

impl GraphInner {
    /// 求出从`root`可达的每个节点的值，子节点先于父节点。
    /// 叶节点从`feed`中取数据；不带条件的推断中，没有喂入数据的潜变量指示按“全部取值打开”处理
    pub fn compute_values(
        &self,
        root: NodeId,
        feed: &Feed,
        pass: &PassContext,
    ) -> Result<ValueTable, SpnError> {
        let mut values = ValueTable::default();
        for id in self.topological_order(root)? {
            let node = self.get_node(id)?;
            let inputs = self.gather_inputs(node, &values)?;
            let value = if node.is_leaf() {
                match feed.get(&id) {
                    Some(data) => node.compute_value(&inputs, Some(data), pass)?,
                    None if !pass.conditioned && self.is_latent_indicators(id) => {
                        let on = if pass.log { 0.0 } else { 1.0 };
                        Tensor::full(on, &[batch_size(feed)?, node.out_size()])
                    }
                    None => {
                        return Err(SpnError::MissingFeed {
                            node: id,
                            name: node.name().to_string(),
                        });
                    }
                }
            } else {
                node.compute_value(&inputs, None, pass)?
            };
            values.insert(id, value);
        }
        Ok(values)
    }

    /// 只返回根节点的值，形状为`[batch, root_out_size]`
    pub fn compute_root_value(
        &self,
        root: NodeId,
        feed: &Feed,
        pass: &PassContext,
    ) -> Result<Tensor, SpnError> {
        let values = self.compute_values(root, feed, pass)?;
        values
            .get(root)
            .cloned()
            .ok_or(SpnError::NodeNotFound(root))
    }

    /// 按输入边从值表中取出（并按下标选好列的）输入值
    pub(in crate::spn::graph) fn gather_inputs(
        &self,
        node: &NodeHandle,
        table: &ValueTable,
    ) -> Result<Vec<Tensor>, SpnError> {
        node.inputs()
            .iter()
            .map(|input| {
                let value = table.get(input.node).ok_or_else(|| {
                    SpnError::InvalidOperation(format!(
                        "{node}的输入{:?}尚未求值。不该触及本错误，否则说明crate代码有问题",
                        input.node
                    ))
                })?;
                match &input.indices {
                    Some(indices) => Ok(value.gather_cols(indices)?),
                    None => Ok(value.clone()),
                }
            })
            .collect()
    }
}

/// 一个批次的样本数：取喂入数据中任一张量的行数，且各张量须一致
fn batch_size(feed: &Feed) -> Result<usize, SpnError> {
    let mut batch = None;
    for data in feed.values() {
        let (rows, _) = data.rows_cols()?;
        match batch {
            None => batch = Some(rows),
            Some(b) if b != rows => {
                return Err(SpnError::InvalidFeed(format!(
                    "喂入数据的样本数不一致：{b}与{rows}"
                )));
            }
            Some(_) => {}
        }
    }
    batch.ok_or_else(|| SpnError::InvalidFeed("喂入的数据为空，无法确定样本数".to_string()))
}
