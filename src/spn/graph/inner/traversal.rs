/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : GraphInner 深度优先遍历：每个可达节点恰好访问一次，并检测环
 */

use super::GraphInner;
use crate::spn::{NodeId, SpnError};
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// 已进入、其子节点尚未处理完
    Visiting,
    Done,
}

impl GraphInner {
    /// 从`root`出发沿输入边可达的所有节点，子节点在父节点之前，`root`在最后。
    /// 有环时报`CycleDetected`
    pub fn topological_order(&self, root: NodeId) -> Result<Vec<NodeId>, SpnError> {
        let mut marks: HashMap<NodeId, Mark> = HashMap::new();
        let mut order = Vec::new();
        // (节点, 子节点是否已入栈)
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                marks.insert(id, Mark::Done);
                order.push(id);
                continue;
            }
            match marks.get(&id) {
                Some(Mark::Done) => continue,
                // 仍在栈上的祖先被再次遇到：环
                Some(Mark::Visiting) => return Err(SpnError::CycleDetected(id)),
                None => {}
            }
            marks.insert(id, Mark::Visiting);
            stack.push((id, true));
            for input in self.get_node(id)?.inputs().iter().rev() {
                match marks.get(&input.node) {
                    Some(Mark::Done) => {}
                    Some(Mark::Visiting) => return Err(SpnError::CycleDetected(input.node)),
                    None => stack.push((input.node, false)),
                }
            }
        }
        Ok(order)
    }

    /// 对从`root`出发可达的每个节点恰好调用一次`visitor`（顺序不作保证）。
    /// `visitor`的错误会中止遍历并原样返回
    pub fn traverse_graph<F>(&self, root: NodeId, mut visitor: F) -> Result<(), SpnError>
    where
        F: FnMut(NodeId) -> Result<(), SpnError>,
    {
        for id in self.topological_order(root)? {
            visitor(id)?;
        }
        Ok(())
    }
}
