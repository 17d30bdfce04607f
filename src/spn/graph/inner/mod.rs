/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : GraphInner 和积网络图的底层实现
 *
 * 各 impl 块分散在子模块中：
 * - core.rs: 创建、基础访问器与参数查询
 * - node_builders.rs: new_*_node 与结构修改
 * - traversal.rs: 深度优先遍历与拓扑序
 * - forward.rs: 自底向上求值
 * - backward.rs: 自顶向下传信号
 * - scope.rs: 作用域与有效性（完备性、可分解性）
 */

mod backward;
mod core;
mod forward;
mod node_builders;
mod scope;
mod traversal;

pub use scope::Scope;

use crate::spn::nodes::NodeHandle;
use crate::spn::NodeId;
use rand::rngs::StdRng;
use std::collections::HashMap;

/// 和积网络图的完整定义。节点只通过输入边（子节点ID）相连，不记录父节点
pub struct GraphInner {
    pub(in crate::spn::graph) name: String,
    pub(in crate::spn::graph) nodes: HashMap<NodeId, NodeHandle>,
    pub(in crate::spn::graph) next_id: u64,
    /// 图级别的随机数生成器（用于权重初始化）
    /// None 表示使用默认的 thread_rng（非确定性）
    pub(in crate::spn::graph) rng: Option<StdRng>,
}

impl Default for GraphInner {
    fn default() -> Self {
        Self::new()
    }
}
