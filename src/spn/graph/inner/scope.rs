/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : GraphInner 作用域与有效性。
 *                 叶节点某一列的作用域是它对应的变量；和要求完备（同一个和的各子项作用域相同），
 *                 乘积要求可分解（同一个乘积的各输入作用域两两不相交）。
 *                 满足这两条的网络，其根值在所有变量取值上的和（或积分）为 1（权重已归一化时）。
 */

use super::GraphInner;
use crate::spn::nodes::{Input, NodeType};
use crate::spn::{NodeId, SpnError};
use std::collections::{BTreeSet, HashMap};

/// 作用域：一组（叶节点, 变量下标）
pub type Scope = BTreeSet<(NodeId, usize)>;

impl GraphInner {
    /// 根节点每一列输出的作用域
    pub fn get_scope(&self, root: NodeId) -> Result<Vec<Scope>, SpnError> {
        let (mut scopes, _) = self.compute_scopes(root)?;
        scopes.remove(&root).ok_or(SpnError::NodeNotFound(root))
    }

    /// 网络是否有效（所有和完备、所有乘积可分解）
    pub fn is_valid(&self, root: NodeId) -> Result<bool, SpnError> {
        let (_, valid) = self.compute_scopes(root)?;
        Ok(valid)
    }

    fn compute_scopes(&self, root: NodeId) -> Result<(HashMap<NodeId, Vec<Scope>>, bool), SpnError> {
        let mut scopes: HashMap<NodeId, Vec<Scope>> = HashMap::new();
        let mut valid = true;
        for id in self.topological_order(root)? {
            let node = self.get_node(id)?;
            let node_scopes = match node.node_type() {
                NodeType::IndicatorLeaf(leaf) => (0..leaf.num_vars())
                    .flat_map(|v| (0..leaf.num_vals()).map(move |_| Scope::from([(id, v)])))
                    .collect(),
                NodeType::NormalLeaf(leaf) => (0..leaf.num_vars())
                    .flat_map(|v| (0..leaf.num_components()).map(move |_| Scope::from([(id, v)])))
                    .collect(),
                NodeType::Weights(_) => Vec::new(),
                NodeType::Sums(sums) => {
                    let children = Self::input_scopes(&scopes, sums.values())?;
                    let latent = sums.latent_indicators();
                    let mut out = Vec::with_capacity(sums.num_sums());
                    for (s, group) in children.chunks(sums.sum_size()).enumerate() {
                        if group.iter().any(|scope| scope != &group[0]) {
                            tracing::debug!(sums = node.name(), sum = s, "和不完备");
                            valid = false;
                        }
                        let mut scope: Scope = group.iter().flatten().copied().collect();
                        if let Some(latent) = latent {
                            scope.insert((latent, s));
                        }
                        out.push(scope);
                    }
                    out
                }
                NodeType::Products(products) => {
                    let children = Self::input_scopes(&scopes, products.values())?;
                    let mut out = Vec::with_capacity(products.num_prods());
                    for (p, group) in children.chunks(products.prod_size()).enumerate() {
                        let mut scope = Scope::new();
                        for child in group {
                            if !scope.is_disjoint(child) {
                                tracing::debug!(products = node.name(), product = p, "乘积不可分解");
                                valid = false;
                            }
                            scope.extend(child.iter().copied());
                        }
                        out.push(scope);
                    }
                    out
                }
            };
            scopes.insert(id, node_scopes);
        }
        Ok((scopes, valid))
    }

    /// 按输入边取出（并按下标选好列的）各列作用域，依次拼接
    fn input_scopes(
        scopes: &HashMap<NodeId, Vec<Scope>>,
        inputs: &[Input],
    ) -> Result<Vec<Scope>, SpnError> {
        let mut out = Vec::new();
        for input in inputs {
            let node_scopes = scopes.get(&input.node).ok_or(SpnError::NodeNotFound(input.node))?;
            match &input.indices {
                Some(indices) => {
                    for &i in indices {
                        let scope = node_scopes.get(i).ok_or_else(|| {
                            SpnError::StructureError(format!(
                                "输入{:?}选取的列{i}越界",
                                input.node
                            ))
                        })?;
                        out.push(scope.clone());
                    }
                }
                None => out.extend(node_scopes.iter().cloned()),
            }
        }
        Ok(out)
    }
}
