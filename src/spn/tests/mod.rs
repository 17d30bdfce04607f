/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 和积网络的单元测试及共用的小网络
 */

mod config;
mod nodes;
mod traversal;

use crate::spn::{Feed, Input, NodeId, SpnGraph, WeightsInit};
use crate::tensor::Tensor;

/// 一个二值变量上的混合：root = 0.3·[X=0] + 0.7·[X=1]
pub(super) struct Mixture {
    pub graph: SpnGraph,
    pub leaf: NodeId,
    pub root: NodeId,
    pub weights: NodeId,
}

pub(super) fn build_mixture(log_weights: bool) -> Mixture {
    let graph = SpnGraph::new();
    let leaf = graph.indicator_leaf(1, 2, "X").unwrap();
    let root = graph
        .sum(&[Input::all(leaf)], WeightsInit::Constant(1.0), log_weights, "root")
        .unwrap();
    let weights = graph.get_sums_weights(root).unwrap();
    graph
        .inner_mut()
        .set_weights(weights, &Tensor::new(&[0.3, 0.7], &[1, 2]))
        .unwrap();
    Mixture {
        graph,
        leaf,
        root,
        weights,
    }
}

/// 两个二值变量 A、B 上的有效网络（含共享子结构）：
/// ```text
///                root（和，2 个子项）
///                 |
///          products（2 个乘积）
///        /     \      /     \
///     sums_a[0] sums_b[0] sums_a[1] sums_b[1]
///        \        |        /
///          leaf（A、B 各 2 个取值）
/// ```
pub(super) struct TwoVarSpn {
    pub graph: SpnGraph,
    pub leaf: NodeId,
    pub sums_a: NodeId,
    pub sums_b: NodeId,
    pub products: NodeId,
    pub root: NodeId,
}

pub(super) fn build_two_var_spn(seed: u64, log_weights: bool) -> TwoVarSpn {
    let graph = SpnGraph::new_with_seed(seed);
    let init = WeightsInit::RandomUniform { min: 0.2, max: 1.0 };
    let leaf = graph.indicator_leaf(2, 2, "AB").unwrap();
    let sums_a = graph
        .sums(&[Input::with_indices(leaf, &[0, 1, 0, 1])], 2, init, log_weights, "sums_a")
        .unwrap();
    let sums_b = graph
        .sums(&[Input::with_indices(leaf, &[2, 3, 2, 3])], 2, init, log_weights, "sums_b")
        .unwrap();
    let products = graph
        .products(
            &[
                Input::with_indices(sums_a, &[0]),
                Input::with_indices(sums_b, &[0]),
                Input::with_indices(sums_a, &[1]),
                Input::with_indices(sums_b, &[1]),
            ],
            2,
            "products",
        )
        .unwrap();
    let root = graph
        .sum(&[Input::all(products)], init, log_weights, "root")
        .unwrap();
    TwoVarSpn {
        graph,
        leaf,
        sums_a,
        sums_b,
        products,
        root,
    }
}

pub(super) fn feed_of(entries: &[(NodeId, Tensor)]) -> Feed {
    entries.iter().cloned().collect()
}

/// A、B 的全部 4 种取值
pub(super) fn all_assignments() -> Tensor {
    Tensor::new(&[0., 0., 0., 1., 1., 0., 1., 1.], &[4, 2])
}
