/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : GDLearning 端到端测试：叶节点 -> 求和层 -> 根，
 *                 分别在线性空间与对数空间的权重上累积计数并提交
 */
use only_spn::spn::{
    Feed, GDLearning, GDLearningConfig, Input, LearningInferenceType, LearningType, NodeId,
    SpnError, SpnGraph, WeightsInit,
};
use only_spn::tensor::Tensor;
use approx::assert_abs_diff_eq;

struct Chain {
    graph: SpnGraph,
    leaf: NodeId,
    sums: NodeId,
    root: NodeId,
}

/// X（3 个取值） -> S（1 个和，3 个子项） -> root（1 个和，1 个子项）
fn build_chain(log_weights: bool) -> Result<Chain, SpnError> {
    let graph = SpnGraph::new();
    let leaf = graph.indicator_leaf(1, 3, "X")?;
    let sums = graph.sum(&[Input::all(leaf)], WeightsInit::Constant(1.0), log_weights, "S")?;
    let root = graph.sum(&[Input::all(sums)], WeightsInit::Constant(1.0), log_weights, "root")?;
    Ok(Chain {
        graph,
        leaf,
        sums,
        root,
    })
}

fn hard_generative_config(log: bool) -> GDLearningConfig {
    GDLearningConfig {
        learning_rate: 0.1,
        log,
        learning_type: LearningType::Generative,
        learning_inference_type: LearningInferenceType::Hard,
        ..Default::default()
    }
}

fn check_chain(log: bool) -> Result<(), SpnError> {
    let chain = build_chain(log)?;
    let mut learning = GDLearning::new(&chain.graph, chain.root, hard_generative_config(log))?;
    assert_eq!(learning.param_records().len(), 2);

    let mut feed = Feed::new();
    feed.insert(chain.leaf, Tensor::new(&[0., 1., 1., 2.], &[4, 1]));
    learning.feed(feed);
    learning.accumulate_updates()?;

    // 累加器 = 学习率 × 计数
    let s_weights = chain.graph.get_sums_weights(chain.sums)?;
    let s_accum = learning.accumulator(s_weights).unwrap().clone();
    assert_abs_diff_eq!(s_accum[[0, 0]], 0.1, epsilon = 1e-6);
    assert_abs_diff_eq!(s_accum[[0, 1]], 0.2, epsilon = 1e-6);
    assert_abs_diff_eq!(s_accum[[0, 2]], 0.1, epsilon = 1e-6);
    let root_accum = learning.root_accum()?.unwrap().clone();
    assert_abs_diff_eq!(root_accum[[0, 0]], 0.4, epsilon = 1e-6);

    learning.update_spn()?;
    let stored = chain.graph.get_weights_variable(s_weights)?;
    for (k, delta) in [0.1f32, 0.2, 0.1].into_iter().enumerate() {
        let expected = if log { (1. + delta).ln() } else { 1. + delta };
        assert_abs_diff_eq!(stored[[0, k]], expected, epsilon = 1e-5);
    }
    let normalized = chain.graph.get_weights_value(s_weights)?;
    assert_abs_diff_eq!(normalized[[0, 1]], 1.2 / 3.4, epsilon = 1e-5);

    // 累加器在提交后保持不变
    assert_eq!(learning.accumulator(s_weights).unwrap(), &s_accum);
    Ok(())
}

#[test]
fn test_chain_linear_weights() -> Result<(), SpnError> {
    check_chain(false)
}

#[test]
fn test_chain_log_weights() -> Result<(), SpnError> {
    check_chain(true)
}

#[test]
fn test_hard_em_moves_weights_toward_data() -> Result<(), SpnError> {
    let chain = build_chain(true)?;
    let mut learning = GDLearning::new(&chain.graph, chain.root, hard_generative_config(true))?;
    let s_weights = chain.graph.get_sums_weights(chain.sums)?;

    let mut last_value = f32::NEG_INFINITY;
    for _ in 0..10 {
        let mut feed = Feed::new();
        feed.insert(chain.leaf, Tensor::full(2., &[10, 1]));
        learning.feed(feed);
        learning.accumulate_updates()?;
        let value = learning.value().unwrap()[[0, 0]];
        assert!(value > last_value, "对数似然应逐轮上升：{last_value} -> {value}");
        last_value = value;
        learning.update_spn()?;
        learning.reset_accumulators();
    }

    // 初始 [1, 1, 1]，每轮为第 3 个取值加 0.1 × 10
    let normalized = chain.graph.get_weights_value(s_weights)?;
    assert_abs_diff_eq!(normalized[[0, 2]], 11. / 13., epsilon = 1e-5);
    Ok(())
}
