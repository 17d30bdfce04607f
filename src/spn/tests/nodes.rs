use super::build_mixture;
use crate::assert_err;
use crate::spn::inference::{InferenceType, PassContext};
use crate::spn::nodes::{NormalLeaf, TraitNode, Weights};
use crate::spn::{Input, SpnError, SpnGraph, WeightsInit};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

const LOG_PASS: PassContext = PassContext {
    log: true,
    inference_type: InferenceType::Marginal,
    conditioned: false,
};

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓权重节点↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[test]
fn test_weights_value_is_normalized() {
    let init = Tensor::new(&[1., 3., 2., 2.], &[2, 2]);
    for log in [false, true] {
        let weights = Weights::new("w", &init, log).unwrap();
        assert_eq!(weights.out_size(), 4);
        assert!(weights.is_param());

        let value = weights.compute_value(&[], None, &LOG_PASS).unwrap();
        let expected = [0.25f32.ln(), 0.75f32.ln(), 0.5f32.ln(), 0.5f32.ln()];
        for (v, e) in value.to_vec().iter().zip(expected) {
            assert_abs_diff_eq!(*v, e, epsilon = 1e-6);
        }

        let linear = PassContext { log: false, ..LOG_PASS };
        let value = weights.compute_value(&[], None, &linear).unwrap();
        assert_abs_diff_eq!(value[[0, 1]], 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(value[[1, 0]], 0.5, epsilon = 1e-6);
    }
}

#[test]
fn test_weights_compute_update() {
    let weights = Weights::new("w", &Tensor::ones(&[1, 3]), false).unwrap();
    let signal = Tensor::new(&[1., 0., 0., 0., 1., 0.], &[2, 3]);
    let update = weights.compute_update(&signal, None).unwrap();
    assert_eq!(update, Tensor::new(&[1., 1., 0.], &[1, 3]));

    let actual = Tensor::new(&[1., 0., 0., 0., 0., 1.], &[2, 3]);
    let update = weights.compute_update(&signal, Some(&actual)).unwrap();
    assert_eq!(update, Tensor::new(&[0., 1., -1.], &[1, 3]));

    assert_err!(
        weights.compute_update(&Tensor::ones(&[2, 2]), None),
        SpnError::ShapeMismatch { .. }
    );
    assert_err!(
        weights.compute_update(&signal, Some(&Tensor::ones(&[1, 3]))),
        SpnError::ShapeMismatch { .. }
    );
}

#[test]
fn test_weights_update_rules() {
    let init = Tensor::new(&[0.3, 0.7], &[1, 2]);
    let delta = Tensor::new(&[0.1, -1.0], &[1, 2]);

    let mut linear = Weights::new("w", &init, false).unwrap();
    linear.update(&delta).unwrap();
    assert_abs_diff_eq!(linear.variable()[[0, 0]], 0.4, epsilon = 1e-6);
    // 不低于下限
    assert!(linear.variable()[[0, 1]] > 0.);
    assert_err!(linear.update_log(&delta), SpnError::InvalidOperation(_));

    let mut log = Weights::new("w", &init, true).unwrap();
    log.update_log(&delta).unwrap();
    assert_abs_diff_eq!(log.variable()[[0, 0]], 0.4f32.ln(), epsilon = 1e-6);
    assert!(log.variable()[[0, 1]].is_finite());
    assert_err!(log.update(&delta), SpnError::InvalidOperation(_));

    assert_err!(
        log.update_log(&Tensor::zeros(&[2, 1])),
        SpnError::ShapeMismatch { .. }
    );
}

#[test]
fn test_weights_reject_non_positive_init() {
    assert_err!(
        Weights::new("w", &Tensor::new(&[0.5, 0.], &[1, 2]), false),
        SpnError::StructureError(_)
    );
    let mut rng = StdRng::seed_from_u64(0);
    assert_err!(
        WeightsInit::Constant(0.).generate(&[1, 2], &mut rng),
        SpnError::InvalidConfig(_)
    );
    let generated = WeightsInit::RandomUniform { min: 0.5, max: 1. }
        .generate(&[2, 3], &mut rng)
        .unwrap();
    assert_eq!(generated.shape(), &[2, 3]);
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑权重节点↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓正态叶节点↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[test]
fn test_normal_leaf_compute_gradient() {
    let leaf = NormalLeaf::new(
        "N",
        Tensor::new(&[0., 1.], &[1, 2]),
        Tensor::new(&[1., 2.], &[1, 2]),
        true,
    )
    .unwrap();
    let signal = Tensor::new(&[1., 0.5, 2., 0.], &[2, 2]);
    let evidence = Tensor::new(&[2., f32::NAN], &[2, 1]);
    let (loc_delta, scale_delta) = leaf.compute_gradient(&signal, &evidence, false).unwrap();

    // 第 0 个样本：x = 2
    // 分量 0：d = 2，loc += 1·2/1 = 2，scale += 1·(4/1 − 1) = 3
    // 分量 1：d = 1，loc += 0.5·1/4 = 0.125，scale += 0.5·(1/8 − 1/2) = −0.1875
    // 第 1 个样本缺失，不贡献
    assert_abs_diff_eq!(loc_delta[[0, 0]], 2., epsilon = 1e-6);
    assert_abs_diff_eq!(scale_delta[[0, 0]], 3., epsilon = 1e-6);
    assert_abs_diff_eq!(loc_delta[[0, 1]], 0.125, epsilon = 1e-6);
    assert_abs_diff_eq!(scale_delta[[0, 1]], -0.1875, epsilon = 1e-6);

    // 线性空间的导数信号还要乘以密度：N(2; 0, 1) = 0.05399097
    let (loc_delta, scale_delta) = leaf.compute_gradient(&signal, &evidence, true).unwrap();
    assert_abs_diff_eq!(loc_delta[[0, 0]], 2. * 0.053_990_97, epsilon = 1e-6);
    assert_abs_diff_eq!(scale_delta[[0, 0]], 3. * 0.053_990_97, epsilon = 1e-6);

    assert_err!(
        leaf.compute_gradient(&Tensor::ones(&[2, 3]), &evidence, false),
        SpnError::ShapeMismatch { .. }
    );
}

#[test]
fn test_normal_leaf_assign_add_clamps_scale() {
    let mut leaf = NormalLeaf::new(
        "N",
        Tensor::new(&[0.], &[1, 1]),
        Tensor::new(&[1.], &[1, 1]),
        true,
    )
    .unwrap();
    leaf.set_min_scale(0.1).unwrap();
    leaf.assign_add(&Tensor::new(&[0.5], &[1, 1]), &Tensor::new(&[-5.], &[1, 1]))
        .unwrap();
    assert_abs_diff_eq!(leaf.loc()[[0, 0]], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(leaf.scale()[[0, 0]], 0.1, epsilon = 1e-6);

    assert_err!(leaf.set_min_scale(0.), SpnError::InvalidConfig(_));
    assert_err!(
        leaf.assign_add(&Tensor::zeros(&[2, 1]), &Tensor::zeros(&[1, 1])),
        SpnError::ShapeMismatch { .. }
    );
}

#[test]
fn test_normal_leaf_rejects_bad_params() {
    assert_err!(
        NormalLeaf::new("N", Tensor::zeros(&[1, 2]), Tensor::ones(&[2, 1]), true),
        SpnError::ShapeMismatch { .. }
    );
    assert_err!(
        NormalLeaf::new("N", Tensor::zeros(&[1, 1]), Tensor::zeros(&[1, 1]), true),
        SpnError::StructureError(_)
    );
}
#[test]
fn test_graph_level_min_scale() {
    let graph = SpnGraph::new();
    let leaf = graph
        .normal_leaf(&Tensor::zeros(&[1, 1]), &Tensor::ones(&[1, 1]), true, "N")
        .unwrap();
    let other = graph.indicator_leaf(1, 2, "X").unwrap();
    let mut inner = graph.inner_mut();
    inner.set_normal_leaf_min_scale(leaf, 0.5).unwrap();
    assert_err!(inner.set_normal_leaf_min_scale(other, 0.5), SpnError::InvalidOperation(_));
    assert_err!(inner.set_normal_leaf_min_scale(leaf, -1.), SpnError::InvalidConfig(_));
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑正态叶节点↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓构图↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[test]
fn test_sums_builder() {
    let graph = SpnGraph::new();
    let leaf = graph.indicator_leaf(2, 3, "X").unwrap();
    let sums = graph
        .sums(&[Input::all(leaf)], 2, WeightsInit::Constant(1.), false, "S")
        .unwrap();
    let weights = graph.get_sums_weights(sums).unwrap();
    let inner = graph.inner();

    assert_eq!(inner.get_node_out_size(sums).unwrap(), 2);
    assert_eq!(inner.get_node_name(weights).unwrap(), "S_Weights");
    assert_eq!(inner.get_weights_variable(weights).unwrap(), Tensor::ones(&[2, 3]));
    assert!(inner.is_param(weights).unwrap());
    assert!(inner.is_leaf(leaf).unwrap());
    // 输入顺序：[权重, 值输入...]
    let inputs = inner.get_node_inputs(sums).unwrap();
    assert_eq!(inputs[0], Input::all(weights));
    assert_eq!(inputs[1], Input::all(leaf));
}

#[test]
fn test_generate_latent_indicators() {
    let mixture = build_mixture(false);
    let latent = mixture
        .graph
        .generate_latent_indicators(mixture.root)
        .unwrap();
    let inner = mixture.graph.inner();
    assert_eq!(inner.get_node_name(latent).unwrap(), "root_Latent");
    assert_eq!(inner.get_node_out_size(latent).unwrap(), 2);
    assert_eq!(inner.get_latent_indicators(mixture.root).unwrap(), Some(latent));
    drop(inner);

    assert_err!(
        mixture.graph.generate_latent_indicators(mixture.root),
        SpnError::StructureError(_)
    );
    assert_err!(
        mixture.graph.generate_latent_indicators(mixture.leaf),
        SpnError::InvalidOperation(_)
    );
}

#[test]
fn test_structure_errors() {
    let graph = SpnGraph::new();
    let leaf = graph.indicator_leaf(1, 3, "X").unwrap();
    let init = WeightsInit::Constant(1.);

    // 3 列不能平均分给 2 个和
    assert_err!(
        graph.sums(&[Input::all(leaf)], 2, init, false, "S"),
        SpnError::StructureError(_)
    );
    assert_err!(graph.sums(&[], 1, init, false, "S"), SpnError::StructureError(_));
    assert_err!(
        graph.product(&[Input::with_indices(leaf, &[0, 3])], "P"),
        SpnError::StructureError(_)
    );
    assert_err!(
        graph.product(&[Input::all(crate::spn::NodeId(100))], "P"),
        SpnError::NodeNotFound(_)
    );
    assert_err!(graph.indicator_leaf(0, 2, "Y"), SpnError::StructureError(_));
    assert_err!(graph.indicator_leaf(1, 2, "X"), SpnError::DuplicateNodeName(_));

    let p = graph.products(&[Input::with_indices(leaf, &[0, 1])], 2, "P").unwrap();
    // 追加后共 3 列，不能平均分给 2 个乘积
    assert_err!(
        graph.add_values(p, &[Input::with_indices(leaf, &[2])]),
        SpnError::StructureError(_)
    );
    graph
        .add_values(p, &[Input::with_indices(leaf, &[2]), Input::with_indices(leaf, &[0])])
        .unwrap();
    assert_eq!(graph.inner().get_node_inputs(p).unwrap().len(), 3);
}

#[test]
fn test_auto_generated_names() {
    let mut inner = crate::spn::GraphInner::new();
    let a = inner.new_indicator_leaf_node(1, 2, None).unwrap();
    let b = inner.new_indicator_leaf_node(1, 2, None).unwrap();
    assert_eq!(inner.get_node_name(a).unwrap(), "indicator_leaf_1");
    assert_eq!(inner.get_node_name(b).unwrap(), "indicator_leaf_2");
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑构图↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

#[test]
fn test_seeded_weights_are_reproducible() {
    let init = WeightsInit::RandomUniform { min: 0.2, max: 1.0 };
    let build = |log_weights: bool| {
        let graph = SpnGraph::new();
        graph.inner_mut().set_seed(9);
        let leaf = graph.indicator_leaf(1, 4, "X").unwrap();
        let root = graph.sum(&[Input::all(leaf)], init, log_weights, "root").unwrap();
        let weights = graph.get_sums_weights(root).unwrap();
        assert_eq!(graph.inner().is_log_weights(weights).unwrap(), log_weights);
        graph.get_weights_value(weights).unwrap()
    };
    let linear = build(false);
    let log = build(true);
    for k in 0..4 {
        assert_abs_diff_eq!(linear[[0, k]], log[[0, k]], epsilon = 1e-5);
    }
}
