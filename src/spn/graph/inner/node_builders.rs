/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : GraphInner 节点创建（new_*_node）与结构修改
 */

use super::GraphInner;
use crate::spn::nodes::{
    IndicatorLeaf, Input, NodeHandle, NodeType, NormalLeaf, Products, Sums, TraitNode, Weights,
    WeightsInit,
};
use crate::spn::{NodeId, SpnError};
use crate::tensor::Tensor;

impl GraphInner {
    pub(in crate::spn::graph) fn add_node_to_list<T: Into<NodeType>>(
        &mut self,
        id: NodeId,
        raw_node: T,
    ) -> NodeId {
        self.nodes.insert(id, NodeHandle::new(id, raw_node));
        id
    }

    /// 校验一组输入边（非空、节点存在、下标不越界），返回其总宽度
    fn check_inputs(&self, values: &[Input], owner: &str) -> Result<usize, SpnError> {
        if values.is_empty() {
            return Err(SpnError::StructureError(format!("节点{owner}的输入不能为空")));
        }
        let mut total = 0;
        for input in values {
            let out_size = self.get_node(input.node)?.out_size();
            if let Some(indices) = &input.indices {
                if indices.is_empty() {
                    return Err(SpnError::StructureError(format!(
                        "节点{owner}的输入{:?}选取的列为空",
                        input.node
                    )));
                }
                if let Some(&index) = indices.iter().find(|&&i| i >= out_size) {
                    return Err(SpnError::StructureError(format!(
                        "节点{owner}的输入{:?}选取的列{index}越界（该节点共{out_size}列）",
                        input.node
                    )));
                }
            }
            total += input.width(out_size);
        }
        Ok(total)
    }

    /// 把总宽度`total`平均分给`num`个和/乘积，返回每份的大小
    fn split_evenly(total: usize, num: usize, owner: &str) -> Result<usize, SpnError> {
        if num == 0 || total % num != 0 {
            return Err(SpnError::StructureError(format!(
                "节点{owner}的输入共{total}列，不能平均分给{num}个子节点"
            )));
        }
        Ok(total / num)
    }

    // ========== 叶节点 ==========

    /// 创建指示变量叶节点，输出宽度为`num_vars * num_vals`
    pub fn new_indicator_leaf_node(
        &mut self,
        num_vars: usize,
        num_vals: usize,
        name: Option<&str>,
    ) -> Result<NodeId, SpnError> {
        let name = self.generate_valid_new_node_name(name.unwrap_or(""), "indicator_leaf")?;
        let leaf = IndicatorLeaf::new(&name, num_vars, num_vals)?;
        let id = self.generate_valid_node_id();
        Ok(self.add_node_to_list(id, leaf))
    }

    /// 创建正态叶节点，`loc`与`scale`的形状为`[num_vars, num_components]`
    pub fn new_normal_leaf_node(
        &mut self,
        loc: &Tensor,
        scale: &Tensor,
        learn_distribution_parameters: bool,
        name: Option<&str>,
    ) -> Result<NodeId, SpnError> {
        let name = self.generate_valid_new_node_name(name.unwrap_or(""), "normal_leaf")?;
        let leaf = NormalLeaf::new(&name, loc.clone(), scale.clone(), learn_distribution_parameters)?;
        let id = self.generate_valid_node_id();
        Ok(self.add_node_to_list(id, leaf))
    }

    /// 设置正态叶节点尺度参数的下限
    pub fn set_normal_leaf_min_scale(&mut self, leaf: NodeId, min_scale: f32) -> Result<(), SpnError> {
        let node = self.get_node_mut(leaf)?;
        let description = node.to_string();
        match node.node_type_mut() {
            NodeType::NormalLeaf(l) => l.set_min_scale(min_scale),
            _ => Err(SpnError::InvalidOperation(format!("{description}不是正态叶节点"))),
        }
    }

    // ========== 求和层 ==========

    /// 创建求和层（连同其权重节点`<name>_Weights`）：拼接后的输入平均分给`num_sums`个和
    pub fn new_sums_node(
        &mut self,
        values: &[Input],
        num_sums: usize,
        weights_init: WeightsInit,
        log_weights: bool,
        name: Option<&str>,
    ) -> Result<NodeId, SpnError> {
        let name = self.generate_valid_new_node_name(name.unwrap_or(""), "sums")?;
        let total = self.check_inputs(values, &name)?;
        let sum_size = Self::split_evenly(total, num_sums, &name)?;

        let weights_name = self.generate_valid_new_node_name(&format!("{name}_Weights"), "weights")?;
        let shape = [num_sums, sum_size];
        let init = match self.rng.as_mut() {
            Some(rng) => weights_init.generate(&shape, rng)?,
            None => weights_init.generate(&shape, &mut rand::thread_rng())?,
        };
        let weights = Weights::new(&weights_name, &init, log_weights)?;

        let mut has_leaf_inputs = false;
        for input in values {
            has_leaf_inputs |= self.get_node(input.node)?.is_leaf();
        }

        let weights_id = self.generate_valid_node_id();
        self.add_node_to_list(weights_id, weights);
        let sums = Sums::new(
            &name,
            num_sums,
            sum_size,
            weights_id,
            values.to_vec(),
            has_leaf_inputs,
        );
        let id = self.generate_valid_node_id();
        tracing::debug!(sums = %name, num_sums, sum_size, "创建求和层");
        Ok(self.add_node_to_list(id, sums))
    }

    /// 创建单个和节点
    pub fn new_sum_node(
        &mut self,
        values: &[Input],
        weights_init: WeightsInit,
        log_weights: bool,
        name: Option<&str>,
    ) -> Result<NodeId, SpnError> {
        self.new_sums_node(values, 1, weights_init, log_weights, name)
    }

    /// 为求和层生成潜变量指示叶节点`<name>_Latent`（`num_vars = num_sums`，`num_vals = sum_size`）
    /// 并挂到该求和层上
    pub fn generate_latent_indicators(&mut self, sums: NodeId) -> Result<NodeId, SpnError> {
        let (name, num_sums, sum_size) = match self.get_node(sums)?.node_type() {
            NodeType::Sums(s) => {
                if s.latent_indicators().is_some() {
                    return Err(SpnError::StructureError(format!(
                        "求和层{}已经有潜变量指示",
                        s.name()
                    )));
                }
                (s.name().to_string(), s.num_sums(), s.sum_size())
            }
            _ => return Err(self.wrong_node_type(sums, "求和层")),
        };
        let latent = self.new_indicator_leaf_node(num_sums, sum_size, Some(&format!("{name}_Latent")))?;
        if let NodeType::Sums(s) = self.get_node_mut(sums)?.node_type_mut() {
            s.set_latent_indicators(latent);
        }
        Ok(latent)
    }

    // ========== 乘积层 ==========

    /// 创建乘积层：拼接后的输入平均分给`num_prods`个乘积
    pub fn new_products_node(
        &mut self,
        values: &[Input],
        num_prods: usize,
        name: Option<&str>,
    ) -> Result<NodeId, SpnError> {
        let name = self.generate_valid_new_node_name(name.unwrap_or(""), "products")?;
        let total = self.check_inputs(values, &name)?;
        let prod_size = Self::split_evenly(total, num_prods, &name)?;
        let products = Products::new(&name, num_prods, prod_size, values.to_vec());
        let id = self.generate_valid_node_id();
        Ok(self.add_node_to_list(id, products))
    }

    /// 创建单个乘积节点
    pub fn new_product_node(&mut self, values: &[Input], name: Option<&str>) -> Result<NodeId, SpnError> {
        self.new_products_node(values, 1, name)
    }

    /// 给已有的乘积层追加输入。追加后的总宽度仍须能平均分给各乘积。
    /// 不检查是否成环，环在遍历时报告
    pub fn add_values(&mut self, products: NodeId, values: &[Input]) -> Result<(), SpnError> {
        let (name, num_prods, current) = match self.get_node(products)?.node_type() {
            NodeType::Products(p) => (
                p.name().to_string(),
                p.num_prods(),
                p.num_prods() * p.prod_size(),
            ),
            _ => return Err(self.wrong_node_type(products, "乘积层")),
        };
        let added = self.check_inputs(values, &name)?;
        let prod_size = Self::split_evenly(current + added, num_prods, &name)?;
        if let NodeType::Products(p) = self.get_node_mut(products)?.node_type_mut() {
            p.add_values(values.to_vec(), prod_size);
        }
        Ok(())
    }
}
