use ndarray::{Array, ArrayD, IxDyn};
use rand::Rng;

use crate::errors::{ComparisonOperator, TensorError};

mod ops {
    pub mod add;
    pub mod add_assign;
    pub mod cols;
    pub mod math;
    pub mod mul;
    pub mod others;
    pub mod sub;
}

pub use ops::math::{arg_max, log_sum_exp};

mod index;
mod shape;


/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 和积网络中，批量化的节点值统一为形状`[batch, out_size]`的二阶张量；
/// 权重节点的值为形状`[num_sums, sum_size]`的二阶张量。
#[derive(Debug, Clone)]
pub struct Tensor {
    data: Array<f32, IxDyn>,
}

impl Tensor {
    /// 创建一个张量，若为标量，`shape`可以是[]、[1]、[1,1]...
    /// 注：`data`的长度必须和`shape`中所有元素的乘积相等，否则panic（需要错误而非panic时请用`try_new`）。
    pub fn new(data: &[f32], shape: &[usize]) -> Tensor {
        Self::try_new(data.to_vec(), shape).unwrap()
    }

    /// 同`new`，但数据与形状不匹配时返回错误
    pub fn try_new(data: Vec<f32>, shape: &[usize]) -> Result<Tensor, TensorError> {
        let data_len = data.len();
        let data = Array::from_shape_vec(IxDyn(shape), data).map_err(|_| {
            TensorError::DataShapeMismatch {
                data_len,
                shape: shape.to_vec(),
            }
        })?;
        Ok(Tensor { data })
    }

    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor {
            data: Array::zeros(IxDyn(shape)),
        }
    }

    pub fn ones(shape: &[usize]) -> Tensor {
        Tensor {
            data: Array::ones(IxDyn(shape)),
        }
    }

    /// 创建一个所有元素均为`value`的张量
    pub fn full(value: f32, shape: &[usize]) -> Tensor {
        Tensor {
            data: Array::from_elem(IxDyn(shape), value),
        }
    }

    /// 创建一个与本张量形状一致的零张量
    pub fn zeros_like(&self) -> Tensor {
        Self::zeros(self.shape())
    }

    /// 创建一个随机张量，其值服从[min, max)上的均匀分布；`min == max`时所有元素均为`min`。
    /// `min > max`时报错。
    pub fn new_uniform<R: Rng>(
        min: f32,
        max: f32,
        shape: &[usize],
        rng: &mut R,
    ) -> Result<Tensor, TensorError> {
        if min > max {
            return Err(TensorError::ValueMustSatisfyComparison {
                value_name: "均匀分布的上界减下界".to_string(),
                operator: ComparisonOperator::GreaterOrEqual,
                threshold: 0,
            });
        }
        if min == max {
            return Ok(Self::full(min, shape));
        }
        let data = (0..shape.iter().product::<usize>())
            .map(|_| rng.gen_range(min..max))
            .collect::<Vec<_>>();
        Self::try_new(data, shape)
    }

    pub(crate) fn from_array(data: ArrayD<f32>) -> Tensor {
        Tensor { data }
    }
}
