use super::Tensor;
use crate::errors::TensorError;

impl Tensor {
    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为矩阵，`shape`可以是[n,m]；
    /// 若为更高维度的数组，`shape`可以是[c,n,m,...]。
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// 计算张量中所有元素的数量
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 判断两个张量的形状是否严格一致。如：形状为 [1, 4]，[1, 4]和[4]是不一致的，会返回false
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    /// 判断张量是否为标量
    pub fn is_scalar(&self) -> bool {
        self.shape().is_empty() || self.shape().iter().all(|x| *x == 1)
    }

    /// 转化为纯数（number）。若为标量，则返回Some(number)，否则返回None
    pub fn number(&self) -> Option<f32> {
        if self.is_scalar() {
            self.data.iter().next().copied()
        } else {
            None
        }
    }

    pub fn reshape(&self, shape: &[usize]) -> Result<Self, TensorError> {
        if self.size() != shape.iter().product::<usize>() {
            return Err(TensorError::IncompatibleShape);
        }
        Self::try_new(self.to_vec(), shape)
    }

    /// 判断两个张量能否按 NumPy 风格广播：从右向左对齐，每个维度相等或其中之一为 1
    pub fn can_broadcast_with(&self, other: &Self) -> bool {
        self.shape()
            .iter()
            .rev()
            .zip(other.shape().iter().rev())
            .all(|(&a, &b)| a == b || a == 1 || b == 1)
    }

    /// 二阶张量的行数与列数
    pub fn rows_cols(&self) -> Result<(usize, usize), TensorError> {
        match self.shape() {
            &[rows, cols] => Ok((rows, cols)),
            shape => Err(TensorError::Need2Dims(shape.to_vec())),
        }
    }
}
