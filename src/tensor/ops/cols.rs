/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 二阶张量的按列操作：拼接、按下标选取（gather）以及按下标散布累加（scatter-add）。
 *                 和积网络节点的输入可以只选取子节点输出中的部分列，
 *                 前向时需要gather，反向传递信号时需要把信号scatter回子节点的完整输出宽度。
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use ndarray::{Array2, Axis};

impl Tensor {
    /// 按列拼接若干个行数相同的二阶张量
    pub fn concat_cols(tensors: &[&Tensor]) -> Result<Tensor, TensorError> {
        let first = tensors.first().ok_or(TensorError::EmptyList)?;
        let (rows, _) = first.rows_cols()?;
        let mut total_cols = 0;
        for t in tensors {
            let (r, c) = t.rows_cols()?;
            if r != rows {
                return Err(TensorError::OperatorError {
                    operator: Operator::Concat,
                    tensor1_shape: first.shape().to_vec(),
                    tensor2_shape: t.shape().to_vec(),
                });
            }
            total_cols += c;
        }
        let mut out = Array2::<f32>::zeros((rows, total_cols));
        let mut offset = 0;
        for t in tensors {
            for (j, col) in t.data.axis_iter(Axis(1)).enumerate() {
                out.column_mut(offset + j).assign(&col);
            }
            offset += t.shape()[1];
        }
        Ok(Tensor::from_array(out.into_dyn()))
    }

    /// 选取二阶张量中的若干列（下标可重复、可乱序）
    pub fn gather_cols(&self, indices: &[usize]) -> Result<Tensor, TensorError> {
        let (_, cols) = self.rows_cols()?;
        if let Some(&index) = indices.iter().find(|&&i| i >= cols) {
            return Err(TensorError::ColumnOutOfRange {
                index,
                num_cols: cols,
            });
        }
        Ok(Tensor::from_array(self.data.select(Axis(1), indices)))
    }

    /// 把`src`的第`j`列累加到本张量的第`indices[j]`列（重复下标会多次累加）
    pub fn scatter_cols_add(&mut self, src: &Tensor, indices: &[usize]) -> Result<(), TensorError> {
        let (rows, cols) = self.rows_cols()?;
        let (src_rows, src_cols) = src.rows_cols()?;
        if src_rows != rows || src_cols != indices.len() {
            return Err(TensorError::IncompatibleShape);
        }
        if let Some(&index) = indices.iter().find(|&&i| i >= cols) {
            return Err(TensorError::ColumnOutOfRange {
                index,
                num_cols: cols,
            });
        }
        for (j, &target) in indices.iter().enumerate() {
            let src_col = src.data.index_axis(Axis(1), j);
            let mut dst_col = self.data.index_axis_mut(Axis(1), target);
            dst_col += &src_col;
        }
        Ok(())
    }
}
