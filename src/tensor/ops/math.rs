/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 逐元素的数学函数以及沿批次维度的归约
 */

use crate::tensor::Tensor;
use ndarray::Axis;

impl Tensor {
    /// 逐元素自然对数（0 的对数为负无穷）
    pub fn ln(&self) -> Tensor {
        self.map(f32::ln)
    }

    /// 逐元素指数
    pub fn exp(&self) -> Tensor {
        self.map(f32::exp)
    }

    pub fn map<F: Fn(f32) -> f32>(&self, f: F) -> Tensor {
        Tensor::from_array(self.data.mapv(f))
    }

    /// 沿第 0 维（批次维）求和，结果去掉该维度。
    /// 如形状`[batch, n]`的张量求和后形状为`[n]`
    pub fn sum_axis0(&self) -> Tensor {
        Tensor::from_array(self.data.sum_axis(Axis(0)))
    }

    /// 所有元素是否都为有限值
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}

/// 对一组（对数空间的）数做数值稳定的 log-sum-exp；全为负无穷时返回负无穷
pub fn log_sum_exp(values: &[f32]) -> f32 {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max == f32::NEG_INFINITY {
        return f32::NEG_INFINITY;
    }
    if max == f32::INFINITY {
        return f32::INFINITY;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f32>().ln()
}

/// 返回最大值所在的下标；并列时取最前的那个。空切片返回`None`
pub fn arg_max(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
