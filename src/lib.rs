//! # Only SPN
//!
//! `only_spn`用纯rust构建和积网络（Sum-Product Network，SPN），并以梯度下降、
//! 硬/软EM等多种学习信号训练网络参数。
//!
//! 核心是[`spn::GDLearning`]：它在构造时遍历网络、为每个可学习的节点建立累加器，
//! 之后可反复`accumulate_updates`，再以`update_spn`提交、`reset_accumulators`清零。

pub mod errors;
pub mod spn;
pub mod tensor;
pub mod utils;
