/*
 * @Author       : 老董
 * @Date         : 2026-10-19
 * @Description  : 和积网络的图：节点的存储（arena）、构建、遍历、求值与传信号
 *
 * 公开 API：
 * - `SpnGraph`: 用户级句柄
 * - `GraphInner`: 底层实现
 * - `SpnError`: 错误类型
 */

mod error;
mod handle;
mod inner;

pub use error::SpnError;
pub use handle::SpnGraph;
pub use inner::{GraphInner, Scope};
