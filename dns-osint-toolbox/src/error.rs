//! 统一错误类型定义

use serde::Serialize;
use thiserror::Error;

/// 工具箱错误类型
///
/// Only operation-level faults live here. Per-query DNS failures inside a
/// multi-query operation are reported as data (see [`crate::QueryOutcome`]).
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum ToolboxError {
    /// 验证错误（在任何网络请求之前发生）
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 工具箱 Result 类型别名
pub type ToolboxResult<T> = std::result::Result<T, ToolboxError>;
