// ==========================================
// 个人财务表格导入 - API 层
// ==========================================
// 职责: 供命令行与对话代理调用的导入 / 只读查询接口
// ==========================================

pub mod error;
pub mod import_api;
pub mod query_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::ImportApi;
pub use query_api::{ColumnInfo, DatabaseSchema, JsonRow, QueryApi, TableInfo};
