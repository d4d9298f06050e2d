// ==========================================
// 个人财务表格导入 - 领域模型层
// ==========================================
// 职责: 定义列类型、表结构描述、原始数据集、导入结果
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod dataset;
pub mod import;
pub mod schema;
pub mod types;

// 重导出核心类型
pub use dataset::{RawCell, RawDataset, RawRow};
pub use import::{ColumnCoercionStats, ImportRunReport, TableLoadReport, TableOutcome};
pub use schema::{ColumnSpec, TableSchema};
pub use types::{ColumnType, TypedValue};
