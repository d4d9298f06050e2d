// ==========================================
// 个人财务表格导入 - 数据仓储层
// ==========================================
// 职责: 目标表的原子替换与只读统计
// 红线: Repository 不含类型转换规则
// ==========================================

pub mod error;
pub mod typed_table_repo;
pub mod typed_table_repo_impl;

pub use error::{RepositoryError, RepositoryResult};
pub use typed_table_repo::TypedTableRepository;
pub use typed_table_repo_impl::TypedTableRepositoryImpl;
