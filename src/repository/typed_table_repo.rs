// ==========================================
// 个人财务表格导入 - 类型化表 Repository Trait
// ==========================================
// 职责: 定义目标表的整表替换与只读统计接口
// 红线: Repository 不做类型转换，只写入已转换的值
// ==========================================

use crate::domain::schema::TableSchema;
use crate::domain::types::TypedValue;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// TypedTableRepository Trait
// ==========================================
// 用途: 按 TableSchema 原子替换目标表
// 实现者: TypedTableRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait TypedTableRepository: Send + Sync {
    /// 以新结构和新数据整表替换目标表
    ///
    /// # 参数
    /// - schema: 目标表结构（列顺序即写入顺序）
    /// - rows: 每行的值，顺序与 schema.columns 一致
    ///
    /// # 返回
    /// - Ok(usize): 写入行数
    /// - Err: 任一步失败时事务回滚，旧表保持不变
    async fn replace_table(
        &self,
        schema: &TableSchema,
        rows: Vec<Vec<TypedValue>>,
    ) -> RepositoryResult<usize>;

    /// 目标表是否存在
    async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool>;

    /// 目标表行数
    async fn table_row_count(&self, table_name: &str) -> RepositoryResult<usize>;
}
