// ==========================================
// 个人财务表格导入 - 类型化表 Repository 实现
// ==========================================
// 职责: 暂存表 + 重命名，在单个事务内整表替换（使用 rusqlite）
// 红线: 失败时事务回滚，旧表与旧数据保持不变
// ==========================================

use crate::db::open_connection;
use crate::domain::schema::{quote_identifier, TableSchema, STAGING_SUFFIX};
use crate::domain::types::TypedValue;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::typed_table_repo::TypedTableRepository;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::{params_from_iter, Connection, OptionalExtension, ToSql};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// ==========================================
// TypedValue → SQLite 值
// ==========================================
// DECIMAL → REAL, BOOLEAN → 0/1, DATE → YYYY-MM-DD
impl ToSql for TypedValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let output = match self {
            TypedValue::Null => ToSqlOutput::Owned(Value::Null),
            TypedValue::Integer(v) => ToSqlOutput::from(*v),
            TypedValue::Decimal(d) => {
                let f = d.to_f64().ok_or_else(|| {
                    rusqlite::Error::ToSqlConversionFailure(
                        format!("DECIMAL 无法转换为浮点数: {}", d).into(),
                    )
                })?;
                ToSqlOutput::from(f)
            }
            TypedValue::Boolean(b) => ToSqlOutput::from(*b),
            TypedValue::Date(d) => ToSqlOutput::from(d.format("%Y-%m-%d").to_string()),
            TypedValue::Text(s) => ToSqlOutput::from(s.as_str()),
        };
        Ok(output)
    }
}

// ==========================================
// TypedTableRepositoryImpl
// ==========================================
pub struct TypedTableRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl TypedTableRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 复用已打开的连接
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn staging_table_name(table_name: &str) -> String {
        format!("{}{}", table_name, STAGING_SUFFIX)
    }

    /// 在事务中完成: 建暂存表 → 写入 → 删旧表 → 重命名
    fn replace_table_tx(
        conn: &Connection,
        schema: &TableSchema,
        rows: &[Vec<TypedValue>],
    ) -> RepositoryResult<usize> {
        let target = quote_identifier(&schema.table_name);
        let staging_name = Self::staging_table_name(&schema.table_name);
        let staging = quote_identifier(&staging_name);

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        // 上次异常退出可能留下暂存表
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", staging))?;
        tx.execute_batch(&schema.create_table_sql(&staging_name))?;

        // 按列名写入
        let width = schema.columns.len();
        let column_list: Vec<String> = schema
            .destination_names()
            .into_iter()
            .map(quote_identifier)
            .collect();
        let placeholders: Vec<String> = (1..=width).map(|i| format!("?{}", i)).collect();
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            staging,
            column_list.join(", "),
            placeholders.join(", ")
        );

        let mut count = 0;
        {
            let mut stmt = tx.prepare(&insert_sql)?;
            for (idx, row) in rows.iter().enumerate() {
                if row.len() != width {
                    return Err(RepositoryError::RowWidthMismatch {
                        row: idx + 1,
                        expected: width,
                        actual: row.len(),
                    });
                }
                stmt.execute(params_from_iter(row.iter()))?;
                count += 1;
            }
        }

        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", target))?;
        tx.execute_batch(&format!("ALTER TABLE {} RENAME TO {}", staging, target))?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(count)
    }
}

#[async_trait]
impl TypedTableRepository for TypedTableRepositoryImpl {
    async fn replace_table(
        &self,
        schema: &TableSchema,
        rows: Vec<Vec<TypedValue>>,
    ) -> RepositoryResult<usize> {
        schema.validate().map_err(RepositoryError::InvalidSchema)?;

        let conn = self.get_conn()?;
        let count = Self::replace_table_tx(&conn, schema, &rows)?;

        debug!(table = %schema.table_name, rows = count, "整表替换完成");
        Ok(count)
    }

    async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let exists = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table_name],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }

    async fn table_row_count(&self, table_name: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(table_name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }
}
