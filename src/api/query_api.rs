// ==========================================
// 个人财务表格导入 - 只读查询API
// ==========================================
// 职责: 供对话代理使用的只读查询与库结构描述
// 红线: 只读连接 + 单条只读语句，拒绝任何写操作
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::db::{list_user_tables, open_read_only_connection};
use crate::domain::schema::{is_valid_identifier, quote_identifier};
use indexmap::IndexMap;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::path::Path;
use tracing::{debug, instrument};

/// 查询结果行: 列名 → 值（保持 SELECT 列顺序）
pub type JsonRow = Map<String, Value>;

/// 表达式结果中 REAL 值保留的有效数字位数
const REAL_SIGNIFICANT_DIGITS: u32 = 15;

// ==========================================
// 库结构描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub columns: IndexMap<String, ColumnInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub tables: IndexMap<String, TableInfo>,
}

// ==========================================
// QueryApi
// ==========================================
pub struct QueryApi {
    db_path: String,
}

impl QueryApi {
    pub fn new(db_path: &str) -> Self {
        Self {
            db_path: db_path.to_string(),
        }
    }

    fn open(&self) -> ApiResult<Connection> {
        if !Path::new(&self.db_path).exists() {
            return Err(ApiError::NotFound(format!("数据库文件不存在: {}", self.db_path)));
        }
        open_read_only_connection(&self.db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))
    }

    /// 执行单条只读 SQL
    ///
    /// # 返回
    /// - Ok(Vec<JsonRow>): 查询结果
    /// - Err(ReadOnlyViolation): 多条语句或写语句
    #[instrument(skip(self))]
    pub fn execute_read_only(&self, sql: &str) -> ApiResult<Vec<JsonRow>> {
        let sql = single_statement(sql)?;
        let conn = self.open()?;

        let mut stmt = conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(ApiError::ReadOnlyViolation(sql.to_string()));
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        // 直接引用 DECIMAL 列时按声明小数位输出；表达式列只清理浮点误差
        let scales: Vec<Option<u32>> = stmt
            .columns()
            .iter()
            .map(|c| c.decl_type().and_then(decimal_scale))
            .collect();
        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut object = Map::with_capacity(columns.len());
            for (idx, column) in columns.iter().enumerate() {
                object.insert(column.clone(), json_value(row.get_ref(idx)?, scales[idx]));
            }
            result.push(object);
        }

        debug!(rows = result.len(), "查询完成");
        Ok(result)
    }

    /// 全部用户表及其列的类型 / 可空性
    pub fn describe_schema(&self) -> ApiResult<DatabaseSchema> {
        let conn = self.open()?;
        let mut schema = DatabaseSchema::default();

        for table in list_user_tables(&conn)? {
            let mut stmt =
                conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(&table)))?;
            let columns = stmt
                .query_map([], |row| {
                    let name: String = row.get(1)?;
                    let column_type: String = row.get(2)?;
                    let not_null: i64 = row.get(3)?;
                    Ok((
                        name,
                        ColumnInfo {
                            column_type,
                            nullable: not_null == 0,
                        },
                    ))
                })?
                .collect::<rusqlite::Result<IndexMap<_, _>>>()?;
            schema.tables.insert(table, TableInfo { columns });
        }

        Ok(schema)
    }

    /// 某列的去重非空值（文本形式，升序）
    pub fn distinct_values(&self, table: &str, column: &str) -> ApiResult<Vec<String>> {
        for name in [table, column] {
            if !is_valid_identifier(name) {
                return Err(ApiError::InvalidInput(format!("非法标识符: {}", name)));
            }
        }

        let conn = self.open()?;
        let column = quote_identifier(column);
        let sql = format!(
            "SELECT DISTINCT CAST({col} AS TEXT) FROM {table} WHERE {col} IS NOT NULL ORDER BY 1",
            col = column,
            table = quote_identifier(table)
        );
        let mut stmt = conn.prepare(&sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(values)
    }
}

/// 只允许一条语句: 去掉结尾的分号与注释
fn single_statement(sql: &str) -> ApiResult<&str> {
    let sql = sql.trim();
    let statement = match statement_separator(sql) {
        Some(pos) if is_blank_sql(&sql[pos..]) => sql[..pos].trim_end(),
        Some(_) => return Err(ApiError::ReadOnlyViolation(format!("不允许多条语句: {}", sql))),
        None => sql,
    };
    if is_blank_sql(statement) {
        return Err(ApiError::InvalidInput("SQL 为空".to_string()));
    }
    Ok(statement)
}

/// `pos` 处若是注释（`--` 行注释或 `/* */` 块注释），返回注释之后的位置
fn comment_end(bytes: &[u8], pos: usize) -> Option<usize> {
    match (bytes.get(pos), bytes.get(pos + 1)) {
        (Some(b'-'), Some(b'-')) => Some(
            bytes[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(bytes.len(), |n| pos + n + 1),
        ),
        (Some(b'/'), Some(b'*')) => Some(
            bytes[pos + 2..]
                .windows(2)
                .position(|w| w == b"*/")
                .map_or(bytes.len(), |n| pos + 2 + n + 2),
        ),
        _ => None,
    }
}

/// 引号与注释之外第一个 ';' 的字节位置
fn statement_separator(sql: &str) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut quote: Option<u8> = None;
    let mut pos = 0;
    while pos < bytes.len() {
        let b = bytes[pos];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => {
                if let Some(end) = comment_end(bytes, pos) {
                    pos = end;
                    continue;
                }
                match b {
                    b'\'' | b'"' | b'`' => quote = Some(b),
                    b'[' => quote = Some(b']'),
                    b';' => return Some(pos),
                    _ => {}
                }
            }
        }
        pos += 1;
    }
    None
}

/// 只含空白、分号与注释
fn is_blank_sql(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        if let Some(end) = comment_end(bytes, pos) {
            pos = end;
            continue;
        }
        if bytes[pos] != b';' && !bytes[pos].is_ascii_whitespace() {
            return false;
        }
        pos += 1;
    }
    true
}

/// 声明类型中的小数位: "DECIMAL(10,2)" → Some(2)，非 DECIMAL → None
fn decimal_scale(decl_type: &str) -> Option<u32> {
    let upper = decl_type.trim().to_ascii_uppercase();
    let args = upper.strip_prefix("DECIMAL")?.trim();
    if args.is_empty() {
        return Some(0);
    }
    let inner = args.strip_prefix('(')?.strip_suffix(')')?;
    match inner.split_once(',') {
        Some((_, scale)) => scale.trim().parse().ok(),
        None => Some(0),
    }
}

/// DECIMAL 列按声明的小数位输出
fn decimal_json(value: Decimal, scale: u32) -> Value {
    let rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded
        .to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// 去掉二进制浮点的累加误差（保留 15 位有效数字）
fn clean_real(f: f64) -> f64 {
    Decimal::from_f64(f)
        .and_then(|d| d.round_sf(REAL_SIGNIFICANT_DIGITS))
        .and_then(|d| d.to_f64())
        .filter(|cleaned| *cleaned != 0.0 || f == 0.0)
        .unwrap_or(f)
}

fn json_value(value: ValueRef<'_>, scale: Option<u32>) -> Value {
    match (value, scale) {
        (ValueRef::Null, _) => Value::Null,
        (ValueRef::Integer(i), Some(scale)) => decimal_json(Decimal::from(i), scale),
        (ValueRef::Integer(i), None) => Value::from(i),
        (ValueRef::Real(f), Some(scale)) => match Decimal::from_f64(f) {
            Some(d) => decimal_json(d, scale),
            None => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        },
        (ValueRef::Real(f), None) => Number::from_f64(clean_real(f)).map(Value::Number).unwrap_or(Value::Null),
        (ValueRef::Text(t), _) => Value::String(String::from_utf8_lossy(t).into_owned()),
        (ValueRef::Blob(b), _) => Value::String(format!("<blob {} bytes>", b.len())),
    }
}
