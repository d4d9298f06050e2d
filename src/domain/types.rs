// ==========================================
// 个人财务表格导入 - 领域类型定义
// ==========================================
// 职责: 目标列类型 / 类型化单元格值
// ==========================================

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DECIMAL 列的持久化精度（整数位 + 小数位）
pub const DECIMAL_PRECISION: u32 = 10;
pub const DECIMAL_SCALE: u32 = 2;

/// 非空 TEXT 列的缺省值
pub const TEXT_DEFAULT: &str = "N/A";

// ==========================================
// 目标列类型 (Column Type)
// ==========================================
// 配置文件中大小写不敏感: "decimal" / "DECIMAL" 均可
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Integer,
    Decimal,
    Boolean,
    Date,
    Text,
}

impl ColumnType {
    /// 建表语句中使用的 SQL 类型
    pub fn sql_type(&self) -> String {
        match self {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Decimal => format!("DECIMAL({},{})", DECIMAL_PRECISION, DECIMAL_SCALE),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::Text => "TEXT".to_string(),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::Decimal => write!(f, "DECIMAL"),
            ColumnType::Boolean => write!(f, "BOOLEAN"),
            ColumnType::Date => write!(f, "DATE"),
            ColumnType::Text => write!(f, "TEXT"),
        }
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INTEGER" => Ok(ColumnType::Integer),
            "DECIMAL" => Ok(ColumnType::Decimal),
            "BOOLEAN" => Ok(ColumnType::Boolean),
            "DATE" => Ok(ColumnType::Date),
            "TEXT" => Ok(ColumnType::Text),
            other => Err(format!("不支持的列类型: {}", other)),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.to_string()
    }
}

// ==========================================
// 类型化单元格值 (Typed Value)
// ==========================================
// Null 只会出现在可空列中（非空列经过缺省值回填）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    Null,
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    Text(String),
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    /// 数值型缺省值 0（按列类型给出对应表示）
    pub fn zero_for(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Decimal => TypedValue::Decimal(Decimal::new(0, DECIMAL_SCALE)),
            ColumnType::Boolean => TypedValue::Boolean(false),
            ColumnType::Text => TypedValue::Text("0".to_string()),
            ColumnType::Integer | ColumnType::Date => TypedValue::Integer(0),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Null => write!(f, "NULL"),
            TypedValue::Integer(v) => write!(f, "{}", v),
            TypedValue::Decimal(v) => write!(f, "{}", v),
            TypedValue::Boolean(v) => write!(f, "{}", v),
            TypedValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            TypedValue::Text(v) => write!(f, "{}", v),
        }
    }
}
