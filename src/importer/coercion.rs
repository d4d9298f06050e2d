// ==========================================
// 个人财务表格导入 - 类型转换规则
// ==========================================
// 职责: 原始单元格 → 目标类型值
// 流程: coerce_cell (可失败) → type_fallback (失败时的类型缺省值)
//       → apply_nullability_default (非空列回填)
// ==========================================

use crate::domain::dataset::RawCell;
use crate::domain::schema::ColumnSpec;
use crate::domain::types::{ColumnType, TypedValue, DECIMAL_PRECISION, DECIMAL_SCALE, TEXT_DEFAULT};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use thiserror::Error;

/// 支持的日期格式（斜杠格式按日/月/年解析）
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%Y%m%d", "%d-%m-%Y"];

/// 支持的日期时间格式（只取日期部分）
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"];

/// 可接受的最小年份（%Y 也会匹配 1~3 位年份，如 "05/03/24" → 0024 年）
const MIN_DATE_YEAR: i32 = 1000;

/// 表格序列日期的基准日（1899-12-30 为第 0 天）
const SERIAL_DATE_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// 单元格转换错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("源值为空")]
    Missing,

    #[error("无法解析为数值: {0}")]
    NotNumeric(String),

    #[error("无法解析为金额: {0}")]
    InvalidCurrency(String),

    #[error("数值超出 DECIMAL(10,2) 范围: {0}")]
    OutOfRange(String),

    #[error("无法解析为布尔值: {0}")]
    InvalidBoolean(String),

    #[error("无法解析为日期: {0}")]
    InvalidDate(String),
}

// ==========================================
// 单元格转换结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome {
    Parsed,
    /// 源值为空，采用类型缺省值
    Missing,
    /// 源值无法解析，采用类型缺省值
    Rejected(CoercionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoercedCell {
    pub value: TypedValue,
    pub outcome: CellOutcome,
    /// 非空列 NULL → 缺省值 是否发生
    pub backfilled: bool,
}

// ==========================================
// 阶段 1: 类型转换
// ==========================================

/// 将原始单元格转换为目标类型值
///
/// 成功时不会返回 `TypedValue::Null`；空值以 `CoercionError::Missing` 表示。
pub fn coerce_cell(raw: &RawCell, column_type: ColumnType) -> Result<TypedValue, CoercionError> {
    if raw.is_empty() {
        return Err(CoercionError::Missing);
    }
    match column_type {
        ColumnType::Integer => coerce_integer(raw),
        ColumnType::Decimal => coerce_decimal(raw),
        ColumnType::Boolean => coerce_boolean(raw),
        ColumnType::Date => coerce_date(raw),
        ColumnType::Text => Ok(TypedValue::Text(stringify(raw))),
    }
}

fn coerce_integer(raw: &RawCell) -> Result<TypedValue, CoercionError> {
    match raw {
        RawCell::Number(n) => integer_from_f64(*n, &stringify(raw)),
        RawCell::Bool(b) => Ok(TypedValue::Integer(i64::from(*b))),
        RawCell::Text(s) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<i64>() {
                return Ok(TypedValue::Integer(v));
            }
            s.parse::<f64>()
                .map_err(|_| CoercionError::NotNumeric(s.to_string()))
                .and_then(|n| integer_from_f64(n, s))
        }
        RawCell::Empty => Err(CoercionError::Missing),
    }
}

/// 非整数数值向零截断
fn integer_from_f64(n: f64, original: &str) -> Result<TypedValue, CoercionError> {
    if !n.is_finite() || n.trunc() < i64::MIN as f64 || n.trunc() > i64::MAX as f64 {
        return Err(CoercionError::NotNumeric(original.to_string()));
    }
    Ok(TypedValue::Integer(n.trunc() as i64))
}

fn coerce_decimal(raw: &RawCell) -> Result<TypedValue, CoercionError> {
    let value = match raw {
        RawCell::Text(s) => parse_currency(s)?,
        RawCell::Number(n) => {
            Decimal::from_f64(*n).ok_or_else(|| CoercionError::NotNumeric(n.to_string()))?
        }
        RawCell::Bool(b) => return Err(CoercionError::NotNumeric(b.to_string())),
        RawCell::Empty => return Err(CoercionError::Missing),
    };
    fit_decimal(value, &stringify(raw)).map(TypedValue::Decimal)
}

/// 解析本地化金额文本（千分位 '.'，小数逗号，可带币种前缀）
///
/// 仅保留数字与逗号，逗号视为小数点: "R$ 1.234,56" → 1234.56
pub fn parse_currency(text: &str) -> Result<Decimal, CoercionError> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();

    let mut parts = kept.split(',');
    let integer_part = parts.next().unwrap_or_default();
    let fraction_part = parts.next();
    if parts.next().is_some() || (integer_part.is_empty() && fraction_part.unwrap_or("").is_empty()) {
        return Err(CoercionError::InvalidCurrency(text.to_string()));
    }

    let normalized = match fraction_part {
        Some(fraction) if !fraction.is_empty() => format!(
            "{}.{}",
            if integer_part.is_empty() { "0" } else { integer_part },
            fraction
        ),
        _ => integer_part.to_string(),
    };

    Decimal::from_str(&normalized).map_err(|_| CoercionError::InvalidCurrency(text.to_string()))
}

/// 四舍五入到 2 位小数并校验 DECIMAL(10,2) 范围
fn fit_decimal(value: Decimal, original: &str) -> Result<Decimal, CoercionError> {
    let mut rounded = value.round_dp_with_strategy(DECIMAL_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(DECIMAL_SCALE);

    let limit = Decimal::from_i64(10_i64.pow(DECIMAL_PRECISION - DECIMAL_SCALE)).unwrap_or(Decimal::MAX);
    if rounded.abs() >= limit {
        return Err(CoercionError::OutOfRange(original.to_string()));
    }
    Ok(rounded)
}

fn coerce_boolean(raw: &RawCell) -> Result<TypedValue, CoercionError> {
    match raw {
        RawCell::Bool(b) => Ok(TypedValue::Boolean(*b)),
        RawCell::Empty => Err(CoercionError::Missing),
        other => {
            let text = stringify(other);
            match text.to_lowercase().as_str() {
                "true" => Ok(TypedValue::Boolean(true)),
                "false" => Ok(TypedValue::Boolean(false)),
                _ => Err(CoercionError::InvalidBoolean(text)),
            }
        }
    }
}

fn coerce_date(raw: &RawCell) -> Result<TypedValue, CoercionError> {
    match raw {
        RawCell::Text(s) => parse_date(s)
            .map(TypedValue::Date)
            .ok_or_else(|| CoercionError::InvalidDate(s.clone())),
        RawCell::Number(n) => serial_to_date(*n)
            .map(TypedValue::Date)
            .ok_or_else(|| CoercionError::InvalidDate(n.to_string())),
        RawCell::Bool(b) => Err(CoercionError::InvalidDate(b.to_string())),
        RawCell::Empty => Err(CoercionError::Missing),
    }
}

/// 解析日期文本（日期格式 → 日期时间格式 → RFC 3339）
///
/// 年份不足 4 位的结果一律拒绝，不做两位年份推断。
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let plausible = |date: &NaiveDate| date.year() >= MIN_DATE_YEAR;

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok().filter(plausible))
        .or_else(|| {
            DATETIME_FORMATS.iter().find_map(|fmt| {
                NaiveDateTime::parse_from_str(text, fmt)
                    .ok()
                    .map(|dt| dt.date())
                    .filter(plausible)
            })
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
                .filter(plausible)
        })
}

/// 表格序列日期 → 日历日期（仅接受 9999-12-31 之前的正数）
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let (y, m, d) = SERIAL_DATE_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// 文本化：整数值数字不带 ".0"
fn stringify(raw: &RawCell) -> String {
    match raw {
        RawCell::Text(s) => s.clone(),
        RawCell::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        RawCell::Bool(true) => "TRUE".to_string(),
        RawCell::Bool(false) => "FALSE".to_string(),
        RawCell::Empty => String::new(),
    }
}

// ==========================================
// 阶段 2: 类型缺省值
// ==========================================

/// 转换失败时的类型缺省值
///
/// INTEGER → 0, DECIMAL → NULL, BOOLEAN → false, DATE → NULL, TEXT → "N/A"
pub fn type_fallback(column_type: ColumnType) -> TypedValue {
    match column_type {
        ColumnType::Integer => TypedValue::Integer(0),
        ColumnType::Decimal | ColumnType::Date => TypedValue::Null,
        ColumnType::Boolean => TypedValue::Boolean(false),
        ColumnType::Text => TypedValue::Text(TEXT_DEFAULT.to_string()),
    }
}

// ==========================================
// 阶段 3: 非空列回填
// ==========================================

/// 非空列仍为 NULL 时回填: TEXT → "N/A"，其余类型 → 0
pub fn apply_nullability_default(value: TypedValue, column_type: ColumnType, nullable: bool) -> TypedValue {
    if nullable || !value.is_null() {
        return value;
    }
    match column_type {
        ColumnType::Text => TypedValue::Text(TEXT_DEFAULT.to_string()),
        other => TypedValue::zero_for(other),
    }
}

/// 按列规则完成三阶段转换
pub fn coerce_column_value(raw: &RawCell, spec: &ColumnSpec) -> CoercedCell {
    let (value, outcome) = match coerce_cell(raw, spec.column_type) {
        Ok(value) => (value, CellOutcome::Parsed),
        Err(CoercionError::Missing) => (type_fallback(spec.column_type), CellOutcome::Missing),
        Err(err) => (type_fallback(spec.column_type), CellOutcome::Rejected(err)),
    };

    let backfilled = value.is_null() && !spec.nullable;
    let value = apply_nullability_default(value, spec.column_type, spec.nullable);

    CoercedCell {
        value,
        outcome,
        backfilled,
    }
}
