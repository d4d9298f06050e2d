// ==========================================
// 个人财务表格导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 配置错误 =====
    #[error("配置错误: {0}")]
    Config(String),

    #[error("表格 {0} 未定义映射")]
    SheetNotMapped(String),

    // ===== 取数错误 =====
    #[error("下载表格 {sheet} 失败: {message}")]
    FetchFailed { sheet: String, message: String },

    #[error("表格 {0} 未返回任何数据")]
    NoData(String),

    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("HTTP 请求失败: {0}")]
    HttpError(String),

    // ===== 建表错误 =====
    #[error("表 {table}: 源列 {column} 未在映射中声明")]
    UnmappedColumn { table: String, column: String },

    #[error("表 {table}: 映射声明的源列 {column} 在数据中缺失")]
    MissingColumn { table: String, column: String },

    #[error("表 {table} 结构描述非法: {message}")]
    InvalidSchema { table: String, message: String },

    #[error("更新表 {table} 失败: {source}")]
    Load {
        table: String,
        #[source]
        source: RepositoryError,
    },

    // ===== 通用错误 =====
}

impl ImportError {
    /// 取数阶段错误统一包装为 FetchFailed（保留表格名）
    pub fn into_fetch_failure(self, sheet: &str) -> ImportError {
        match self {
            ImportError::FetchFailed { .. } | ImportError::NoData(_) => self,
            other => ImportError::FetchFailed {
                sheet: sheet.to_string(),
                message: other.to_string(),
            },
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        ImportError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::Config(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
