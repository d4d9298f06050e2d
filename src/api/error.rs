// ==========================================
// 个人财务表格导入 - API层错误类型
// ==========================================
// 职责: 将导入层 / 仓储层错误转换为调用方可读的错误消息
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 查询接口只接受单条只读语句
    #[error("只允许只读查询: {0}")]
    ReadOnlyViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::TableNotFound(msg) => ApiError::NotFound(msg),
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::InvalidSchema(msg) => ApiError::InvalidInput(msg),
            RepositoryError::LockError(msg) => ApiError::InternalError(msg),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Config(msg) => ApiError::ConfigError(msg),
            ImportError::Load { source, .. } => ApiError::from(source),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::from(RepositoryError::from(err))
    }
}

/// API 结果类型
pub type ApiResult<T> = Result<T, ApiError>;
