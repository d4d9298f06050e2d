// ==========================================
// 个人财务表格导入 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 将个人财务表格按映射配置导入本地分析库，供对话代理只读查询
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 类型与结构描述
pub mod domain;

// 数据仓储层 - 目标表写入
pub mod repository;

// 导入层 - 表格源 / 类型转换 / 驱动
pub mod importer;

// 配置层 - 映射文件与运行设置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// SQL 计数与慢查询日志
pub mod perf;

// 日志系统
pub mod logging;

// API 层 - 导入与只读查询
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    ColumnSpec, ColumnType, ImportRunReport, RawCell, RawDataset, TableLoadReport, TableOutcome,
    TableSchema, TypedValue,
};

pub use importer::{FailurePolicy, ImportDriver, ImportError, TableBuilder, TabularSource};

pub use config::{AppSettings, ConfigManager, TableMapping};

pub use api::{ApiError, ImportApi, QueryApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "个人财务表格导入";
