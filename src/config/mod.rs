// ==========================================
// 个人财务表格导入 - 配置层
// ==========================================
// 职责: 表格映射文件 + 运行设置（环境变量 / 命令行）
// ==========================================

pub mod config_manager;
pub mod import_config_trait;
pub mod settings;
pub mod table_mapping;

pub use config_manager::ConfigManager;
pub use import_config_trait::ImportConfigReader;
pub use settings::{AppSettings, SourceKind};
pub use table_mapping::TableMapping;
