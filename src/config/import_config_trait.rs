// ==========================================
// 个人财务表格导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入
// ==========================================

use crate::config::settings::SourceKind;
use crate::config::table_mapping::TableMapping;
use crate::importer::error::ImportResult;
use crate::importer::import_driver::FailurePolicy;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（环境变量 + 映射文件）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 读取并校验表格映射（每次导入读取一次）
    async fn load_table_mapping(&self) -> ImportResult<TableMapping>;

    /// 工作簿标识
    ///
    /// # 返回
    /// - Err(Config): 未配置
    fn workbook_id(&self) -> ImportResult<String>;

    fn source_kind(&self) -> SourceKind;

    /// # 默认值
    /// - FailFast
    fn failure_policy(&self) -> FailurePolicy;

    fn db_path(&self) -> &str;
}
