// ==========================================
// 个人财务表格导入 - 导入接口定义
// ==========================================
// 职责: 定义外部表格源接口（不包含实现）
// ==========================================

use crate::domain::dataset::RawDataset;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::sync::Arc;

// ==========================================
// TabularSource Trait
// ==========================================
// 用途: 按 (工作簿, 表格名) 取回整张表格
// 实现者: CsvDirectorySource, ExcelWorkbookSource, GoogleSheetsSource
#[async_trait]
pub trait TabularSource: Send + Sync {
    /// 取回工作簿中指定表格的全部行
    ///
    /// # 参数
    /// - workbook_id: 工作簿标识（目录名 / 文件名 / 在线表格 ID）
    /// - sheet: 表格名
    ///
    /// # 返回
    /// - Ok(Some(RawDataset)): 取数成功
    /// - Ok(None): 表格存在但没有表头（无数据）
    /// - Err: 文件/网络/解析错误
    async fn fetch(&self, workbook_id: &str, sheet: &str) -> ImportResult<Option<RawDataset>>;

    /// 来源名称（用于日志）
    fn name(&self) -> &'static str;
}

// 共享的表格源（多次导入复用同一实例）
#[async_trait]
impl<T> TabularSource for Arc<T>
where
    T: TabularSource + ?Sized,
{
    async fn fetch(&self, workbook_id: &str, sheet: &str) -> ImportResult<Option<RawDataset>> {
        (**self).fetch(workbook_id, sheet).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
