// ==========================================
// 个人财务表格导入 - 导入结果模型
// ==========================================
// 职责: 单表装载报告 / 整次运行报告
// 用途: 导入层写入, API 层与 CLI 只读
// ==========================================

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ==========================================
// ColumnCoercionStats - 单列类型转换统计
// ==========================================
// missing: 源值为空，按类型缺省值处理
// rejected: 源值无法解析，按类型缺省值处理
// backfilled: 非空列中仍为 NULL 而回填缺省值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCoercionStats {
    pub parsed: usize,
    pub missing: usize,
    pub rejected: usize,
    pub backfilled: usize,
    /// 首个无法解析的样例值（便于排查）
    pub first_rejected: Option<String>,
}

impl ColumnCoercionStats {
    pub fn has_rejections(&self) -> bool {
        self.rejected > 0
    }
}

// ==========================================
// TableLoadReport - 单表装载报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableLoadReport {
    pub table_name: String,
    pub rows_loaded: usize,
    /// 目标列名 → 转换统计（声明顺序）
    pub columns: IndexMap<String, ColumnCoercionStats>,
    pub elapsed: Duration,
}

impl TableLoadReport {
    pub fn total_rejected(&self) -> usize {
        self.columns.values().map(|c| c.rejected).sum()
    }

    pub fn total_backfilled(&self) -> usize {
        self.columns.values().map(|c| c.backfilled).sum()
    }
}

// ==========================================
// TableOutcome - 单表结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableOutcome {
    Succeeded {
        sheet: String,
        report: TableLoadReport,
    },
    Failed {
        sheet: String,
        table_name: Option<String>,
        reason: String,
    },
    /// 快速失败策略下，前序表失败后未尝试
    Skipped { sheet: String },
}

impl TableOutcome {
    pub fn sheet(&self) -> &str {
        match self {
            TableOutcome::Succeeded { sheet, .. }
            | TableOutcome::Failed { sheet, .. }
            | TableOutcome::Skipped { sheet } => sheet,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TableOutcome::Succeeded { .. })
    }
}

// ==========================================
// ImportRunReport - 整次运行报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRunReport {
    pub run_id: String,
    pub workbook_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// 按处理顺序排列
    pub outcomes: Vec<TableOutcome>,
}

impl ImportRunReport {
    /// 全部表成功才算成功（空运行视为成功）
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(TableOutcome::is_success)
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn first_failure(&self) -> Option<&TableOutcome> {
        self.outcomes
            .iter()
            .find(|o| matches!(o, TableOutcome::Failed { .. }))
    }

    pub fn outcome_for(&self, sheet: &str) -> Option<&TableOutcome> {
        self.outcomes.iter().find(|o| o.sheet() == sheet)
    }
}
