// ==========================================
// 个人财务表格导入 - 导入进度事件
// ==========================================
// 职责: 定义进度事件与发布者 trait
// 说明: 发布失败只记日志，不影响导入结果
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// 导入事件类型
// ==========================================

/// 导入进度事件（index 从 1 开始）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportEvent {
    TableStarted {
        index: usize,
        total: usize,
        sheet: String,
    },
    TableSucceeded {
        index: usize,
        total: usize,
        sheet: String,
        rows: usize,
    },
    TableFailed {
        index: usize,
        total: usize,
        sheet: String,
        reason: String,
    },
    RunFinished {
        run_id: String,
        succeeded: usize,
        total: usize,
    },
}

impl ImportEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ImportEvent::TableStarted { .. } => "TableStarted",
            ImportEvent::TableSucceeded { .. } => "TableSucceeded",
            ImportEvent::TableFailed { .. } => "TableFailed",
            ImportEvent::RunFinished { .. } => "RunFinished",
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 导入事件发布者
///
/// # 返回
/// - `Err`: 发布失败（调用方记录 warn 后继续）
pub trait ImportEventPublisher: Send + Sync {
    fn publish(&self, event: &ImportEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl ImportEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: &ImportEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::trace!(event = event.kind(), "NoOpEventPublisher: 跳过事件");
        Ok(())
    }
}

/// 日志事件发布者（"正在导入 2/5: Despesas"）
#[derive(Debug, Clone, Default)]
pub struct LogEventPublisher;

impl ImportEventPublisher for LogEventPublisher {
    fn publish(&self, event: &ImportEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        match event {
            ImportEvent::TableStarted { index, total, sheet } => {
                tracing::info!(sheet = %sheet, "正在导入 {}/{}", index, total);
            }
            ImportEvent::TableSucceeded {
                index,
                total,
                sheet,
                rows,
            } => {
                tracing::info!(sheet = %sheet, rows, "导入完成 {}/{}", index, total);
            }
            ImportEvent::TableFailed {
                index,
                total,
                sheet,
                reason,
            } => {
                tracing::error!(sheet = %sheet, reason = %reason, "导入失败 {}/{}", index, total);
            }
            ImportEvent::RunFinished {
                run_id,
                succeeded,
                total,
            } => {
                tracing::info!(run_id = %run_id, succeeded, total, "导入结束");
            }
        }
        Ok(())
    }
}

/// 记录全部事件（测试与嵌入方使用）
#[derive(Debug, Clone, Default)]
pub struct RecordingEventPublisher {
    events: Arc<Mutex<Vec<ImportEvent>>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ImportEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ImportEventPublisher for RecordingEventPublisher {
    fn publish(&self, event: &ImportEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut events = self
            .events
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;
        events.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_publisher_keeps_order() {
        let publisher = RecordingEventPublisher::new();
        publisher
            .publish(&ImportEvent::TableStarted {
                index: 1,
                total: 2,
                sheet: "Contas".to_string(),
            })
            .unwrap();
        publisher
            .publish(&ImportEvent::TableFailed {
                index: 1,
                total: 2,
                sheet: "Contas".to_string(),
                reason: "boom".to_string(),
            })
            .unwrap();

        let kinds: Vec<&str> = publisher.events().iter().map(ImportEvent::kind).collect();
        assert_eq!(kinds, vec!["TableStarted", "TableFailed"]);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(ImportEvent::TableSucceeded {
            index: 2,
            total: 5,
            sheet: "Despesas".to_string(),
            rows: 40,
        })
        .unwrap();
        assert_eq!(json["event"], "TABLE_SUCCEEDED");
        assert_eq!(json["rows"], 40);
    }
}
