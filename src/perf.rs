// ==========================================
// 个人财务表格导入 - SQL 计数与慢查询日志
// ==========================================
// 开关:
// - FINANCE_PERF_SQL=1 开启（Debug 构建默认开启）
// - FINANCE_SLOW_SQL_MS=50 慢 SQL 阈值（毫秒）
// ==========================================

use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const PERF_SQL_ENV: &str = "FINANCE_PERF_SQL";
pub const SLOW_SQL_MS_ENV: &str = "FINANCE_SLOW_SQL_MS";

static PERF_SQL_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

// 导入是顺序执行的，进程级计数即可
static SQL_COUNT: AtomicU64 = AtomicU64::new(0);
static SLOW_SQL_COUNT: AtomicU64 = AtomicU64::new(0);

fn is_true(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn truncate_sql(sql: &str, max_chars: usize) -> String {
    let s = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s,
    }
}

/// 为连接安装 trace/profile 回调
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = match std::env::var(PERF_SQL_ENV) {
        Ok(v) => is_true(&v),
        Err(_) => cfg!(debug_assertions),
    };
    PERF_SQL_ENABLED.store(enabled, Ordering::Relaxed);

    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let slow_ms = std::env::var(SLOW_SQL_MS_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    SLOW_SQL_THRESHOLD_MS.store(slow_ms, Ordering::Relaxed);

    conn.trace(Some(sql_trace_callback));
    conn.profile(Some(sql_profile_callback));
}

fn sql_trace_callback(_sql: &str) {
    if PERF_SQL_ENABLED.load(Ordering::Relaxed) {
        SQL_COUNT.fetch_add(1, Ordering::Relaxed);
    }
}

fn sql_profile_callback(sql: &str, duration: Duration) {
    if !PERF_SQL_ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        SLOW_SQL_COUNT.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            target: "slow_sql",
            duration_ms = ms,
            sql = %truncate_sql(sql, 300),
            "slow sql"
        );
    }
}

/// 耗时 Guard：drop 时记录 elapsed_ms / sql_count / slow_sql_count
///
/// ```ignore
/// let _perf = finance_sheets_import::perf::PerfGuard::new("import_table", "tb_despesas");
/// ```
pub struct PerfGuard {
    op: &'static str,
    subject: String,
    start: Instant,
    sql_start: u64,
    slow_sql_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str, subject: impl Into<String>) -> Self {
        Self {
            op,
            subject: subject.into(),
            start: Instant::now(),
            sql_start: SQL_COUNT.load(Ordering::Relaxed),
            slow_sql_start: SLOW_SQL_COUNT.load(Ordering::Relaxed),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let sql_count = SQL_COUNT.load(Ordering::Relaxed).saturating_sub(self.sql_start);
        let slow_sql_count = SLOW_SQL_COUNT
            .load(Ordering::Relaxed)
            .saturating_sub(self.slow_sql_start);

        tracing::debug!(
            target: "perf",
            op = self.op,
            subject = %self.subject,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            sql_count,
            slow_sql_count,
            "done"
        );
    }
}
