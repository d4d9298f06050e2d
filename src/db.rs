// ==========================================
// 个人财务表格导入 - SQLite 连接初始化
// ==========================================
// 目标:
// - 所有 Connection::open 走同一套 PRAGMA
// - 只读查询使用独立的只读连接
// ==========================================

use crate::perf::install_sqlite_tracing;
use rusqlite::{Connection, OpenFlags};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开读写连接（导入使用），文件不存在时创建
pub fn open_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    install_sqlite_tracing(&mut conn);
    Ok(conn)
}

/// 打开只读连接（查询接口使用），文件必须已存在
pub fn open_read_only_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    install_sqlite_tracing(&mut conn);
    Ok(conn)
}

/// 列出用户表（排除 SQLite 内部表与导入暂存表），按名称排序
pub fn list_user_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table'
           AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
           AND name NOT LIKE '%\\_\\_staging' ESCAPE '\\'
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_list_user_tables_hides_staging() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE tb_metas (x INTEGER);
             CREATE TABLE tb_contas (x INTEGER);
             CREATE TABLE tb_contas__staging (x INTEGER);",
        )
        .unwrap();

        assert_eq!(list_user_tables(&conn).unwrap(), vec!["tb_contas", "tb_metas"]);
    }

    #[test]
    fn test_read_only_connection_rejects_writes() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        open_connection(&path)
            .unwrap()
            .execute_batch("CREATE TABLE tb_metas (x INTEGER)")
            .unwrap();

        let ro = open_read_only_connection(&path).unwrap();
        assert!(ro.execute_batch("INSERT INTO tb_metas VALUES (1)").is_err());
    }
}
