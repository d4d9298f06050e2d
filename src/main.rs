// ==========================================
// 个人财务表格导入 - 命令行入口
// ==========================================
// 子命令: import / query / schema
// 输出: 结果 JSON 写 stdout，日志写 stderr
// ==========================================

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use finance_sheets_import::api::{ImportApi, QueryApi};
use finance_sheets_import::config::{AppSettings, ConfigManager, SourceKind};
use finance_sheets_import::importer::FailurePolicy;
use finance_sheets_import::logging::{self, LogFormat};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "finance-import",
    version,
    about = "个人财务表格导入 - 按映射配置把表格导入本地 SQLite 分析库"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite 数据库文件
    #[arg(long = "db", env = "FINANCE_DB_PATH", global = true)]
    db: Option<String>,

    /// 表格映射文件 (JSON)
    #[arg(long = "mapping", env = "TABLE_MAPPING_PATH", global = true)]
    mapping: Option<PathBuf>,

    /// 表格源: csv / excel / google
    #[arg(long = "source", env = "FINANCE_SOURCE", global = true)]
    source: Option<SourceKind>,

    /// CSV 目录或 Excel 文件所在目录
    #[arg(long = "source-root", env = "FINANCE_SOURCE_ROOT", global = true)]
    source_root: Option<PathBuf>,

    /// 工作簿标识
    #[arg(long = "workbook", env = "SPREADSHEET_ID", global = true)]
    workbook: Option<String>,

    /// 日志级别（RUST_LOG 优先）
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,

    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatArg,
}

#[derive(Subcommand)]
enum Command {
    /// 导入表格（默认导入映射中的全部表格）
    Import {
        /// 只导入指定表格，可重复
        #[arg(long = "sheet", value_name = "NAME")]
        sheets: Vec<String>,

        /// 某张表失败后继续导入其余表格
        #[arg(long = "continue-on-error")]
        continue_on_error: bool,
    },

    /// 执行一条只读 SQL，输出 JSON 行
    Query {
        #[arg(value_name = "SQL")]
        sql: String,
    },

    /// 输出库结构 JSON
    Schema,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// 环境变量为底，命令行覆盖
fn settings_from_cli(cli: &Cli) -> anyhow::Result<AppSettings> {
    let mut settings = AppSettings::from_env().context("读取环境变量失败")?;
    if let Some(db) = &cli.db {
        settings.db_path = db.clone();
    }
    if let Some(mapping) = &cli.mapping {
        settings.mapping_path = mapping.clone();
    }
    if let Some(source) = cli.source {
        settings.source = source;
    }
    if let Some(root) = &cli.source_root {
        settings.source_root = root.clone();
    }
    if let Some(workbook) = &cli.workbook {
        settings.workbook_id = Some(workbook.clone());
    }
    Ok(settings)
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut settings = settings_from_cli(&cli)?;

    match cli.command {
        Command::Import {
            sheets,
            continue_on_error,
        } => {
            if continue_on_error {
                settings.failure_policy = FailurePolicy::ContinueOnError;
            }
            let api = ImportApi::new(ConfigManager::new(settings));
            let report = api.run_import(&sheets).await.context("导入无法开始")?;

            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.is_success() {
                Ok(ExitCode::SUCCESS)
            } else {
                if let Some(failure) = report.first_failure() {
                    tracing::error!(sheet = %failure.sheet(), "导入未完成");
                }
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Query { sql } => {
            let rows = QueryApi::new(&settings.db_path)
                .execute_read_only(&sql)
                .context("查询失败")?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Schema => {
            let schema = QueryApi::new(&settings.db_path)
                .describe_schema()
                .context("读取库结构失败")?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref(), cli.log_format.into());

    tracing::debug!(version = finance_sheets_import::VERSION, "{}", finance_sheets_import::APP_NAME);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("错误: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
