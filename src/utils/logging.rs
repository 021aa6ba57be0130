//! 日志工具模块
//!
//! 日志系统初始化，以及批处理周期的日志格式化输出
use anyhow::Result;
use chrono::NaiveDate;
use std::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
pub fn init() {
    init_with_default("info");
}

/// 详细模式：未设置 RUST_LOG 时默认 debug
pub fn init_verbose() {
    init_with_default("debug");
}

fn init_with_default(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_line_number(true)
        .try_init();
}

/// 初始化测试环境的日志系统，可重复调用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// 初始化周期日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
/// - `date`: 本周期计算的日期
pub fn init_cycle_log_file(log_file_path: &str, date: NaiveDate) -> Result<()> {
    let log_header = format!(
        "{}\n每日负荷计算日志 - {} (计算日期 {})\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        date,
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 追加一行到周期日志文件
pub fn append_cycle_log(log_file_path: &str, line: &str) -> Result<()> {
    use std::io::Write;

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// 记录周期启动信息
///
/// # 参数
/// - `date`: 计算日期
/// - `total`: 学生总数
/// - `max_concurrent`: 最大并发数
pub fn log_cycle_start(date: NaiveDate, total: usize, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🤖 开始每日负荷计算 - {}", date);
    info!("📊 学生总数: {}, 最大并发数: {}", total, max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 打印周期统计信息
pub fn log_cycle_summary(
    processed: usize,
    tips_generated: usize,
    failed: usize,
    aborted: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("✅ 每日负荷计算完成");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("   - 已处理: {}/{} 名学生", processed, total);
    info!("   - 已生成: {} 条提示", tips_generated);
    info!("   - 失败: {}", failed);
    if aborted > 0 {
        info!("   - 中止未处理: {}", aborted);
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_text("负荷计算", 2), "负荷...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn cycle_log_file_gets_header_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycle.txt");
        let path = path.to_str().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 18).unwrap();

        init_cycle_log_file(path, date).unwrap();
        append_cycle_log(path, "s1 ok").unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("2026-01-18"));
        assert!(content.ends_with("s1 ok\n"));
    }
}
