//! 每日负荷批处理 - 编排层
//!
//! ## 职责
//!
//! 每个调度周期对全部学生执行一次负荷计算。
//!
//! ## 核心功能
//!
//! 1. **加载学生**：从花名册读取全部学生
//! 2. **并发控制**：使用 Semaphore 限制同时处理的学生数量
//! 3. **失败隔离**：单个学生失败只计入统计，不影响其他学生
//! 4. **可中止**：每个学生开始前检查中止信号，已开始的学生会完整结束
//! 5. **全局统计**：汇总为 `CycleSummary`
//!
//! 快照写入按 (学生, 日期) 覆盖，重复执行同一天的周期不会产生重复数据。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::RosterStore;
use crate::utils::logging;
use crate::workflow::{StudentCtx, StudentFlow, StudentOutcome};

/// 中止信号
///
/// 克隆后共享同一个标志。
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// 清除中止标志，供下一个周期使用
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 周期统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub total: usize,
    /// 快照已写入的学生数
    pub processed: usize,
    pub tips_generated: usize,
    pub tip_failures: usize,
    pub failed: usize,
    /// 因中止而未开始的学生数
    pub aborted: usize,
}

/// 批处理编排器
pub struct BatchOrchestrator {
    roster: Arc<dyn RosterStore>,
    flow: Arc<StudentFlow>,
    max_concurrent: usize,
    cycle_log_file: Option<String>,
    abort: AbortSignal,
}

impl BatchOrchestrator {
    pub fn new(roster: Arc<dyn RosterStore>, flow: Arc<StudentFlow>, max_concurrent: usize) -> Self {
        Self {
            roster,
            flow,
            max_concurrent: max_concurrent.max(1),
            cycle_log_file: None,
            abort: AbortSignal::new(),
        }
    }

    /// 把每个学生的结果追加到周期日志文件
    pub fn with_cycle_log(mut self, path: impl Into<String>) -> Self {
        self.cycle_log_file = Some(path.into());
        self
    }

    /// 使用外部传入的中止信号
    pub fn with_abort_signal(mut self, signal: AbortSignal) -> Self {
        self.abort = signal;
        self
    }

    /// 共享的中止信号
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// 执行一个完整周期
    ///
    /// 只有读取学生列表失败时返回错误，单个学生的失败体现在统计中。
    pub async fn run_cycle(&self, date: NaiveDate) -> AppResult<CycleSummary> {
        let students = self.roster.list_students().await?;
        let total = students.len();
        let mut summary = CycleSummary {
            total,
            ..Default::default()
        };

        logging::log_cycle_start(date, total, self.max_concurrent);
        self.init_cycle_log(date);

        if students.is_empty() {
            warn!("⚠️ 花名册中没有学生，周期结束");
            return Ok(summary);
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(total);

        for (idx, student) in students.into_iter().enumerate() {
            let student_index = idx + 1;
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| AppError::Other(format!("并发许可获取失败: {}", e)))?;

            // 等待许可期间也可能收到中止
            if self.abort.is_aborted() {
                summary.aborted = total - idx;
                warn!(
                    "🛑 收到中止信号，剩余 {} 名学生未处理",
                    summary.aborted
                );
                break;
            }

            let flow = self.flow.clone();
            let ctx = StudentCtx::new(student.id.clone(), student_index, date);

            let handle = tokio::spawn(async move {
                let _permit = permit;
                flow.run_unit(&student, &ctx).await
            });
            handles.push((student_index, handle));
        }

        for (student_index, handle) in handles {
            match handle.await {
                Ok(outcome) if outcome.is_failed() => {
                    summary.failed += 1;
                    self.append_cycle_log(&outcome_line(&outcome));
                }
                Ok(outcome) => {
                    summary.processed += 1;
                    if outcome.tip.is_some() {
                        summary.tips_generated += 1;
                    }
                    if outcome.tip_error.is_some() {
                        summary.tip_failures += 1;
                    }
                    self.append_cycle_log(&outcome_line(&outcome));
                }
                Err(e) => {
                    error!("[学生 #{}] 任务执行失败: {}", student_index, e);
                    summary.failed += 1;
                    self.append_cycle_log(&format!("学生 #{} 任务异常: {}", student_index, e));
                }
            }
        }

        logging::log_cycle_summary(
            summary.processed,
            summary.tips_generated,
            summary.failed,
            summary.aborted,
            summary.total,
        );
        if let Some(path) = &self.cycle_log_file {
            info!("\n日志已保存至: {}", path);
        }

        Ok(summary)
    }

    fn init_cycle_log(&self, date: NaiveDate) {
        if let Some(path) = &self.cycle_log_file {
            if let Err(e) = logging::init_cycle_log_file(path, date) {
                warn!("⚠️ 无法创建周期日志文件 {}: {}", path, e);
            }
        }
    }

    fn append_cycle_log(&self, line: &str) {
        if let Some(path) = &self.cycle_log_file {
            if let Err(e) = logging::append_cycle_log(path, line) {
                warn!("⚠️ 写入周期日志失败: {}", e);
            }
        }
    }
}

fn outcome_line(outcome: &StudentOutcome) -> String {
    let mut line = format!(
        "学生 {}: 负荷 {} ({}) 状态 {:?}",
        outcome.student_id, outcome.load_score, outcome.risk_level, outcome.state
    );
    if let Some(err) = &outcome.tip_error {
        line.push_str(&format!(" 提示失败: {}", err));
    }
    if let Some(err) = &outcome.error {
        line.push_str(&format!(" 失败: {}", err));
    }
    line
}
