//! 学生负荷流程 - 流程层
//!
//! 核心职责：定义"一名学生"的完整处理流程
//!
//! 流程顺序：
//! 1. 读取选修课程 → 截止日期
//! 2. 计算当日负荷（Scored）
//! 3. 写入快照（Persisted）
//! 4. 风险为 warning / danger 时生成提示（Notified）

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::{RosterStore, SnapshotStore};
use crate::models::{DailyLoad, DailyLoadSnapshot, Deadline, LoadForecast, RiskLevel, Student};
use crate::services::{peak_days, Notifier, ScoreEngine, StudentTip};
use crate::utils::bounded;
use crate::workflow::student_ctx::StudentCtx;

/// 单个学生的处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnitState {
    Pending,
    Scored,
    Persisted,
    Notified,
    Failed,
}

/// 单个学生的处理结果
#[derive(Debug, Clone, Serialize)]
pub struct StudentOutcome {
    pub student_id: String,
    pub state: UnitState,
    pub load_score: u8,
    pub risk_level: RiskLevel,
    pub tip: Option<StudentTip>,
    /// 提示生成失败的原因（不影响快照）
    pub tip_error: Option<String>,
    /// 流程失败的原因（state 为 Failed）
    pub error: Option<String>,
}

impl StudentOutcome {
    fn pending(student_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            state: UnitState::Pending,
            load_score: 0,
            risk_level: RiskLevel::Safe,
            tip: None,
            tip_error: None,
            error: None,
        }
    }

    fn failed(student_id: &str, err: &AppError) -> Self {
        Self {
            state: UnitState::Failed,
            error: Some(err.to_string()),
            ..Self::pending(student_id)
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == UnitState::Failed
    }
}

/// 学生负荷流程
///
/// - 只依赖存储接口和能力层
/// - 不关心其他学生
pub struct StudentFlow {
    roster: Arc<dyn RosterStore>,
    snapshots: Arc<dyn SnapshotStore>,
    notifier: Arc<dyn Notifier>,
    engine: Arc<ScoreEngine>,
    forecast_days: usize,
    timeout_secs: u64,
}

impl StudentFlow {
    pub fn new(
        roster: Arc<dyn RosterStore>,
        snapshots: Arc<dyn SnapshotStore>,
        notifier: Arc<dyn Notifier>,
        engine: Arc<ScoreEngine>,
        forecast_days: usize,
        timeout_secs: u64,
    ) -> Self {
        Self {
            roster,
            snapshots,
            notifier,
            engine,
            forecast_days,
            timeout_secs,
        }
    }

    /// 学生所有选修课程的截止日期
    pub async fn student_deadlines(&self, student_id: &str) -> AppResult<Vec<Deadline>> {
        let courses = bounded(
            "list_courses_for",
            self.timeout_secs,
            self.roster.list_courses_for(student_id),
        )
        .await?;
        let course_ids: Vec<String> = courses.into_iter().map(|c| c.id).collect();

        bounded(
            "list_deadlines_for_courses",
            self.timeout_secs,
            self.roster.list_deadlines_for_courses(&course_ids),
        )
        .await
    }

    /// 计算单个学生某一天的负荷（只读，不写快照）
    pub async fn score(&self, student_id: &str, date: NaiveDate) -> AppResult<DailyLoad> {
        self.ensure_student(student_id).await?;
        let deadlines = self.student_deadlines(student_id).await?;
        Ok(self.engine.daily_load(&deadlines, date))
    }

    /// 学生负荷预测及高峰日
    pub async fn forecast(
        &self,
        student_id: &str,
        start: NaiveDate,
        days: usize,
        peak_threshold: u8,
    ) -> AppResult<LoadForecast> {
        self.ensure_student(student_id).await?;
        let deadlines = self.student_deadlines(student_id).await?;
        let load_data = self.engine.load_range(&deadlines, start, days);
        let peaks = peak_days(&load_data, peak_threshold);

        Ok(LoadForecast {
            student_id: student_id.to_string(),
            load_data,
            peak_days: peaks,
        })
    }

    /// 执行一名学生的完整流程，错误收敛为 Failed 状态
    pub async fn run_unit(&self, student: &Student, ctx: &StudentCtx) -> StudentOutcome {
        match self.run(student, ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{} ❌ 处理过程中发生错误: {}", ctx, e);
                StudentOutcome::failed(&student.id, &e)
            }
        }
    }

    /// 执行一名学生的完整流程
    pub async fn run(&self, student: &Student, ctx: &StudentCtx) -> AppResult<StudentOutcome> {
        let mut outcome = StudentOutcome::pending(&student.id);
        let deadlines = self.student_deadlines(&student.id).await?;
        debug!("{} 找到 {} 个截止日期", ctx, deadlines.len());

        // Scored
        let load = self.engine.daily_load(&deadlines, ctx.date);
        outcome.state = UnitState::Scored;
        outcome.load_score = load.load_score;
        outcome.risk_level = load.risk_level;

        // Persisted
        let snapshot = DailyLoadSnapshot::from_load(&student.id, &load);
        bounded(
            "snapshot_upsert",
            self.timeout_secs,
            self.snapshots.upsert(snapshot),
        )
        .await?;
        outcome.state = UnitState::Persisted;

        info!(
            "{} ✓ 负荷 {} ({}), 相关截止日期 {} 个",
            ctx, load.load_score, load.risk_level, load.deadlines_count
        );

        if !load.risk_level.needs_attention() {
            return Ok(outcome);
        }

        // Notified（失败只记录，不影响已写入的快照）
        let series = self
            .engine
            .load_range(&deadlines, ctx.date, self.forecast_days);
        match bounded(
            "generate_student_tip",
            self.timeout_secs,
            self.notifier.generate_student_tip(student, &series),
        )
        .await
        {
            Ok(tip) => {
                info!("{} 📝 已生成提示 (优先级: {:?})", ctx, tip.priority);
                outcome.tip = Some(tip);
                outcome.state = UnitState::Notified;
            }
            Err(e) => {
                warn!("{} ⚠️ 提示生成失败: {}", ctx, e);
                outcome.tip_error = Some(e.to_string());
            }
        }

        Ok(outcome)
    }

    async fn ensure_student(&self, student_id: &str) -> AppResult<()> {
        let student = bounded(
            "get_student",
            self.timeout_secs,
            self.roster.get_student(student_id),
        )
        .await?;
        match student {
            Some(_) => Ok(()),
            None => Err(AppError::student_not_found(student_id)),
        }
    }
}
