//! 截止日期影响分析调度 - 编排层
//!
//! 新建截止日期后在后台启动影响分析，创建操作立即返回。
//! 每次分析的结果（报告 / 跳过 / 失败）都作为 `ImpactEvent` 发出并记录日志，
//! 分析失败不会传回给创建方。

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::{AppError, AppResult, RosterError};
use crate::infrastructure::RosterStore;
use crate::models::Deadline;
use crate::workflow::{ImpactAnalyzer, ImpactOutcome, ImpactReport};

/// 一次影响分析的结果事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ImpactEvent {
    Reported(ImpactReport),
    Skipped {
        deadline_id: String,
        outcome: ImpactOutcome,
    },
    Failed {
        deadline_id: String,
        error: String,
    },
}

impl ImpactEvent {
    pub fn deadline_id(&self) -> &str {
        match self {
            ImpactEvent::Reported(report) => &report.deadline_id,
            ImpactEvent::Skipped { deadline_id, .. } | ImpactEvent::Failed { deadline_id, .. } => {
                deadline_id
            }
        }
    }
}

/// 影响分析调度器
pub struct ImpactDispatcher {
    roster: Arc<dyn RosterStore>,
    analyzer: Arc<ImpactAnalyzer>,
    events: UnboundedSender<ImpactEvent>,
}

impl ImpactDispatcher {
    /// 返回调度器和事件接收端
    pub fn new(
        roster: Arc<dyn RosterStore>,
        analyzer: Arc<ImpactAnalyzer>,
    ) -> (Self, UnboundedReceiver<ImpactEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                roster,
                analyzer,
                events,
            },
            rx,
        )
    }

    /// 写入新的截止日期并在后台启动影响分析
    ///
    /// 只有写入失败会返回错误。
    pub async fn create_deadline(
        &self,
        deadline: Deadline,
        today: NaiveDate,
    ) -> AppResult<JoinHandle<()>> {
        self.roster.insert_deadline(deadline.clone()).await?;
        info!("[截止日期 {}] ✓ 已创建: {}", deadline.id, deadline.title);
        Ok(self.on_deadline_created(deadline, today))
    }

    /// 在后台分析一个新截止日期的影响，立即返回
    pub fn on_deadline_created(&self, deadline: Deadline, today: NaiveDate) -> JoinHandle<()> {
        let analyzer = self.analyzer.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let event = match analyzer.analyze(&deadline, today).await {
                Ok(ImpactOutcome::Suggested(report)) => {
                    info!(
                        "[截止日期 {}] 📝 影响分析完成: {} 个冲突",
                        deadline.id,
                        report.brief.suggestions.len()
                    );
                    ImpactEvent::Reported(report)
                }
                Ok(outcome) => {
                    info!("[截止日期 {}] 无需通知: {:?}", deadline.id, outcome);
                    ImpactEvent::Skipped {
                        deadline_id: deadline.id.clone(),
                        outcome,
                    }
                }
                Err(e) => {
                    error!("[截止日期 {}] ❌ 影响分析失败: {}", deadline.id, e);
                    ImpactEvent::Failed {
                        deadline_id: deadline.id.clone(),
                        error: e.to_string(),
                    }
                }
            };
            // 接收端已关闭时丢弃事件
            let _ = events.send(event);
        })
    }

    /// 对已存在的截止日期同步执行影响分析
    pub async fn analyze_existing(
        &self,
        deadline_id: &str,
        today: NaiveDate,
    ) -> AppResult<ImpactOutcome> {
        let deadline = self
            .roster
            .get_deadline(deadline_id)
            .await?
            .ok_or_else(|| {
                AppError::Roster(RosterError::DeadlineNotFound {
                    deadline_id: deadline_id.to_string(),
                })
            })?;
        self.analyzer.analyze(&deadline, today).await
    }
}
