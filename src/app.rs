//! 应用装配
//!
//! 读取配置，创建存储、评分引擎与通知协作方，并组装编排层。

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{Config, WeightTable};
use crate::error::AppResult;
use crate::infrastructure::{JsonFileSnapshotStore, MemoryRoster, RosterStore, SnapshotStore};
use crate::models::{DailyLoad, Deadline, LoadForecast};
use crate::orchestrator::{
    AbortSignal, BatchOrchestrator, CycleSummary, ImpactDispatcher, ImpactEvent,
};
use crate::services::{
    AlternativeDateResolver, LlmNotifier, LlmService, LogNotifier, Notifier, ScoreEngine,
};
use crate::workflow::{ImpactAnalyzer, ImpactOutcome, StudentFlow};

/// 应用主结构
pub struct App {
    config: Config,
    flow: Arc<StudentFlow>,
    batch: BatchOrchestrator,
    dispatcher: ImpactDispatcher,
    events: Option<UnboundedReceiver<ImpactEvent>>,
}

impl App {
    /// 按配置初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let weights = config.load_weights()?;
        let roster = MemoryRoster::load(Path::new(&config.roster_file))
            .await
            .with_context(|| format!("无法加载花名册: {}", config.roster_file))?;
        let snapshots = JsonFileSnapshotStore::open(&config.snapshot_file)
            .await
            .with_context(|| format!("无法打开快照文件: {}", config.snapshot_file))?;

        let notifier: Arc<dyn Notifier> = if config.llm_enabled() {
            let llm = LlmService::new(&config);
            info!("🤖 使用 LLM 生成提示 (模型: {})", llm.model_name());
            Arc::new(LlmNotifier::new(llm))
        } else {
            info!("📝 未配置 LLM_API_KEY，提示仅写入日志");
            Arc::new(LogNotifier)
        };

        let app = Self::with_components(
            config,
            weights,
            Arc::new(roster),
            Arc::new(snapshots),
            notifier,
        );
        Ok(app.with_cycle_log())
    }

    /// 使用给定的存储与通知协作方组装应用
    pub fn with_components(
        config: Config,
        weights: WeightTable,
        roster: Arc<dyn RosterStore>,
        snapshots: Arc<dyn SnapshotStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let engine = Arc::new(ScoreEngine::new(weights));

        let flow = Arc::new(StudentFlow::new(
            roster.clone(),
            snapshots,
            notifier.clone(),
            engine.clone(),
            config.forecast_days,
            config.collaborator_timeout_secs,
        ));
        let batch =
            BatchOrchestrator::new(roster.clone(), flow.clone(), config.max_concurrent_students);

        let analyzer = Arc::new(ImpactAnalyzer::new(
            roster.clone(),
            notifier,
            engine,
            AlternativeDateResolver::new(config.alternative_window_days),
            config.class_forecast_days,
            config.collaborator_timeout_secs,
        ));
        let (dispatcher, events) = ImpactDispatcher::new(roster, analyzer);

        Self {
            config,
            flow,
            batch,
            dispatcher,
            events: Some(events),
        }
    }

    fn with_cycle_log(mut self) -> Self {
        self.batch = self.batch.with_cycle_log(self.config.cycle_log_file.clone());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 执行一个每日负荷周期
    pub async fn run_batch(&self, date: NaiveDate) -> AppResult<CycleSummary> {
        self.batch.run_cycle(date).await
    }

    pub fn abort_signal(&self) -> AbortSignal {
        self.batch.abort_signal()
    }

    /// 单个学生某天的负荷
    pub async fn score(&self, student_id: &str, date: NaiveDate) -> AppResult<DailyLoad> {
        self.flow.score(student_id, date).await
    }

    /// 单个学生从 `start` 起 `days` 天的负荷预测
    pub async fn forecast(
        &self,
        student_id: &str,
        start: NaiveDate,
        days: usize,
    ) -> AppResult<LoadForecast> {
        self.flow
            .forecast(student_id, start, days, self.config.peak_threshold)
            .await
    }

    /// 新建截止日期，影响分析在后台执行
    pub async fn create_deadline(
        &self,
        deadline: Deadline,
        today: NaiveDate,
    ) -> AppResult<JoinHandle<()>> {
        self.dispatcher.create_deadline(deadline, today).await
    }

    /// 对已存在的截止日期执行影响分析
    pub async fn impact(&self, deadline_id: &str, today: NaiveDate) -> AppResult<ImpactOutcome> {
        self.dispatcher.analyze_existing(deadline_id, today).await
    }

    /// 取走影响分析事件接收端（只能取一次）
    pub fn take_impact_events(&mut self) -> Option<UnboundedReceiver<ImpactEvent>> {
        self.events.take()
    }
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 学生认知负荷分析");
    info!("📁 花名册: {}", config.roster_file);
    info!("💾 快照文件: {}", config.snapshot_file);
    info!("📊 最大并发数: {}", config.max_concurrent_students);
    info!("{}", "=".repeat(60));
}
