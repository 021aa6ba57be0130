//! # Cognitive Load
//!
//! 学生认知负荷评分与截止日期冲突检测
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 花名册与快照存储，只暴露读写能力
//! - `RosterStore` - 学生 / 课程 / 截止日期
//! - `SnapshotStore` - 按 (学生, 日期) 覆盖写入的每日负荷快照
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 纯计算能力与外部协作方
//! - `ScoreEngine` - 每日负荷评分
//! - `ConflictDetector` - 同日截止冲突检测
//! - `AlternativeDateResolver` - 备选日期推荐
//! - `Notifier` - 学生提示 / 教师建议（LLM 或日志）
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 单个处理单元的完整流程
//! - `StudentFlow` - 一名学生：评分 → 快照 → 提示
//! - `ImpactAnalyzer` - 一个新截止日期：一跳范围 → 冲突 → 备选日期 → 建议
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 每日批处理，管理并发与中止
//! - `orchestrator/impact_dispatcher` - 后台影响分析与事件通道
//!
//! ## 模块结构

pub mod app;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::{Config, WeightTable};
pub use error::{AppError, AppResult};
pub use models::{Conflict, Course, DailyLoad, Deadline, RiskLevel, Student};
pub use orchestrator::{AbortSignal, BatchOrchestrator, CycleSummary, ImpactDispatcher, ImpactEvent};
pub use services::{AlternativeDateResolver, ConflictDetector, ScoreEngine};
pub use workflow::{ImpactAnalyzer, ImpactOutcome, ImpactReport};
