//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和后台调度，只做调度和统计，不做具体业务判断。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 每日负荷批处理
//! - 加载全部学生
//! - 控制并发数量（Semaphore）
//! - 响应中止信号
//! - 输出周期统计
//!
//! ### `impact_dispatcher` - 截止日期影响分析调度
//! - 新建截止日期后在后台启动分析
//! - 通过事件通道报告每次分析的结果
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Student>)     impact_dispatcher (处理新 Deadline)
//!     ↓                                       ↓
//! workflow::StudentFlow                   workflow::ImpactAnalyzer
//!     ↓                                       ↓
//! services (能力层：score / conflict / alternatives / notifier)
//!     ↓
//! infrastructure (基础设施：RosterStore / SnapshotStore)
//! ```

pub mod batch_processor;
pub mod impact_dispatcher;

// 重新导出主要类型
pub use batch_processor::{AbortSignal, BatchOrchestrator, CycleSummary};
pub use impact_dispatcher::{ImpactDispatcher, ImpactEvent};
