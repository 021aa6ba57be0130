pub mod impact_flow;
pub mod student_ctx;
pub mod student_flow;

pub use impact_flow::{ImpactAnalyzer, ImpactOutcome, ImpactReport};
pub use student_ctx::StudentCtx;
pub use student_flow::{StudentFlow, StudentOutcome, UnitState};
