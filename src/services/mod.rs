pub mod alternative_dates;
pub mod conflict_detector;
pub mod llm_service;
pub mod notifier;
pub mod score_engine;

pub use alternative_dates::AlternativeDateResolver;
pub use conflict_detector::ConflictDetector;
pub use llm_service::LlmService;
pub use notifier::{
    LlmNotifier, LogNotifier, Notifier, ProfessorBrief, ProfessorSuggestion, StudentTip,
    TipPriority,
};
pub use score_engine::{peak_days, ScoreEngine};
