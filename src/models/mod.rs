pub mod conflict;
pub mod course;
pub mod deadline;
pub mod load;
pub mod loaders;

pub use conflict::{AlternativeDate, Conflict, ConflictDeadline, ConflictSuggestion, Severity};
pub use course::{Course, Student};
pub use deadline::{parse_due, CourseRef, Deadline, DeadlineKind, UNKNOWN_COURSE_NAME};
pub use load::{
    ClassLoadDay, ContributingDeadline, DailyLoad, DailyLoadSnapshot, LoadForecast, RiskLevel,
};
pub use loaders::{load_roster_file, parse_roster, DeadlineRecord, RawDifficulty, RosterFile};
