use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::deadline::DeadlineKind;

/// 冲突严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// 冲突中的一项截止日期
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictDeadline {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: DeadlineKind,
    pub difficulty: Option<u8>,
    pub course_id: String,
    /// 课程未解析时为 `Unknown Course`
    pub course_name: String,
}

/// 同一天的截止日期冲突（不持久化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub date: NaiveDate,
    pub count: usize,
    pub deadlines: Vec<ConflictDeadline>,
    pub severity: Severity,
    pub total_difficulty: u32,
}

impl Conflict {
    pub fn involves_course(&self, course_id: &str) -> bool {
        self.deadlines.iter().any(|d| d.course_id == course_id)
    }
}

/// 备选日期
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeDate {
    pub date: NaiveDate,
    /// 相对冲突日期的偏移（可为负）
    pub days_from_conflict: i64,
    pub existing_deadlines: usize,
    pub suitability_score: i64,
}

/// 冲突及其备选日期
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictSuggestion {
    pub conflict: Conflict,
    pub alternatives: Vec<AlternativeDate>,
}
