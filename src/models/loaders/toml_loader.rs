use crate::models::course::{Course, Student};
use crate::models::deadline::{deserialize_due, CourseRef, Deadline, DeadlineKind};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// 花名册文件结构
///
/// ```toml
/// [[students]]
/// id = "s1"
/// name = "Asha"
///
/// [[courses]]
/// id = "c1"
/// name = "Algorithms"
/// professor_id = "p1"
/// student_ids = ["s1"]
///
/// [[deadlines]]
/// id = "d1"
/// title = "Midterm"
/// course_id = "c1"
/// due = "2026-01-18T09:00:00"
/// difficulty = 5
/// type = "exam"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterFile {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub deadlines: Vec<DeadlineRecord>,
}

/// 文件中的截止日期记录，课程只以 id 引用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineRecord {
    pub id: String,
    pub title: String,
    pub course_id: String,
    #[serde(deserialize_with = "deserialize_due")]
    pub due: NaiveDateTime,
    /// 原值保留，负数或小数在转换时视为缺失
    #[serde(default)]
    pub difficulty: Option<RawDifficulty>,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// 文件中的难度原值，整数或小数都接受
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDifficulty {
    Int(i64),
    Float(f64),
}

impl RawDifficulty {
    /// 能表示为 `u8` 的整数保留原值，其余视为缺失
    pub fn level(self) -> Option<u8> {
        match self {
            RawDifficulty::Int(d) => u8::try_from(d).ok(),
            RawDifficulty::Float(d) if d.fract() == 0.0 && (0.0..=255.0).contains(&d) => {
                Some(d as u8)
            }
            RawDifficulty::Float(_) => None,
        }
    }
}

impl DeadlineRecord {
    /// 转换为引擎使用的截止日期，课程名在此处一次性解析
    pub fn into_deadline(self, course_name: Option<&str>) -> Deadline {
        let course = match course_name {
            Some(name) => CourseRef::resolved(self.course_id, name),
            None => CourseRef::bare(self.course_id),
        };

        Deadline {
            id: self.id,
            title: self.title,
            course,
            due: self.due,
            difficulty: self.difficulty.and_then(RawDifficulty::level),
            kind: DeadlineKind::parse(&self.kind),
        }
    }

    pub fn from_deadline(deadline: &Deadline) -> Self {
        Self {
            id: deadline.id.clone(),
            title: deadline.title.clone(),
            course_id: deadline.course.id.clone(),
            due: deadline.due,
            difficulty: deadline
                .difficulty
                .map(|d| RawDifficulty::Int(i64::from(d))),
            kind: deadline.kind.as_str().to_string(),
        }
    }
}

/// 从 TOML 文本解析花名册
pub fn parse_roster(content: &str) -> Result<RosterFile> {
    let roster: RosterFile = toml::from_str(content).context("无法解析花名册")?;
    Ok(roster)
}

/// 从 TOML 文件加载花名册
pub async fn load_roster_file(path: &Path) -> Result<RosterFile> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取花名册文件: {}", path.display()))?;

    let roster: RosterFile = toml::from_str(&content)
        .with_context(|| format!("无法解析花名册文件: {}", path.display()))?;

    tracing::info!(
        "花名册已加载: {} 名学生, {} 门课程, {} 个截止日期",
        roster.students.len(),
        roster.courses.len(),
        roster.deadlines.len()
    );

    Ok(roster)
}
