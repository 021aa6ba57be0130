use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// 课程引用未解析（没有名称）时使用的占位名
pub const UNKNOWN_COURSE_NAME: &str = "Unknown Course";

/// 截止日期类型
///
/// 无法识别的类型统一落到 `Unknown`，评分时按倍率 1.0 计算，不会拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineKind {
    Assignment,
    Project,
    Exam,
    Quiz,
    #[serde(other)]
    Unknown,
}

impl DeadlineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeadlineKind::Assignment => "assignment",
            DeadlineKind::Project => "project",
            DeadlineKind::Exam => "exam",
            DeadlineKind::Quiz => "quiz",
            DeadlineKind::Unknown => "unknown",
        }
    }

    /// 从文本解析，大小写不敏感
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "assignment" => DeadlineKind::Assignment,
            "project" => DeadlineKind::Project,
            "exam" => DeadlineKind::Exam,
            "quiz" => DeadlineKind::Quiz,
            _ => DeadlineKind::Unknown,
        }
    }
}

impl fmt::Display for DeadlineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 课程引用
///
/// 在数据访问边界处解析一次：能找到课程时带上名称，否则只有 id。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CourseRef {
    pub fn resolved(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    /// 显示用名称，未解析时为 `Unknown Course`
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_COURSE_NAME)
    }

    /// 按 id 判断是否同一门课程，与是否已解析无关
    pub fn is_course(&self, course_id: &str) -> bool {
        self.id == course_id
    }
}

/// 截止日期
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deadline {
    pub id: String,
    pub title: String,
    pub course: CourseRef,
    /// 截止时间；计算天数时只取日期部分
    #[serde(deserialize_with = "deserialize_due")]
    pub due: NaiveDateTime,
    /// 难度 1..=5；缺失或越界时评分使用回退值
    #[serde(default)]
    pub difficulty: Option<u8>,
    #[serde(rename = "type")]
    pub kind: DeadlineKind,
}

impl Deadline {
    /// 截止日（去掉时间部分）
    pub fn due_date(&self) -> NaiveDate {
        self.due.date()
    }

    /// 难度原值，缺失按 0 计（用于冲突的难度合计）
    pub fn difficulty_or_zero(&self) -> u32 {
        self.difficulty.map(u32::from).unwrap_or(0)
    }

    pub fn is_exam(&self) -> bool {
        self.kind == DeadlineKind::Exam
    }
}

/// 解析截止时间文本
///
/// 支持 `YYYY-MM-DD`（视为当天 00:00）以及带时间的
/// `YYYY-MM-DDTHH:MM[:SS]` / `YYYY-MM-DD HH:MM[:SS]`。
pub fn parse_due(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// 截止时间反序列化：接受日期或日期时间文本
pub(crate) fn deserialize_due<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;

    struct DueVisitor;

    impl<'de> Visitor<'de> for DueVisitor {
        type Value = NaiveDateTime;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a date (YYYY-MM-DD) or datetime (YYYY-MM-DDTHH:MM[:SS])")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_due(value).ok_or_else(|| E::custom(format!("无法解析截止时间: {}", value)))
        }
    }

    deserializer.deserialize_str(DueVisitor)
}
