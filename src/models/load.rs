use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::deadline::DeadlineKind;

/// 风险等级，由负荷分数唯一决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Warning,
    Danger,
}

impl RiskLevel {
    /// 分数 ≥ 70 为 danger，≥ 40 为 warning，其余为 safe
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            RiskLevel::Danger
        } else if score >= 40 {
            RiskLevel::Warning
        } else {
            RiskLevel::Safe
        }
    }

    /// 是否需要给学生生成提示
    pub fn needs_attention(self) -> bool {
        matches!(self, RiskLevel::Warning | RiskLevel::Danger)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Warning => "warning",
            RiskLevel::Danger => "danger",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 对某一天负荷有贡献的截止日期
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributingDeadline {
    pub deadline_id: String,
    pub title: String,
    pub course_name: String,
    pub days_until: i64,
    /// 贡献分，保留一位小数
    pub load_points: f64,
    pub difficulty: Option<u8>,
    #[serde(rename = "type")]
    pub kind: DeadlineKind,
}

/// 单日负荷结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoad {
    pub date: NaiveDate,
    /// 0..=100
    pub load_score: u8,
    pub risk_level: RiskLevel,
    pub deadlines_count: usize,
    /// 按剩余天数升序
    pub deadlines: Vec<ContributingDeadline>,
}

impl DailyLoad {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            load_score: 0,
            risk_level: RiskLevel::Safe,
            deadlines_count: 0,
            deadlines: Vec::new(),
        }
    }
}

/// 班级某一天的平均负荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLoadDay {
    pub date: NaiveDate,
    pub average_load: u32,
}

/// 学生每日负荷快照，按 (student_id, date) 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoadSnapshot {
    pub student_id: String,
    pub date: NaiveDate,
    pub load_score: u8,
    pub risk_level: RiskLevel,
    pub deadlines_count: usize,
    pub deadlines: Vec<ContributingDeadline>,
}

impl DailyLoadSnapshot {
    pub fn from_load(student_id: impl Into<String>, load: &DailyLoad) -> Self {
        Self {
            student_id: student_id.into(),
            date: load.date,
            load_score: load.load_score,
            risk_level: load.risk_level,
            deadlines_count: load.deadlines_count,
            deadlines: load.deadlines.clone(),
        }
    }

    pub fn key(&self) -> (String, NaiveDate) {
        (self.student_id.clone(), self.date)
    }
}

/// 学生负荷预测：序列 + 高峰日
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadForecast {
    pub student_id: String,
    pub load_data: Vec<DailyLoad>,
    pub peak_days: Vec<DailyLoad>,
}
