//! 通知协作方 - 业务能力层
//!
//! 学生提示与教师建议的生成。核心逻辑只把结果交给这里，
//! 生成失败走独立的错误通道，不影响评分与快照。

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{ClassLoadDay, ConflictSuggestion, Course, DailyLoad, Deadline, RiskLevel, Student};
use crate::services::llm_service::LlmService;
use crate::utils::logging::truncate_text;

/// 进入学生提示的负荷下限
pub const HIGH_LOAD_THRESHOLD: u8 = 40;
/// 班级平均负荷超过该值视为过载
pub const OVERLOAD_THRESHOLD: u32 = 60;

const STUDENT_SYSTEM_PROMPT: &str = "You are a supportive academic advisor helping students manage their workload. Be encouraging but realistic.";
const PROFESSOR_SYSTEM_PROMPT: &str = "You are an AI assistant helping professors optimize course scheduling. Be professional and data-driven.";

/// 提示优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipPriority {
    Low,
    Medium,
    High,
}

/// 学生提示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentTip {
    pub student_id: String,
    pub text: String,
    pub priority: TipPriority,
    pub affected_dates: Vec<NaiveDate>,
}

/// 交给教师建议生成的材料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessorBrief {
    pub course: Course,
    /// 本课程在一跳范围内的截止日期
    pub course_deadlines: Vec<Deadline>,
    pub class_load: Vec<ClassLoadDay>,
    pub suggestions: Vec<ConflictSuggestion>,
}

/// 教师建议
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessorSuggestion {
    pub course_id: String,
    pub professor_id: String,
    pub text: String,
    pub priority: TipPriority,
    pub affected_dates: Vec<NaiveDate>,
}

/// 通知协作方
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 根据未来几天的负荷为学生生成提示
    async fn generate_student_tip(
        &self,
        student: &Student,
        load_series: &[DailyLoad],
    ) -> AppResult<StudentTip>;

    /// 根据冲突与班级负荷为任课教师生成建议
    async fn generate_professor_suggestion(
        &self,
        brief: &ProfessorBrief,
    ) -> AppResult<ProfessorSuggestion>;
}

// ========== 通用规则 ==========

/// 分数 ≥ 40 的日期
pub fn high_load_days(series: &[DailyLoad]) -> Vec<&DailyLoad> {
    series
        .iter()
        .filter(|d| d.load_score >= HIGH_LOAD_THRESHOLD)
        .collect()
}

/// 班级平均 ≥ 60 的日期
pub fn overloaded_days(class_load: &[ClassLoadDay]) -> Vec<&ClassLoadDay> {
    class_load
        .iter()
        .filter(|d| d.average_load >= OVERLOAD_THRESHOLD)
        .collect()
}

/// 学生提示优先级：第一个高负荷日为 danger 时为 high
fn student_priority(high_days: &[&DailyLoad]) -> TipPriority {
    match high_days.first() {
        Some(day) if day.risk_level == RiskLevel::Danger => TipPriority::High,
        _ => TipPriority::Medium,
    }
}

/// 教师建议优先级：过载超过 3 天为 high
fn professor_priority(overloaded: &[&ClassLoadDay]) -> TipPriority {
    if overloaded.len() > 3 {
        TipPriority::High
    } else {
        TipPriority::Medium
    }
}

/// 没有高负荷日时的鼓励性提示（按学生 id 固定选择一条）
pub fn encouraging_tip(student: &Student) -> StudentTip {
    let name = student.display_name();
    let templates = [
        format!("Great job, {}! Your workload is well-managed. This is a perfect time to review past material or get ahead on readings.", name),
        format!("You're doing excellent, {}! With light workload ahead, consider helping classmates or exploring extra credit opportunities.", name),
        format!("Awesome balance, {}! Use this lighter period to recharge and prepare for busier times ahead.", name),
    ];
    let pick = student.id.bytes().map(usize::from).sum::<usize>() % templates.len();

    StudentTip {
        student_id: student.id.clone(),
        text: templates[pick].clone(),
        priority: TipPriority::Low,
        affected_dates: Vec::new(),
    }
}

fn professor_of(course: &Course) -> AppResult<String> {
    course
        .professor_id
        .clone()
        .ok_or_else(|| AppError::Other(format!("课程缺少任课教师: {}", course.id)))
}

fn student_prompt(student: &Student, high_days: &[&DailyLoad]) -> String {
    let days = high_days
        .iter()
        .map(|d| {
            let titles: Vec<String> = d
                .deadlines
                .iter()
                .map(|c| format!("{} ({}, {} days left)", c.title, c.course_name, c.days_until))
                .collect();
            format!(
                "- {}: load {} ({}), due soon: {}",
                d.date,
                d.load_score,
                d.risk_level,
                titles.join("; ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Student {} has the following high-workload days coming up:\n{}\n\nWrite one short, practical tip (max 3 sentences) to help them plan the week.",
        student.display_name(),
        days
    )
}

fn professor_prompt(brief: &ProfessorBrief, overloaded: &[&ClassLoadDay]) -> String {
    let deadlines = brief
        .course_deadlines
        .iter()
        .map(|d| format!("- {} ({}) due {}", d.title, d.kind, d.due_date()))
        .collect::<Vec<_>>()
        .join("\n");

    let overload = if overloaded.is_empty() {
        "none".to_string()
    } else {
        overloaded
            .iter()
            .map(|d| format!("{} (avg {})", d.date, d.average_load))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let conflicts = brief
        .suggestions
        .iter()
        .map(|s| {
            let alternatives: Vec<String> = s
                .alternatives
                .iter()
                .map(|a| format!("{} (score {})", a.date, a.suitability_score))
                .collect();
            let titles: Vec<String> = s
                .conflict
                .deadlines
                .iter()
                .map(|d| format!("{} [{}]", d.title, d.course_name))
                .collect();
            format!(
                "- {} [{}]: {} | alternatives: {}",
                s.conflict.date,
                s.conflict.severity,
                titles.join(", "),
                alternatives.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Course: {}\nDeadlines:\n{}\nOverloaded class days: {}\nConflicts with other courses:\n{}\n\nSuggest concrete schedule adjustments in at most 4 sentences.",
        brief.course.name, deadlines, overload, conflicts
    )
}

// ========== LLM 实现 ==========

/// 基于 LLM 的通知协作方
pub struct LlmNotifier {
    llm: LlmService,
}

impl LlmNotifier {
    pub fn new(llm: LlmService) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Notifier for LlmNotifier {
    async fn generate_student_tip(
        &self,
        student: &Student,
        load_series: &[DailyLoad],
    ) -> AppResult<StudentTip> {
        let high_days = high_load_days(load_series);
        if high_days.is_empty() {
            info!("[学生 {}] 没有高负荷日，使用鼓励性提示", student.id);
            return Ok(encouraging_tip(student));
        }

        let prompt = student_prompt(student, &high_days);
        match self
            .llm
            .send_to_llm(&prompt, Some(STUDENT_SYSTEM_PROMPT), 200)
            .await
        {
            Ok(text) => {
                info!("[学生 {}] 📝 LLM 提示: {}", student.id, truncate_text(&text, 60));
                Ok(StudentTip {
                    student_id: student.id.clone(),
                    text,
                    priority: student_priority(&high_days),
                    affected_dates: high_days.iter().map(|d| d.date).collect(),
                })
            }
            Err(e) => {
                warn!("[学生 {}] ⚠️ LLM 生成提示失败，使用鼓励性提示: {}", student.id, e);
                Ok(encouraging_tip(student))
            }
        }
    }

    async fn generate_professor_suggestion(
        &self,
        brief: &ProfessorBrief,
    ) -> AppResult<ProfessorSuggestion> {
        let professor_id = professor_of(&brief.course)?;
        let overloaded = overloaded_days(&brief.class_load);
        let prompt = professor_prompt(brief, &overloaded);

        let text = self
            .llm
            .send_to_llm(&prompt, Some(PROFESSOR_SYSTEM_PROMPT), 250)
            .await?;
        info!("[课程 {}] 📝 LLM 建议: {}", brief.course.id, truncate_text(&text, 60));

        Ok(ProfessorSuggestion {
            course_id: brief.course.id.clone(),
            professor_id,
            text,
            priority: professor_priority(&overloaded),
            affected_dates: overloaded.iter().map(|d| d.date).collect(),
        })
    }
}

// ========== 日志实现 ==========

/// 未配置 LLM 时使用：只记录日志，返回模板文本
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn generate_student_tip(
        &self,
        student: &Student,
        load_series: &[DailyLoad],
    ) -> AppResult<StudentTip> {
        let high_days = high_load_days(load_series);
        let Some(peak) = high_days.iter().max_by_key(|d| d.load_score) else {
            return Ok(encouraging_tip(student));
        };

        let text = format!(
            "{}, you have {} busy day(s) ahead; the heaviest is {} (load {}). Start on the nearest deadlines first.",
            student.display_name(),
            high_days.len(),
            peak.date,
            peak.load_score
        );
        info!("[学生 {}] 📝 提示: {}", student.id, text);

        Ok(StudentTip {
            student_id: student.id.clone(),
            text,
            priority: student_priority(&high_days),
            affected_dates: high_days.iter().map(|d| d.date).collect(),
        })
    }

    async fn generate_professor_suggestion(
        &self,
        brief: &ProfessorBrief,
    ) -> AppResult<ProfessorSuggestion> {
        let professor_id = professor_of(&brief.course)?;
        let overloaded = overloaded_days(&brief.class_load);

        let moves: Vec<String> = brief
            .suggestions
            .iter()
            .filter_map(|s| {
                s.alternatives
                    .first()
                    .map(|a| format!("{} → {}", s.conflict.date, a.date))
            })
            .collect();
        let text = format!(
            "{}: {} conflict(s) with other courses. Consider moving {}.",
            brief.course.name,
            brief.suggestions.len(),
            if moves.is_empty() {
                "nothing".to_string()
            } else {
                moves.join(", ")
            }
        );
        info!("[课程 {}] 📝 建议: {}", brief.course.id, text);

        Ok(ProfessorSuggestion {
            course_id: brief.course.id.clone(),
            professor_id,
            text,
            priority: professor_priority(&overloaded),
            affected_dates: overloaded.iter().map(|d| d.date).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlternativeDate, Conflict, Severity};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn student() -> Student {
        Student {
            id: "s1".into(),
            name: "Asha".into(),
        }
    }

    fn day(d: u32, score: u8) -> DailyLoad {
        DailyLoad {
            load_score: score,
            risk_level: RiskLevel::from_score(score),
            ..DailyLoad::empty(date(d))
        }
    }

    fn course(professor: Option<&str>) -> Course {
        Course {
            id: "c1".into(),
            name: "Physics".into(),
            professor_id: professor.map(String::from),
            student_ids: vec!["s1".into()],
        }
    }

    #[test]
    fn encouraging_tip_is_low_priority_and_stable() {
        let a = encouraging_tip(&student());
        let b = encouraging_tip(&student());
        assert_eq!(a, b);
        assert_eq!(a.priority, TipPriority::Low);
        assert!(a.text.contains("Asha"));
    }

    #[tokio::test]
    async fn log_notifier_prioritises_danger_days() {
        let series = vec![day(1, 75), day(2, 20), day(3, 45)];
        let tip = LogNotifier
            .generate_student_tip(&student(), &series)
            .await
            .unwrap();
        assert_eq!(tip.priority, TipPriority::High);
        assert_eq!(tip.affected_dates, vec![date(1), date(3)]);

        let calm = vec![day(1, 10), day(2, 39)];
        let tip = LogNotifier.generate_student_tip(&student(), &calm).await.unwrap();
        assert_eq!(tip.priority, TipPriority::Low);
    }

    #[tokio::test]
    async fn warning_first_day_is_medium_priority() {
        let series = vec![day(1, 50), day(2, 90)];
        let tip = LogNotifier
            .generate_student_tip(&student(), &series)
            .await
            .unwrap();
        assert_eq!(tip.priority, TipPriority::Medium);
    }

    #[tokio::test]
    async fn professor_suggestion_requires_professor() {
        let brief = ProfessorBrief {
            course: course(None),
            course_deadlines: Vec::new(),
            class_load: Vec::new(),
            suggestions: Vec::new(),
        };
        assert!(LogNotifier.generate_professor_suggestion(&brief).await.is_err());
    }

    #[tokio::test]
    async fn professor_priority_depends_on_overloaded_days() {
        let class_load: Vec<ClassLoadDay> = (1..=5)
            .map(|d| ClassLoadDay {
                date: date(d),
                average_load: if d == 5 { 10 } else { 65 },
            })
            .collect();
        let suggestion = ConflictSuggestion {
            conflict: Conflict {
                date: date(18),
                count: 2,
                deadlines: Vec::new(),
                severity: Severity::Critical,
                total_difficulty: 8,
            },
            alternatives: vec![AlternativeDate {
                date: date(17),
                days_from_conflict: -1,
                existing_deadlines: 0,
                suitability_score: 19,
            }],
        };
        let brief = ProfessorBrief {
            course: course(Some("p1")),
            course_deadlines: Vec::new(),
            class_load,
            suggestions: vec![suggestion],
        };

        let result = LogNotifier.generate_professor_suggestion(&brief).await.unwrap();
        assert_eq!(result.professor_id, "p1");
        assert_eq!(result.priority, TipPriority::High);
        assert_eq!(result.affected_dates.len(), 4);
        assert!(result.text.contains("2026-01-17"));
    }
}
