//! 截止日期影响分析 - 流程层
//!
//! 新建截止日期后：课程 → 选课学生 → 这些学生选修的全部课程（只走一跳），
//! 在合并后的截止日期上检测冲突，保留涉及本课程的冲突并给出备选日期，
//! 最后交给通知协作方生成教师建议。

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::RosterStore;
use crate::models::{Course, ConflictSuggestion, Deadline};
use crate::services::{
    AlternativeDateResolver, ConflictDetector, Notifier, ProfessorBrief, ProfessorSuggestion,
    ScoreEngine,
};
use crate::utils::bounded;

/// 影响分析结果
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImpactOutcome {
    /// 课程没有选课学生
    NoStudents { course_id: String },
    /// 一跳范围内没有冲突
    NoConflicts { course_id: String },
    /// 有冲突，但都不涉及本课程
    NoRelevantConflicts {
        course_id: String,
        total_conflicts: usize,
    },
    /// 已生成建议材料
    Suggested(ImpactReport),
}

/// 影响分析报告
#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    pub deadline_id: String,
    /// 一跳范围内的全部课程
    pub related_course_ids: Vec<String>,
    pub brief: ProfessorBrief,
    pub suggestion: Option<ProfessorSuggestion>,
    /// 建议生成失败的原因（不影响分析结果）
    pub notify_error: Option<String>,
}

/// 影响分析器
pub struct ImpactAnalyzer {
    roster: Arc<dyn RosterStore>,
    notifier: Arc<dyn Notifier>,
    engine: Arc<ScoreEngine>,
    detector: ConflictDetector,
    resolver: AlternativeDateResolver,
    class_forecast_days: usize,
    timeout_secs: u64,
}

impl ImpactAnalyzer {
    pub fn new(
        roster: Arc<dyn RosterStore>,
        notifier: Arc<dyn Notifier>,
        engine: Arc<ScoreEngine>,
        resolver: AlternativeDateResolver,
        class_forecast_days: usize,
        timeout_secs: u64,
    ) -> Self {
        Self {
            roster,
            notifier,
            engine,
            detector: ConflictDetector::new(),
            resolver,
            class_forecast_days,
            timeout_secs,
        }
    }

    /// 分析一个新截止日期的影响
    ///
    /// 课程不存在时返回 NotFound 错误，只放弃这一次分析。
    pub async fn analyze(&self, deadline: &Deadline, today: NaiveDate) -> AppResult<ImpactOutcome> {
        let course_id = deadline.course.id.as_str();

        // 1. 课程与选课学生
        let course = bounded(
            "get_course",
            self.timeout_secs,
            self.roster.get_course(course_id),
        )
        .await?
        .ok_or_else(|| AppError::course_not_found(course_id))?;

        info!("[课程 {}] 开始分析冲突: {}", course.id, course.name);

        if course.student_ids.is_empty() {
            info!("[课程 {}] 没有选课学生", course.id);
            return Ok(ImpactOutcome::NoStudents {
                course_id: course.id,
            });
        }

        // 2. 一跳：这些学生选修的全部课程
        let related = bounded(
            "courses_for_students",
            self.timeout_secs,
            self.roster.courses_for_students(&course.student_ids),
        )
        .await?;
        let related_ids: Vec<String> = related.iter().map(|c| c.id.clone()).collect();

        // 3. 合并后的截止日期
        let all_deadlines = bounded(
            "list_deadlines_for_courses",
            self.timeout_secs,
            self.roster.list_deadlines_for_courses(&related_ids),
        )
        .await?;
        debug!(
            "[课程 {}] 一跳范围: {} 门课程, {} 个截止日期",
            course.id,
            related_ids.len(),
            all_deadlines.len()
        );

        // 4. 冲突检测
        let conflicts = self.detector.detect_conflicts(&all_deadlines);
        if conflicts.is_empty() {
            info!("[课程 {}] 未检测到冲突", course.id);
            return Ok(ImpactOutcome::NoConflicts {
                course_id: course.id,
            });
        }
        let total_conflicts = conflicts.len();

        // 5. 只保留涉及本课程的冲突
        let relevant: Vec<_> = conflicts
            .into_iter()
            .filter(|c| c.involves_course(&course.id))
            .collect();
        info!(
            "[课程 {}] 共 {} 个冲突，其中 {} 个涉及本课程",
            course.id,
            total_conflicts,
            relevant.len()
        );
        if relevant.is_empty() {
            return Ok(ImpactOutcome::NoRelevantConflicts {
                course_id: course.id,
                total_conflicts,
            });
        }

        // 6. 备选日期
        let suggestions: Vec<ConflictSuggestion> = relevant
            .into_iter()
            .map(|conflict| {
                let alternatives = self.resolver.suggest_alternatives(&conflict, &all_deadlines);
                ConflictSuggestion {
                    conflict,
                    alternatives,
                }
            })
            .collect();

        // 7. 打包并交给通知协作方
        let course_deadlines: Vec<Deadline> = all_deadlines
            .iter()
            .filter(|d| d.course.is_course(&course.id))
            .cloned()
            .collect();
        let per_student = per_student_deadlines(&course, &related, &all_deadlines);
        let class_load =
            self.engine
                .class_load_range(&per_student, today, self.class_forecast_days);

        let brief = ProfessorBrief {
            course,
            course_deadlines,
            class_load,
            suggestions,
        };

        let (suggestion, notify_error) = match bounded(
            "generate_professor_suggestion",
            self.timeout_secs,
            self.notifier.generate_professor_suggestion(&brief),
        )
        .await
        {
            Ok(s) => (Some(s), None),
            Err(e) => {
                warn!("[课程 {}] ⚠️ 教师建议生成失败: {}", brief.course.id, e);
                (None, Some(e.to_string()))
            }
        };

        Ok(ImpactOutcome::Suggested(ImpactReport {
            deadline_id: deadline.id.clone(),
            related_course_ids: related_ids,
            brief,
            suggestion,
            notify_error,
        }))
    }
}

/// 本课程每位学生的截止日期（一跳范围已包含学生选修的全部课程）
fn per_student_deadlines(
    course: &Course,
    related: &[Course],
    all_deadlines: &[Deadline],
) -> Vec<Vec<Deadline>> {
    course
        .student_ids
        .iter()
        .map(|student_id| {
            let enrolled: Vec<&str> = related
                .iter()
                .filter(|c| c.enrolls(student_id))
                .map(|c| c.id.as_str())
                .collect();
            all_deadlines
                .iter()
                .filter(|d| enrolled.contains(&d.course.id.as_str()))
                .cloned()
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightTable;
    use crate::infrastructure::MemoryRoster;
    use crate::models::parse_roster;
    use crate::services::{LogNotifier, StudentTip};
    use crate::models::{DailyLoad, Student};
    use async_trait::async_trait;

    const ROSTER: &str = r#"
        [[students]]
        id = "s1"
        [[students]]
        id = "s2"
        [[students]]
        id = "s3"

        [[courses]]
        id = "c1"
        name = "Physics"
        professor_id = "p1"
        student_ids = ["s1", "s2"]

        [[courses]]
        id = "c2"
        name = "Design"
        professor_id = "p2"
        student_ids = ["s2", "s3"]

        [[courses]]
        id = "c3"
        name = "History"
        professor_id = "p3"
        student_ids = ["s3"]

        [[courses]]
        id = "c4"
        name = "Seminar"
        student_ids = []

        [[deadlines]]
        id = "d1"
        title = "Midterm"
        course_id = "c1"
        due = "2026-01-20T09:00:00"
        difficulty = 5
        type = "exam"

        [[deadlines]]
        id = "d2"
        title = "Poster"
        course_id = "c2"
        due = "2026-01-20T17:00:00"
        difficulty = 3
        type = "project"

        [[deadlines]]
        id = "d3"
        title = "Essay"
        course_id = "c3"
        due = "2026-01-20"
        difficulty = 4
        type = "assignment"

        [[deadlines]]
        id = "d4"
        title = "Sketch"
        course_id = "c2"
        due = "2026-01-25"
        difficulty = 2
        type = "assignment"

        [[deadlines]]
        id = "d5"
        title = "Reading"
        course_id = "c3"
        due = "2026-01-25"
        difficulty = 2
        type = "assignment"
    "#;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn generate_student_tip(
            &self,
            _student: &Student,
            _load_series: &[DailyLoad],
        ) -> AppResult<StudentTip> {
            Err(AppError::Other("notifier down".into()))
        }

        async fn generate_professor_suggestion(
            &self,
            _brief: &ProfessorBrief,
        ) -> AppResult<ProfessorSuggestion> {
            Err(AppError::Other("notifier down".into()))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    fn analyzer(notifier: Arc<dyn Notifier>) -> (Arc<MemoryRoster>, ImpactAnalyzer) {
        let roster = Arc::new(MemoryRoster::new(parse_roster(ROSTER).unwrap()));
        let analyzer = ImpactAnalyzer::new(
            roster.clone(),
            notifier,
            Arc::new(ScoreEngine::new(WeightTable::default())),
            AlternativeDateResolver::new(14),
            7,
            5,
        );
        (roster, analyzer)
    }

    async fn deadline(roster: &MemoryRoster, id: &str) -> Deadline {
        roster.get_deadline(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn conflicts_stay_within_one_hop() {
        let (roster, analyzer) = analyzer(Arc::new(LogNotifier));
        let d1 = deadline(&roster, "d1").await;

        let outcome = analyzer.analyze(&d1, today()).await.unwrap();
        let report = match outcome {
            ImpactOutcome::Suggested(report) => report,
            other => panic!("expected a report, got {:?}", other),
        };

        assert_eq!(report.related_course_ids, vec!["c1", "c2"]);
        assert_eq!(report.brief.suggestions.len(), 1);
        let conflict = &report.brief.suggestions[0].conflict;
        // c3 的 Essay 同一天，但只能经由 s3 到达
        assert_eq!(conflict.count, 2);
        assert_eq!(conflict.total_difficulty, 8);
        assert_eq!(report.brief.class_load.len(), 7);
        assert_eq!(report.brief.course_deadlines.len(), 1);

        let suggestion = report.suggestion.expect("suggestion");
        assert_eq!(suggestion.professor_id, "p1");
        assert!(report.notify_error.is_none());
    }

    #[tokio::test]
    async fn unrelated_conflicts_are_not_reported() {
        let (roster, analyzer) = analyzer(Arc::new(LogNotifier));
        // c2 的一跳范围包括 c3，1月25日的冲突不涉及 c1
        let d2 = deadline(&roster, "d2").await;
        let outcome = analyzer.analyze(&d2, today()).await.unwrap();
        let report = match outcome {
            ImpactOutcome::Suggested(report) => report,
            other => panic!("expected a report, got {:?}", other),
        };
        assert_eq!(report.related_course_ids, vec!["c1", "c2", "c3"]);
        assert_eq!(report.brief.suggestions.len(), 2);

        roster
            .upsert_course(Course {
                id: "c5".into(),
                name: "Drawing".into(),
                professor_id: Some("p5".into()),
                student_ids: vec!["s3".into()],
            })
            .await;
        let lone = Deadline {
            id: "d9".into(),
            title: "Still life".into(),
            course: crate::models::CourseRef::bare("c5"),
            due: NaiveDate::from_ymd_opt(2026, 2, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            difficulty: Some(2),
            kind: crate::models::DeadlineKind::Assignment,
        };
        roster.insert_deadline(lone.clone()).await.unwrap();

        let outcome = analyzer.analyze(&lone, today()).await.unwrap();
        assert!(matches!(
            outcome,
            ImpactOutcome::NoRelevantConflicts { total_conflicts: 2, .. }
        ));
    }

    #[tokio::test]
    async fn course_without_students_is_skipped() {
        let (_, analyzer) = analyzer(Arc::new(LogNotifier));
        let d = Deadline {
            id: "d8".into(),
            title: "Talk".into(),
            course: crate::models::CourseRef::bare("c4"),
            due: today().and_hms_opt(9, 0, 0).unwrap(),
            difficulty: None,
            kind: crate::models::DeadlineKind::Quiz,
        };
        let outcome = analyzer.analyze(&d, today()).await.unwrap();
        assert!(matches!(outcome, ImpactOutcome::NoStudents { .. }));
    }

    #[tokio::test]
    async fn missing_course_is_not_found() {
        let (roster, analyzer) = analyzer(Arc::new(LogNotifier));
        let mut d = deadline(&roster, "d1").await;
        d.course = crate::models::CourseRef::bare("c404");
        let err = analyzer.analyze(&d, today()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn notifier_failure_is_recorded_in_report() {
        let (roster, analyzer) = analyzer(Arc::new(FailingNotifier));
        let d1 = deadline(&roster, "d1").await;
        let outcome = analyzer.analyze(&d1, today()).await.unwrap();
        let report = match outcome {
            ImpactOutcome::Suggested(report) => report,
            other => panic!("expected a report, got {:?}", other),
        };
        assert!(report.suggestion.is_none());
        assert!(report.notify_error.unwrap().contains("notifier down"));
    }
}
