//! 冲突检测 - 业务能力层
//!
//! 按日历日把截止日期分组，同一天有两个及以上即为冲突。
//! 输出按难度合计降序、日期升序排列，相同输入结果确定。

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{Conflict, ConflictDeadline, Deadline, Severity};

/// 冲突检测器（无状态）
#[derive(Debug, Default, Clone, Copy)]
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn new() -> Self {
        Self
    }

    /// 检测所有冲突
    pub fn detect_conflicts(&self, deadlines: &[Deadline]) -> Vec<Conflict> {
        if deadlines.is_empty() {
            debug!("没有需要检查的截止日期");
            return Vec::new();
        }

        let mut conflicts: Vec<Conflict> = group_by_date(deadlines)
            .into_iter()
            .filter(|(_, items)| items.len() >= 2)
            .map(|(date, items)| build_conflict(date, &items))
            .collect();

        conflicts.sort_by(|a, b| {
            b.total_difficulty
                .cmp(&a.total_difficulty)
                .then_with(|| a.date.cmp(&b.date))
        });

        debug!(
            "检测完成: {} 个截止日期, {} 个冲突",
            deadlines.len(),
            conflicts.len()
        );

        conflicts
    }

    /// 严重程度
    ///
    /// 含考试且至少两项 → critical；三项及以上或平均难度 ≥ 4 → high；其余 medium
    pub fn severity(&self, deadlines: &[&Deadline]) -> Severity {
        let count = deadlines.len();
        if count == 0 {
            return Severity::Medium;
        }

        let has_exam = deadlines.iter().any(|d| d.is_exam());
        let total: u32 = deadlines.iter().map(|d| d.difficulty_or_zero()).sum();
        let avg_difficulty = f64::from(total) / count as f64;

        if has_exam && count >= 2 {
            Severity::Critical
        } else if count >= 3 || avg_difficulty >= 4.0 {
            Severity::High
        } else {
            Severity::Medium
        }
    }
}

/// 按截止日分组，组内保持输入顺序
pub(crate) fn group_by_date(deadlines: &[Deadline]) -> BTreeMap<NaiveDate, Vec<&Deadline>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<&Deadline>> = BTreeMap::new();
    for deadline in deadlines {
        grouped.entry(deadline.due_date()).or_default().push(deadline);
    }
    grouped
}

fn build_conflict(date: NaiveDate, items: &[&Deadline]) -> Conflict {
    let members = items
        .iter()
        .map(|d| ConflictDeadline {
            id: d.id.clone(),
            title: d.title.clone(),
            kind: d.kind,
            difficulty: d.difficulty,
            course_id: d.course.id.clone(),
            course_name: d.course.display_name().to_string(),
        })
        .collect();

    Conflict {
        date,
        count: items.len(),
        deadlines: members,
        severity: ConflictDetector.severity(items),
        total_difficulty: items.iter().map(|d| d.difficulty_or_zero()).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseRef, DeadlineKind, UNKNOWN_COURSE_NAME};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn deadline(
        id: &str,
        course: CourseRef,
        due: NaiveDate,
        difficulty: Option<u8>,
        kind: DeadlineKind,
    ) -> Deadline {
        Deadline {
            id: id.to_string(),
            title: id.to_uppercase(),
            course,
            due: due.and_hms_opt(9, 0, 0).unwrap(),
            difficulty,
            kind,
        }
    }

    #[test]
    fn distinct_dates_produce_no_conflicts() {
        let c = CourseRef::resolved("c1", "Algorithms");
        let deadlines = vec![
            deadline("a", c.clone(), date(2026, 1, 1), Some(3), DeadlineKind::Exam),
            deadline("b", c.clone(), date(2026, 1, 2), Some(3), DeadlineKind::Exam),
            deadline("c", c, date(2026, 1, 3), Some(3), DeadlineKind::Exam),
        ];
        assert!(ConflictDetector::new().detect_conflicts(&deadlines).is_empty());
        assert!(ConflictDetector::new().detect_conflicts(&[]).is_empty());
    }

    #[test]
    fn exam_and_project_on_same_day_is_critical() {
        let day = date(2026, 1, 18);
        let deadlines = vec![
            deadline("x", CourseRef::resolved("c1", "Physics"), day, Some(5), DeadlineKind::Exam),
            deadline("y", CourseRef::resolved("c2", "Design"), day, Some(3), DeadlineKind::Project),
        ];

        let conflicts = ConflictDetector::new().detect_conflicts(&deadlines);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].date, day);
        assert_eq!(conflicts[0].severity, Severity::Critical);
        assert_eq!(conflicts[0].total_difficulty, 8);
        assert_eq!(conflicts[0].count, 2);
    }

    #[test]
    fn three_deadlines_with_one_exam_is_critical() {
        let day = date(2026, 3, 2);
        let c = CourseRef::bare("c1");
        let deadlines = vec![
            deadline("a", c.clone(), day, Some(1), DeadlineKind::Assignment),
            deadline("b", c.clone(), day, Some(1), DeadlineKind::Quiz),
            deadline("c", c, day, Some(1), DeadlineKind::Exam),
        ];
        let conflicts = ConflictDetector::new().detect_conflicts(&deadlines);
        assert_eq!(conflicts[0].severity, Severity::Critical);
    }

    #[test]
    fn severity_high_and_medium_rules() {
        let day = date(2026, 3, 2);
        let c = CourseRef::bare("c1");
        let detector = ConflictDetector::new();

        let three = vec![
            deadline("a", c.clone(), day, Some(1), DeadlineKind::Assignment),
            deadline("b", c.clone(), day, Some(1), DeadlineKind::Assignment),
            deadline("c", c.clone(), day, Some(1), DeadlineKind::Quiz),
        ];
        assert_eq!(detector.detect_conflicts(&three)[0].severity, Severity::High);

        let hard_pair = vec![
            deadline("a", c.clone(), day, Some(4), DeadlineKind::Project),
            deadline("b", c.clone(), day, Some(4), DeadlineKind::Assignment),
        ];
        assert_eq!(detector.detect_conflicts(&hard_pair)[0].severity, Severity::High);

        let easy_pair = vec![
            deadline("a", c.clone(), day, Some(4), DeadlineKind::Project),
            deadline("b", c, day, None, DeadlineKind::Assignment),
        ];
        let conflicts = detector.detect_conflicts(&easy_pair);
        assert_eq!(conflicts[0].severity, Severity::Medium);
        assert_eq!(conflicts[0].total_difficulty, 4);
    }

    #[test]
    fn conflicts_sorted_by_total_difficulty_then_date() {
        let c = CourseRef::bare("c1");
        let deadlines = vec![
            deadline("a", c.clone(), date(2026, 2, 5), Some(2), DeadlineKind::Assignment),
            deadline("b", c.clone(), date(2026, 2, 5), Some(2), DeadlineKind::Assignment),
            deadline("c", c.clone(), date(2026, 2, 1), Some(2), DeadlineKind::Assignment),
            deadline("d", c.clone(), date(2026, 2, 1), Some(2), DeadlineKind::Assignment),
            deadline("e", c.clone(), date(2026, 2, 9), Some(5), DeadlineKind::Assignment),
            deadline("f", c, date(2026, 2, 9), Some(5), DeadlineKind::Assignment),
        ];

        let dates: Vec<NaiveDate> = ConflictDetector::new()
            .detect_conflicts(&deadlines)
            .iter()
            .map(|c| c.date)
            .collect();
        assert_eq!(dates, vec![date(2026, 2, 9), date(2026, 2, 1), date(2026, 2, 5)]);
    }

    #[test]
    fn unresolved_course_gets_placeholder_name() {
        let day = date(2026, 1, 18);
        let deadlines = vec![
            deadline("a", CourseRef::bare("c404"), day, Some(2), DeadlineKind::Quiz),
            deadline("b", CourseRef::resolved("c1", "Physics"), day, Some(2), DeadlineKind::Quiz),
        ];

        let conflict = &ConflictDetector::new().detect_conflicts(&deadlines)[0];
        assert_eq!(conflict.deadlines[0].course_id, "c404");
        assert_eq!(conflict.deadlines[0].course_name, UNKNOWN_COURSE_NAME);
        assert_eq!(conflict.deadlines[1].course_name, "Physics");
        assert!(conflict.involves_course("c404"));
    }
}
