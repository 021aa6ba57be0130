//! 负荷评分引擎 - 业务能力层
//!
//! 纯函数，不持有任何资源，可并发调用。
//!
//! 单个截止日期的贡献 = 基础分(难度) × 类型倍率 × 临近系数，
//! 只有剩余 0..=14 天的截止日期参与计算；当日总分四舍五入后封顶 100。

use chrono::{Duration, NaiveDate};

use crate::config::WeightTable;
use crate::models::{ClassLoadDay, ContributingDeadline, DailyLoad, Deadline, RiskLevel};

/// 难度缺失或越界时的基础分
pub const FALLBACK_BASE_POINTS: f64 = 20.0;
/// 类型无法识别时的倍率
pub const FALLBACK_TYPE_MULTIPLIER: f64 = 1.0;
/// 参与计算的最大剩余天数
pub const MAX_DAYS_AHEAD: i64 = 14;
/// 分数上限
pub const MAX_SCORE: u8 = 100;
/// 默认高峰日阈值
pub const DEFAULT_PEAK_THRESHOLD: u8 = 60;

/// 负荷评分引擎
pub struct ScoreEngine {
    weights: WeightTable,
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::new(WeightTable::default())
    }
}

impl ScoreEngine {
    pub fn new(weights: WeightTable) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// 临近系数
    ///
    /// 0 天 3.0，1 天 2.5，2–3 天 2.0，4–7 天 1.5，8–14 天按 14/(d+1) 衰减
    pub fn proximity_factor(days_until: i64) -> f64 {
        match days_until {
            0 => 3.0,
            1 => 2.5,
            2..=3 => 2.0,
            4..=7 => 1.5,
            d => 14.0 / (d as f64 + 1.0),
        }
    }

    /// 单个截止日期对某一天的贡献分
    ///
    /// 剩余天数不在 0..=14 内时返回 `None`（不参与计算）。
    pub fn score_contribution(&self, deadline: &Deadline, days_until: i64) -> Option<f64> {
        if !(0..=MAX_DAYS_AHEAD).contains(&days_until) {
            return None;
        }

        let base_points = self
            .weights
            .difficulty_weight(deadline.difficulty)
            .unwrap_or(FALLBACK_BASE_POINTS);
        let type_multiplier = self
            .weights
            .kind_weight(&deadline.kind)
            .unwrap_or(FALLBACK_TYPE_MULTIPLIER);

        Some(base_points * type_multiplier * Self::proximity_factor(days_until))
    }

    /// 计算某一天的负荷
    ///
    /// 空输入返回 0 分 / safe / 空列表。
    pub fn daily_load(&self, deadlines: &[Deadline], target_date: NaiveDate) -> DailyLoad {
        let mut total = 0.0;
        let mut contributing = Vec::new();

        for deadline in deadlines {
            let days_until = days_until(deadline.due_date(), target_date);
            let Some(points) = self.score_contribution(deadline, days_until) else {
                continue;
            };

            total += points;
            contributing.push(ContributingDeadline {
                deadline_id: deadline.id.clone(),
                title: deadline.title.clone(),
                course_name: deadline.course.display_name().to_string(),
                days_until,
                load_points: (points * 10.0).round() / 10.0,
                difficulty: deadline.difficulty,
                kind: deadline.kind,
            });
        }

        // 稳定排序：同一天的保持原顺序
        contributing.sort_by_key(|d| d.days_until);

        let load_score = saturate(total);

        DailyLoad {
            date: target_date,
            load_score,
            risk_level: RiskLevel::from_score(load_score),
            deadlines_count: contributing.len(),
            deadlines: contributing,
        }
    }

    /// 从 `start_date` 起连续 `days` 天的负荷序列
    pub fn load_range(
        &self,
        deadlines: &[Deadline],
        start_date: NaiveDate,
        days: usize,
    ) -> Vec<DailyLoad> {
        consecutive_dates(start_date, days)
            .map(|date| self.daily_load(deadlines, date))
            .collect()
    }

    /// 全体学生在某一天的平均分（四舍五入），空人群返回 0
    pub fn class_average(&self, per_student_deadlines: &[Vec<Deadline>], date: NaiveDate) -> u32 {
        if per_student_deadlines.is_empty() {
            return 0;
        }

        let total: u32 = per_student_deadlines
            .iter()
            .map(|deadlines| u32::from(self.daily_load(deadlines, date).load_score))
            .sum();

        (f64::from(total) / per_student_deadlines.len() as f64).round() as u32
    }

    /// 班级平均负荷序列
    pub fn class_load_range(
        &self,
        per_student_deadlines: &[Vec<Deadline>],
        start_date: NaiveDate,
        days: usize,
    ) -> Vec<ClassLoadDay> {
        consecutive_dates(start_date, days)
            .map(|date| ClassLoadDay {
                date,
                average_load: self.class_average(per_student_deadlines, date),
            })
            .collect()
    }
}

/// 筛选分数 ≥ 阈值的日期，按分数降序（稳定）
pub fn peak_days(series: &[DailyLoad], threshold: u8) -> Vec<DailyLoad> {
    let mut peaks: Vec<DailyLoad> = series
        .iter()
        .filter(|day| day.load_score >= threshold)
        .cloned()
        .collect();
    peaks.sort_by(|a, b| b.load_score.cmp(&a.load_score));
    peaks
}

/// 按日历日计算的剩余天数（可为负）
pub fn days_until(due_date: NaiveDate, target_date: NaiveDate) -> i64 {
    (due_date - target_date).num_days()
}

fn consecutive_dates(start_date: NaiveDate, days: usize) -> impl Iterator<Item = NaiveDate> {
    (0..days).map(move |offset| start_date + Duration::days(offset as i64))
}

/// 总分四舍五入并封顶（不对单项封顶）
fn saturate(total: f64) -> u8 {
    let rounded = total.round();
    if rounded >= f64::from(MAX_SCORE) {
        MAX_SCORE
    } else if rounded <= 0.0 {
        0
    } else {
        rounded as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseRef, DeadlineKind};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn deadline(id: &str, due: NaiveDate, difficulty: Option<u8>, kind: DeadlineKind) -> Deadline {
        Deadline {
            id: id.to_string(),
            title: format!("deadline {}", id),
            course: CourseRef::resolved("c1", "Algorithms"),
            due: due.and_hms_opt(23, 59, 0).unwrap(),
            difficulty,
            kind,
        }
    }

    #[test]
    fn same_day_contribution_is_base_times_type_times_three() {
        let engine = ScoreEngine::default();
        let today = date(2026, 1, 18);
        let expected = [10.0, 15.0, 20.0, 25.0, 30.0];

        for (d, base) in (1..=5u8).zip(expected) {
            let project = deadline("p", today, Some(d), DeadlineKind::Project);
            assert_eq!(engine.score_contribution(&project, 0), Some(base * 1.5 * 3.0));
        }
    }

    #[test]
    fn proximity_factor_is_piecewise() {
        assert_eq!(ScoreEngine::proximity_factor(0), 3.0);
        assert_eq!(ScoreEngine::proximity_factor(1), 2.5);
        assert_eq!(ScoreEngine::proximity_factor(2), 2.0);
        assert_eq!(ScoreEngine::proximity_factor(3), 2.0);
        assert_eq!(ScoreEngine::proximity_factor(4), 1.5);
        assert_eq!(ScoreEngine::proximity_factor(7), 1.5);
        assert!((ScoreEngine::proximity_factor(8) - 14.0 / 9.0).abs() < 1e-9);
        assert!((ScoreEngine::proximity_factor(14) - 14.0 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn missing_or_invalid_weights_use_fallbacks() {
        let engine = ScoreEngine::default();
        let today = date(2026, 1, 18);

        let missing = deadline("a", today, None, DeadlineKind::Unknown);
        assert_eq!(engine.score_contribution(&missing, 0), Some(20.0 * 1.0 * 3.0));

        let out_of_range = deadline("b", today, Some(9), DeadlineKind::Quiz);
        assert_eq!(engine.score_contribution(&out_of_range, 0), Some(60.0));
    }

    #[test]
    fn deadlines_outside_window_do_not_contribute() {
        let engine = ScoreEngine::default();
        let today = date(2026, 1, 18);
        let d = deadline("a", today, Some(3), DeadlineKind::Assignment);

        assert_eq!(engine.score_contribution(&d, -1), None);
        assert_eq!(engine.score_contribution(&d, 15), None);

        let past = deadline("past", date(2026, 1, 17), Some(3), DeadlineKind::Assignment);
        let far = deadline("far", date(2026, 2, 10), Some(3), DeadlineKind::Assignment);
        let load = engine.daily_load(&[past, far], today);
        assert_eq!(load.load_score, 0);
        assert_eq!(load.deadlines_count, 0);
    }

    #[test]
    fn exam_today_saturates_at_hundred() {
        let engine = ScoreEngine::default();
        let today = date(2026, 1, 18);
        let exam = deadline("x", today, Some(5), DeadlineKind::Exam);

        assert_eq!(engine.score_contribution(&exam, 0), Some(180.0));

        let load = engine.daily_load(&[exam], today);
        assert_eq!(load.load_score, 100);
        assert_eq!(load.risk_level, RiskLevel::Danger);
        assert_eq!(load.deadlines[0].load_points, 180.0);
    }

    #[test]
    fn empty_input_is_zero_and_safe() {
        let engine = ScoreEngine::default();
        let load = engine.daily_load(&[], date(2026, 1, 18));
        assert_eq!(load, DailyLoad::empty(date(2026, 1, 18)));
    }

    #[test]
    fn time_of_day_is_ignored() {
        let engine = ScoreEngine::default();
        let today = date(2026, 1, 18);
        let mut early = deadline("a", date(2026, 1, 19), Some(2), DeadlineKind::Assignment);
        early.due = date(2026, 1, 19).and_hms_opt(0, 1, 0).unwrap();

        let load = engine.daily_load(&[early], today);
        assert_eq!(load.deadlines[0].days_until, 1);
        // 15 × 1.0 × 2.5 = 37.5 → 38
        assert_eq!(load.load_score, 38);
        assert_eq!(load.risk_level, RiskLevel::Safe);
    }

    #[test]
    fn contributing_deadlines_sorted_by_days_until_stably() {
        let engine = ScoreEngine::default();
        let today = date(2026, 1, 10);
        let deadlines = vec![
            deadline("late", date(2026, 1, 15), Some(1), DeadlineKind::Assignment),
            deadline("first", date(2026, 1, 11), Some(1), DeadlineKind::Assignment),
            deadline("second", date(2026, 1, 11), Some(1), DeadlineKind::Assignment),
        ];

        let load = engine.daily_load(&deadlines, today);
        let ids: Vec<&str> = load.deadlines.iter().map(|d| d.deadline_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "late"]);
        assert_eq!(load.deadlines_count, 3);
    }

    #[test]
    fn load_points_are_rounded_to_one_decimal() {
        let engine = ScoreEngine::default();
        let today = date(2026, 1, 10);
        // 10 × 1.0 × 14/9 = 15.555…
        let d = deadline("a", date(2026, 1, 18), Some(1), DeadlineKind::Assignment);
        let load = engine.daily_load(&[d], today);
        assert_eq!(load.deadlines[0].load_points, 15.6);
        assert_eq!(load.load_score, 16);
    }

    #[test]
    fn load_range_yields_consecutive_days() {
        let engine = ScoreEngine::default();
        let start = date(2026, 1, 30);
        let deadlines = vec![deadline("a", date(2026, 2, 2), Some(3), DeadlineKind::Project)];

        let series = engine.load_range(&deadlines, start, 5);
        assert_eq!(series.len(), 5);
        for (i, day) in series.iter().enumerate() {
            assert_eq!(day.date, start + Duration::days(i as i64));
        }
        assert!(engine.load_range(&deadlines, start, 0).is_empty());
    }

    #[test]
    fn class_average_handles_empty_population() {
        let engine = ScoreEngine::default();
        assert_eq!(engine.class_average(&[], date(2026, 1, 18)), 0);
    }

    #[test]
    fn class_average_is_rounded_mean() {
        let engine = ScoreEngine::default();
        let today = date(2026, 1, 18);
        let busy = vec![deadline("x", today, Some(5), DeadlineKind::Exam)];
        let light = vec![deadline("y", today, Some(1), DeadlineKind::Assignment)];
        let idle = Vec::new();

        // (100 + 30 + 0) / 3 = 43.3 → 43
        assert_eq!(engine.class_average(&[busy, light, idle], today), 43);
    }

    #[test]
    fn peak_days_filters_and_sorts_descending() {
        let make = |day: u32, score: u8| DailyLoad {
            load_score: score,
            risk_level: RiskLevel::from_score(score),
            ..DailyLoad::empty(date(2026, 1, day))
        };
        let series = vec![make(1, 61), make(2, 20), make(3, 90), make(4, 61), make(5, 60)];

        let peaks = peak_days(&series, DEFAULT_PEAK_THRESHOLD);
        let days: Vec<u32> = peaks.iter().map(|d| chrono::Datelike::day(&d.date)).collect();
        assert_eq!(days, vec![3, 1, 4, 5]);
    }
}
