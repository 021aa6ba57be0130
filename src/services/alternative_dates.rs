//! 备选日期搜索 - 业务能力层
//!
//! 在冲突日期前后 `window_days / 2` 天内逐日评估，
//! 适宜度 = max(0, 10 − 3×已有数量) + max(0, 10 − |偏移|)。

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::models::{AlternativeDate, Conflict, Deadline};

/// 默认搜索窗口（天）
pub const DEFAULT_WINDOW_DAYS: i64 = 14;
/// 返回的候选数量
pub const MAX_CANDIDATES: usize = 3;

/// 备选日期搜索器
#[derive(Debug, Clone, Copy)]
pub struct AlternativeDateResolver {
    window_days: i64,
}

impl Default for AlternativeDateResolver {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_DAYS)
    }
}

impl AlternativeDateResolver {
    /// 负数窗口按 0 处理
    pub fn new(window_days: i64) -> Self {
        Self {
            window_days: window_days.max(0),
        }
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    /// 评估窗口内除冲突日外的每一天，按偏移升序返回
    pub fn evaluate_window(
        &self,
        conflict: &Conflict,
        all_deadlines: &[Deadline],
    ) -> Vec<AlternativeDate> {
        let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
        for deadline in all_deadlines {
            *per_day.entry(deadline.due_date()).or_default() += 1;
        }

        let half = self.window_days / 2;
        (-half..=half)
            .filter(|offset| *offset != 0)
            .map(|offset| {
                let date = conflict.date + Duration::days(offset);
                let existing = per_day.get(&date).copied().unwrap_or(0);
                AlternativeDate {
                    date,
                    days_from_conflict: offset,
                    existing_deadlines: existing,
                    suitability_score: suitability(existing, offset.abs()),
                }
            })
            .collect()
    }

    /// 为冲突给出最多 3 个备选日期
    ///
    /// 排序：适宜度降序，|偏移| 升序，偏移升序（提前优先）
    pub fn suggest_alternatives(
        &self,
        conflict: &Conflict,
        all_deadlines: &[Deadline],
    ) -> Vec<AlternativeDate> {
        let mut candidates = self.evaluate_window(conflict, all_deadlines);
        candidates.sort_by(|a, b| {
            b.suitability_score
                .cmp(&a.suitability_score)
                .then_with(|| a.days_from_conflict.abs().cmp(&b.days_from_conflict.abs()))
                .then_with(|| a.days_from_conflict.cmp(&b.days_from_conflict))
        });
        candidates.truncate(MAX_CANDIDATES);
        candidates
    }
}

/// 适宜度评分
pub fn suitability(existing_deadlines: usize, days_away: i64) -> i64 {
    let existing = i64::try_from(existing_deadlines).unwrap_or(i64::MAX / 3);
    let load_score = (10 - existing.saturating_mul(3)).max(0);
    let proximity_score = (10 - days_away).max(0);
    load_score + proximity_score
}
