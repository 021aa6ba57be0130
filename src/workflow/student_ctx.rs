//! 学生处理上下文
//!
//! 封装"我正在为哪位学生计算哪一天"这一信息

use chrono::NaiveDate;
use std::fmt::Display;

/// 学生处理上下文
#[derive(Debug, Clone)]
pub struct StudentCtx {
    /// 学生ID
    pub student_id: String,

    /// 学生在本周期中的序号（仅用于日志显示，从1开始）
    pub student_index: usize,

    /// 计算日期
    pub date: NaiveDate,
}

impl StudentCtx {
    pub fn new(student_id: String, student_index: usize, date: NaiveDate) -> Self {
        Self {
            student_id,
            student_index,
            date,
        }
    }
}

impl Display for StudentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[学生 #{} ID#{} 日期#{}]",
            self.student_index, self.student_id, self.date
        )
    }
}
