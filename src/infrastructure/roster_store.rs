//! 花名册存储 - 基础设施层
//!
//! 学生、课程、截止日期的读取边界。课程引用在这里一次性解析成
//! `CourseRef`，上层逻辑只按 id 比较，不再判断数据形态。

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use futures::future::try_join_all;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{AppError, AppResult, RosterError};
use crate::models::{load_roster_file, Course, Deadline, DeadlineRecord, RosterFile, Student};

/// 花名册读取接口
#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn list_students(&self) -> AppResult<Vec<Student>>;

    async fn get_student(&self, student_id: &str) -> AppResult<Option<Student>>;

    async fn get_course(&self, course_id: &str) -> AppResult<Option<Course>>;

    /// 学生选修的所有课程
    async fn list_courses_for(&self, student_id: &str) -> AppResult<Vec<Course>>;

    /// 教师任教的所有课程
    async fn list_courses_owned_by(&self, professor_id: &str) -> AppResult<Vec<Course>>;

    /// 指定课程的所有截止日期
    async fn list_deadlines_for_courses(&self, course_ids: &[String]) -> AppResult<Vec<Deadline>>;

    async fn get_deadline(&self, deadline_id: &str) -> AppResult<Option<Deadline>>;

    /// 新建或替换截止日期
    async fn insert_deadline(&self, deadline: Deadline) -> AppResult<()>;

    /// 一跳范围：这些学生选修的全部课程（按 id 去重、排序）
    async fn courses_for_students(&self, student_ids: &[String]) -> AppResult<Vec<Course>> {
        let lists = try_join_all(student_ids.iter().map(|id| self.list_courses_for(id))).await?;

        let mut unique: BTreeMap<String, Course> = BTreeMap::new();
        for course in lists.into_iter().flatten() {
            unique.entry(course.id.clone()).or_insert(course);
        }
        Ok(unique.into_values().collect())
    }
}

#[derive(Debug, Default)]
struct RosterState {
    students: Vec<Student>,
    courses: Vec<Course>,
    deadlines: Vec<DeadlineRecord>,
}

impl RosterState {
    fn course_name(&self, course_id: &str) -> Option<&str> {
        self.courses
            .iter()
            .find(|c| c.id == course_id)
            .map(|c| c.name.as_str())
    }

    fn resolve(&self, record: &DeadlineRecord) -> Deadline {
        let name = self.course_name(&record.course_id);
        record.clone().into_deadline(name)
    }
}

/// 内存花名册（可从 TOML 文件加载）
#[derive(Debug, Default)]
pub struct MemoryRoster {
    state: RwLock<RosterState>,
}

impl MemoryRoster {
    pub fn new(roster: RosterFile) -> Self {
        Self {
            state: RwLock::new(RosterState {
                students: roster.students,
                courses: roster.courses,
                deadlines: roster.deadlines,
            }),
        }
    }

    /// 从 TOML 文件加载
    pub async fn load(path: &Path) -> AppResult<Self> {
        let roster = load_roster_file(path).await.map_err(|e| {
            AppError::Roster(RosterError::LoadFailed {
                path: path.display().to_string(),
                source: e.into(),
            })
        })?;
        Ok(Self::new(roster))
    }

    /// 新增或替换课程
    pub async fn upsert_course(&self, course: Course) {
        let mut state = self.state.write().await;
        match state.courses.iter_mut().find(|c| c.id == course.id) {
            Some(existing) => *existing = course,
            None => state.courses.push(course),
        }
    }
}

#[async_trait]
impl RosterStore for MemoryRoster {
    async fn list_students(&self) -> AppResult<Vec<Student>> {
        Ok(self.state.read().await.students.clone())
    }

    async fn get_student(&self, student_id: &str) -> AppResult<Option<Student>> {
        let state = self.state.read().await;
        Ok(state.students.iter().find(|s| s.id == student_id).cloned())
    }

    async fn get_course(&self, course_id: &str) -> AppResult<Option<Course>> {
        let state = self.state.read().await;
        Ok(state.courses.iter().find(|c| c.id == course_id).cloned())
    }

    async fn list_courses_for(&self, student_id: &str) -> AppResult<Vec<Course>> {
        let state = self.state.read().await;
        Ok(state
            .courses
            .iter()
            .filter(|c| c.enrolls(student_id))
            .cloned()
            .collect())
    }

    async fn list_courses_owned_by(&self, professor_id: &str) -> AppResult<Vec<Course>> {
        let state = self.state.read().await;
        Ok(state
            .courses
            .iter()
            .filter(|c| c.professor_id.as_deref() == Some(professor_id))
            .cloned()
            .collect())
    }

    async fn list_deadlines_for_courses(&self, course_ids: &[String]) -> AppResult<Vec<Deadline>> {
        let state = self.state.read().await;
        let deadlines: Vec<Deadline> = state
            .deadlines
            .iter()
            .filter(|d| course_ids.iter().any(|id| *id == d.course_id))
            .map(|d| state.resolve(d))
            .collect();

        debug!(
            "读取截止日期: {} 门课程, {} 个截止日期",
            course_ids.len(),
            deadlines.len()
        );
        Ok(deadlines)
    }

    async fn get_deadline(&self, deadline_id: &str) -> AppResult<Option<Deadline>> {
        let state = self.state.read().await;
        Ok(state
            .deadlines
            .iter()
            .find(|d| d.id == deadline_id)
            .map(|d| state.resolve(d)))
    }

    async fn insert_deadline(&self, deadline: Deadline) -> AppResult<()> {
        let record = DeadlineRecord::from_deadline(&deadline);
        let mut state = self.state.write().await;
        match state.deadlines.iter_mut().find(|d| d.id == record.id) {
            Some(existing) => *existing = record,
            None => state.deadlines.push(record),
        }
        Ok(())
    }
}
