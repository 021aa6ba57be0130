use serde::{Deserialize, Serialize};

/// 学生
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Student {
    /// 显示用名称，没有名字时用 id
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// 课程
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    /// 任课教师
    #[serde(default)]
    pub professor_id: Option<String>,
    /// 选课学生
    #[serde(default)]
    pub student_ids: Vec<String>,
}

impl Course {
    pub fn enrolls(&self, student_id: &str) -> bool {
        self.student_ids.iter().any(|s| s == student_id)
    }
}
