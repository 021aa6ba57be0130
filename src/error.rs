use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 花名册（学生 / 课程 / 截止日期）相关错误
    #[error("花名册错误: {0}")]
    Roster(#[from] RosterError),
    /// 快照存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 外部协作方调用超时
    #[error("操作超时: {operation} (超过 {secs} 秒)")]
    Timeout { operation: String, secs: u64 },
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 花名册相关错误
#[derive(Debug, Error)]
pub enum RosterError {
    /// 课程不存在
    #[error("课程不存在: {course_id}")]
    CourseNotFound { course_id: String },
    /// 学生不存在
    #[error("学生不存在: {student_id}")]
    StudentNotFound { student_id: String },
    /// 截止日期不存在
    #[error("截止日期不存在: {deadline_id}")]
    DeadlineNotFound { deadline_id: String },
    /// 读取花名册失败
    #[error("读取花名册失败 ({path}): {source}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 快照存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 读取失败
    #[error("读取快照失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入失败
    #[error("写入快照失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 序列化 / 反序列化失败
    #[error("快照序列化失败: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 请求构建失败
    #[error("LLM请求构建失败: {0}")]
    RequestBuildFailed(String),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 权重表不合法
    #[error("权重表不合法: {entry}")]
    InvalidWeightTable { entry: String },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败: {0}")]
    TomlParseFailed(#[source] toml::de::Error),
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Store(StoreError::Serialization(err))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::TomlParseFailed(err))
    }
}

impl From<async_openai::error::OpenAIError> for AppError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        AppError::Llm(LlmError::RequestBuildFailed(err.to_string()))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建课程不存在错误
    pub fn course_not_found(course_id: impl Into<String>) -> Self {
        AppError::Roster(RosterError::CourseNotFound {
            course_id: course_id.into(),
        })
    }

    /// 创建学生不存在错误
    pub fn student_not_found(student_id: impl Into<String>) -> Self {
        AppError::Roster(RosterError::StudentNotFound {
            student_id: student_id.into(),
        })
    }

    /// 创建环境变量解析错误
    pub fn env_var_parse_failed(
        var_name: impl Into<String>,
        value: impl Into<String>,
        expected_type: impl Into<String>,
    ) -> Self {
        AppError::Config(ConfigError::EnvVarParseFailed {
            var_name: var_name.into(),
            value: value.into(),
            expected_type: expected_type.into(),
        })
    }

    /// 创建配置文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Config(ConfigError::FileReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建快照写入错误
    pub fn store_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Store(StoreError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 创建超时错误
    pub fn timeout(operation: impl Into<String>, secs: u64) -> Self {
        AppError::Timeout {
            operation: operation.into(),
            secs,
        }
    }

    /// 是否属于"实体不存在"类错误（只放弃该实体的分析）
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::Roster(
                RosterError::CourseNotFound { .. }
                    | RosterError::StudentNotFound { .. }
                    | RosterError::DeadlineNotFound { .. }
            )
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
