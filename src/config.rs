use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ConfigError};
use crate::models::DeadlineKind;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时处理的学生数量
    pub max_concurrent_students: usize,
    /// 花名册 TOML 文件
    pub roster_file: String,
    /// 每日负荷快照存放文件
    pub snapshot_file: String,
    /// 权重表文件（可选，缺省使用内置权重）
    pub weights_file: Option<String>,
    /// 学生提示使用的预测天数
    pub forecast_days: usize,
    /// 班级负荷序列天数
    pub class_forecast_days: usize,
    /// 备选日期搜索窗口（天）
    pub alternative_window_days: i64,
    /// 高峰日阈值
    pub peak_threshold: u8,
    /// 外部协作方调用超时（秒）
    pub collaborator_timeout_secs: u64,
    /// 批处理周期日志文件
    pub cycle_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_students: 8,
            roster_file: "roster.toml".to_string(),
            snapshot_file: "snapshots.json".to_string(),
            weights_file: None,
            forecast_days: 7,
            class_forecast_days: 7,
            alternative_window_days: 14,
            peak_threshold: 60,
            collaborator_timeout_secs: 30,
            cycle_log_file: "cycle_log.txt".to_string(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量读取配置，未设置的项使用默认值
    ///
    /// 设置了但无法解析的数值项返回 `ConfigError::EnvVarParseFailed`。
    pub fn from_env() -> AppResult<Self> {
        let default = Self::default();
        Ok(Self {
            max_concurrent_students: env_or("MAX_CONCURRENT_STUDENTS", default.max_concurrent_students)?,
            roster_file: std::env::var("ROSTER_FILE").unwrap_or(default.roster_file),
            snapshot_file: std::env::var("SNAPSHOT_FILE").unwrap_or(default.snapshot_file),
            weights_file: std::env::var("WEIGHTS_FILE").ok().or(default.weights_file),
            forecast_days: env_or("FORECAST_DAYS", default.forecast_days)?,
            class_forecast_days: env_or("CLASS_FORECAST_DAYS", default.class_forecast_days)?,
            alternative_window_days: env_or("ALTERNATIVE_WINDOW_DAYS", default.alternative_window_days)?,
            peak_threshold: env_or("PEAK_THRESHOLD", default.peak_threshold)?,
            collaborator_timeout_secs: env_or("COLLABORATOR_TIMEOUT_SECS", default.collaborator_timeout_secs)?,
            cycle_log_file: std::env::var("CYCLE_LOG_FILE").unwrap_or(default.cycle_log_file),
            verbose_logging: env_or("VERBOSE_LOGGING", default.verbose_logging)?,
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
        })
    }

    /// 是否配置了 LLM（未配置时使用日志通知）
    pub fn llm_enabled(&self) -> bool {
        !self.llm_api_key.trim().is_empty()
    }

    /// 加载权重表：配置了文件则读取文件，否则使用内置默认值
    pub fn load_weights(&self) -> Result<WeightTable> {
        match &self.weights_file {
            Some(path) => WeightTable::from_toml_file(Path::new(path))
                .with_context(|| format!("无法加载权重表: {}", path)),
            None => Ok(WeightTable::default()),
        }
    }
}

fn env_or<T: FromStr>(var_name: &str, default: T) -> AppResult<T> {
    parse_env_value(var_name, std::env::var(var_name).ok(), default)
}

/// 解析环境变量原值；未设置或为空时使用默认值
fn parse_env_value<T: FromStr>(var_name: &str, raw: Option<String>, default: T) -> AppResult<T> {
    match raw {
        Some(value) if !value.trim().is_empty() => value.trim().parse().map_err(|_| {
            AppError::env_var_parse_failed(var_name, value.clone(), std::any::type_name::<T>())
        }),
        _ => Ok(default),
    }
}

/// 评分权重表
///
/// 作为不可变配置在构造 `ScoreEngine` 时传入。
/// 表中缺失的难度或类型由评分引擎使用回退值（难度 20，类型 1.0）。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    /// 难度 1..=5 对应的基础分，下标 0 对应难度 1
    pub difficulty: Vec<f64>,
    /// 各类型倍率
    #[serde(default)]
    pub kind: KindWeights,
}

/// 类型倍率，未填写的类型按 1.0 计算
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KindWeights {
    pub assignment: Option<f64>,
    pub project: Option<f64>,
    pub exam: Option<f64>,
    pub quiz: Option<f64>,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            difficulty: vec![10.0, 15.0, 20.0, 25.0, 30.0],
            // quiz 没有单独的倍率
            kind: KindWeights {
                assignment: Some(1.0),
                project: Some(1.5),
                exam: Some(2.0),
                quiz: None,
            },
        }
    }
}

impl WeightTable {
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let table: WeightTable = toml::from_str(content)?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    /// 难度对应的基础分；难度缺失或越界时返回 `None`
    pub fn difficulty_weight(&self, difficulty: Option<u8>) -> Option<f64> {
        let d = difficulty?;
        if d == 0 {
            return None;
        }
        self.difficulty.get(usize::from(d) - 1).copied()
    }

    /// 类型对应的倍率；类型未知或表中无此项时返回 `None`
    pub fn kind_weight(&self, kind: &DeadlineKind) -> Option<f64> {
        match kind {
            DeadlineKind::Assignment => self.kind.assignment,
            DeadlineKind::Project => self.kind.project,
            DeadlineKind::Exam => self.kind.exam,
            DeadlineKind::Quiz => self.kind.quiz,
            DeadlineKind::Unknown => None,
        }
    }

    /// 所有权重必须为有限正数
    pub fn validate(&self) -> AppResult<()> {
        if self.difficulty.len() != 5 {
            return Err(AppError::Config(ConfigError::InvalidWeightTable {
                entry: format!("difficulty 需要 5 项，实际 {} 项", self.difficulty.len()),
            }));
        }

        let bad_difficulty = self
            .difficulty
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w <= 0.0)
            .map(|(i, w)| format!("difficulty {} = {}", i + 1, w));

        let kinds = [
            ("assignment", self.kind.assignment),
            ("project", self.kind.project),
            ("exam", self.kind.exam),
            ("quiz", self.kind.quiz),
        ];
        let bad_kind = kinds
            .iter()
            .filter_map(|(name, w)| w.map(|w| (name, w)))
            .find(|(_, w)| !w.is_finite() || *w <= 0.0)
            .map(|(name, w)| format!("kind {} = {}", name, w));

        match bad_difficulty.or(bad_kind) {
            Some(entry) => Err(AppError::Config(ConfigError::InvalidWeightTable { entry })),
            None => Ok(()),
        }
    }
}
