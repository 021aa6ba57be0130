//! 快照存储 - 基础设施层
//!
//! 每日负荷快照按 (student_id, date) 幂等写入，重复执行不会产生重复记录。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{AppError, AppResult, StoreError};
use crate::models::DailyLoadSnapshot;

type SnapshotKey = (String, NaiveDate);

/// 快照存储接口
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// 按 (student_id, date) 插入或覆盖
    async fn upsert(&self, snapshot: DailyLoadSnapshot) -> AppResult<()>;

    async fn get(&self, student_id: &str, date: NaiveDate) -> AppResult<Option<DailyLoadSnapshot>>;

    /// 某一天的全部快照，按学生 id 排序
    async fn list_for_date(&self, date: NaiveDate) -> AppResult<Vec<DailyLoadSnapshot>>;
}

fn for_date(map: &BTreeMap<SnapshotKey, DailyLoadSnapshot>, date: NaiveDate) -> Vec<DailyLoadSnapshot> {
    map.values().filter(|s| s.date == date).cloned().collect()
}

/// 内存快照存储
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<BTreeMap<SnapshotKey, DailyLoadSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn upsert(&self, snapshot: DailyLoadSnapshot) -> AppResult<()> {
        self.snapshots.write().await.insert(snapshot.key(), snapshot);
        Ok(())
    }

    async fn get(&self, student_id: &str, date: NaiveDate) -> AppResult<Option<DailyLoadSnapshot>> {
        let key = (student_id.to_string(), date);
        Ok(self.snapshots.read().await.get(&key).cloned())
    }

    async fn list_for_date(&self, date: NaiveDate) -> AppResult<Vec<DailyLoadSnapshot>> {
        Ok(for_date(&*self.snapshots.read().await, date))
    }
}

/// JSON 文件快照存储
///
/// 每次写入都在锁内把完整内容写到临时文件后再替换，保证文件始终完整。
#[derive(Debug)]
pub struct JsonFileSnapshotStore {
    path: PathBuf,
    snapshots: Mutex<BTreeMap<SnapshotKey, DailyLoadSnapshot>>,
}

impl JsonFileSnapshotStore {
    /// 打开存储文件，不存在时从空开始
    ///
    /// 无法判断文件是否存在时返回错误，避免用空内容覆盖已有文件。
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut snapshots = BTreeMap::new();

        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| read_failed(&path, e))?;
        if exists {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| read_failed(&path, e))?;
            if !content.trim().is_empty() {
                let list: Vec<DailyLoadSnapshot> = serde_json::from_str(&content)?;
                for snapshot in list {
                    snapshots.insert(snapshot.key(), snapshot);
                }
            }
        }

        debug!("快照文件已打开: {} ({} 条)", path.display(), snapshots.len());

        Ok(Self {
            path,
            snapshots: Mutex::new(snapshots),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, snapshots: &BTreeMap<SnapshotKey, DailyLoadSnapshot>) -> AppResult<()> {
        let list: Vec<&DailyLoadSnapshot> = snapshots.values().collect();
        let content = serde_json::to_string_pretty(&list)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| AppError::store_write_failed(tmp.display().to_string(), e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AppError::store_write_failed(self.path.display().to_string(), e))?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn upsert(&self, snapshot: DailyLoadSnapshot) -> AppResult<()> {
        let mut snapshots = self.snapshots.lock().await;

        // 写入成功后才更新内存
        let mut next = snapshots.clone();
        next.insert(snapshot.key(), snapshot);
        self.persist(&next).await?;
        *snapshots = next;
        Ok(())
    }

    async fn get(&self, student_id: &str, date: NaiveDate) -> AppResult<Option<DailyLoadSnapshot>> {
        let key = (student_id.to_string(), date);
        Ok(self.snapshots.lock().await.get(&key).cloned())
    }

    async fn list_for_date(&self, date: NaiveDate) -> AppResult<Vec<DailyLoadSnapshot>> {
        Ok(for_date(&*self.snapshots.lock().await, date))
    }
}

fn read_failed(path: &Path, source: std::io::Error) -> AppError {
    AppError::Store(StoreError::ReadFailed {
        path: path.display().to_string(),
        source: Box::new(source),
    })
}
