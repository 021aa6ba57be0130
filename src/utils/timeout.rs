//! 外部协作方调用的超时边界

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// 在 `secs` 秒内完成 `fut`，否则返回超时错误；`secs` 为 0 表示不限时
pub async fn bounded<T, F>(operation: &str, secs: u64, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    if secs == 0 {
        return fut.await;
    }

    match tokio::time::timeout(Duration::from_secs(secs), fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::timeout(operation, secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let result: AppResult<()> = bounded("slow", 1, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(AppError::Timeout { secs: 1, .. })));
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let result = bounded("fast", 1, async { Ok::<_, AppError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
