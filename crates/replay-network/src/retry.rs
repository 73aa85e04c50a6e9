//! 외부 호출 재시도 정책.
//!
//! 협력자 경계에서만 쓰인다. 통합 엔진은 재시도 중간 상태를 보지 않는다.
//! 대기 시간: `initial × 2^attempt` (+ 0~1초 지터), 상한 `max_backoff`.
//! 서버가 `Retry-After`를 주면 그 값을 우선한다.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use replay_core::config::RetryConfig;
use replay_core::error::CoreError;

/// 재시도 정책
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 총 시도 횟수 (첫 시도 포함, 최소 1)
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_secs(config.max_backoff_secs),
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// 재시도 없이 한 번만 시도
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// `attempt`번째(0부터) 실패 뒤 대기 시간
    pub fn delay_for(&self, attempt: u32, error: &CoreError) -> Duration {
        if let CoreError::RateLimit { retry_after_secs } = error {
            if *retry_after_secs > 0 {
                return Duration::from_secs(*retry_after_secs).min(self.max_backoff);
            }
        }

        let factor = 2u32.saturating_pow(attempt);
        let mut delay = self.initial_backoff.saturating_mul(factor);
        if self.jitter {
            delay += Duration::from_secs_f64(rand::random::<f64>());
        }
        delay.min(self.max_backoff)
    }

    /// 일시적 에러(네트워크, 429, 502/503/504)만 재시도하며 작업을 실행한다
    pub async fn execute<F, Fut, T>(&self, label: &str, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(label, attempts = attempt + 1, "재시도 후 성공");
                    }
                    return Ok(result);
                }
                Err(e) => {
                    if !e.is_transient() || attempt + 1 >= self.max_attempts {
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt, &e);
                    warn!(
                        label,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "요청 실패, 재시도 예정"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
            jitter: false,
        }
    }

    #[test]
    fn exponential_schedule_without_jitter() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            jitter: false,
        };
        let err = CoreError::Network("x".to_string());
        let delays: Vec<u64> = (0..6).map(|a| policy.delay_for(a, &err).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30]);
    }

    #[test]
    fn jitter_stays_within_one_second() {
        let policy = RetryPolicy {
            jitter: true,
            ..RetryPolicy::default()
        };
        let err = CoreError::ServiceUnavailable("x".to_string());
        for _ in 0..20 {
            let d = policy.delay_for(1, &err);
            assert!(d >= Duration::from_secs(2) && d < Duration::from_secs(3), "{d:?}");
        }
    }

    #[test]
    fn retry_after_takes_precedence() {
        let policy = RetryPolicy::default();
        let err = CoreError::RateLimit {
            retry_after_secs: 7,
        };
        assert_eq!(policy.delay_for(0, &err), Duration::from_secs(7));

        let huge = CoreError::RateLimit {
            retry_after_secs: 3600,
        };
        assert_eq!(policy.delay_for(0, &huge), policy.max_backoff);
    }

    #[test]
    fn from_config_never_zero_attempts() {
        let config = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert_eq!(RetryPolicy::from(&config).max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, 5);
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(5)
            .execute("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(CoreError::RateLimit {
                        retry_after_secs: 0,
                    })
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(3)
            .execute("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::ServiceUnavailable("down".to_string()))
            })
            .await;
        assert!(matches!(result, Err(CoreError::ServiceUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(5)
            .execute("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::Config("bad key".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
