//! 阶段运行模块
//! 插入阶段与查找阶段的执行循环，以及每个阶段的统计结果

use crate::client::{CallOptions, CreateOptions, LargeSetClient, LsetTarget, SearchOutcome};
use crate::config::{FailurePolicy, HarnessConfig, messages};
use crate::error::{AppError, Result};
use crate::workload::ValueSequence;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 单个阶段的统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseReport {
    /// 计划执行的操作数
    pub planned: usize,
    pub success: usize,
    /// 调用成功但值不存在（只有查找阶段会出现）
    pub not_found: usize,
    pub errors: usize,
    /// 是否因 `FailurePolicy::Abort` 提前结束
    pub aborted: bool,
}

impl PhaseReport {
    pub fn new(planned: usize) -> Self {
        Self {
            planned,
            ..Self::default()
        }
    }

    /// 实际发起的操作数
    #[inline]
    pub fn attempted(&self) -> usize {
        self.success + self.not_found + self.errors
    }

    /// 全部计划操作都成功
    #[inline]
    pub fn is_clean(&self) -> bool {
        !self.aborted && self.success == self.planned
    }

    /// 计算成功率（百分比）
    #[inline]
    pub fn success_rate(&self) -> f64 {
        let total = self.attempted();
        if total == 0 {
            0.0
        } else {
            self.success as f64 / total as f64 * 100.0
        }
    }
}

/// 通用阶段运行器
pub struct WorkloadRunner;

impl WorkloadRunner {
    /// 用单次调用超时包住一次远程调用
    async fn bounded<T, F>(limit: Duration, op: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match compio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!("{} exceeded {:?}", op, limit))),
        }
    }

    /// 创建 Large Set bin，失败即为致命错误
    pub async fn create_set<C: LargeSetClient>(
        client: &mut C,
        config: &HarnessConfig,
        target: &LsetTarget,
    ) -> Result<()> {
        let create = CreateOptions::from_config(config);
        let call = CallOptions::from_config(config);
        let created = Self::bounded(
            config.timeout,
            "create",
            client.create(target, &create, &call),
        )
        .await;
        if let Err(e) = created {
            error!(
                client = client.name(),
                bin = %target.bin,
                error = %e,
                "{}",
                messages::SET_CREATE_FAILED
            );
            return Err(AppError::SetCreate(format!(
                "{}: {}",
                messages::SET_CREATE_FAILED,
                e
            )));
        }
        info!(
            client = client.name(),
            key = %target.key,
            bin = %target.bin,
            capacity = create.capacity,
            "LSET created"
        );
        Ok(())
    }

    /// 按序列逐个插入，遇错的处理取决于 `config.insert_policy`
    pub async fn insert_values<C: LargeSetClient>(
        client: &mut C,
        config: &HarnessConfig,
        target: &LsetTarget,
    ) -> PhaseReport {
        let call = CallOptions::from_config(config);
        let mut report = PhaseReport::new(config.iterations);

        info!(
            iterations = config.iterations,
            seed = config.seed,
            policy = ?config.insert_policy,
            "insert phase started"
        );
        let values = ValueSequence::new(config.seed).take(config.iterations);
        for (i, value) in values.enumerate() {
            debug!(i, value, "pushing");
            match Self::bounded(config.timeout, "insert", client.insert(target, value, &call)).await
            {
                Ok(()) => report.success += 1,
                Err(e) => {
                    report.errors += 1;
                    error!(i, value, error = %e, "{}", messages::INSERT_FAILED);
                    if config.insert_policy == FailurePolicy::Abort {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        info!(
            success = report.success,
            errors = report.errors,
            aborted = report.aborted,
            "[RESULTS] insert phase"
        );
        report
    }

    /// 创建 bin 后执行插入阶段
    pub async fn run_insert<C: LargeSetClient>(
        client: &mut C,
        config: &HarnessConfig,
        target: &LsetTarget,
    ) -> Result<PhaseReport> {
        Self::create_set(client, config, target).await?;
        Ok(Self::insert_values(client, config, target).await)
    }

    /// 用相同种子重新生成序列并逐个精确查找
    ///
    /// 找到且值一致计入 `success`，调用成功但不存在计入 `not_found`，
    /// 调用失败或返回了别的值计入 `errors`。
    pub async fn run_search<C: LargeSetClient>(
        client: &mut C,
        config: &HarnessConfig,
        target: &LsetTarget,
    ) -> PhaseReport {
        let call = CallOptions::from_config(config);
        let mut report = PhaseReport::new(config.iterations);

        info!(
            iterations = config.iterations,
            seed = config.seed,
            policy = ?config.search_policy,
            "search phase started"
        );
        let values = ValueSequence::new(config.seed).take(config.iterations);
        for (i, value) in values.enumerate() {
            debug!(i, value, "searching");
            let failed = match Self::bounded(
                config.timeout,
                "search",
                client.search(target, value, &call),
            )
            .await
            {
                Ok(SearchOutcome::Found(found)) if found == value => {
                    debug!(i, value, found, "LSET search success");
                    report.success += 1;
                    false
                }
                Ok(SearchOutcome::Found(found)) => {
                    let e = AppError::Protocol(format!(
                        "searched for {}, node returned {}",
                        value, found
                    ));
                    error!(i, value, found, error = %e, "{}", messages::SEARCH_FAILED);
                    report.errors += 1;
                    true
                }
                Ok(SearchOutcome::NotFound) => {
                    warn!(i, value, "LSET search: value not found");
                    report.not_found += 1;
                    true
                }
                Err(e) => {
                    error!(i, value, error = %e, "{}", messages::SEARCH_FAILED);
                    report.errors += 1;
                    true
                }
            };
            if failed && config.search_policy == FailurePolicy::Abort {
                report.aborted = true;
                break;
            }
        }

        info!(
            success = report.success,
            not_found = report.not_found,
            errors = report.errors,
            "[RESULTS] search phase"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 总是返回相邻值的客户端
    struct OffByOne;

    impl LargeSetClient for OffByOne {
        async fn create(
            &mut self,
            _target: &LsetTarget,
            _create: &CreateOptions,
            _call: &CallOptions,
        ) -> Result<()> {
            Ok(())
        }

        async fn insert(
            &mut self,
            _target: &LsetTarget,
            _value: i64,
            _call: &CallOptions,
        ) -> Result<()> {
            Ok(())
        }

        async fn search(
            &mut self,
            _target: &LsetTarget,
            value: i64,
            _call: &CallOptions,
        ) -> Result<SearchOutcome> {
            Ok(SearchOutcome::Found(value + 1))
        }

        fn name(&self) -> &'static str {
            "off-by-one"
        }
    }

    fn search_with(policy: FailurePolicy) -> PhaseReport {
        let config = HarnessConfig {
            search_policy: policy,
            ..HarnessConfig::default()
        };
        let target = LsetTarget::from_config(&config);
        let runtime = compio::runtime::Runtime::new().expect("Failed to create Compio runtime");
        runtime.block_on(WorkloadRunner::run_search(&mut OffByOne, &config, &target))
    }

    #[test]
    fn wrong_value_is_not_a_hit() {
        let report = search_with(FailurePolicy::Continue);
        assert_eq!(report.success, 0);
        assert_eq!(report.not_found, 0);
        assert_eq!(report.errors, 15);
        assert!(!report.aborted);

        let report = search_with(FailurePolicy::Abort);
        assert_eq!(report.success, 0);
        assert_eq!(report.errors, 1);
        assert!(report.aborted);
    }

    #[test]
    fn report_accounting() {
        let report = PhaseReport {
            planned: 4,
            success: 3,
            not_found: 1,
            errors: 0,
            aborted: false,
        };
        assert_eq!(report.attempted(), 4);
        assert!(!report.is_clean());
        assert_eq!(report.success_rate(), 75.0);

        let empty = PhaseReport::new(0);
        assert!(empty.is_clean());
        assert_eq!(empty.success_rate(), 0.0);
    }

    #[test]
    fn aborted_report_is_never_clean() {
        let report = PhaseReport {
            planned: 1,
            success: 1,
            aborted: true,
            ..PhaseReport::default()
        };
        assert!(!report.is_clean());
    }
}
