//! 测试流程模块
//! 连接引导 → 创建 bin → 插入阶段 → 查找阶段，严格顺序执行

use crate::client::{LargeSetClient, LsetTarget};
use crate::config::{HarnessConfig, messages};
use crate::error::{AppError, ErrorContext, Result};
use crate::runner::{PhaseReport, WorkloadRunner};
use crate::tcp::TcpClient;
use tracing::{debug, info};

/// 一次运行所处的状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HarnessState {
    Unconfigured,
    Connected,
    SetCreated,
    Inserted { done: usize, total: usize },
    Verified { done: usize, total: usize },
    Done,
    Failed,
}

/// 一次运行的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub insert: PhaseReport,
    /// 插入阶段中止时不会执行查找阶段
    pub search: Option<PhaseReport>,
    pub state: HarnessState,
}

impl RunReport {
    /// 汇总为最终状态，两个阶段都完全成功才返回 `Ok`
    pub fn status(&self) -> Result<()> {
        if !self.insert.is_clean() {
            return Err(AppError::InsertPhase(format!(
                "{} of {} inserted, {} errors{}",
                self.insert.success,
                self.insert.planned,
                self.insert.errors,
                if self.insert.aborted { ", aborted" } else { "" }
            )));
        }
        match self.search {
            Some(search) if search.is_clean() => Ok(()),
            Some(search) => Err(AppError::SearchPhase(format!(
                "{} of {} found, {} not found, {} errors",
                search.success, search.planned, search.not_found, search.errors
            ))),
            None => Err(AppError::SearchPhase("search phase did not run".to_string())),
        }
    }
}

/// 持有配置与连接句柄，驱动整个流程
pub struct Harness<C> {
    config: HarnessConfig,
    client: C,
    target: LsetTarget,
    state: HarnessState,
}

impl Harness<TcpClient> {
    /// 校验配置并连接节点
    pub async fn connect(config: HarnessConfig) -> Result<Self> {
        config.validate().with_context(messages::INVALID_CONFIG)?;
        info!(
            host = %config.host,
            port = config.port,
            namespace = %config.namespace,
            set = %config.set,
            "startup"
        );
        let client = TcpClient::connect(&config.host, config.port, config.timeout)
            .await
            .with_context(messages::CONNECT_FAILED)?;
        Ok(Self::from_parts(config, client))
    }
}

impl<C: LargeSetClient> Harness<C> {
    /// 使用已建立的客户端
    pub fn with_client(config: HarnessConfig, client: C) -> Result<Self> {
        config.validate().with_context(messages::INVALID_CONFIG)?;
        Ok(Self::from_parts(config, client))
    }

    /// 调用方已校验过配置
    fn from_parts(config: HarnessConfig, client: C) -> Self {
        let target = LsetTarget::from_config(&config);
        let mut harness = Self {
            config,
            client,
            target,
            state: HarnessState::Unconfigured,
        };
        harness.advance(HarnessState::Connected);
        harness
    }

    pub fn state(&self) -> HarnessState {
        self.state
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    fn advance(&mut self, next: HarnessState) {
        debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    /// 执行完整流程
    ///
    /// 只有创建 bin 失败才返回 `Err`；逐项失败体现在 `RunReport` 中。
    pub async fn run(&mut self) -> Result<RunReport> {
        if self.state != HarnessState::Connected {
            return Err(AppError::State(format!(
                "run() requires Connected, harness is {:?}",
                self.state
            )));
        }

        if let Err(e) =
            WorkloadRunner::create_set(&mut self.client, &self.config, &self.target).await
        {
            self.advance(HarnessState::Failed);
            return Err(e);
        }
        self.advance(HarnessState::SetCreated);

        let insert = WorkloadRunner::insert_values(&mut self.client, &self.config, &self.target).await;
        if insert.aborted {
            self.advance(HarnessState::Failed);
            return Ok(RunReport {
                insert,
                search: None,
                state: self.state,
            });
        }
        self.advance(HarnessState::Inserted {
            done: insert.success,
            total: insert.planned,
        });

        let search = self.verify().await?;
        self.advance(HarnessState::Done);
        Ok(RunReport {
            insert,
            search: Some(search),
            state: self.state,
        })
    }

    /// 只执行查找阶段，可以对同一个 bin 重复调用
    pub async fn verify(&mut self) -> Result<PhaseReport> {
        match self.state {
            HarnessState::Inserted { .. } | HarnessState::Verified { .. } | HarnessState::Done => {}
            other => {
                return Err(AppError::State(format!(
                    "verify() requires a completed insert phase, harness is {:?}",
                    other
                )));
            }
        }
        let search = WorkloadRunner::run_search(&mut self.client, &self.config, &self.target).await;
        self.advance(HarnessState::Verified {
            done: search.success,
            total: search.planned,
        });
        Ok(search)
    }
}
