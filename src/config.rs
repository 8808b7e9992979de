//! 配置模块
//! 定义所有默认常量，以及在各阶段之间按引用传递的 `HarnessConfig`

use crate::error::{AppError, Result};
use clap::ValueEnum;
use std::time::Duration;

/// 默认节点地址
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// 默认节点端口
pub const DEFAULT_PORT: u16 = 3000;

/// 默认命名空间
pub const DEFAULT_NAMESPACE: &str = "test";

/// 默认 set 名称
pub const DEFAULT_SET: &str = "demo";

/// 每次远程调用的超时（毫秒）
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// 记录生存时间（秒），10 天
pub const DEFAULT_RECORD_TTL_SECS: u64 = 864_000;

/// 记录生存时间上限（秒），1000 年
pub const MAX_RECORD_TTL_SECS: u64 = 1000 * 365 * 24 * 60 * 60;

/// 服务端存储过程包名
pub const DEFAULT_PACKAGE: &str = "AsLSetStoneman";

/// 测试记录的 key
pub const DEFAULT_RECORD_KEY: &str = "User_111";

/// 存放 Large Set 的 bin 名称
pub const DEFAULT_BIN: &str = "urlid_stack";

/// 每个阶段的操作数量
pub const DEFAULT_ITERATIONS: usize = 15;

/// 插入与查找阶段共用的种子
pub const DEFAULT_SEED: u64 = 200;

/// 创建 Large Set 时的容量提示
pub const DEFAULT_CAPACITY: u32 = 32;

/// 生成值的上界（不含）
pub const VALUE_BOUND: i64 = 500;

/// 内存存储最多保留的记录数
pub const MEMORY_MAX_RECORDS: u64 = 10_000;

/// 内存模式下模拟的往返延迟范围（微秒）
pub const MIN_DELAY_US: u64 = 100;
pub const MAX_DELAY_US: u64 = 300;

/// 基准测试配置
pub mod bench {
    /// 采样数量
    pub const SAMPLE_SIZE: usize = 20;

    /// 测量时间（秒）
    pub const MEASUREMENT_TIME_SECS: u64 = 10;

    /// 生成器基准的序列长度
    pub const SEQUENCE_SIZE: usize = 10_000;

    /// 完整运行基准的操作数量
    pub const RUN_ITERATIONS: usize = 1_000;
}

/// 错误消息常量
pub mod messages {
    pub const RUNTIME_CREATE_FAILED: &str = "Failed to create Compio runtime";
    pub const CONNECT_FAILED: &str = "Could not connect to node";
    pub const SET_CREATE_FAILED: &str = "LSET create failed";
    pub const INSERT_FAILED: &str = "LSET insert failed";
    pub const SEARCH_FAILED: &str = "LSET search failed";
    pub const INVALID_CONFIG: &str = "Invalid harness configuration";
}

/// 单个阶段遇到逐项错误时的处理策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// 第一个错误即中止本阶段
    #[default]
    Abort,
    /// 记录错误并继续执行剩余操作
    Continue,
}

/// 测试工具的完整配置
///
/// 启动时构建一次，之后只读；连接句柄不放在这里，由 `Harness` 持有。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessConfig {
    pub host: String,
    pub port: u16,
    pub namespace: String,
    pub set: String,
    /// 每次远程调用的超时
    pub timeout: Duration,
    /// 记录生存时间，零表示永不过期
    pub record_ttl: Duration,
    pub verbose: bool,
    /// 存储过程包名，原样转发给服务端
    pub package: String,
    pub key: String,
    pub bin: String,
    pub iterations: usize,
    pub seed: u64,
    /// 容量提示，原样转发给服务端
    pub capacity: u32,
    pub insert_policy: FailurePolicy,
    pub search_policy: FailurePolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            namespace: DEFAULT_NAMESPACE.to_string(),
            set: DEFAULT_SET.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            record_ttl: Duration::from_secs(DEFAULT_RECORD_TTL_SECS),
            verbose: false,
            package: DEFAULT_PACKAGE.to_string(),
            key: DEFAULT_RECORD_KEY.to_string(),
            bin: DEFAULT_BIN.to_string(),
            iterations: DEFAULT_ITERATIONS,
            seed: DEFAULT_SEED,
            capacity: DEFAULT_CAPACITY,
            insert_policy: FailurePolicy::Abort,
            search_policy: FailurePolicy::Continue,
        }
    }
}

impl HarnessConfig {
    /// 校验配置
    ///
    /// 名称会被写进以制表符分隔的请求行，因此不能为空，也不能包含制表符或换行。
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("host", &self.host),
            ("namespace", &self.namespace),
            ("set", &self.set),
            ("package", &self.package),
            ("key", &self.key),
            ("bin", &self.bin),
        ];
        for (field, value) in names {
            if value.is_empty() {
                return Err(AppError::Config(format!("{} must not be empty", field)));
            }
            if value.contains(['\t', '\n', '\r']) {
                return Err(AppError::Config(format!(
                    "{} must not contain tab or newline characters: {:?}",
                    field, value
                )));
            }
        }
        if self.timeout.is_zero() {
            return Err(AppError::Config("timeout must be greater than zero".to_string()));
        }
        if self.record_ttl > Duration::from_secs(MAX_RECORD_TTL_SECS) {
            return Err(AppError::Config(format!(
                "record ttl must not exceed {} seconds, got {}",
                MAX_RECORD_TTL_SECS,
                self.record_ttl.as_secs()
            )));
        }
        Ok(())
    }

    /// 节点地址，形如 `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
