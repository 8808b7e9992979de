//! Large Set 客户端抽象模块
//! 定义远程 Large Set 操作的统一接口，TCP 节点与内存存储都实现它

use crate::config::HarnessConfig;
use crate::error::Result;
use std::time::Duration;

/// 远程 Large Set 的完整定位：命名空间、set、记录 key 与 bin
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LsetTarget {
    pub namespace: String,
    pub set: String,
    pub key: String,
    pub bin: String,
}

impl LsetTarget {
    pub fn new(
        namespace: impl Into<String>,
        set: impl Into<String>,
        key: impl Into<String>,
        bin: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            key: key.into(),
            bin: bin.into(),
        }
    }

    /// 从配置中取出目标
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(&config.namespace, &config.set, &config.key, &config.bin)
    }

    /// 记录级别的 key，不含 bin
    pub fn record_key(&self) -> RecordKey {
        RecordKey {
            namespace: self.namespace.clone(),
            set: self.set.clone(),
            key: self.key.clone(),
        }
    }
}

/// 记录的唯一标识
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub namespace: String,
    pub set: String,
    pub key: String,
}

/// 每次调用都要带上的参数
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallOptions {
    /// 存储过程包名
    pub package: String,
    pub timeout: Duration,
}

impl CallOptions {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            package: config.package.clone(),
            timeout: config.timeout,
        }
    }
}

/// 创建 Large Set 时的参数，客户端不做解释，原样转发
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreateOptions {
    pub capacity: u32,
    pub record_ttl: Duration,
}

impl CreateOptions {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            capacity: config.capacity,
            record_ttl: config.record_ttl,
        }
    }
}

/// 查找调用本身成功时的结果
///
/// 调用失败走 `Err`，这里只区分“找到”和“不存在”。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(i64),
    NotFound,
}

impl SearchOutcome {
    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }
}

/// Large Set 操作trait，统一接口
///
/// 所有调用都在单线程上顺序执行，因此方法取 `&mut self`。
#[allow(async_fn_in_trait)]
pub trait LargeSetClient {
    /// 在目标 bin 上创建 Large Set
    async fn create(
        &mut self,
        target: &LsetTarget,
        create: &CreateOptions,
        call: &CallOptions,
    ) -> Result<()>;

    /// 向 Large Set 插入一个值
    async fn insert(&mut self, target: &LsetTarget, value: i64, call: &CallOptions) -> Result<()>;

    /// 精确查找一个值
    async fn search(
        &mut self,
        target: &LsetTarget,
        value: i64,
        call: &CallOptions,
    ) -> Result<SearchOutcome>;

    /// 获取客户端名称（用于日志）
    fn name(&self) -> &'static str;
}
