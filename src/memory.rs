//! 内存存储模块
//! 进程内的 Large Set 参考实现：`-m` 模式与测试都用它代替真实节点

use crate::client::{CallOptions, CreateOptions, LargeSetClient, LsetTarget, RecordKey, SearchOutcome};
use crate::config::*;
use crate::error::{AppError, Result};
use crate::protocol::{Request, Response};
use hashlink::LinkedHashSet;
use mini_moka::unsync::Cache as MokaCache;
use rand::prelude::*;
use rand::rngs::SmallRng;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::rc::Rc;
use std::time::Duration;

/// 内存存储返回的错误码
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreError {
    RecordNotFound,
    BinNotFound,
    BinExists,
    PackageNotFound,
    /// 故障注入产生的错误
    Injected,
}

impl StoreError {
    pub const fn code(self) -> i32 {
        match self {
            StoreError::RecordNotFound => 2,
            StoreError::BinNotFound => 17,
            StoreError::BinExists => 1410,
            StoreError::PackageNotFound => 1301,
            StoreError::Injected => 1499,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            StoreError::RecordNotFound => "record not found",
            StoreError::BinNotFound => "LSET bin not found",
            StoreError::BinExists => "LSET bin already exists",
            StoreError::PackageNotFound => "UDF package not registered",
            StoreError::Injected => "injected failure",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Remote {
            code: err.code(),
            message: err.message().to_string(),
        }
    }
}

/// 一个 Large Set bin，保持插入顺序
#[derive(Debug)]
struct LargeSet {
    items: LinkedHashSet<i64>,
}

#[derive(Debug, Default)]
struct Record {
    bins: HashMap<String, LargeSet>,
}

/// 缓存里放共享句柄，读写都在原处进行
type SharedRecord = Rc<RefCell<Record>>;

/// 进程内 Large Set 存储
///
/// 记录放在 mini-moka 缓存里，缓存的 TTL 即记录生存时间；每次写入都会刷新生存时间。
pub struct MemoryStore {
    records: MokaCache<RecordKey, SharedRecord>,
    packages: HashSet<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_RECORD_TTL_SECS))
    }
}

impl MemoryStore {
    /// 创建存储，`record_ttl` 为零或不小于 `MAX_RECORD_TTL_SECS` 表示记录永不过期
    ///
    /// 默认注册 `DEFAULT_PACKAGE`。
    pub fn new(record_ttl: Duration) -> Self {
        let mut builder = MokaCache::builder().max_capacity(MEMORY_MAX_RECORDS);
        // mini-moka 不接受超过 1000 年的 TTL
        if !record_ttl.is_zero() && record_ttl < Duration::from_secs(MAX_RECORD_TTL_SECS) {
            builder = builder.time_to_live(record_ttl);
        }
        let mut packages = HashSet::new();
        packages.insert(DEFAULT_PACKAGE.to_string());
        Self {
            records: builder.build(),
            packages,
        }
    }

    /// 额外注册一个存储过程包
    pub fn register_package(&mut self, package: impl Into<String>) {
        self.packages.insert(package.into());
    }

    fn check_package(&self, call: &CallOptions) -> std::result::Result<(), StoreError> {
        if self.packages.contains(&call.package) {
            Ok(())
        } else {
            Err(StoreError::PackageNotFound)
        }
    }

    fn record(&mut self, target: &LsetTarget) -> std::result::Result<SharedRecord, StoreError> {
        self.records
            .get(&target.record_key())
            .map(Rc::clone)
            .ok_or(StoreError::RecordNotFound)
    }

    /// 写回同一个句柄以刷新记录生存时间
    fn touch(&mut self, target: &LsetTarget, record: SharedRecord) {
        self.records.insert(target.record_key(), record);
    }

    /// 在目标 bin 上创建 Large Set，记录不存在时一并创建
    pub fn create(
        &mut self,
        target: &LsetTarget,
        create: &CreateOptions,
        call: &CallOptions,
    ) -> std::result::Result<(), StoreError> {
        self.check_package(call)?;
        let record = self.record(target).unwrap_or_default();
        {
            let mut record = record.borrow_mut();
            if record.bins.contains_key(&target.bin) {
                return Err(StoreError::BinExists);
            }
            record.bins.insert(
                target.bin.clone(),
                LargeSet {
                    items: LinkedHashSet::with_capacity(create.capacity as usize),
                },
            );
        }
        self.touch(target, record);
        Ok(())
    }

    /// 插入一个值，返回它是否为新值；重复插入视为成功
    pub fn insert(
        &mut self,
        target: &LsetTarget,
        value: i64,
        call: &CallOptions,
    ) -> std::result::Result<bool, StoreError> {
        self.check_package(call)?;
        let record = self.record(target)?;
        let added = {
            let mut record = record.borrow_mut();
            let set = record
                .bins
                .get_mut(&target.bin)
                .ok_or(StoreError::BinNotFound)?;
            // 已存在的值保持原位置
            let added = !set.items.contains(&value);
            if added {
                set.items.insert(value);
            }
            added
        };
        self.touch(target, record);
        Ok(added)
    }

    pub fn search(
        &mut self,
        target: &LsetTarget,
        value: i64,
        call: &CallOptions,
    ) -> std::result::Result<SearchOutcome, StoreError> {
        self.check_package(call)?;
        let record = self.record(target)?;
        let record = record.borrow();
        let set = record.bins.get(&target.bin).ok_or(StoreError::BinNotFound)?;
        if set.items.contains(&value) {
            Ok(SearchOutcome::Found(value))
        } else {
            Ok(SearchOutcome::NotFound)
        }
    }

    /// 按插入顺序列出 bin 中的值
    pub fn items(&mut self, target: &LsetTarget) -> Option<Vec<i64>> {
        let record = self.record(target).ok()?;
        let record = record.borrow();
        record
            .bins
            .get(&target.bin)
            .map(|set| set.items.iter().copied().collect())
    }

    /// 执行一条协议请求，供节点端使用
    pub fn execute(&mut self, request: &Request) -> Response {
        let result = match request {
            Request::Create {
                target,
                create,
                call,
            } => self.create(target, create, call).map(|_| Response::Ok),
            Request::Insert {
                target,
                value,
                call,
            } => self.insert(target, *value, call).map(|_| Response::Ok),
            Request::Search {
                target,
                value,
                call,
            } => self.search(target, *value, call).map(|outcome| match outcome {
                SearchOutcome::Found(v) => Response::Value(v),
                SearchOutcome::NotFound => Response::NotFound,
            }),
        };
        result.unwrap_or_else(|e| Response::from_error(e.into()))
    }
}

/// 每类调用被发起的次数
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create: usize,
    pub insert: usize,
    pub search: usize,
}

/// 故障注入计划，调用序号从 0 开始
#[derive(Clone, Debug, Default)]
pub struct FaultPlan {
    pub fail_create: bool,
    pub fail_inserts: HashSet<usize>,
    pub fail_searches: HashSet<usize>,
}

/// 基于 `MemoryStore` 的客户端
pub struct MemoryClient {
    store: MemoryStore,
    faults: FaultPlan,
    calls: CallCounts,
    latency: Option<(RangeInclusive<u64>, SmallRng)>,
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new(MemoryStore::default())
    }
}

impl MemoryClient {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            faults: FaultPlan::default(),
            calls: CallCounts::default(),
            latency: None,
        }
    }

    /// 为 `-m` 模式构建客户端：使用配置中的 TTL 与包名，并模拟往返延迟
    pub fn from_config(config: &HarnessConfig) -> Self {
        let mut store = MemoryStore::new(config.record_ttl);
        store.register_package(config.package.clone());
        Self::new(store).with_latency(MIN_DELAY_US..=MAX_DELAY_US, config.seed)
    }

    /// 每次调用前休眠一段随机时间（微秒）
    pub fn with_latency(mut self, range_us: RangeInclusive<u64>, seed: u64) -> Self {
        self.latency = Some((range_us, SmallRng::seed_from_u64(seed)));
        self
    }

    pub fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    pub fn calls(&self) -> CallCounts {
        self.calls
    }

    pub fn store_mut(&mut self) -> &mut MemoryStore {
        &mut self.store
    }

    /// 模拟后端延迟
    async fn simulate_latency(&mut self) {
        if let Some((range, rng)) = self.latency.as_mut() {
            let delay_us = rng.random_range(range.clone());
            compio::time::sleep(Duration::from_micros(delay_us)).await;
        }
    }
}

impl LargeSetClient for MemoryClient {
    async fn create(
        &mut self,
        target: &LsetTarget,
        create: &CreateOptions,
        call: &CallOptions,
    ) -> Result<()> {
        self.calls.create += 1;
        self.simulate_latency().await;
        if self.faults.fail_create {
            return Err(StoreError::Injected.into());
        }
        Ok(self.store.create(target, create, call)?)
    }

    async fn insert(&mut self, target: &LsetTarget, value: i64, call: &CallOptions) -> Result<()> {
        let index = self.calls.insert;
        self.calls.insert += 1;
        self.simulate_latency().await;
        if self.faults.fail_inserts.contains(&index) {
            return Err(StoreError::Injected.into());
        }
        self.store.insert(target, value, call)?;
        Ok(())
    }

    async fn search(
        &mut self,
        target: &LsetTarget,
        value: i64,
        call: &CallOptions,
    ) -> Result<SearchOutcome> {
        let index = self.calls.search;
        self.calls.search += 1;
        self.simulate_latency().await;
        if self.faults.fail_searches.contains(&index) {
            return Err(StoreError::Injected.into());
        }
        Ok(self.store.search(target, value, call)?)
    }

    #[inline]
    fn name(&self) -> &'static str {
        "memory"
    }
}
