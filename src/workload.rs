//! 工作负载生成模块
//! 由固定种子产生可复现的整数序列，插入阶段与查找阶段各自重新生成同一序列

use crate::config::VALUE_BOUND;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// 确定性的值序列
///
/// 每次构造都会用种子重新初始化随机数生成器，所以相同种子产生的序列逐项一致。
/// 使用 ChaCha 而不是 `StdRng`，保证跨平台、跨版本的结果不变。
#[derive(Clone, Debug)]
pub struct ValueSequence {
    rng: ChaCha8Rng,
    bound: i64,
}

impl ValueSequence {
    /// 创建取值范围为 `[0, VALUE_BOUND)` 的序列
    pub fn new(seed: u64) -> Self {
        Self::with_bound(seed, VALUE_BOUND)
    }

    /// 创建取值范围为 `[0, bound)` 的序列
    ///
    /// `bound` 小于 1 时按 1 处理。
    pub fn with_bound(seed: u64, bound: i64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            bound: bound.max(1),
        }
    }
}

impl Iterator for ValueSequence {
    type Item = i64;

    #[inline]
    fn next(&mut self) -> Option<i64> {
        Some(self.rng.random_range(0..self.bound))
    }
}

/// 工作负载生成器
pub struct WorkloadGenerator {
    seed: u64,
}

impl WorkloadGenerator {
    /// 创建新的工作负载生成器
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 从头生成前 `count` 个值
    pub fn generate(&self, count: usize) -> Vec<i64> {
        ValueSequence::new(self.seed).take(count).collect()
    }
}
