//! Large Set 集成测试工具库
//!
//! 连接单个节点，在一条记录上创建 Large Set bin，
//! 用固定种子生成的值序列依次插入，再用同一序列逐个查找，最后统计成功与失败数。
//!
//! 特性：
//! - 使用Compio单线程运行时，每次远程调用都有独立超时
//! - ChaCha 种子序列，插入与查找阶段逐项一致
//! - 可配置的逐项失败策略（中止 / 继续）
//! - 进程内参考存储，便于离线运行与测试

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod harness;
pub mod memory;
pub mod protocol;
pub mod runner;
pub mod tcp;
pub mod workload;
