//! 错误处理模块
//! 定义了所有应用级别的错误类型

use thiserror::Error;

/// 应用主错误类型
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),
    /// 无法连接到节点
    #[error("Connection error: {0}")]
    Connection(String),
    /// 创建 Large Set 失败
    #[error("LSET create error: {0}")]
    SetCreate(String),
    /// 服务端返回的错误
    #[error("Remote error ({code}): {message}")]
    Remote { code: i32, message: String },
    /// 单次调用超时
    #[error("Timeout: {0}")]
    Timeout(String),
    /// 无法解析的应答
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// 插入阶段未全部成功
    #[error("Insert phase failed: {0}")]
    InsertPhase(String),
    /// 查找阶段未全部成功
    #[error("Search phase failed: {0}")]
    SearchPhase(String),
    /// 状态机转换非法
    #[error("Invalid harness state: {0}")]
    State(String),
    /// 运行时创建错误
    #[error("Runtime create error: {0}")]
    RuntimeCreate(String),
    /// IO错误
    #[error("IO error: {0}")]
    Io(String),
}

impl AppError {
    /// 进程退出码
    pub const fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::Connection(_) => 3,
            AppError::SetCreate(_) => 4,
            AppError::InsertPhase(_) => 5,
            AppError::SearchPhase(_) => 6,
            _ => 1,
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

/// 错误上下文扩展trait
pub trait ErrorContext<T> {
    /// 添加上下文信息
    fn with_context(self, context: &str) -> Result<T>;
}

impl<T> ErrorContext<T> for Result<T> {
    fn with_context(self, context: &str) -> Result<T> {
        self.map_err(|e| match e {
            AppError::Config(msg) => AppError::Config(format!("{}: {}", context, msg)),
            AppError::Connection(msg) => AppError::Connection(format!("{}: {}", context, msg)),
            AppError::SetCreate(msg) => AppError::SetCreate(format!("{}: {}", context, msg)),
            AppError::Remote { code, message } => AppError::Remote {
                code,
                message: format!("{}: {}", context, message),
            },
            AppError::Timeout(msg) => AppError::Timeout(format!("{}: {}", context, msg)),
            AppError::Protocol(msg) => AppError::Protocol(format!("{}: {}", context, msg)),
            AppError::InsertPhase(msg) => AppError::InsertPhase(format!("{}: {}", context, msg)),
            AppError::SearchPhase(msg) => AppError::SearchPhase(format!("{}: {}", context, msg)),
            AppError::State(msg) => AppError::State(format!("{}: {}", context, msg)),
            AppError::RuntimeCreate(msg) => {
                AppError::RuntimeCreate(format!("{}: {}", context, msg))
            }
            AppError::Io(msg) => AppError::Io(format!("{}: {}", context, msg)),
        })
    }
}
