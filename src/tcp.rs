//! TCP 客户端模块
//! 通过一条 TCP 连接与单个节点通信，使用 `protocol` 中的行协议

use crate::client::{CallOptions, CreateOptions, LargeSetClient, LsetTarget, SearchOutcome};
use crate::error::{AppError, Result};
use crate::protocol::{Request, Response};
use compio::io::{AsyncRead, AsyncWriteExt};
use compio::net::TcpStream;
use std::time::Duration;
use tracing::{debug, warn};

/// 单次读取的缓冲区大小
const READ_CHUNK: usize = 4096;

/// 应答行的最大长度
const MAX_LINE: usize = 64 * 1024;

pub struct TcpClient {
    stream: TcpStream,
    /// 已读到但尚未消费的字节
    pending: Vec<u8>,
    peer: String,
    /// 请求已发出、应答尚未读完；调用被取消时保持为 true
    in_flight: bool,
    /// 连接失去同步的原因，之后的调用一律失败
    broken: Option<String>,
}

impl TcpClient {
    /// 连接到单个节点，超时或失败都返回 `AppError::Connection`
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let peer = format!("{}:{}", host, port);
        let stream = match compio::time::timeout(timeout, TcpStream::connect(peer.as_str())).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(AppError::Connection(format!("{}: {}", peer, e)));
            }
            Err(_) => {
                return Err(AppError::Connection(format!(
                    "{}: timed out after {:?}",
                    peer, timeout
                )));
            }
        };
        debug!(peer = %peer, "connected");
        Ok(Self {
            stream,
            pending: Vec::new(),
            peer,
            in_flight: false,
            broken: None,
        })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// 连接是否还能继续使用
    pub fn is_usable(&self) -> bool {
        self.broken.is_none() && !self.in_flight
    }

    fn ensure_usable(&mut self) -> Result<()> {
        if self.in_flight {
            // 上一次调用在读到应答前被丢弃，剩余应答会错位
            self.broken = Some("previous request was cancelled before its reply".to_string());
        }
        match &self.broken {
            Some(reason) => Err(AppError::Connection(format!(
                "{}: connection unusable: {}",
                self.peer, reason
            ))),
            None => Ok(()),
        }
    }

    /// 发送一行请求并等待一行应答
    ///
    /// 超时、IO 错误或无法解析的应答都会使连接失效；`ERR` 应答不会。
    async fn round_trip(&mut self, request: Request) -> Result<Response> {
        self.ensure_usable()?;
        let limit = request.call().timeout;
        self.in_flight = true;
        let result = match compio::time::timeout(limit, self.exchange(&request)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "{}: no reply within {:?}",
                self.peer, limit
            ))),
        };
        match &result {
            Ok(_) => self.in_flight = false,
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "dropping connection state");
                self.broken = Some(e.to_string());
            }
        }
        result
    }

    async fn exchange(&mut self, request: &Request) -> Result<Response> {
        let line = request.encode();
        let written = self.stream.write_all(line.into_bytes()).await;
        written.0?;
        let reply = self.read_line().await?;
        Response::parse(&reply)
    }

    async fn read_line(&mut self) -> Result<String> {
        loop {
            if let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=pos).collect();
                return String::from_utf8(line)
                    .map_err(|e| AppError::Protocol(format!("reply is not UTF-8: {}", e)));
            }
            if self.pending.len() > MAX_LINE {
                return Err(AppError::Protocol(format!(
                    "reply exceeds {} bytes without a newline",
                    MAX_LINE
                )));
            }
            let read = self.stream.read(Vec::with_capacity(READ_CHUNK)).await;
            let n = read.0?;
            if n == 0 {
                return Err(AppError::Protocol(format!(
                    "connection closed by {}",
                    self.peer
                )));
            }
            let chunk = read.1;
            self.pending.extend_from_slice(&chunk[..n.min(chunk.len())]);
        }
    }
}

impl LargeSetClient for TcpClient {
    async fn create(
        &mut self,
        target: &LsetTarget,
        create: &CreateOptions,
        call: &CallOptions,
    ) -> Result<()> {
        self.round_trip(Request::Create {
            target: target.clone(),
            create: *create,
            call: call.clone(),
        })
        .await?
        .into_ack()
    }

    async fn insert(&mut self, target: &LsetTarget, value: i64, call: &CallOptions) -> Result<()> {
        self.round_trip(Request::Insert {
            target: target.clone(),
            value,
            call: call.clone(),
        })
        .await?
        .into_ack()
    }

    async fn search(
        &mut self,
        target: &LsetTarget,
        value: i64,
        call: &CallOptions,
    ) -> Result<SearchOutcome> {
        self.round_trip(Request::Search {
            target: target.clone(),
            value,
            call: call.clone(),
        })
        .await?
        .into_search()
    }

    #[inline]
    fn name(&self) -> &'static str {
        "tcp"
    }
}
