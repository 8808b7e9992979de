//! 行协议模块
//!
//! 每个请求、每个应答都是一行文本，字段之间用制表符分隔，以 `\n` 结尾：
//!
//! ```text
//! LSET_CREATE  ns set key bin capacity package ttl_secs timeout_ms
//! LSET_INSERT  ns set key bin value package timeout_ms
//! LSET_SEARCH  ns set key bin value package timeout_ms
//!
//! OK | VALUE <int> | NF | ERR <code> <message>
//! ```

use crate::client::{CallOptions, CreateOptions, LsetTarget, SearchOutcome};
use crate::error::{AppError, Result};
use std::time::Duration;

const CREATE: &str = "LSET_CREATE";
const INSERT: &str = "LSET_INSERT";
const SEARCH: &str = "LSET_SEARCH";

/// 客户端发往节点的请求
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Create {
        target: LsetTarget,
        create: CreateOptions,
        call: CallOptions,
    },
    Insert {
        target: LsetTarget,
        value: i64,
        call: CallOptions,
    },
    Search {
        target: LsetTarget,
        value: i64,
        call: CallOptions,
    },
}

impl Request {
    /// 请求附带的调用参数
    pub fn call(&self) -> &CallOptions {
        match self {
            Request::Create { call, .. }
            | Request::Insert { call, .. }
            | Request::Search { call, .. } => call,
        }
    }

    /// 编码为一行，包含结尾换行
    pub fn encode(&self) -> String {
        match self {
            Request::Create {
                target,
                create,
                call,
            } => format!(
                "{}\t{}\t{}\t{}\t{}\t{}\n",
                CREATE,
                encode_target(target),
                create.capacity,
                call.package,
                create.record_ttl.as_secs(),
                call.timeout.as_millis()
            ),
            Request::Insert {
                target,
                value,
                call,
            } => format!(
                "{}\t{}\t{}\t{}\t{}\n",
                INSERT,
                encode_target(target),
                value,
                call.package,
                call.timeout.as_millis()
            ),
            Request::Search {
                target,
                value,
                call,
            } => format!(
                "{}\t{}\t{}\t{}\t{}\n",
                SEARCH,
                encode_target(target),
                value,
                call.package,
                call.timeout.as_millis()
            ),
        }
    }

    /// 解析一行请求（可以带或不带结尾换行）
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        match fields.as_slice() {
            [CREATE, ns, set, key, bin, capacity, package, ttl, timeout] => Ok(Request::Create {
                target: LsetTarget::new(*ns, *set, *key, *bin),
                create: CreateOptions {
                    capacity: parse_number(capacity, "capacity")?,
                    record_ttl: Duration::from_secs(parse_number(ttl, "ttl")?),
                },
                call: parse_call(package, timeout)?,
            }),
            [INSERT, ns, set, key, bin, value, package, timeout] => Ok(Request::Insert {
                target: LsetTarget::new(*ns, *set, *key, *bin),
                value: parse_number(value, "value")?,
                call: parse_call(package, timeout)?,
            }),
            [SEARCH, ns, set, key, bin, value, package, timeout] => Ok(Request::Search {
                target: LsetTarget::new(*ns, *set, *key, *bin),
                value: parse_number(value, "value")?,
                call: parse_call(package, timeout)?,
            }),
            [command, ..] => Err(AppError::Protocol(format!(
                "unknown or malformed request: {} ({} fields)",
                command,
                fields.len()
            ))),
            [] => Err(AppError::Protocol("empty request".to_string())),
        }
    }
}

/// 节点返回的应答
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Ok,
    Value(i64),
    NotFound,
    Error { code: i32, message: String },
}

impl Response {
    /// 编码为一行，包含结尾换行；消息中的制表符与换行会被替换为空格
    pub fn encode(&self) -> String {
        match self {
            Response::Ok => "OK\n".to_string(),
            Response::Value(v) => format!("VALUE\t{}\n", v),
            Response::NotFound => "NF\n".to_string(),
            Response::Error { code, message } => {
                format!("ERR\t{}\t{}\n", code, message.replace(['\t', '\n', '\r'], " "))
            }
        }
    }

    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut parts = line.splitn(3, '\t');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("OK"), None, None) => Ok(Response::Ok),
            (Some("NF"), None, None) => Ok(Response::NotFound),
            (Some("VALUE"), Some(v), None) => Ok(Response::Value(parse_number(v, "value")?)),
            (Some("ERR"), Some(code), message) => Ok(Response::Error {
                code: parse_number(code, "error code")?,
                message: message.unwrap_or_default().to_string(),
            }),
            _ => Err(AppError::Protocol(format!("unexpected reply: {:?}", line))),
        }
    }

    /// 转换为 create/insert 的结果
    pub fn into_ack(self) -> Result<()> {
        match self {
            Response::Ok => Ok(()),
            Response::Error { code, message } => Err(AppError::Remote { code, message }),
            other => Err(AppError::Protocol(format!("expected OK, got {:?}", other))),
        }
    }

    /// 转换为 search 的结果
    pub fn into_search(self) -> Result<SearchOutcome> {
        match self {
            Response::Value(v) => Ok(SearchOutcome::Found(v)),
            Response::NotFound => Ok(SearchOutcome::NotFound),
            Response::Error { code, message } => Err(AppError::Remote { code, message }),
            Response::Ok => Err(AppError::Protocol(
                "expected VALUE or NF, got OK".to_string(),
            )),
        }
    }

    /// 把错误编码为 `ERR` 应答，非远程错误统一使用代码 -1
    pub fn from_error(err: AppError) -> Self {
        match err {
            AppError::Remote { code, message } => Response::Error { code, message },
            other => Response::Error {
                code: -1,
                message: other.to_string(),
            },
        }
    }
}

fn encode_target(target: &LsetTarget) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        target.namespace, target.set, target.key, target.bin
    )
}

fn parse_call(package: &str, timeout: &str) -> Result<CallOptions> {
    Ok(CallOptions {
        package: package.to_string(),
        timeout: Duration::from_millis(parse_number(timeout, "timeout")?),
    })
}

fn parse_number<T: std::str::FromStr>(raw: &str, field: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| AppError::Protocol(format!("invalid {}: {:?}", field, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> CallOptions {
        CallOptions {
            package: "AsLSetStoneman".to_string(),
            timeout: Duration::from_millis(5000),
        }
    }

    fn target() -> LsetTarget {
        LsetTarget::new("test", "demo", "User_111", "urlid_stack")
    }

    #[test]
    fn create_request_wire_format() {
        let request = Request::Create {
            target: target(),
            create: CreateOptions {
                capacity: 32,
                record_ttl: Duration::from_secs(864_000),
            },
            call: call(),
        };
        let line = request.encode();
        assert_eq!(
            line,
            "LSET_CREATE\ttest\tdemo\tUser_111\turlid_stack\t32\tAsLSetStoneman\t864000\t5000\n"
        );
        assert_eq!(Request::parse(&line).unwrap(), request);
    }

    #[test]
    fn search_request_accepts_negative_values() {
        let request = Request::Search {
            target: target(),
            value: -17,
            call: call(),
        };
        let line = request.encode();
        assert_eq!(
            line,
            "LSET_SEARCH\ttest\tdemo\tUser_111\turlid_stack\t-17\tAsLSetStoneman\t5000\n"
        );
        assert_eq!(Request::parse(&line).unwrap(), request);
    }

    #[test]
    fn malformed_requests_are_rejected() {
        assert!(Request::parse("").is_err());
        assert!(Request::parse("LSET_INSERT\ttest\tdemo").is_err());
        assert!(Request::parse("LSET_INSERT\ttest\tdemo\tk\tb\tabc\tpkg\t10").is_err());
        assert!(Request::parse("LSET_DELETE\ttest\tdemo\tk\tb\t1\tpkg\t10").is_err());
    }

    #[test]
    fn responses_map_to_outcomes() {
        assert_eq!(Response::parse("OK\n").unwrap().into_ack(), Ok(()));
        assert_eq!(
            Response::parse("VALUE\t42").unwrap().into_search(),
            Ok(SearchOutcome::Found(42))
        );
        assert_eq!(
            Response::parse("NF\r\n").unwrap().into_search(),
            Ok(SearchOutcome::NotFound)
        );
        assert_eq!(
            Response::parse("ERR\t1402\tunique key violation")
                .unwrap()
                .into_ack(),
            Err(AppError::Remote {
                code: 1402,
                message: "unique key violation".to_string()
            })
        );
        assert!(matches!(
            Response::parse("OK").unwrap().into_search(),
            Err(AppError::Protocol(_))
        ));
        assert!(Response::parse("HELLO").is_err());
        assert!(Response::parse("VALUE\tx").is_err());
    }

    #[test]
    fn error_messages_stay_on_one_line() {
        let line = Response::Error {
            code: 3,
            message: "a\tb\nc".to_string(),
        }
        .encode();
        assert_eq!(line, "ERR\t3\ta b c\n");
        assert_eq!(
            Response::parse(&line).unwrap(),
            Response::Error {
                code: 3,
                message: "a b c".to_string()
            }
        );
    }
}
