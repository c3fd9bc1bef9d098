//! 错误类型定义

use thiserror::Error;

/// 引擎协议错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// 无法建立连接
    #[error("Failed to connect to engine at {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// 连接超时
    #[error("Timeout waiting for engine connection")]
    ConnectTimeout,

    /// 命令响应超时
    #[error("Timeout waiting for engine response to '{0}'")]
    CommandTimeout(String),

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 命令等待响应期间连接断开
    #[error("Connection lost while '{0}' was pending")]
    ConnectionLost(String),

    /// 已有命令在等待响应
    #[error("Command '{0}' is already pending")]
    CommandPending(String),

    /// 引擎服务拒绝认证
    #[error("Engine server rejected authentication")]
    Unauthenticated,

    /// 单行消息超限
    #[error("Line too large: {size} bytes (max: {max})")]
    LineTooLarge { size: usize, max: usize },

    /// 响应解析失败
    #[error("Parse error: {0}")]
    Parse(String),

    /// 搜索结束但未产生 bestmove
    #[error("Engine produced no bestmove line")]
    NoBestMove,
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, EngineError>;
