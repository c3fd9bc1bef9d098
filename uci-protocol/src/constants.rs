//! 协议常量定义

use std::time::Duration;

/// 引擎服务默认端口
pub const DEFAULT_ENGINE_PORT: u16 = 8080;

/// 引擎服务默认地址
pub const DEFAULT_ENGINE_ADDR: &str = "127.0.0.1:8080";

/// 单行消息最大大小
pub const MAX_LINE_SIZE: usize = 8192;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// 命令响应超时（秒）
pub const COMMAND_TIMEOUT_SECS: u64 = 10;

/// 断线重连延迟（秒）
pub const RECONNECT_DELAY_SECS: u64 = 5;

/// 完整评估的默认搜索深度
pub const EVAL_DEPTH: u32 = 15;

/// 完整评估的默认思考时间（毫秒）
pub const EVAL_MOVE_TIME_MS: u64 = 1000;

/// 快速静态评估的搜索深度
pub const QUICK_EVAL_DEPTH: u32 = 1;

/// 快速静态评估的保底思考时间（毫秒）
pub const QUICK_EVAL_MOVE_TIME_MS: u64 = 100;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);

/// 命令响应超时 Duration
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(COMMAND_TIMEOUT_SECS);

/// 断线重连延迟 Duration
pub const RECONNECT_DELAY: Duration = Duration::from_secs(RECONNECT_DELAY_SECS);
