//! 消息信封定义
//!
//! 引擎服务使用 `{"type": "...", "payload": "..."}` 形式的 JSON 信封
//! 逐行传输命令与响应。部分引擎服务会直接回传裸的 UCI 文本行，
//! 解码时先尝试结构化解析，失败则回退为原始响应文本。

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 引擎消息信封
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EngineEvent {
    /// 发往引擎的 UCI 命令
    #[serde(rename = "uci:command")]
    Command(String),
    /// 引擎回传的 UCI 响应行
    #[serde(rename = "uci:response")]
    Response(String),
    /// 认证通过
    #[serde(rename = "auth:authenticated")]
    Authenticated(Option<String>),
    /// 认证被拒绝
    #[serde(rename = "auth:unauthenticated")]
    Unauthenticated(Option<String>),
}

impl EngineEvent {
    /// 构造命令信封
    pub fn command(text: impl Into<String>) -> Self {
        EngineEvent::Command(text.into())
    }

    /// 编码为一行 JSON 文本（不含换行符）
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// 从一行文本解码
    ///
    /// JSON 形式的行必须是合法信封，否则报 JSON 错误；
    /// 非 JSON 的行按裸 UCI 响应处理（回退路径）。
    pub fn decode(line: &str) -> Result<EngineEvent> {
        let line = line.trim();
        if line.starts_with('{') {
            Ok(serde_json::from_str(line)?)
        } else {
            Ok(EngineEvent::Response(line.to_string()))
        }
    }
}
