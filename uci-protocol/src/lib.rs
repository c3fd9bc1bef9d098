//! UCI 引擎共享协议库
//!
//! 包含:
//! - 消息信封定义 (EngineEvent)
//! - 传输层抽象 (Connector, Connection, Listener traits)
//! - 行编解码 (EventReader, EventWriter)
//! - 待完成命令与响应终止判定 (PendingCommand)
//! - UCI 命令格式化与响应解析 (PositionOptions, SearchOptions, UciParser)
//! - 评估数据模型 (Evaluation, EvaluatedMove)

mod codec;
mod command;
mod constants;
mod error;
mod eval;
mod message;
mod transport;

pub use codec::UciParser;
pub use command::PendingCommand;
pub use constants::*;
pub use error::{EngineError, Result};
pub use eval::{BestMove, EvaluatedMove, Evaluation, PositionOptions, SearchOptions};
pub use message::EngineEvent;
pub use transport::{
    Connection, Connector, EngineConnector, EngineListener, EngineTransport, EventReader,
    EventWriter, Listener,
};
