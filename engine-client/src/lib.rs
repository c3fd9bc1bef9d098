//! UCI 引擎客户端
//!
//! 包含:
//! - 引擎连接会话 (EngineSession)
//! - 评估工作流 (EngineAnalyzer)
//! - 评估缓存存储 (EvalStorage)

pub mod analyzer;
pub mod session;
pub mod storage;

pub use analyzer::{EngineAnalyzer, SearchReport};
pub use session::{EngineSession, SessionConfig};
pub use storage::{EvalKey, EvalStorage, StoredEvaluation};
