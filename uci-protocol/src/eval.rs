//! 评估数据模型
//!
//! 局面与搜索选项负责组装 UCI 命令文本，评估结果结构
//! 由上层工作流从引擎响应中解析得到。FEN 与走法在本层
//! 均为不透明字符串，不做棋规校验。

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// 局面设置选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOptions {
    /// FEN 字符串，缺省时使用起始局面 (startpos)
    pub fen: Option<String>,
    /// 在该局面之后依次执行的走法
    pub moves: Vec<String>,
}

impl PositionOptions {
    /// 起始局面
    pub fn startpos() -> Self {
        Self::default()
    }

    /// 从 FEN 字符串构造
    pub fn from_fen(fen: impl Into<String>) -> Self {
        Self {
            fen: Some(fen.into()),
            moves: Vec::new(),
        }
    }

    /// 追加走法列表
    pub fn with_moves<I, S>(mut self, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.moves = moves.into_iter().map(Into::into).collect();
        self
    }

    /// 组装 position 命令
    ///
    /// 规范形式为 `position fen <FEN>` / `position startpos`，
    /// 可选追加 ` moves <走法列表>`。
    pub fn to_command(&self) -> String {
        let mut command = String::from("position ");
        match &self.fen {
            Some(fen) => {
                command.push_str("fen ");
                command.push_str(fen);
            }
            None => command.push_str("startpos"),
        }
        if !self.moves.is_empty() {
            command.push_str(" moves ");
            command.push_str(&self.moves.join(" "));
        }
        command
    }

    /// 解析 position 命令文本
    pub fn from_command(command: &str) -> Result<Self> {
        let rest = command
            .trim()
            .strip_prefix("position")
            .ok_or_else(|| EngineError::Parse(format!("not a position command: {}", command)))?
            .trim_start();

        let (head, moves) = match rest.split_once(" moves ") {
            Some((head, tail)) => (
                head.trim(),
                tail.split_whitespace().map(String::from).collect(),
            ),
            None => (rest.trim(), Vec::new()),
        };

        let fen = if head == "startpos" {
            None
        } else if let Some(fen) = head.strip_prefix("fen ") {
            Some(fen.trim().to_string())
        } else {
            return Err(EngineError::Parse(format!(
                "unrecognized position form: {}",
                head
            )));
        };

        Ok(Self { fen, moves })
    }
}

/// 搜索选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// 思考时间（毫秒）
    pub move_time_ms: Option<u64>,
    /// 最大搜索深度
    pub depth: Option<u32>,
    /// 限定只搜索这些走法
    pub search_moves: Vec<String>,
}

impl SearchOptions {
    /// 以思考时间为预算构造
    pub fn move_time(ms: u64) -> Self {
        Self {
            move_time_ms: Some(ms),
            ..Self::default()
        }
    }

    /// 设置最大搜索深度
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    /// 限定搜索走法
    pub fn with_search_moves<I, S>(mut self, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_moves = moves.into_iter().map(Into::into).collect();
        self
    }

    /// 组装 go 命令
    pub fn to_command(&self) -> String {
        let mut command = String::from("go");
        if let Some(ms) = self.move_time_ms {
            command.push_str(&format!(" movetime {}", ms));
        }
        if let Some(depth) = self.depth {
            command.push_str(&format!(" depth {}", depth));
        }
        if !self.search_moves.is_empty() {
            command.push_str(" searchmoves ");
            command.push_str(&self.search_moves.join(" "));
        }
        command
    }
}

/// bestmove 行解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMove {
    /// 最佳走法
    pub mv: String,
    /// 引擎预测的对方应着
    pub ponder: Option<String>,
}

/// 局面评估结果（与具体走法无关，用于按局面缓存）
///
/// 分数与将杀步数均为被评估局面走子方视角；
/// 需要白方视角时用 [`Evaluation::white_perspective`] 翻转。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// 厘兵分数 (centipawn)
    pub score: Option<i32>,
    /// N 步杀，符号表示将杀方
    pub mate: Option<i32>,
    /// 达到的搜索深度
    pub depth: u32,
}

impl Evaluation {
    /// 转换为白方视角：黑方走子时翻转符号
    pub fn white_perspective(&self, fen: &str) -> Evaluation {
        let black_to_move = fen.split_whitespace().nth(1) == Some("b");
        if black_to_move {
            Evaluation {
                score: self.score.map(|s| -s),
                mate: self.mate.map(|m| -m),
                depth: self.depth,
            }
        } else {
            *self
        }
    }
}

/// 搜索产出：最佳走法及其评估
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatedMove {
    /// 最佳走法
    #[serde(rename = "move")]
    pub mv: String,
    /// 引擎预测的对方应着
    pub ponder: Option<String>,
    /// 厘兵分数（走子方视角）
    pub score: Option<i32>,
    /// N 步杀
    pub mate: Option<i32>,
    /// 达到的搜索深度
    pub depth: u32,
}
