//! UCI 响应解析
//!
//! 对累积的响应行做纯解析，无 I/O、无可变状态。
//! 分数以 `info ... score cp <n>` / `score mate <n>` 形式出现在
//! 搜索进度行中，以最后一条带分数的 info 行（最深一轮迭代）为准。

use tracing::debug;

use crate::error::{EngineError, Result};
use crate::eval::{BestMove, Evaluation};

/// UCI 响应行解析器
pub struct UciParser;

impl UciParser {
    /// 从响应行中解析最佳走法
    ///
    /// 查找首个以 `bestmove` 开头的行，提取走法 token 及可选的
    /// `ponder <走法>` 后缀。找不到则报解析错误。
    pub fn parse_best_move(lines: &[String]) -> Result<BestMove> {
        for line in lines {
            let line = line.trim();
            if !line.starts_with("bestmove") {
                continue;
            }

            let mut tokens = line.split_whitespace();
            // 跳过 bestmove 自身
            tokens.next();

            let mv = tokens
                .next()
                .ok_or_else(|| EngineError::Parse("bestmove line has no move token".to_string()))?
                .to_string();

            let mut ponder = None;
            while let Some(token) = tokens.next() {
                if token == "ponder" {
                    ponder = tokens.next().map(String::from);
                }
            }

            return Ok(BestMove { mv, ponder });
        }

        Err(EngineError::Parse(
            "no bestmove line in engine response".to_string(),
        ))
    }

    /// 从 info 行中解析局面评估
    ///
    /// 在既以 `info` 开头又包含 `score` 的行中取最后一条为准，
    /// 分别提取 `depth`、`score cp`、`score mate`（cp 与 mate 在
    /// 单行中互斥）。没有匹配行时返回空评估（depth 为 0）。
    pub fn parse_evaluation(lines: &[String]) -> Evaluation {
        let scored = lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| line.starts_with("info") && line.contains("score"))
            .last();

        let Some(line) = scored else {
            debug!("No scored info line in engine response");
            return Evaluation::default();
        };

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let mut eval = Evaluation::default();

        for (i, token) in tokens.iter().enumerate() {
            match *token {
                "depth" => {
                    if let Some(depth) = tokens.get(i + 1).and_then(|t| t.parse::<u32>().ok()) {
                        eval.depth = depth;
                    }
                }
                "score" => match (tokens.get(i + 1), tokens.get(i + 2)) {
                    (Some(&"cp"), Some(value)) => {
                        if let Ok(score) = value.parse::<i32>() {
                            eval.score = Some(score);
                        }
                    }
                    (Some(&"mate"), Some(value)) => {
                        if let Ok(mate) = value.parse::<i32>() {
                            eval.mate = Some(mate);
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        eval
    }

    /// 从 uci 命令的响应中提取引擎版本号
    ///
    /// 查找同时包含引擎标识 (stockfish) 与作者署名 (by) 的行，
    /// 返回引擎名之后的 `<major>[.<minor>]` 数字 token。
    pub fn extract_version(lines: &[String]) -> Result<String> {
        let identity = lines
            .iter()
            .map(|line| line.trim())
            .find(|line| {
                let lower = line.to_lowercase();
                lower.contains("stockfish") && lower.contains("by")
            })
            .ok_or_else(|| {
                EngineError::Parse("no engine identity line in uci response".to_string())
            })?;

        let mut seen_name = false;
        for token in identity.split_whitespace() {
            if seen_name && is_version_token(token) {
                return Ok(token.to_string());
            }
            if token.to_lowercase().contains("stockfish") {
                seen_name = true;
            }
        }

        Err(EngineError::Parse(format!(
            "no version token in identity line: {}",
            identity
        )))
    }
}

/// 形如 16 或 16.1 的版本号 token
fn is_version_token(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_digit())
        && chars.all(|c| c.is_ascii_digit() || c == '.')
}
