//! 待完成命令与响应终止判定
//!
//! UCI 协议没有请求/响应关联 ID，响应行只能按到达顺序归属于
//! 当前等待中的命令。每类命令有各自的终止标记：
//! `go*` 等待 `bestmove`，`isready` 等待 `readyok`，`uci` 等待 `uciok`，
//! `position*` 与 `stop` 发出后立即完成，其余命令收到首行即完成。

use std::time::{Duration, Instant};

/// 当前等待响应的命令及其已累积的响应行
#[derive(Debug)]
pub struct PendingCommand {
    command: String,
    lines: Vec<String>,
    issued_at: Instant,
}

impl PendingCommand {
    /// 创建待完成命令
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            lines: Vec::new(),
            issued_at: Instant::now(),
        }
    }

    /// 判断命令是否发出后立即完成（不等待任何响应行）
    pub fn is_immediate(command: &str) -> bool {
        command.starts_with("position") || command == "stop"
    }

    /// 命令文本
    pub fn command(&self) -> &str {
        &self.command
    }

    /// 已累积的响应行
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// 自发出以来经过的时间
    pub fn elapsed(&self) -> Duration {
        self.issued_at.elapsed()
    }

    /// 追加一行响应，返回命令是否已完成
    pub fn push_line(&mut self, line: &str) -> bool {
        self.lines.push(line.to_string());
        self.is_terminal(line)
    }

    /// 取出全部响应行
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    fn is_terminal(&self, line: &str) -> bool {
        if self.command.starts_with("go") {
            line.contains("bestmove")
        } else if self.command == "isready" {
            line.contains("readyok")
        } else if self.command == "uci" {
            line.contains("uciok")
        } else {
            // 未知命令：收到首行即视为完整响应
            true
        }
    }
}
