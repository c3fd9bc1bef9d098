//! 评估工作流
//!
//! 将会话的命令原语组合为标准交互序列
//! (uci → isready → position → isready → go)，并把响应解析为
//! 调用方可用的评估结构。会话同一时刻只允许一条在途命令，
//! 序列中的每一步都严格顺序等待。

use tracing::{debug, info};

use uci_protocol::{
    EngineError, EvaluatedMove, Evaluation, PositionOptions, Result, SearchOptions, UciParser,
    EVAL_DEPTH, EVAL_MOVE_TIME_MS, QUICK_EVAL_DEPTH, QUICK_EVAL_MOVE_TIME_MS,
};

use crate::session::{EngineSession, SessionConfig};

/// 搜索产出：最佳走法及引擎回传的原始响应行
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// 最佳走法及其评估
    pub best: EvaluatedMove,
    /// 原始响应行（按到达顺序）
    pub lines: Vec<String>,
}

/// 引擎评估工作流
///
/// 包装一条 [`EngineSession`]，由调用方构造并持有；
/// 并发评估多个局面时各自创建实例。
pub struct EngineAnalyzer {
    session: EngineSession,
}

impl EngineAnalyzer {
    /// 连接到指定地址的引擎
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            session: EngineSession::new(addr),
        }
    }

    /// 使用指定会话配置
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            session: EngineSession::with_config(config),
        }
    }

    /// 复用既有会话
    pub fn from_session(session: EngineSession) -> Self {
        Self { session }
    }

    /// 底层会话
    pub fn session(&self) -> &EngineSession {
        &self.session
    }

    /// 初始化引擎 (uci + isready)
    pub async fn initialize(&self) -> Result<()> {
        self.session.send_uci().await?;
        self.session.send_is_ready().await?;
        Ok(())
    }

    /// 获取引擎版本号，如 "16.1"
    pub async fn engine_version(&self) -> Result<String> {
        let lines = self.session.send_uci().await?;
        UciParser::extract_version(&lines)
    }

    /// 设置当前局面
    pub async fn set_position(&self, options: &PositionOptions) -> Result<()> {
        self.session.set_position(options).await
    }

    /// 在当前局面上搜索最佳走法
    ///
    /// 搜索结束却解析不出 bestmove 行时报 [`EngineError::NoBestMove`]；
    /// 分数是尽力而为的诊断数据，info 行缺失时返回空评估而非报错。
    pub async fn search(&self, options: &SearchOptions) -> Result<SearchReport> {
        let lines = self.session.go(options).await?;

        let best = UciParser::parse_best_move(&lines).map_err(|e| {
            debug!("No parseable bestmove in search response: {}", e);
            EngineError::NoBestMove
        })?;
        let eval = UciParser::parse_evaluation(&lines);

        info!(
            "Best move {} (score: {:?}, mate: {:?}, depth: {})",
            best.mv, eval.score, eval.mate, eval.depth
        );

        Ok(SearchReport {
            best: EvaluatedMove {
                mv: best.mv,
                ponder: best.ponder,
                score: eval.score,
                mate: eval.mate,
                depth: eval.depth,
            },
            lines,
        })
    }

    /// 快速静态评估：depth 1 搜索加短保底思考时间，只取分数
    pub async fn quick_evaluate(&self) -> Result<Evaluation> {
        let options =
            SearchOptions::move_time(QUICK_EVAL_MOVE_TIME_MS).with_depth(QUICK_EVAL_DEPTH);
        let lines = self.session.go(&options).await?;
        Ok(UciParser::parse_evaluation(&lines))
    }

    /// 按标准序列评估一个 FEN 局面
    pub async fn evaluate_position(
        &self,
        fen: &str,
        options: &SearchOptions,
    ) -> Result<Evaluation> {
        self.session.send_uci().await?;
        self.session.send_is_ready().await?;
        self.session
            .set_position(&PositionOptions::from_fen(fen))
            .await?;
        self.session.send_is_ready().await?;

        let report = self.search(options).await?;
        Ok(Evaluation {
            score: report.best.score,
            mate: report.best.mate,
            depth: report.best.depth,
        })
    }

    /// 使用默认搜索预算评估一个 FEN 局面
    pub async fn evaluate_fen(&self, fen: &str) -> Result<Evaluation> {
        let options = SearchOptions::move_time(EVAL_MOVE_TIME_MS).with_depth(EVAL_DEPTH);
        self.evaluate_position(fen, &options).await
    }

    /// 断开与引擎的连接
    pub async fn disconnect(&self) {
        self.session.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    const TEST_FEN: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";

    /// 按顺序应答的假引擎：逐条读取命令并回发脚本中的响应行
    async fn spawn_engine(script: Vec<(&str, Vec<&str>)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let script: Vec<(String, Vec<String>)> = script
            .into_iter()
            .map(|(cmd, responses)| {
                (
                    cmd.to_string(),
                    responses.into_iter().map(String::from).collect(),
                )
            })
            .collect();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = BufReader::new(read_half).lines();

            for (expected, responses) in script {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    _ => return,
                };
                let event: serde_json::Value = serde_json::from_str(&line).unwrap();
                assert_eq!(event["payload"], expected.as_str());

                for response in responses {
                    let envelope =
                        format!("{{\"type\":\"uci:response\",\"payload\":\"{}\"}}\n", response);
                    write_half.write_all(envelope.as_bytes()).await.unwrap();
                }
            }
            while let Ok(Some(_)) = lines.next_line().await {}
        });
        addr
    }

    fn test_analyzer(addr: String) -> EngineAnalyzer {
        EngineAnalyzer::with_config(SessionConfig {
            addr,
            connect_timeout: Duration::from_secs(1),
            command_timeout: Duration::from_millis(500),
            reconnect_delay: Duration::from_millis(50),
        })
    }

    #[tokio::test]
    async fn test_initialize() {
        let addr = spawn_engine(vec![
            ("uci", vec!["id name Stockfish 16.1", "uciok"]),
            ("isready", vec!["readyok"]),
        ])
        .await;

        let analyzer = test_analyzer(addr);
        analyzer.initialize().await.unwrap();
        analyzer.disconnect().await;
    }

    #[tokio::test]
    async fn test_engine_version() {
        let addr = spawn_engine(vec![(
            "uci",
            vec![
                "Stockfish 16.1 by the Stockfish developers (see AUTHORS file)",
                "uciok",
            ],
        )])
        .await;

        let analyzer = test_analyzer(addr);
        assert_eq!(analyzer.engine_version().await.unwrap(), "16.1");
    }

    #[tokio::test]
    async fn test_search_parses_move_and_score() {
        let addr = spawn_engine(vec![(
            "go movetime 1000 depth 15",
            vec![
                "info depth 10 seldepth 14 score cp 20 nodes 100000",
                "info depth 15 seldepth 21 score cp 35 nodes 2500000 pv e7e6",
                "bestmove e7e6 ponder d2d4",
            ],
        )])
        .await;

        let analyzer = test_analyzer(addr);
        let options = SearchOptions::move_time(1000).with_depth(15);
        let report = analyzer.search(&options).await.unwrap();

        assert_eq!(report.best.mv, "e7e6");
        assert_eq!(report.best.ponder, Some("d2d4".to_string()));
        assert_eq!(report.best.score, Some(35));
        assert_eq!(report.best.mate, None);
        assert_eq!(report.best.depth, 15);
        assert_eq!(report.lines.len(), 3);
    }

    #[tokio::test]
    async fn test_search_without_score_lines() {
        let addr = spawn_engine(vec![("go depth 1", vec!["bestmove a7a6"])]).await;

        let analyzer = test_analyzer(addr);
        let options = SearchOptions::default().with_depth(1);
        let report = analyzer.search(&options).await.unwrap();

        // 分数缺失不报错，返回空评估
        assert_eq!(report.best.mv, "a7a6");
        assert_eq!(report.best.score, None);
        assert_eq!(report.best.depth, 0);
    }

    #[tokio::test]
    async fn test_search_no_bestmove() {
        // 含 bestmove 子串的行会结束 go 命令，但解析不出走法
        let addr = spawn_engine(vec![(
            "go movetime 100",
            vec!["info string pondering bestmove candidates"],
        )])
        .await;

        let analyzer = test_analyzer(addr);
        let err = analyzer
            .search(&SearchOptions::move_time(100))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoBestMove));
    }

    #[tokio::test]
    async fn test_quick_evaluate() {
        let addr = spawn_engine(vec![(
            "go movetime 100 depth 1",
            vec!["info depth 1 score cp -14", "bestmove a7a6"],
        )])
        .await;

        let analyzer = test_analyzer(addr);
        let eval = analyzer.quick_evaluate().await.unwrap();
        assert_eq!(eval.score, Some(-14));
        assert_eq!(eval.mate, None);
        assert_eq!(eval.depth, 1);
    }

    #[tokio::test]
    async fn test_evaluate_fen_full_sequence() {
        let position_command = format!("position fen {}", TEST_FEN);
        let addr = spawn_engine(vec![
            ("uci", vec!["id name Stockfish 16.1", "uciok"]),
            ("isready", vec!["readyok"]),
            (position_command.as_str(), vec![]),
            ("isready", vec!["readyok"]),
            (
                "go movetime 1000 depth 15",
                vec![
                    "info depth 15 seldepth 20 score cp 35 nodes 2500000 pv e7e6",
                    "bestmove e7e6 ponder d2d4",
                ],
            ),
        ])
        .await;

        let analyzer = test_analyzer(addr);
        let eval = analyzer.evaluate_fen(TEST_FEN).await.unwrap();

        assert_eq!(eval.score, Some(35));
        assert_eq!(eval.mate, None);
        assert_eq!(eval.depth, 15);
        analyzer.disconnect().await;
    }

    #[tokio::test]
    async fn test_evaluate_fen_mate_score() {
        let position_command = format!("position fen {}", TEST_FEN);
        let addr = spawn_engine(vec![
            ("uci", vec!["uciok"]),
            ("isready", vec!["readyok"]),
            (position_command.as_str(), vec![]),
            ("isready", vec!["readyok"]),
            (
                "go movetime 1000 depth 15",
                vec![
                    "info depth 12 score mate 2 pv d8h4",
                    "bestmove d8h4",
                ],
            ),
        ])
        .await;

        let analyzer = test_analyzer(addr);
        let eval = analyzer.evaluate_fen(TEST_FEN).await.unwrap();

        assert_eq!(eval.score, None);
        assert_eq!(eval.mate, Some(2));
        assert_eq!(eval.depth, 12);
    }
}
