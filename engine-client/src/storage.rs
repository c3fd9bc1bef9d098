//! 评估缓存存储
//!
//! 以每盘棋一个 JSON 文件的形式缓存引擎评估结果，
//! 键为 FEN 加搜索参数。缓存缺失是正常情况而非错误。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use uci_protocol::{Evaluation, SearchOptions, EVAL_DEPTH, EVAL_MOVE_TIME_MS};

use crate::analyzer::EngineAnalyzer;

/// 评估缓存键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalKey {
    /// 被评估局面
    pub fen: String,
    /// 搜索深度
    pub depth: u32,
    /// 思考时间（毫秒）
    pub move_time_ms: u64,
}

impl EvalKey {
    /// 使用默认搜索参数构造
    pub fn new(fen: impl Into<String>) -> Self {
        Self {
            fen: fen.into(),
            depth: EVAL_DEPTH,
            move_time_ms: EVAL_MOVE_TIME_MS,
        }
    }

    /// 缓存文件中的键字符串
    pub fn key_string(&self) -> String {
        format!("{}_{}_{}", self.fen, self.depth, self.move_time_ms)
    }
}

/// 带时间戳的缓存条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvaluation {
    #[serde(flatten)]
    pub eval: Evaluation,
    /// 评估完成时间
    pub evaluated_at: DateTime<Utc>,
}

/// 评估缓存管理器
pub struct EvalStorage {
    cache_dir: PathBuf,
}

impl EvalStorage {
    /// 在指定目录下创建缓存管理器
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();

        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)
                .with_context(|| format!("Failed to create eval cache directory: {:?}", cache_dir))?;
        }

        Ok(Self { cache_dir })
    }

    /// 读取缓存的评估
    pub fn read_eval(&self, game_id: &str, key: &EvalKey) -> Option<StoredEvaluation> {
        self.load_game_cache(game_id).remove(&key.key_string())
    }

    /// 写入评估结果
    pub fn write_eval(&self, game_id: &str, key: &EvalKey, eval: Evaluation) -> Result<()> {
        let mut cache = self.load_game_cache(game_id);
        cache.insert(
            key.key_string(),
            StoredEvaluation {
                eval,
                evaluated_at: Utc::now(),
            },
        );

        let path = self.game_file_path(game_id);
        let content =
            serde_json::to_string_pretty(&cache).context("Failed to serialize eval cache")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write eval cache file: {:?}", path))?;

        Ok(())
    }

    /// 按 FEN 在全部缓存文件中查找评估（忽略搜索参数）
    pub fn get_eval_by_fen(&self, fen: &str) -> Result<Option<StoredEvaluation>> {
        let prefix = format!("{}_", fen);

        let entries = fs::read_dir(&self.cache_dir)
            .with_context(|| format!("Failed to read eval cache directory: {:?}", self.cache_dir))?;

        for entry in entries {
            let entry = entry.context("Failed to read cache directory entry")?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let Ok(cache) = serde_json::from_str::<HashMap<String, StoredEvaluation>>(&content)
            else {
                // 跳过损坏的文件
                continue;
            };

            if let Some((_, stored)) = cache.into_iter().find(|(k, _)| k.starts_with(&prefix)) {
                return Ok(Some(stored));
            }
        }

        Ok(None)
    }

    /// 读穿缓存：命中直接返回，未命中则评估并写入
    pub async fn get_or_evaluate(
        &self,
        analyzer: &EngineAnalyzer,
        game_id: &str,
        key: &EvalKey,
    ) -> Result<Evaluation> {
        if let Some(stored) = self.read_eval(game_id, key) {
            debug!("Eval cache hit for game {}", game_id);
            return Ok(stored.eval);
        }

        let options = SearchOptions::move_time(key.move_time_ms).with_depth(key.depth);
        let eval = analyzer
            .evaluate_position(&key.fen, &options)
            .await
            .with_context(|| format!("Engine evaluation failed for game {}", game_id))?;

        self.write_eval(game_id, key, eval)?;
        Ok(eval)
    }

    /// 缓存目录路径
    pub fn cache_directory(&self) -> &Path {
        &self.cache_dir
    }

    fn game_file_path(&self, game_id: &str) -> PathBuf {
        self.cache_dir
            .join(format!("game_{}.json", sanitize_game_id(game_id)))
    }

    /// 读取一盘棋的全部缓存条目
    fn load_game_cache(&self, game_id: &str) -> HashMap<String, StoredEvaluation> {
        let path = self.game_file_path(game_id);
        if !path.exists() {
            return HashMap::new();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(cache) => cache,
                Err(e) => {
                    warn!("Invalid eval cache file {:?}: {}", path, e);
                    HashMap::new()
                }
            },
            Err(e) => {
                warn!("Failed to read eval cache file {:?}: {}", path, e);
                HashMap::new()
            }
        }
    }
}

/// 清理棋局 ID 中不适合做文件名的字符
fn sanitize_game_id(game_id: &str) -> String {
    game_id
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
