//! 排行榜文档：按玩家名合并、取最高分，并读写 JSON 文件。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::io;
use std::path::Path;
use tokio::fs;
use tokio::io::ErrorKind;

/// A single leaderboard record keyed by player name.
///
/// Fields other than `name` and `score` are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub score: Number,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entry {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, score: impl Into<Number>) -> Self {
        Self {
            name: name.into(),
            score: score.into(),
            extra: Map::new(),
        }
    }

    fn score_value(&self) -> f64 {
        self.score.as_f64().unwrap_or(f64::NAN)
    }

    fn beats(&self, other: &Entry) -> bool {
        self.score_value() > other.score_value()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardDocument {
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LeaderboardDocument {
    /// 同名条目仅在新分数严格更高时原地替换；否则追加到末尾。
    pub fn upsert_best(mut self, incoming: Entry) -> Self {
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.name == incoming.name)
        {
            Some(existing) => {
                if incoming.beats(existing) {
                    *existing = incoming;
                }
            }
            None => self.entries.push(incoming),
        }
        self
    }

    pub fn merge_all(self, incoming: impl IntoIterator<Item = Entry>) -> Self {
        incoming
            .into_iter()
            .fold(self, |document, entry| document.upsert_best(entry))
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a document from a JSON value, accepting either an object or a
    /// string holding the encoded document.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::String(text) => serde_json::from_str(&text),
            other => serde_json::from_value(other),
        }
    }
}

#[derive(Debug)]
pub enum LeaderboardError {
    NotFound,
    Corrupt(serde_json::Error),
    Io(io::Error),
}

impl From<io::Error> for LeaderboardError {
    fn from(err: io::Error) -> Self {
        if err.kind() == ErrorKind::NotFound {
            LeaderboardError::NotFound
        } else {
            LeaderboardError::Io(err)
        }
    }
}

pub async fn load(path: &Path) -> Result<LeaderboardDocument, LeaderboardError> {
    let bytes = fs::read(path).await?;
    serde_json::from_slice(&bytes).map_err(LeaderboardError::Corrupt)
}

/// Overwrites `path` in place; a crash mid-write can leave a truncated file.
pub async fn save(path: &Path, document: &LeaderboardDocument) -> Result<(), LeaderboardError> {
    let text = document
        .to_pretty_json()
        .map_err(|err| LeaderboardError::Io(io::Error::other(err)))?;
    fs::write(path, text).await?;
    Ok(())
}

#[derive(Debug, PartialEq)]
pub enum SyncOutcome {
    Merged(LeaderboardDocument),
    Created(LeaderboardDocument),
}

/// 合并已有文档并写回；文档不存在时用传入数据新建（同名条目取最高分）。
///
/// Callers must hold the path lock for the whole call to avoid lost updates.
pub async fn sync(
    path: &Path,
    incoming: Option<LeaderboardDocument>,
) -> Result<SyncOutcome, LeaderboardError> {
    match load(path).await {
        Ok(existing) => {
            let merged = match incoming {
                Some(document) => existing.merge_all(document.entries),
                None => existing,
            };
            save(path, &merged).await?;
            Ok(SyncOutcome::Merged(merged))
        }
        Err(LeaderboardError::NotFound) => {
            let Some(LeaderboardDocument { entries, extra }) = incoming else {
                return Err(LeaderboardError::NotFound);
            };
            let created = LeaderboardDocument {
                entries: Vec::new(),
                extra,
            }
            .merge_all(entries);
            save(path, &created).await?;
            Ok(SyncOutcome::Created(created))
        }
        Err(err) => Err(err),
    }
}

/// Upserts one entry, starting from an empty document when none exists yet.
pub async fn record_entry(
    path: &Path,
    entry: Entry,
) -> Result<LeaderboardDocument, LeaderboardError> {
    let existing = match load(path).await {
        Ok(document) => document,
        Err(LeaderboardError::NotFound) => LeaderboardDocument::default(),
        Err(err) => return Err(err),
    };
    let merged = existing.upsert_best(entry);
    save(path, &merged).await?;
    Ok(merged)
}
