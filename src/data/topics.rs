use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Topic {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum TopicFetchError {
    #[error("no topic data available for cluster {id}")]
    Missing { id: String },
    #[error("failed to read topic data: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid topic data: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Narrow interface to whatever service produces topic summaries for one
/// leaf cluster. Implementations must be idempotent and safe to retry.
pub trait TopicSource: Send + Sync {
    fn fetch_topics(&self, l0_id: &str) -> Result<Vec<Topic>, TopicFetchError>;
}

/// Reads `<dir>/<l0_id>.json`, an ordered array of `{id, text}` records.
pub struct DirTopicSource {
    dir: PathBuf,
}

impl DirTopicSource {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl TopicSource for DirTopicSource {
    fn fetch_topics(&self, l0_id: &str) -> Result<Vec<Topic>, TopicFetchError> {
        let path = self.dir.join(format!("{l0_id}.json"));
        if !path.is_file() {
            return Err(TopicFetchError::Missing {
                id: l0_id.to_string(),
            });
        }

        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Stands in when no topics directory was given; every leaf reports the same
/// unavailable state instead of failing at startup.
pub struct UnavailableTopicSource;

impl TopicSource for UnavailableTopicSource {
    fn fetch_topics(&self, l0_id: &str) -> Result<Vec<Topic>, TopicFetchError> {
        Err(TopicFetchError::Missing {
            id: l0_id.to_string(),
        })
    }
}
