//! Build models: status markers, resolved builds and build logs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::models::{PrInfo, SuiteResult};

/// Contents of a `started.json` or `finished.json` marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildMetadata(pub Map<String, Value>);

impl BuildMetadata {
    /// Parse marker bytes read from `path`.
    ///
    /// Empty content and a literal JSON `null` are treated as an absent marker.
    /// Anything else must be a JSON object.
    pub fn parse(path: &str, data: &[u8]) -> AppResult<Option<Self>> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let value: Value =
            serde_json::from_slice(data).map_err(|e| AppError::MalformedMetadata {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        match value {
            Value::Null => Ok(None),
            Value::Object(map) => Ok(Some(Self(map))),
            other => Err(AppError::MalformedMetadata {
                path: path.to_string(),
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Unix timestamp in seconds, accepting integers, floats and numeric strings.
    pub fn timestamp(&self) -> Option<i64> {
        match self.0.get("timestamp")? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
            _ => None,
        }
    }

    pub fn version(&self) -> Option<&str> {
        self.0.get("version").and_then(Value::as_str)
    }

    /// Overall build result, e.g. `SUCCESS` or `FAILURE`.
    pub fn result(&self) -> Option<&str> {
        self.0.get("result").and_then(Value::as_str)
    }

    /// Raw `pull` field (`base:sha,number:sha,...`).
    pub fn pull(&self) -> Option<&str> {
        self.0.get("pull").and_then(Value::as_str)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One build in a job history or build list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BuildRecord {
    /// Build number or content hash
    pub id: String,
    /// Storage path of the build directory
    pub location: String,
    #[schema(value_type = Option<Object>)]
    pub started: Option<BuildMetadata>,
    #[schema(value_type = Option<Object>)]
    pub finished: Option<BuildMetadata>,
}

impl BuildRecord {
    /// A build without any marker does not exist.
    pub fn exists(&self) -> bool {
        self.started.is_some() || self.finished.is_some()
    }

    pub fn start_timestamp(&self) -> Option<i64> {
        self.started.as_ref().and_then(BuildMetadata::timestamp)
    }
}

/// A `name:sha` entry from the started marker's `pull` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PullRef {
    pub name: String,
    pub sha: String,
}

/// Parse `base:sha,1234:sha` into refs. Entries without a sha keep an empty one.
pub fn parse_pull_refs(pull: &str) -> Vec<PullRef> {
    pull.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((name, sha)) => PullRef {
                name: name.to_string(),
                sha: sha.to_string(),
            },
            None => PullRef {
                name: entry.to_string(),
                sha: String::new(),
            },
        })
        .collect()
}

/// Fully resolved build: markers plus parsed test results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BuildDetails {
    pub build_dir: String,
    #[schema(value_type = Option<Object>)]
    pub started: Option<BuildMetadata>,
    #[schema(value_type = Option<Object>)]
    pub finished: Option<BuildMetadata>,
    pub results: SuiteResult,
}

impl BuildDetails {
    /// Version string, preferring the finished marker.
    pub fn version(&self) -> Option<&str> {
        self.finished
            .as_ref()
            .and_then(BuildMetadata::version)
            .or_else(|| self.started.as_ref().and_then(BuildMetadata::version))
    }

    /// Commit identifier: the part of the version after the last `+`.
    pub fn commit(&self) -> Option<&str> {
        self.version().and_then(|v| v.rsplit('+').next())
    }

    pub fn pull_refs(&self) -> Vec<PullRef> {
        self.started
            .as_ref()
            .and_then(BuildMetadata::pull)
            .map(parse_pull_refs)
            .unwrap_or_default()
    }
}

/// Digest of a build's execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BuildLog {
    pub digest: String,
    /// Set when the log came from the live execution controller
    pub source_url: Option<String>,
}

/// Everything shown for one build.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BuildView {
    pub job: String,
    pub build: String,
    pub details: BuildDetails,
    pub commit: Option<String>,
    pub pull_refs: Vec<PullRef>,
    /// Set for builds stored under the PR prefix
    pub pr: Option<PrInfo>,
    /// Present when the build log was wanted and could be found
    pub log: Option<BuildLog>,
}
