//! Template records and version selection.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BuilderError;
use crate::key::{KeyKind, TemplateKey};
use crate::value::Value;

/// Which content slot of a template to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    #[default]
    Draft,
    Published,
}

impl Version {
    /// Parse an optional selector, falling back to `default` when absent.
    pub fn parse_or(selector: Option<&str>, default: Version) -> Result<Self, BuilderError> {
        selector.map_or(Ok(default), str::parse::<Version>)
    }
}

impl FromStr for Version {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Version::Draft),
            "published" => Ok(Version::Published),
            _ => Err(BuilderError::InvalidVersion {
                selector: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Draft => f.write_str("draft"),
            Version::Published => f.write_str("published"),
        }
    }
}

/// A stored template with its draft and published bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub key: String,
    pub kind: KeyKind,
    pub name: String,
    pub draft: String,
    /// `None` until the first publish.
    pub published: Option<String>,
    /// Canned scope data used only by previews.
    #[serde(default)]
    pub mock_data: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl TemplateRecord {
    /// Body for the requested version, if that slot has content.
    pub fn body(&self, version: Version) -> Option<&str> {
        match version {
            Version::Draft => Some(&self.draft),
            Version::Published => self.published.as_deref(),
        }
    }

    /// Whether the template was published at least once.
    pub fn is_published(&self) -> bool {
        self.published.is_some() || self.published_at.is_some()
    }
}

/// Input for creating a template.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub key: TemplateKey,
    pub name: String,
    pub draft: String,
    pub mock_data: Option<Value>,
    pub stamp: Stamp,
}

impl NewTemplate {
    pub(crate) fn into_record(self) -> TemplateRecord {
        TemplateRecord {
            kind: self.key.kind(),
            key: self.key.as_str().to_string(),
            name: self.name,
            draft: self.draft,
            published: None,
            mock_data: self.mock_data,
            created_at: self.stamp.at,
            updated_at: self.stamp.at,
            published_at: None,
            created_by: self.stamp.actor.clone(),
            updated_by: self.stamp.actor,
        }
    }
}

/// Who changed a template and when.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamp {
    pub actor: Option<String>,
    pub at: DateTime<Utc>,
}

impl Stamp {
    pub fn now(actor: Option<&str>) -> Self {
        Self {
            actor: actor.map(str::to_string),
            at: Utc::now(),
        }
    }
}
