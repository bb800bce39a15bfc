//! Identity Resolution
//!
//! Developers commit under several email addresses over time. An alias table
//! maps groups of addresses onto one canonical developer, and [`resolve`]
//! folds the raw commit authors of a run into those developers.
//!
//! Alias tables are stored as a JSON array:
//!
//! ```json
//! [
//!   { "id": "jane", "name": "Jane Doe", "emails": ["jane@work.com", "jane@home.org"] },
//!   { "name": "Sam", "emails": ["sam@work.com"] }
//! ]
//! ```
//!
//! Records without an `id` get a random one when loaded.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::error::{AnalysisError, AnalysisResult};
use crate::model::Author;

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Persisted mapping of several email addresses onto one developer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    /// Stable identifier of the record
    #[serde(default = "generate_id")]
    pub id: String,
    /// Display name, may be empty
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub emails: Vec<String>,
}

impl Alias {
    /// Create an alias with a generated id
    pub fn new<I, S>(name: impl Into<String>, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: generate_id(),
            name: name.into(),
            emails: emails.into_iter().map(Into::into).collect(),
        }
    }

    /// Replace the generated id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Whether the alias claims any of the author's emails
    pub fn matches(&self, author: &Author) -> bool {
        author.shares_any(&self.emails)
    }

    fn merge(&self, author: &Author) -> Author {
        let name = if self.name.trim().is_empty() {
            author.name.clone()
        } else {
            self.name.clone()
        };

        let mut emails: BTreeSet<String> = self.emails.iter().cloned().collect();
        emails.extend(author.emails.iter().cloned());

        Author { name, emails }
    }
}

/// Loader for alias table files
pub struct AliasTable;

impl AliasTable {
    /// Load an alias table, an absent or blank path gives an empty table
    pub fn load(path: Option<&Path>) -> AnalysisResult<Vec<Alias>> {
        let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(Vec::new());
        };

        let content = fs::read_to_string(path).map_err(|e| AnalysisError::AliasLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let aliases = Self::parse(&content).map_err(|e| match e {
            AnalysisError::AliasLoad { message, .. } => AnalysisError::AliasLoad {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;

        info!("Loaded {} aliases from {}", aliases.len(), path.display());
        Ok(aliases)
    }

    /// Parse and validate alias table JSON
    pub fn parse(content: &str) -> AnalysisResult<Vec<Alias>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let aliases: Vec<Alias> = serde_json::from_str(content).map_err(|e| AnalysisError::AliasLoad {
            path: Default::default(),
            message: e.to_string(),
        })?;

        validate_disjoint(&aliases)?;
        Ok(aliases)
    }
}

/// Fail when two alias records claim the same email address
///
/// A record listing the same address twice is accepted.
pub fn validate_disjoint(aliases: &[Alias]) -> AnalysisResult<()> {
    let mut owners: HashMap<&str, usize> = HashMap::new();

    for (index, alias) in aliases.iter().enumerate() {
        for email in &alias.emails {
            match owners.get(email.as_str()) {
                Some(&owner) if owner != index => {
                    return Err(AnalysisError::AliasConflict { email: email.clone() });
                }
                Some(_) => {}
                None => {
                    owners.insert(email.as_str(), index);
                }
            }
        }
    }

    Ok(())
}

/// Resolve raw commit authors into canonical developers
///
/// Each raw author is merged into the first alias claiming one of its emails.
/// An alias merges at most one raw author per call; later raw authors matching
/// an alias already claimed stay separate entries. Output order follows the
/// order of first appearance in `raw_authors`.
pub fn resolve(raw_authors: &[Author], aliases: &[Alias]) -> AnalysisResult<Vec<Author>> {
    if aliases.is_empty() {
        return Ok(raw_authors.to_vec());
    }

    validate_disjoint(aliases)?;

    let mut entries: Vec<(String, Author)> = Vec::with_capacity(raw_authors.len());
    let mut claimed: HashMap<&str, usize> = HashMap::new();

    for author in raw_authors {
        match aliases.iter().find(|alias| alias.matches(author)) {
            Some(alias) if !claimed.contains_key(alias.id.as_str()) => {
                debug!("Merging '{}' into alias '{}'", author.name, alias.id);
                claimed.insert(alias.id.as_str(), entries.len());
                entries.push((alias.id.clone(), alias.merge(author)));
            }
            Some(alias) => {
                debug!("Alias '{}' already claimed, keeping '{}' separate", alias.id, author.name);
                entries.push((generate_id(), author.clone()));
            }
            None => entries.push((generate_id(), author.clone())),
        }
    }

    Ok(entries.into_iter().map(|(_, author)| author).collect())
}
