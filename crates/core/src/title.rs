//! Level-based job titles.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A title earned by reaching `level_req` in a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    name: String,
    short_name: String,
    level_req: u32,
}

impl Title {
    pub fn new(
        name: impl Into<String>,
        short_name: impl Into<String>,
        level_req: u32,
    ) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        let short_name = short_name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("title name cannot be empty"));
        }
        if short_name.is_empty() {
            return Err(DomainError::validation(format!("title {name} needs a short name")));
        }
        Ok(Self {
            name,
            short_name,
            level_req,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn level_req(&self) -> u32 {
        self.level_req
    }
}

/// A title as written in configuration; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleEntry {
    /// Configuration key, used to name the entry when it is rejected.
    pub key: String,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub level_req: Option<i64>,
}

impl TitleEntry {
    fn into_title(self) -> DomainResult<Title> {
        let name = self
            .name
            .ok_or_else(|| DomainError::validation(format!("title {} has no name", self.key)))?;
        let short_name = self.short_name.ok_or_else(|| {
            DomainError::validation(format!("title {} has no short name", self.key))
        })?;
        let level_req = self
            .level_req
            .and_then(|l| u32::try_from(l).ok())
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "title {} has an invalid level requirement",
                    self.key
                ))
            })?;
        Title::new(name, short_name, level_req)
    }
}

/// Titles ordered by level requirement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleLadder {
    titles: Vec<Title>,
}

impl TitleLadder {
    pub fn new(mut titles: Vec<Title>) -> Self {
        // Stable: among equal requirements the first configured wins.
        titles.sort_by_key(|t| t.level_req);
        Self { titles }
    }

    /// Build from raw configuration entries.
    ///
    /// Invalid entries are skipped and returned with the reason, so the
    /// caller can log them.
    pub fn from_entries(entries: Vec<TitleEntry>) -> (Self, Vec<(String, DomainError)>) {
        let mut titles = Vec::with_capacity(entries.len());
        let mut rejected = Vec::new();
        for entry in entries {
            let key = entry.key.clone();
            match entry.into_title() {
                Ok(title) => titles.push(title),
                Err(err) => rejected.push((key, err)),
            }
        }
        (Self::new(titles), rejected)
    }

    /// The title with the highest requirement `level` meets.
    pub fn title_for(&self, level: u32) -> Option<&Title> {
        let reached = self.titles.partition_point(|t| t.level_req <= level);
        let best = self.titles[..reached].last()?;
        // First configured among titles sharing that requirement.
        self.titles[..reached]
            .iter()
            .find(|t| t.level_req == best.level_req)
    }

    /// The title first reached when leveling from `from` to `to`, if it
    /// differs from the one held before.
    pub fn new_title(&self, from: u32, to: u32) -> Option<&Title> {
        let before = self.title_for(from);
        let after = self.title_for(to)?;
        (before != Some(after)).then_some(after)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Title> {
        self.titles.iter()
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}
