use crate::error::DriverError;
use std::fmt;

/// Opaque identifier of a fuzz target as the engine knows it.
///
/// Only blank names are rejected here. Whether the target actually exists is
/// for the engine to decide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetName(String);

impl TargetName {
    /// Wraps `name` unchanged.
    ///
    /// Returns [`DriverError::Usage`] if the name is empty or only whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, DriverError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DriverError::Usage(
                "fuzz target name must not be blank".to_string(),
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TargetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Targets in the order the engine reported them. Built per query, never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetCatalog {
    targets: Vec<TargetName>,
}

impl TargetCatalog {
    pub fn new(targets: Vec<TargetName>) -> Self {
        Self { targets }
    }

    /// Parses an engine listing: one name per line, surrounding whitespace
    /// dropped, blank lines skipped, order kept.
    pub fn from_listing(listing: &str) -> Self {
        let targets = listing
            .lines()
            .filter_map(|line| TargetName::new(line.trim()).ok())
            .collect();
        Self { targets }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetName> {
        self.targets.iter()
    }

    /// Writes one name per line.
    pub fn write_to(&self, out: &mut dyn std::io::Write) -> std::io::Result<()> {
        for target in &self.targets {
            writeln!(out, "{target}")?;
        }
        out.flush()
    }
}

impl IntoIterator for TargetCatalog {
    type Item = TargetName;
    type IntoIter = std::vec::IntoIter<TargetName>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.into_iter()
    }
}
