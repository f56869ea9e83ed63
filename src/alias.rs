use std::collections::BTreeMap;

use crate::config::{ConfigError, ShowDefinition};

/// Maps every canonical show name and alias to its canonical show name.
///
/// Keys iterate in sorted order so matching over them is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasIndex {
    aliases: BTreeMap<String, String>,
}

impl AliasIndex {
    /// A key claimed by two different shows is rejected.
    pub fn build(shows: &BTreeMap<String, ShowDefinition>) -> Result<Self, ConfigError> {
        let mut aliases: BTreeMap<String, String> = shows
            .keys()
            .map(|name| (name.clone(), name.clone()))
            .collect();

        for (name, show) in shows {
            for alias in &show.names {
                match aliases.get(alias) {
                    Some(owner) if owner != name => {
                        return Err(ConfigError::AliasCollision {
                            alias: alias.clone(),
                            first: owner.clone(),
                            second: name.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        aliases.insert(alias.clone(), name.clone());
                    }
                }
            }
        }

        Ok(Self { aliases })
    }

    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
