use crate::error::{FetchError, Result};
use crate::github::ReleaseAsset;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Regular expression matched against release asset names.
///
/// Matching is an unanchored search: `linux` matches `tool-linux-amd64.tar.gz`.
/// Use `^`/`$` to anchor, as in `x86_64-unknown-linux-musl\.tar\.gz$`.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Pattern)
            .map_err(|source| FetchError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.0.is_match(name)
    }
}

impl FromStr for Pattern {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        Pattern::new(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the single asset whose name matches `pattern`.
pub fn select<'a>(assets: &'a [ReleaseAsset], pattern: &Pattern) -> Result<&'a ReleaseAsset> {
    let matches: Vec<&ReleaseAsset> = assets
        .iter()
        .filter(|asset| {
            let hit = pattern.is_match(&asset.name);
            tracing::debug!(
                "Checking asset {} against pattern {}: {}",
                asset.name,
                pattern,
                if hit { "match" } else { "no match" }
            );
            hit
        })
        .collect();

    match matches.as_slice() {
        [asset] => Ok(*asset),
        [] => Err(FetchError::NoMatch {
            pattern: pattern.to_string(),
            available: join_names(assets.iter()),
        }),
        many => Err(FetchError::AmbiguousMatch {
            pattern: pattern.to_string(),
            count: many.len(),
            matches: join_names(many.iter().copied()),
        }),
    }
}

fn join_names<'a>(assets: impl Iterator<Item = &'a ReleaseAsset>) -> String {
    let names = assets.map(|a| a.name.as_str()).collect::<Vec<_>>();
    if names.is_empty() {
        "No assets available".to_string()
    } else {
        names.join(", ")
    }
}
