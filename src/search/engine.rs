//! The closed set of supported engines.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::ack::AckAdapter;
use super::find_str::FindStrAdapter;
use super::git_grep::GitGrepAdapter;
use super::grep::GrepAdapter;
use super::platinum_searcher::PlatinumSearcherAdapter;
use super::silver_searcher::SilverSearcherAdapter;
use super::{EngineAdapter, SearchError};

static SILVER_SEARCHER: SilverSearcherAdapter = SilverSearcherAdapter;
static PLATINUM_SEARCHER: PlatinumSearcherAdapter = PlatinumSearcherAdapter;
static ACK: AckAdapter = AckAdapter;
static GIT_GREP: GitGrepAdapter = GitGrepAdapter;
static GREP: GrepAdapter = GrepAdapter;
static FIND_STR: FindStrAdapter = FindStrAdapter;

/// Identifier of a supported search engine.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum EngineId {
    /// The Silver Searcher (`ag`).
    #[value(name = "silver_searcher", alias = "ag")]
    #[serde(alias = "ag")]
    SilverSearcher,
    /// The Platinum Searcher (`pt`).
    #[value(name = "platinum_searcher", alias = "pt")]
    #[serde(alias = "pt")]
    PlatinumSearcher,
    /// `ack`.
    #[value(name = "ack")]
    Ack,
    /// `git grep` over tracked files.
    #[value(name = "git_grep")]
    GitGrep,
    /// Recursive POSIX/GNU `grep`.
    #[default]
    #[value(name = "grep")]
    Grep,
    /// Windows `findstr`.
    #[value(name = "find_str", alias = "findstr")]
    #[serde(alias = "findstr")]
    FindStr,
}

impl EngineId {
    pub const ALL: [EngineId; 6] = [
        EngineId::SilverSearcher,
        EngineId::PlatinumSearcher,
        EngineId::Ack,
        EngineId::GitGrep,
        EngineId::Grep,
        EngineId::FindStr,
    ];

    /// The configuration name of this engine.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SilverSearcher => "silver_searcher",
            Self::PlatinumSearcher => "platinum_searcher",
            Self::Ack => "ack",
            Self::GitGrep => "git_grep",
            Self::Grep => "grep",
            Self::FindStr => "find_str",
        }
    }

    /// The shared, stateless adapter for this engine.
    #[must_use]
    pub fn adapter(self) -> &'static dyn EngineAdapter {
        match self {
            Self::SilverSearcher => &SILVER_SEARCHER,
            Self::PlatinumSearcher => &PLATINUM_SEARCHER,
            Self::Ack => &ACK,
            Self::GitGrep => &GIT_GREP,
            Self::Grep => &GREP,
            Self::FindStr => &FIND_STR,
        }
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineId {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        match name {
            "silver_searcher" | "ag" => Ok(Self::SilverSearcher),
            "platinum_searcher" | "pt" => Ok(Self::PlatinumSearcher),
            "ack" => Ok(Self::Ack),
            "git_grep" => Ok(Self::GitGrep),
            "grep" => Ok(Self::Grep),
            "find_str" | "findstr" => Ok(Self::FindStr),
            _ => Err(SearchError::EngineNotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for id in EngineId::ALL {
            assert_eq!(id.as_str().parse::<EngineId>().ok(), Some(id));
        }
    }

    #[test]
    fn short_aliases() {
        assert_eq!("ag".parse::<EngineId>().ok(), Some(EngineId::SilverSearcher));
        assert_eq!("findstr".parse::<EngineId>().ok(), Some(EngineId::FindStr));
    }

    #[test]
    fn unknown_engine() {
        let err = "ripgrep".parse::<EngineId>().unwrap_err();
        assert!(matches!(err, SearchError::EngineNotFound(ref n) if n == "ripgrep"));
    }

    #[test]
    fn adapters_are_shared() {
        for id in EngineId::ALL {
            assert!(std::ptr::addr_eq(id.adapter(), id.adapter()));
        }
    }

    #[test]
    fn deserializes_from_toml_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            engine: EngineId,
        }
        let w: Wrapper = toml::from_str("engine = \"git_grep\"").unwrap();
        assert_eq!(w.engine, EngineId::GitGrep);
        let w: Wrapper = toml::from_str("engine = \"ag\"").unwrap();
        assert_eq!(w.engine, EngineId::SilverSearcher);
        let w: Wrapper = toml::from_str("engine = \"findstr\"").unwrap();
        assert_eq!(w.engine, EngineId::FindStr);
    }
}
