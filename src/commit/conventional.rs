//! Conventional commit header parsing.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;

/// Conventional commit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Build,
    Ci,
    Chore,
    Revert,
}

impl CommitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Perf => "perf",
            CommitType::Test => "test",
            CommitType::Build => "build",
            CommitType::Ci => "ci",
            CommitType::Chore => "chore",
            CommitType::Revert => "revert",
        }
    }
}

impl std::str::FromStr for CommitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "feat" => Ok(Self::Feat),
            "fix" => Ok(Self::Fix),
            "docs" => Ok(Self::Docs),
            "style" => Ok(Self::Style),
            "refactor" => Ok(Self::Refactor),
            "perf" => Ok(Self::Perf),
            "test" => Ok(Self::Test),
            "build" => Ok(Self::Build),
            "ci" => Ok(Self::Ci),
            "chore" => Ok(Self::Chore),
            "revert" => Ok(Self::Revert),
            _ => Err(format!("Unknown commit type: {}", s)),
        }
    }
}

/// Parsed `type(scope)!: description` header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitHeader {
    pub commit_type: CommitType,
    pub scope: Option<String>,
    pub breaking: bool,
    pub description: String,
}

impl fmt::Display for CommitHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.commit_type.as_str())?;
        if let Some(scope) = &self.scope {
            write!(f, "({scope})")?;
        }
        if self.breaking {
            f.write_str("!")?;
        }
        write!(f, ": {}", self.description)
    }
}

// type(scope)!: description, scope and ! optional
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]+)(?:\(([^()\s][^()]*)\))?(!)?: (\S.*)$")
        .expect("header pattern is valid")
});

/// Parse a single line as a conventional commit header.
///
/// Returns `None` unless the type is one of the known [`CommitType`]s and
/// the description is non-empty.
pub fn parse_header(line: &str) -> Option<CommitHeader> {
    let caps = HEADER_RE.captures(line.trim_end())?;

    let commit_type = caps.get(1)?.as_str().parse::<CommitType>().ok()?;
    let scope = caps.get(2).map(|m| m.as_str().trim().to_string());
    let breaking = caps.get(3).is_some();
    let description = caps.get(4)?.as_str().trim().to_string();

    if description.is_empty() {
        return None;
    }

    Some(CommitHeader {
        commit_type,
        scope,
        breaking,
        description,
    })
}
