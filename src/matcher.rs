// src/matcher.rs

//! The matcher algebra: glob and regex patterns, possibly inverted, combined
//! by logical AND.
//!
//! Besides plain matching, every matcher answers [`Matcher::exclude_prefix`]:
//! whether *no* path with a given prefix can ever match. That answer may have
//! false negatives but never false positives; the watcher uses it to skip
//! whole directory subtrees.

use std::fmt;
use std::sync::OnceLock;

use globset::GlobBuilder;
use regex::Regex;
use regex_syntax::hir::{Hir, HirKind, Look};

use crate::errors::{ReflexError, Result};

/// A matcher decides whether a path name matches its set of patterns.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Matches every name; never excludes a prefix.
    All,
    Glob(GlobPattern),
    Regex(RegexPattern),
    /// Logical AND of its children for matching; logical OR for exclusion.
    Multi(Vec<Matcher>),
}

impl Matcher {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Glob(glob) => glob.matches(name),
            Matcher::Regex(regex) => regex.matches(name),
            Matcher::Multi(children) => children.iter().all(|child| child.matches(name)),
        }
    }

    /// Whether all paths with this prefix cannot match. False negatives are
    /// allowed; false positives would hide matching files.
    pub fn exclude_prefix(&self, prefix: &str) -> bool {
        match self {
            Matcher::All => false,
            Matcher::Glob(_) => false,
            Matcher::Regex(regex) => regex.exclude_prefix(prefix),
            Matcher::Multi(children) => {
                children.iter().any(|child| child.exclude_prefix(prefix))
            }
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::All => f.write_str("(Implicitly matching all non-excluded files)"),
            Matcher::Glob(glob) => {
                let kind = if glob.inverse { "Inverted glob" } else { "Glob" };
                write!(f, "{kind} match: {:?}", glob.pattern)
            }
            Matcher::Regex(regex) => {
                let kind = if regex.inverse {
                    "Inverted regex"
                } else {
                    "Regex"
                };
                write!(f, "{kind} match: {:?}", regex.regex.as_str())
            }
            Matcher::Multi(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "{child}")?;
                }
                Ok(())
            }
        }
    }
}

/// A shell glob (`*`, `?`, `[set]`), matched against the whole path.
/// `*` and `?` do not cross `/` separators.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    pattern: String,
    matcher: globset::GlobMatcher,
    inverse: bool,
}

impl GlobPattern {
    pub fn new(pattern: &str, inverse: bool) -> Result<Self> {
        // The glob language has no `**`: adjacent stars match exactly what a
        // single star does, and never cross a separator. Collapsing runs of
        // `*` keeps globset's recursive-wildcard extension switched off.
        let glob = GlobBuilder::new(&collapse_star_runs(pattern))
            .literal_separator(true)
            .build()
            .map_err(|err| ReflexError::InvalidPattern(err.to_string()))?;
        Ok(Self {
            pattern: pattern.to_string(),
            matcher: glob.compile_matcher(),
            inverse,
        })
    }

    fn matches(&self, name: &str) -> bool {
        self.matcher.is_match(name) != self.inverse
    }
}

/// A regex searched over the whole path, with a memoized answer to whether
/// the pattern could ever be invalidated by appending more input.
#[derive(Debug, Clone)]
pub struct RegexPattern {
    regex: Regex,
    inverse: bool,
    can_exclude_prefix: OnceLock<bool>,
}

impl RegexPattern {
    pub fn new(regex: Regex, inverse: bool) -> Self {
        Self {
            regex,
            inverse,
            can_exclude_prefix: OnceLock::new(),
        }
    }

    pub fn compile(pattern: &str, inverse: bool) -> Result<Self> {
        let regex =
            Regex::new(pattern).map_err(|err| ReflexError::InvalidPattern(err.to_string()))?;
        Ok(Self::new(regex, inverse))
    }

    fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name) != self.inverse
    }

    /// Given a prefix this (inverse) regex matches, can any string extending
    /// the prefix fail to match? With a classic regular expression that can
    /// only happen through a zero-width assertion that stops holding once
    /// more input follows: `$`, `\z`, or `\b`. For instance `foo$`, `foo\b`,
    /// and `(foo$)|(baz$)` all match "foo" but not "foobar". So the prefix is
    /// excludable only when the pattern contains none of those assertions.
    fn exclude_prefix(&self, prefix: &str) -> bool {
        if !self.inverse {
            return false;
        }
        if self.regex.as_str().is_empty() || !self.regex.is_match(prefix) {
            return false;
        }
        *self
            .can_exclude_prefix
            .get_or_init(|| !has_non_start_assertion(self.regex.as_str()))
    }
}

/// Replace every run of consecutive `*` with a single `*`. A backslash
/// escapes the following character, so a literal `\*` never starts a run.
fn collapse_star_runs(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '*' => {
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
            }
            _ => {}
        }
    }
    out
}

/// Walk the parsed pattern looking for zero-width assertions other than the
/// start anchors. Unparseable input (which cannot happen for an already
/// compiled regex) is treated as containing one, keeping the answer sound.
fn has_non_start_assertion(pattern: &str) -> bool {
    match regex_syntax::parse(pattern) {
        Ok(hir) => hir_has_non_start_assertion(&hir),
        Err(_) => true,
    }
}

fn hir_has_non_start_assertion(hir: &Hir) -> bool {
    match hir.kind() {
        HirKind::Look(look) => !matches!(look, Look::Start | Look::StartLF | Look::StartCRLF),
        HirKind::Repetition(rep) => hir_has_non_start_assertion(&rep.sub),
        HirKind::Capture(cap) => hir_has_non_start_assertion(&cap.sub),
        HirKind::Concat(subs) | HirKind::Alternation(subs) => {
            subs.iter().any(hir_has_non_start_assertion)
        }
        _ => false,
    }
}

/// Combine multiple (possibly inverse) regex and glob patterns into a single
/// matcher. With no patterns at all, the result matches everything.
pub fn parse_matchers(
    regexes: &[String],
    inverse_regexes: &[String],
    globs: &[String],
    inverse_globs: &[String],
) -> Result<Matcher> {
    if regexes.is_empty() && inverse_regexes.is_empty() && globs.is_empty() && inverse_globs.is_empty()
    {
        return Ok(Matcher::Multi(vec![Matcher::All]));
    }
    let mut children = Vec::new();
    for pattern in regexes {
        children.push(Matcher::Regex(RegexPattern::compile(pattern, false)?));
    }
    for pattern in inverse_regexes {
        children.push(Matcher::Regex(RegexPattern::compile(pattern, true)?));
    }
    for pattern in globs {
        children.push(Matcher::Glob(GlobPattern::new(pattern, false)?));
    }
    for pattern in inverse_globs {
        children.push(Matcher::Glob(GlobPattern::new(pattern, true)?));
    }
    Ok(Matcher::Multi(children))
}

/// Patterns excluded by default: VCS bookkeeping, editor temp files, and OS
/// metadata.
pub const DEFAULT_EXCLUDES: [&str; 7] = [
    // VCS dirs
    r"(^|/)\.git/",
    r"(^|/)\.hg/",
    // Vim
    r"~$",
    r"\.swp$",
    // Emacs
    r"\.#",
    r"(^|/)#.*#$",
    // OS X
    r"(^|/)\.DS_Store$",
];

/// The default exclusion matcher: an AND of inverse regexes over
/// [`DEFAULT_EXCLUDES`].
pub fn default_exclude_matcher() -> Matcher {
    let children = DEFAULT_EXCLUDES
        .iter()
        .map(|pattern| {
            let regex = Regex::new(pattern).expect("default exclude pattern must compile");
            Matcher::Regex(RegexPattern::new(regex, true))
        })
        .collect();
    Matcher::Multi(children)
}
