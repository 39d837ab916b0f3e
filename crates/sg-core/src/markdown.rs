//! Markdown normalization for speech input
//!
//! Text sent to the speech endpoint is frequently LLM output formatted as
//! Markdown. Heading hashes, list bullets, fill-in blanks and link brackets
//! would otherwise be read aloud literally, so they are stripped here before
//! the text reaches the synthesis provider.
//!
//! The rules run in a fixed order and every rule sees the output of the
//! previous one:
//!
//! 1. heading strip (`# title` → `title`, `#tag` is left alone)
//! 2. list bullet strip, keeping blockquote markers (`> * item` → `> item`)
//! 3. underscore collapse (`_____` → `__`)
//! 4. bare bracket removal (`[1]` is deleted unless a `(...)` follows)
//! 5. link resolution (`[label](url)` → `label`)

use std::sync::LazyLock;

use regex::{NoExpand, Regex, RegexBuilder};

static MARKDOWN: LazyLock<NormalizationPipeline> = LazyLock::new(|| {
    NormalizationPipeline::markdown().expect("built-in markdown rules must compile")
});

/// Strip Markdown formatting from `text` so it can be spoken.
///
/// Never fails: input without any Markdown comes back unchanged.
pub fn normalize(text: &str) -> String {
    MARKDOWN.apply(text)
}

/// The shared Markdown pipeline used by [`normalize`].
pub fn markdown_pipeline() -> &'static NormalizationPipeline {
    &MARKDOWN
}

/// Where a rule's pattern is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `^` and `$` match at every line boundary
    Line,
    /// `^` and `$` match only at the ends of the text
    Document,
}

/// How a rule rewrites its matches
#[derive(Debug, Clone)]
pub enum Replacement {
    /// Replace each match with a fixed string, `$` taken literally
    Literal(&'static str),
    /// Expand a `${n}` template against the match's capture groups
    Template(&'static str),
    /// Delete each match unless the text right after it starts with the guard
    DeleteUnlessFollowedBy(Regex),
}

impl Replacement {
    /// Build a conditional deletion. `guard` is anchored to the end of each match.
    pub fn delete_unless_followed_by(guard: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{guard})")).map(Self::DeleteUnlessFollowedBy)
    }
}

/// A single rewrite step
#[derive(Debug, Clone)]
pub struct NormalizationRule {
    name: &'static str,
    pattern: Regex,
    scope: Scope,
    replacement: Replacement,
}

impl NormalizationRule {
    pub fn new(
        name: &'static str,
        pattern: &str,
        scope: Scope,
        replacement: Replacement,
    ) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern)
            .multi_line(scope == Scope::Line)
            .build()?;

        Ok(Self {
            name,
            pattern,
            scope,
            replacement,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Rewrite every non-overlapping match in `text`
    pub fn apply(&self, text: &str) -> String {
        match &self.replacement {
            Replacement::Literal(with) => self.pattern.replace_all(text, NoExpand(with)).into_owned(),
            Replacement::Template(template) => self.pattern.replace_all(text, *template).into_owned(),
            Replacement::DeleteUnlessFollowedBy(guard) => {
                let mut out = String::with_capacity(text.len());
                let mut last = 0;

                for m in self.pattern.find_iter(text) {
                    if guard.is_match(&text[m.end()..]) {
                        continue;
                    }
                    out.push_str(&text[last..m.start()]);
                    last = m.end();
                }

                out.push_str(&text[last..]);
                out
            }
        }
    }
}

/// An ordered list of rules applied one after another
#[derive(Debug, Clone, Default)]
pub struct NormalizationPipeline {
    rules: Vec<NormalizationRule>,
}

impl NormalizationPipeline {
    pub fn new(rules: Vec<NormalizationRule>) -> Self {
        Self { rules }
    }

    /// The Markdown rule set, in execution order.
    ///
    /// Bracket removal comes last: a bare `[x]` is only told apart from a
    /// link by what follows it, so both bracket passes have to see the text
    /// after headings and bullets are gone.
    pub fn markdown() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            NormalizationRule::new(
                "heading",
                r"^#+\s",
                Scope::Line,
                Replacement::Literal(""),
            )?,
            NormalizationRule::new(
                "list_bullet",
                r"^((?:>(?:\s*>)*\s*)?)[ \t]*\*\s",
                Scope::Line,
                Replacement::Template("${1}"),
            )?,
            NormalizationRule::new(
                "underscore_blank",
                r"_{2,}",
                Scope::Document,
                Replacement::Literal("__"),
            )?,
            NormalizationRule::new(
                "bare_bracket",
                r"\[[^\]]*\]",
                Scope::Document,
                Replacement::delete_unless_followed_by(r"\([^\)]*\)")?,
            )?,
            NormalizationRule::new(
                "link",
                r"\[([^\]]*)\]\([^\)]*\)",
                Scope::Document,
                Replacement::Template("${1}"),
            )?,
        ]))
    }

    pub fn apply(&self, text: &str) -> String {
        let mut text = text.to_owned();
        for rule in &self.rules {
            text = rule.apply(&text);
        }
        text
    }

    pub fn rules(&self) -> &[NormalizationRule] {
        &self.rules
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(NormalizationRule::name).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
