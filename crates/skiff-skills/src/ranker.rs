//! Lexical relevance ranking of catalog skills against a prompt.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::definition::Skill;

/// Absolute floor for a shortlist entry, and the precision gate for selection.
pub const MIN_SCORE: f64 = 0.12;
/// Shortlist entries must score at least this fraction of the best score.
pub const RELATIVE_CUTOFF: f64 = 0.6;
pub const SHORTLIST_MAX: usize = 8;

const NAME_MATCH_BONUS: f64 = 0.25;
const LONG_TOKEN_LEN: usize = 7;
const LONG_TOKEN_BONUS: f64 = 0.05;
const NAME_FRAGMENT_LEN: usize = 4;
const NAME_FRAGMENT_BONUS: f64 = 0.10;

const STOP_WORDS: &[&str] = &[
    // articles, conjunctions, prepositions
    "a", "an", "the", "and", "or", "but", "of", "to", "in", "on", "for", "with", "by", "at",
    "from", "into", "about", "as", "if", "then", "so",
    // auxiliaries
    "is", "are", "was", "be", "been", "do", "does", "can", "could", "would", "should", "will",
    "please",
    // pronouns and determiners
    "i", "me", "my", "we", "us", "our", "you", "your", "it", "its", "he", "she", "they", "them",
    "their", "this", "that", "these", "those", "some", "any", "what", "which",
    // request verbs that say nothing about the task
    "generate", "make", "create", "help", "want", "need", "get", "give", "use", "using",
];

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub skill: Arc<Skill>,
    pub score: f64,
}

/// Every catalog skill scored (descending) plus the shortlist for routing.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    pub scored: Vec<ScoredCandidate>,
    pub shortlist: Vec<ScoredCandidate>,
}

impl Ranking {
    pub fn best_score(&self) -> f64 {
        self.scored.first().map_or(0.0, |c| c.score)
    }
}

/// Lower-case, split on non-alphanumeric runs and drop stop words.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Score one skill against an already tokenized prompt.
fn score(prompt_lower: &str, prompt_tokens: &BTreeSet<String>, skill: &Skill) -> f64 {
    let skill_tokens = tokenize(&format!("{} {} {}", skill.name, skill.title, skill.description));
    if prompt_tokens.is_empty() || skill_tokens.is_empty() {
        return 0.0;
    }

    let shared: Vec<&String> = prompt_tokens.intersection(&skill_tokens).collect();
    let union = prompt_tokens.union(&skill_tokens).count();
    let mut score = shared.len() as f64 / union as f64;

    if prompt_lower.contains(&skill.name) {
        score += NAME_MATCH_BONUS;
    }
    score += LONG_TOKEN_BONUS
        * shared
            .iter()
            .filter(|t| t.chars().count() >= LONG_TOKEN_LEN)
            .count() as f64;
    score += NAME_FRAGMENT_BONUS
        * prompt_tokens
            .iter()
            .filter(|t| t.chars().count() >= NAME_FRAGMENT_LEN && skill.name.contains(t.as_str()))
            .count() as f64;

    score.min(1.0)
}

/// Rank the catalog against a prompt.
///
/// Ties keep catalog order, which is name-sorted, so the result is
/// deterministic. The shortlist keeps candidates scoring at least
/// `max(MIN_SCORE, best * RELATIVE_CUTOFF)`, at most [`SHORTLIST_MAX`].
pub fn rank(prompt: &str, catalog: &[Arc<Skill>]) -> Ranking {
    let prompt_lower = prompt.to_lowercase();
    let prompt_tokens = tokenize(prompt);

    let mut scored: Vec<ScoredCandidate> = catalog
        .iter()
        .map(|skill| ScoredCandidate {
            score: score(&prompt_lower, &prompt_tokens, skill),
            skill: Arc::clone(skill),
        })
        .collect();
    // sort_by is stable
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    let best = scored.first().map_or(0.0, |c| c.score);
    let threshold = MIN_SCORE.max(best * RELATIVE_CUTOFF);
    let shortlist = scored
        .iter()
        .filter(|c| c.score >= threshold)
        .take(SHORTLIST_MAX)
        .cloned()
        .collect();

    Ranking { scored, shortlist }
}
