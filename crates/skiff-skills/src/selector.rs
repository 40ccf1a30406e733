//! Skill selection: ranker, then router, then heuristic fallback.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::definition::Skill;
use crate::ranker::{MIN_SCORE, Ranking, rank};
use crate::registry::Catalog;
use crate::router::SkillRouter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMethod {
    /// Nothing was relevant enough.
    None,
    /// Top-ranked shortlist entry, chosen without (or despite) the router.
    Heuristic,
    Router,
}

impl std::fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Heuristic => "heuristic",
            Self::Router => "router",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub skills: Vec<Arc<Skill>>,
    pub method: SelectionMethod,
    /// The router's explanation, when it was consulted successfully.
    pub reason: Option<String>,
    pub ranking: Ranking,
}

impl Selection {
    pub fn names(&self) -> Vec<&str> {
        self.skills.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Choose the skills for a prompt. Pass `router = None` when no backend
/// credential is available.
pub async fn select(prompt: &str, catalog: &Catalog, router: Option<&SkillRouter>) -> Selection {
    let ranking = rank(prompt, catalog.skills());

    if ranking.shortlist.is_empty() || ranking.best_score() < MIN_SCORE {
        debug!(best = ranking.best_score(), "no skill passed the relevance gate");
        return Selection {
            skills: vec![],
            method: SelectionMethod::None,
            reason: None,
            ranking,
        };
    }

    let top = vec![Arc::clone(&ranking.shortlist[0].skill)];

    let Some(router) = router else {
        info!(skill = %top[0].name, score = ranking.best_score(), "selected skill heuristically");
        return Selection {
            skills: top,
            method: SelectionMethod::Heuristic,
            reason: None,
            ranking,
        };
    };

    let candidates: Vec<Arc<Skill>> = ranking
        .shortlist
        .iter()
        .map(|c| Arc::clone(&c.skill))
        .collect();

    match router.route(prompt, &candidates).await {
        Some(decision) => {
            let skills: Vec<Arc<Skill>> = candidates
                .into_iter()
                .filter(|s| decision.selected.contains(&s.name))
                .collect();
            info!(
                skills = ?skills.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
                reason = %decision.reason,
                "router selected skills"
            );
            Selection {
                skills,
                method: SelectionMethod::Router,
                reason: Some(decision.reason),
                ranking,
            }
        }
        None => {
            info!(skill = %top[0].name, "router unavailable, falling back to top-ranked skill");
            Selection {
                skills: top,
                method: SelectionMethod::Heuristic,
                reason: None,
                ranking,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::SkillSource;
    use skiff_llm::MockProvider;
    use std::path::PathBuf;

    fn skill(name: &str, description: &str) -> Skill {
        Skill {
            name: name.into(),
            title: name.into(),
            description: description.into(),
            allowed_tools: vec![],
            body: String::new(),
            file_path: PathBuf::from(format!("/skills/{name}/SKILL.md")),
            source: SkillSource::Local,
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            skill("csv-report", "Summarize tabular data into a report"),
            skill("data-report", "Summarize tabular data into a report"),
            skill("pdf", "Extract text and tables from PDF files"),
        ])
    }

    fn router(reply: &str) -> (Arc<MockProvider>, SkillRouter) {
        let provider = Arc::new(MockProvider::new("mock").with_response(reply));
        let router = SkillRouter::new(provider.clone(), "m", 128);
        (provider, router)
    }

    #[tokio::test]
    async fn irrelevant_prompt_selects_nothing_even_with_router() {
        let (provider, router) = router(r#"{"selected": ["pdf"], "reason": "r"}"#);
        let selection = select("what's the weather in Lisbon", &catalog(), Some(&router)).await;
        assert_eq!(selection.method, SelectionMethod::None);
        assert!(selection.skills.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn without_router_picks_single_top_skill() {
        let selection = select("summarize tabular data report", &catalog(), None).await;
        assert_eq!(selection.method, SelectionMethod::Heuristic);
        assert_eq!(selection.names(), vec!["csv-report"]);
        assert!(selection.ranking.shortlist.len() >= 2);
    }

    #[tokio::test]
    async fn router_choice_preserves_shortlist_order() {
        let (_provider, router) =
            router(r#"{"selected": ["data-report", "csv-report"], "reason": "both"}"#);
        let selection = select("summarize tabular data report", &catalog(), Some(&router)).await;
        assert_eq!(selection.method, SelectionMethod::Router);
        assert_eq!(selection.names(), vec!["csv-report", "data-report"]);
        assert_eq!(selection.reason.as_deref(), Some("both"));
    }

    #[tokio::test]
    async fn router_may_select_nothing() {
        let (_provider, router) = router(r#"{"selected": [], "reason": "not needed"}"#);
        let selection = select("extract pdf tables", &catalog(), Some(&router)).await;
        assert_eq!(selection.method, SelectionMethod::Router);
        assert!(selection.skills.is_empty());
    }

    #[tokio::test]
    async fn unparsable_router_reply_falls_back() {
        let (_provider, router) = router("I would pick the pdf skill.");
        let selection = select("extract pdf tables", &catalog(), Some(&router)).await;
        assert_eq!(selection.method, SelectionMethod::Heuristic);
        assert_eq!(selection.names(), vec!["pdf"]);
    }

    #[tokio::test]
    async fn router_cannot_invent_skills() {
        let (_provider, router) = router(r#"{"selected": ["made-up"], "reason": "r"}"#);
        let selection = select("extract pdf tables", &catalog(), Some(&router)).await;
        assert_eq!(selection.method, SelectionMethod::Router);
        assert!(selection.skills.is_empty());
    }

    #[tokio::test]
    async fn empty_catalog_selects_nothing() {
        let selection = select("extract pdf tables", &Catalog::default(), None).await;
        assert_eq!(selection.method, SelectionMethod::None);
    }

    #[test]
    fn method_display() {
        assert_eq!(SelectionMethod::Heuristic.to_string(), "heuristic");
        assert_eq!(
            serde_json::to_string(&SelectionMethod::Router).unwrap(),
            "\"router\""
        );
    }
}
