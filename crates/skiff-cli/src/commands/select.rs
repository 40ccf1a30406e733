use console::style;
use serde::Serialize;

use skiff_config::SkiffConfig;
use skiff_runtime::Agent;
use skiff_skills::{Selection, SelectionMethod};

#[derive(Serialize)]
struct SelectionView<'a> {
    method: SelectionMethod,
    reason: Option<&'a str>,
    selected: Vec<&'a str>,
    ranking: Vec<RankedView<'a>>,
}

#[derive(Serialize)]
struct RankedView<'a> {
    name: &'a str,
    score: f64,
    shortlisted: bool,
}

impl<'a> SelectionView<'a> {
    fn new(selection: &'a Selection) -> Self {
        let ranking = &selection.ranking;
        Self {
            method: selection.method,
            reason: selection.reason.as_deref(),
            selected: selection.names(),
            ranking: ranking
                .scored
                .iter()
                .map(|c| RankedView {
                    name: &c.skill.name,
                    score: c.score,
                    shortlisted: ranking.shortlist.iter().any(|s| s.skill.name == c.skill.name),
                })
                .collect(),
        }
    }
}

pub(super) async fn cmd_select(config: &SkiffConfig, prompt: &str, json: bool) -> skiff_core::Result<()> {
    let agent = Agent::from_config(config)?;
    let selection = agent.select(prompt).await;
    let view = SelectionView::new(&selection);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    if view.ranking.is_empty() {
        println!("No skills in the catalog.");
        return Ok(());
    }

    println!("{}", style(format!("Ranking ({} skills)", view.ranking.len())).bold());
    println!("{}", "-".repeat(48));
    for entry in &view.ranking {
        let chosen = view.selected.contains(&entry.name);
        let marker = if chosen {
            style("*").green().bold()
        } else if entry.shortlisted {
            style("+").yellow()
        } else {
            style(" ")
        };
        println!("{marker} {:<36} {:>8.3}", entry.name, entry.score);
    }
    println!();

    if view.selected.is_empty() {
        println!("Selected: {} ({})", style("none").dim(), view.method);
    } else {
        println!(
            "Selected: {} ({})",
            style(view.selected.join(", ")).cyan(),
            view.method
        );
    }
    if let Some(reason) = view.reason {
        println!("Reason:   {reason}");
    }
    Ok(())
}
