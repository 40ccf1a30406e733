use console::style;

use skiff_config::SkiffConfig;
use skiff_runtime::{Agent, TerminationReason};

pub(super) async fn cmd_run(config: &SkiffConfig, prompt: &str, json: bool) -> skiff_core::Result<()> {
    let agent = Agent::from_config(config)?;
    let run = agent.run(prompt).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run.summary())?);
        return Ok(());
    }

    let names = run.selection.names();
    if names.is_empty() {
        eprintln!("{}", style("No skills selected").dim());
    } else {
        eprintln!(
            "{} {} ({})",
            style("Skills:").bold(),
            style(names.join(", ")).cyan(),
            run.selection.method
        );
    }

    println!("{}", run.result.text);

    let result = &run.result;
    let footer = format!(
        "{} steps, {} tool calls, {} tokens",
        result.steps,
        result.tool_calls,
        result.usage.total_tokens()
    );
    match result.termination_reason {
        TerminationReason::Completed => eprintln!("{}", style(footer).dim()),
        TerminationReason::StepLimitReached => {
            eprintln!("{} {}", style("step limit reached:").yellow(), style(footer).dim())
        }
    }
    Ok(())
}
