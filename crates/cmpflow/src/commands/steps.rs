use crate::connect::connect;
use anyhow::Context;
use cmpflow_cmp::CommandApi;
use cmpflow_config::ProviderConfig;
use colored::Colorize;

pub async fn handle(
    config: &ProviderConfig,
    task_id: &str,
    page: u32,
    page_size: u32,
) -> anyhow::Result<()> {
    let client = connect(config).await?;
    let steps = client
        .describe_command_steps(task_id, page, page_size)
        .await
        .with_context(|| format!("[CMP] Describe steps of task ({}) failed", task_id))?;

    if steps.is_empty() {
        println!("{}", "No steps found".yellow());
        return Ok(());
    }

    for step in &steps {
        // ステータスで色分け
        let status = match step.step_status.as_str() {
            "success" => step.step_status.green(),
            "failed" => step.step_status.red(),
            _ => step.step_status.yellow(),
        };
        let progress = step
            .progress
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();
        println!(
            "{} {} [{}]{}",
            "•".cyan(),
            step.machine_name.bold(),
            status,
            progress.dimmed()
        );
        if !step.step_desc.is_empty() {
            println!("  {}", step.step_desc.dimmed());
        }
        for line in step.step_log.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}
