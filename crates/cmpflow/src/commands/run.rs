use crate::connect::connect;
use crate::utils;
use anyhow::Context;
use cmpflow_cmp::{CommandResource, CommandSubmission, HostType};
use cmpflow_config::ProviderConfig;
use colored::Colorize;

pub async fn handle(
    config: &ProviderConfig,
    host_type: HostType,
    content: String,
    instance_ids: String,
    name: Option<String>,
    description: Option<String>,
    no_wait: bool,
) -> anyhow::Result<()> {
    // 1. 送信内容を組み立てる
    let mut submission = CommandSubmission::new(host_type, content, instance_ids);
    if let Some(name) = name {
        submission = submission.with_name(name);
    }
    if let Some(description) = description {
        submission = submission.with_description(description);
    }

    println!("{}", "Sending command...".blue());
    println!("  {} {}", "host type:".dimmed(), host_type);
    println!(
        "  {} {}",
        "instances:".dimmed(),
        submission.instances().collect::<Vec<_>>().join(", ")
    );

    // 2. コマンド送信
    let client = connect(config).await?;
    let resource = CommandResource::new(&client, utils::wait_config(&config.wait));

    let created = resource
        .create(&submission)
        .await
        .context("[CMP] Send command failed")?;
    println!("{}", "✓ Command accepted".green());
    utils::print_state(&created);

    // --no-wait: 受付だけ確認して終了
    if no_wait {
        println!();
        println!(
            "{} cmpflow wait {}",
            "Follow it with:".dimmed(),
            created.record_id
        );
        return Ok(());
    }

    println!();
    println!("{}", "Waiting for the command to finish...".blue());

    // 3. 完了待ち（Ctrl-C で中断、リモート側のコマンドは止まらない）
    let cancel = utils::cancel_on_ctrl_c();
    match resource.read(&created.record_id, &cancel).await {
        Ok(done) => {
            println!("{}", "✓ Command finished".green().bold());
            utils::print_state(&done);
            Ok(())
        }
        Err(err) => {
            utils::report_wait_error(&err);
            Err(err).with_context(|| format!("[CMP] Waiting for command ({})", created.record_id))
        }
    }
}
