use crate::connect::connect;
use crate::utils;
use anyhow::Context;
use cmpflow_cmp::CommandResource;
use cmpflow_config::ProviderConfig;
use colored::Colorize;

pub async fn handle(config: &ProviderConfig, record_id: &str) -> anyhow::Result<()> {
    let client = connect(config).await?;
    let resource = CommandResource::new(&client, utils::wait_config(&config.wait));

    println!("{} {}", "Waiting for command".blue(), record_id.cyan());

    let cancel = utils::cancel_on_ctrl_c();
    match resource.read(record_id, &cancel).await {
        Ok(done) => {
            println!("{}", "✓ Command finished".green().bold());
            utils::print_state(&done);
            Ok(())
        }
        Err(err) => {
            utils::report_wait_error(&err);
            Err(err).with_context(|| format!("[CMP] Waiting for command ({})", record_id))
        }
    }
}
