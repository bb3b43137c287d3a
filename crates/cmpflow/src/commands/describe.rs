use crate::connect::connect;
use anyhow::Context;
use cmpflow_cmp::CommandApi;
use cmpflow_config::ProviderConfig;

pub async fn handle(config: &ProviderConfig, record_id: &str) -> anyhow::Result<()> {
    let client = connect(config).await?;
    let record = client
        .describe_command(record_id)
        .await
        .with_context(|| format!("[CMP] Describe command ({}) failed", record_id))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
