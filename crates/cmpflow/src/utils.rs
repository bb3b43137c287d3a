use cmpflow_cmp::{CmpError, CommandResourceState, WaitConfig};
use cmpflow_config::WaitSettings;
use colored::Colorize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// 設定ファイルのポーリング設定を WaitConfig に変換
pub fn wait_config(settings: &WaitSettings) -> WaitConfig {
    WaitConfig {
        delay: Duration::from_secs(settings.delay_secs),
        poll_interval: Duration::from_secs(settings.poll_interval_secs),
        timeout: Duration::from_secs(settings.timeout_secs),
    }
}

/// 最初の Ctrl-C でキャンセルされるトークン
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping the wait");
            trigger.cancel();
        }
    });
    token
}

pub fn print_state(state: &CommandResourceState) {
    println!("  {} {}", "record:".dimmed(), state.record_id.cyan());
    println!("  {} {}", "task:".dimmed(), state.task_id.cyan());
    if !state.name.is_empty() {
        println!("  {} {}", "name:".dimmed(), state.name);
    }
    println!("  {} {}", "status:".dimmed(), state.status);
}

/// 待機失敗の詳細を表示する（エラー自体は呼び出し元が返す）
pub fn report_wait_error(err: &CmpError) {
    match err {
        CmpError::RemoteFailure { reason, .. } => {
            println!("{}", "✗ Command failed on the remote host".red().bold());
            if let Some(record) = err.record() {
                println!("  {} {}", "record:".dimmed(), record.record_id.cyan());
                println!("  {} {}", "task:".dimmed(), record.task_id.cyan());
            }
            println!("  {}", "step log:".dimmed());
            for line in reason.lines() {
                println!("    {}", line);
            }
        }
        CmpError::Timeout { .. } => {
            println!("{}", "✗ Gave up waiting for the command".red().bold());
        }
        CmpError::Cancelled => {
            println!(
                "{}",
                "⚠ Wait cancelled; the command keeps running remotely".yellow()
            );
        }
        _ => {}
    }
}
