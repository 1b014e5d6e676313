//! Build commands.

use anyhow::{Result, bail};
use buildtrack_core::Build;

use crate::client::ApiClient;

pub async fn trigger(api_url: &str, environment: &str, base_url: &str) -> Result<()> {
    let client = ApiClient::new(api_url)?;
    let reply = client.trigger(environment, base_url).await?;

    if reply.success {
        println!(
            "{} {}",
            reply.build_id.as_deref().unwrap_or("-"),
            reply.message.as_deref().unwrap_or("")
        );
        return Ok(());
    }

    let error = reply.error.as_deref().unwrap_or("unknown error");
    match reply.build_id {
        Some(id) => bail!("{} (build {} was recorded)", error, id),
        None => bail!("{}", error),
    }
}

pub async fn list(api_url: &str, limit: u32) -> Result<()> {
    let client = ApiClient::new(api_url)?;
    let builds = client.list(limit).await?;

    if builds.is_empty() {
        println!("No builds");
        return Ok(());
    }
    print!("{}", render_table(&builds));
    Ok(())
}

pub async fn show(api_url: &str, id: &str) -> Result<()> {
    let client = ApiClient::new(api_url)?;
    let build = client.get(id).await?;
    println!("{}", serde_json::to_string_pretty(&build)?);
    Ok(())
}

fn render_table(builds: &[Build]) -> String {
    let mut out = format!(
        "{:<8}  {:<7}  {:<8}  {:<12}  {:>4}  {}\n",
        "ID", "ENV", "STATUS", "STAGE", "PCT", "CREATED"
    );
    for build in builds {
        out.push_str(&format!(
            "{:<8}  {:<7}  {:<8}  {:<12}  {:>3}%  {}\n",
            build.id.short(),
            build.environment.as_str(),
            build.status.as_str(),
            build.stage.as_str(),
            build.progress,
            build.created_at.format("%Y-%m-%d %H:%M:%S"),
        ));
    }
    out
}
