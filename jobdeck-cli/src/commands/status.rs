//! One-shot dashboard

use anyhow::Result;

use crate::config::Config;
use crate::id_resolver::resolve_filter;
use crate::render;

pub async fn handle_status(config: &Config, job: Option<&str>) -> Result<()> {
    let session = config.open_session()?;
    let only = resolve_filter(session.registry(), job)?;

    session.refresh_now().await;

    render::print_dashboard(&session.view(only));
    render::print_legend();
    Ok(())
}
