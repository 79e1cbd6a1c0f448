mod body;
mod config;
mod script;
mod session;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::DemoConfig;
use crate::session::run_session;

fn main() {
    init_tracing();
    info!("=== Motion Graph Demo ===");

    let config = DemoConfig::from_env();
    info!(
        graph = %config
            .graph_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "bundled".to_string()),
        save_dir = %config.save_dir.display(),
        target_tps = config.schedule.target_tps,
        total_ticks = config.total_ticks,
        save_at_tick = config.save_at_tick,
        "motion_demo_config"
    );

    match run_session(&config) {
        Ok(report) => {
            info!(
                final_state = report.final_state.as_str(),
                x = report.final_position.x,
                y = report.final_position.y,
                z = report.final_position.z,
                snapshot = %report.snapshot_path.display(),
                "motion_demo_complete"
            );
        }
        Err(err) => {
            error!(error = %err, "motion_demo_failed");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
