//!
//! reportnav server binary
//! -----------------------
//! Command-line entry point for the report browser. Configuration comes from an
//! optional JSON file, then `REPORTNAV_*` environment variables, then the flags below.

use anyhow::Result;
use std::env;
use std::path::PathBuf;

use reportnav::config::ServerConfig;

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            return args.get(i + 1).filter(|v| !v.starts_with("--")).cloned();
        }
        i += 1;
    }
    None
}

fn parse_port_arg(args: &[String], flag: &str) -> Option<u16> {
    arg_value(args, flag).and_then(|v| v.parse::<u16>().ok())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Apply CLI overrides on top of an already loaded config.
fn apply_args(cfg: &mut ServerConfig, args: &[String]) {
    if let Some(h) = arg_value(args, "--host") { cfg.host = h; }
    if let Some(p) = parse_port_arg(args, "--port") { cfg.port = p; }
    if let Some(d) = arg_value(args, "--reports-dir") { cfg.reports_dir = PathBuf::from(d); }
    if has_flag(args, "--debug") { cfg.debug = true; }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("reportnav server\n\nUSAGE:\n  reportnav_server [--config PATH] [--host ADDR] [--port N] [--reports-dir PATH] [--debug]\n\nOPTIONS:\n  --config PATH       JSON config file (env: REPORTNAV_CONFIG)\n  --host ADDR         Bind address (env: REPORTNAV_HOST, default 127.0.0.1)\n  --port N            HTTP port (env: REPORTNAV_PORT, default 5000)\n  --reports-dir PATH  Folder of <id>.json reports (env: REPORTNAV_REPORTS_DIR, default reports)\n  --debug             Show error details on error pages (env: REPORTNAV_DEBUG)\n");
        return Ok(());
    }

    let config_path = arg_value(&args, "--config").map(PathBuf::from);
    let mut cfg = ServerConfig::load(config_path.as_deref())?;
    apply_args(&mut cfg, &args);

    tracing::info!("Using http={}:{}, reports_dir={:?}, debug={}", cfg.host, cfg.port, cfg.reports_dir, cfg.debug);
    reportnav::server::run(cfg).await
}
