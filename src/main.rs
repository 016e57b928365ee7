use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use log::info;

use scaling_panel::config::Config;
use scaling_panel::data::loader;
use scaling_panel::pipeline;
use scaling_panel::render;

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let data_path: PathBuf = match args.next() {
        Some(p) => p.into(),
        None => bail!("usage: scaling-panel <data-file> [config.json]"),
    };
    let config_path: PathBuf = args
        .next()
        .map(Into::into)
        .unwrap_or_else(|| PathBuf::from("scaling_config.json"));

    let config = Config::load(&config_path)?;
    let table = loader::load_file(&data_path)
        .with_context(|| format!("loading {}", data_path.display()))?;

    let report = pipeline::run(&config, table)?;

    for outcome in report.outcomes.iter().chain(&report.world_outcomes) {
        render::render(&outcome.spec)
            .with_context(|| format!("rendering '{}'", outcome.fit.pair.title))?;
    }

    info!(
        "done: {} pair(s) processed, country and world",
        report.outcomes.len()
    );
    print!("{report}");
    Ok(())
}
