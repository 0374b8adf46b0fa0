use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use receding_dispatch::{config::Config, controller::DispatchLoop, telemetry::init_tracing};
use tracing::info;

fn main() -> Result<()> {
    let cfg = Config::load()?;
    init_tracing(cfg.log.json);

    let run = &cfg.run;
    let mut dispatch = DispatchLoop::from_spec_file(&run.spec)
        .with_context(|| format!("building dispatch loop from {}", run.spec.display()))?;

    info!(spec = %run.spec.display(), steps = run.steps, start = %run.start, "starting simulation");
    let decisions = dispatch
        .simulate(run.start, &run.initial_state, run.steps)
        .context("simulation step failed")?;

    if let Some(path) = &run.output {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        dispatch
            .optimal_results()
            .write_csv(BufWriter::new(file))
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), rows = dispatch.optimal_results().len(), "results written");
    }

    println!("{}", serde_json::to_string_pretty(dispatch.optimal_results())?);
    info!(steps = decisions.len(), "simulation finished");
    Ok(())
}
