use anyhow::Result;
use miefield::logging;
use miefield::settings;
use miefield::simulation::Simulation;

fn main() -> Result<()> {
    logging::init_tracing();

    let settings = settings::load_config()?;
    let simulation = Simulation::new(&settings)?;

    let result = simulation.solve()?;
    println!("{}", result);

    Ok(())
}
