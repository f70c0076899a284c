use anyhow::Result;
use instance_io::generator::{generate_instances, GeneratorConfig};
use log::{debug, info};

use super::{read_json, Outcome};
use crate::Generate;

pub fn generate(generate: Generate) -> Result<Outcome> {
    let config: GeneratorConfig = match generate.config {
        Some(path) => read_json(&path)?,
        None => GeneratorConfig::default(),
    };
    debug!("{config:?}");

    let written = generate_instances(&config)?;
    info!(
        "Generated {} instances in {}",
        written.len(),
        config.instances_directory.display()
    );

    Ok(Outcome::Success)
}
