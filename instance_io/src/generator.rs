use std::{collections::VecDeque, path::PathBuf};

use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{write_instance, InstanceError, InstanceFile, JobRecord};

/// Bounds used when drawing random instances. Every range is inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub instances_directory: PathBuf,
    pub instance_name: String,
    pub first_instance_index: usize,
    pub last_instance_index: usize,
    /// Fixed seed for reproducible batches, every instance index derives its own stream
    pub seed: Option<u64>,
    pub pretty_json: bool,

    pub nb_resources: usize,
    pub min_resource_capacity: usize,
    pub max_resource_capacity: usize,
    pub nb_jobs: usize,
    pub min_nb_successors: usize,
    pub max_nb_successors: usize,
    pub min_nb_modes: usize,
    pub max_nb_modes: usize,
    pub min_execution_time: usize,
    pub max_execution_time: usize,
    pub min_units_per_job: usize,
    pub max_units_per_job: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            instances_directory: PathBuf::from("instances"),
            instance_name: String::from("instance"),
            first_instance_index: 0,
            last_instance_index: 10,
            seed: None,
            pretty_json: true,
            nb_resources: 1,
            min_resource_capacity: 1,
            max_resource_capacity: 10,
            nb_jobs: 5,
            min_nb_successors: 1,
            max_nb_successors: 3,
            min_nb_modes: 2,
            max_nb_modes: 3,
            min_execution_time: 3,
            max_execution_time: 5,
            min_units_per_job: 1,
            max_units_per_job: 4,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), InstanceError> {
        let invalid = |message: String| Err(InstanceError::InvalidGeneratorConfig(message));

        if self.nb_jobs == 0 {
            return invalid("number of jobs must be strictly positive".into());
        }
        if self.nb_resources == 0 {
            return invalid("number of resources must be strictly positive".into());
        }
        if self.min_nb_modes == 0 {
            return invalid("every job needs at least one mode".into());
        }
        if self.first_instance_index > self.last_instance_index {
            return invalid(format!(
                "first instance index {} is after last instance index {}",
                self.first_instance_index, self.last_instance_index
            ));
        }

        for (name, min, max) in [
            (
                "resource capacity",
                self.min_resource_capacity,
                self.max_resource_capacity,
            ),
            (
                "number of successors",
                self.min_nb_successors,
                self.max_nb_successors,
            ),
            ("number of modes", self.min_nb_modes, self.max_nb_modes),
            (
                "execution time",
                self.min_execution_time,
                self.max_execution_time,
            ),
            (
                "units per job",
                self.min_units_per_job,
                self.max_units_per_job,
            ),
        ] {
            if min > max {
                return invalid(format!("{name}: minimum {min} exceeds maximum {max}"));
            }
        }

        // Every drawn capacity must leave room for the smallest request
        if self.min_resource_capacity.min(self.max_units_per_job) < self.min_units_per_job {
            return invalid(format!(
                "units per job ({}) cannot be served by a capacity of {}",
                self.min_units_per_job, self.min_resource_capacity
            ));
        }
        if self.max_units_per_job == 0 || self.min_resource_capacity == 0 {
            return invalid("modes would never request any resource unit".into());
        }

        Ok(())
    }

    pub fn instance_path(&self, index: usize) -> PathBuf {
        self.instances_directory
            .join(format!("{}_{index}.json", self.instance_name))
    }
}

/// Draws one random instance.
///
/// The precedence graph is a random tree grown breadth first from job `0`, so it
/// is acyclic by construction. Modes requesting more units get shorter
/// processing times.
pub fn generate_instance<R: Rng>(
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<InstanceFile, InstanceError> {
    config.validate()?;

    let res_units: Vec<usize> = (0..config.nb_resources)
        .map(|_| rng.gen_range(config.min_resource_capacity..=config.max_resource_capacity))
        .collect();

    let dependencies = generate_dependencies(config, rng);

    let jobs = dependencies
        .into_iter()
        .enumerate()
        .map(|(job_index, successors)| {
            let modes = generate_job_modes(config, &res_units, rng);
            let processing_time = generate_processing_times(config, &modes, rng);

            JobRecord {
                id: job_index.to_string(),
                release_time: 0,
                modes,
                processing_time,
                succ: successors.into_iter().map(|s| s.to_string()).collect(),
            }
        })
        .collect();

    let instance = InstanceFile { res_units, jobs };
    instance.check_shape()?;

    Ok(instance)
}

/// Generates and writes every instance of the configured index range, returning
/// the written paths.
pub fn generate_instances(config: &GeneratorConfig) -> Result<Vec<PathBuf>, InstanceError> {
    config.validate()?;

    std::fs::create_dir_all(&config.instances_directory).map_err(|source| InstanceError::Io {
        path: config.instances_directory.display().to_string(),
        source,
    })?;

    let mut written = Vec::new();
    for index in config.first_instance_index..=config.last_instance_index {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        };

        let instance = generate_instance(config, &mut rng)?;
        let path = config.instance_path(index);
        write_instance(&path, &instance, config.pretty_json)?;
        info!("wrote instance {index} to {}", path.display());

        written.push(path);
    }

    Ok(written)
}

fn generate_dependencies<R: Rng>(config: &GeneratorConfig, rng: &mut R) -> Vec<Vec<usize>> {
    let nb_nodes = config.nb_jobs;
    let mut dependencies = vec![vec![]; nb_nodes];

    let mut queue = VecDeque::from([0]);
    let mut nb_created_nodes = 1;

    while nb_created_nodes < nb_nodes {
        let Some(current) = queue.pop_front() else {
            break;
        };

        let nb_child_nodes = rng
            .gen_range(config.min_nb_successors..=config.max_nb_successors)
            .min(nb_nodes - nb_created_nodes);

        for _ in 0..nb_child_nodes {
            dependencies[current].push(nb_created_nodes);
            queue.push_back(nb_created_nodes);
            nb_created_nodes += 1;
        }
    }

    debug!("dependencies: {dependencies:?}");

    dependencies
}

fn generate_job_modes<R: Rng>(
    config: &GeneratorConfig,
    res_units: &[usize],
    rng: &mut R,
) -> Vec<Vec<usize>> {
    let nb_modes = rng.gen_range(config.min_nb_modes..=config.max_nb_modes);

    let mut job_modes = Vec::with_capacity(nb_modes);
    while job_modes.len() < nb_modes {
        let mode: Vec<usize> = res_units
            .iter()
            .map(|&capacity| {
                let max_nb_units = capacity.min(config.max_units_per_job);
                rng.gen_range(config.min_units_per_job..=max_nb_units)
            })
            .collect();

        // a mode has to consume something
        if mode.iter().all(|&units| units == 0) {
            continue;
        }

        job_modes.push(mode);
    }

    job_modes
}

fn generate_processing_times<R: Rng>(
    config: &GeneratorConfig,
    job_modes: &[Vec<usize>],
    rng: &mut R,
) -> Vec<usize> {
    let resources_per_mode: Vec<usize> = job_modes.iter().map(|mode| mode.iter().sum()).collect();
    let max_units = resources_per_mode.iter().copied().max().unwrap_or(1).max(1);

    let fastest = config
        .min_execution_time
        .max(config.max_execution_time / 2);
    let optimal_execution_time = rng.gen_range(config.min_execution_time..=fastest);
    let spread = (config.max_execution_time - optimal_execution_time) as f64;

    resources_per_mode
        .into_iter()
        .map(|units| {
            let normalized = units as f64 / max_units as f64;
            config.max_execution_time - (normalized * spread).ceil() as usize
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::{generate_instance, GeneratorConfig};
    use crate::InstanceError;

    fn config() -> GeneratorConfig {
        GeneratorConfig {
            nb_resources: 2,
            nb_jobs: 12,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn generated_instance_respects_bounds() {
        let config = config();
        let instance = generate_instance(&config, &mut StdRng::seed_from_u64(7)).unwrap();

        assert_eq!(instance.res_units.len(), 2);
        assert_eq!(instance.jobs.len(), 12);

        for capacity in &instance.res_units {
            assert!((config.min_resource_capacity..=config.max_resource_capacity).contains(capacity));
        }

        for job in &instance.jobs {
            assert!((config.min_nb_modes..=config.max_nb_modes).contains(&job.modes.len()));
            assert_eq!(job.modes.len(), job.processing_time.len());

            for (mode, processing_time) in job.modes.iter().zip(&job.processing_time) {
                assert!(mode.iter().any(|&units| units > 0));
                for (units, capacity) in mode.iter().zip(&instance.res_units) {
                    assert!(units <= capacity);
                    assert!(*units <= config.max_units_per_job);
                }
                assert!(
                    (config.min_execution_time..=config.max_execution_time)
                        .contains(processing_time)
                );
            }
        }
    }

    #[test]
    fn generated_precedence_graph_is_a_forward_tree() {
        let instance = generate_instance(&config(), &mut StdRng::seed_from_u64(11)).unwrap();

        let mut parents = vec![0; instance.jobs.len()];
        for job in &instance.jobs {
            let id: usize = job.id.parse().unwrap();
            for successor in &job.succ {
                let successor: usize = successor.parse().unwrap();
                assert!(successor > id);
                parents[successor] += 1;
            }
        }

        assert_eq!(parents[0], 0);
        assert!(parents.iter().skip(1).all(|&count| count == 1));
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let config = config();
        let first = generate_instance(&config, &mut StdRng::seed_from_u64(3)).unwrap();
        let second = generate_instance(&config, &mut StdRng::seed_from_u64(3)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let config = GeneratorConfig {
            min_nb_modes: 4,
            max_nb_modes: 2,
            ..GeneratorConfig::default()
        };

        assert!(matches!(
            generate_instance(&config, &mut StdRng::seed_from_u64(0)),
            Err(InstanceError::InvalidGeneratorConfig(_))
        ));
    }
}
