// Instances are plain JSON documents, serde does all the heavy lifting

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod generator;

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("instance content is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("instance content is empty")]
    Empty,
    #[error("instance declares no resources")]
    NoResources,
    #[error("instance declares no jobs")]
    NoJobs,
    #[error("job {job} declares {modes} modes but {times} processing times")]
    ProcessingTimeCount {
        job: String,
        modes: usize,
        times: usize,
    },
    #[error("job {job} mode {mode} lists {found} resource requests, expected {expected}")]
    RequestCount {
        job: String,
        mode: usize,
        found: usize,
        expected: usize,
    },
    #[error("invalid generator configuration: {0}")]
    InvalidGeneratorConfig(String),
}

/// On-disk layout of a problem instance.
///
/// `res_units` holds the capacity of every renewable resource. Each job lists
/// its modes as rows of per-resource unit requests, next to one processing
/// time per mode and the ids of its successors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceFile {
    pub res_units: Vec<usize>,
    pub jobs: Vec<JobRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub release_time: usize,
    pub modes: Vec<Vec<usize>>,
    pub processing_time: Vec<usize>,
    #[serde(default)]
    pub succ: Vec<String>,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

impl InstanceFile {
    /// Checks that the arrays line up, i.e. one processing time per mode and one
    /// request per resource in every mode.
    pub fn check_shape(&self) -> Result<(), InstanceError> {
        if self.res_units.is_empty() {
            return Err(InstanceError::NoResources);
        }
        if self.jobs.is_empty() {
            return Err(InstanceError::NoJobs);
        }

        for job in &self.jobs {
            if job.modes.len() != job.processing_time.len() {
                return Err(InstanceError::ProcessingTimeCount {
                    job: job.id.clone(),
                    modes: job.modes.len(),
                    times: job.processing_time.len(),
                });
            }

            for (mode_index, requests) in job.modes.iter().enumerate() {
                if requests.len() != self.res_units.len() {
                    return Err(InstanceError::RequestCount {
                        job: job.id.clone(),
                        mode: mode_index + 1,
                        found: requests.len(),
                        expected: self.res_units.len(),
                    });
                }
            }
        }

        Ok(())
    }
}

pub fn parse_instance(content: &str) -> Result<InstanceFile, InstanceError> {
    if content.trim().is_empty() {
        return Err(InstanceError::Empty);
    }

    let instance: InstanceFile = serde_json::from_str(content)?;
    instance.check_shape()?;

    Ok(instance)
}

pub fn read_instance(path: impl AsRef<Path>) -> Result<InstanceFile, InstanceError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| InstanceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    debug!("read {} bytes from {}", content.len(), path.display());

    parse_instance(&content)
}

pub fn write_instance(
    path: impl AsRef<Path>,
    instance: &InstanceFile,
    pretty: bool,
) -> Result<(), InstanceError> {
    let path = path.as_ref();
    let io_error = |source| InstanceError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, instance)?;
    } else {
        serde_json::to_writer(&mut writer, instance)?;
    }
    writer.write_all(b"\n").map_err(io_error)?;
    writer.flush().map_err(io_error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{parse_instance, InstanceError};

    static TEST_INSTANCE: &str = r#"{
        "res_units": [4, 2],
        "jobs": [
            {"id": "0", "modes": [[2, 1], [4, 0]], "processing_time": [5, 3], "succ": ["1", "2"]},
            {"id": "1", "modes": [[1, 1]], "processing_time": [2], "succ": []},
            {"id": "2", "release_time": 4, "modes": [[0, 2]], "processing_time": [1]}
        ]
    }"#;

    #[test]
    fn parse_instance_test() {
        let instance = parse_instance(TEST_INSTANCE).unwrap();

        assert_eq!(instance.res_units, vec![4, 2]);
        assert_eq!(instance.jobs.len(), 3);
        assert_eq!(instance.jobs[0].succ, vec!["1", "2"]);
        assert_eq!(instance.jobs[0].processing_time, vec![5, 3]);
        assert_eq!(instance.jobs[2].release_time, 4);
        assert!(instance.jobs[2].succ.is_empty());
    }

    #[test]
    fn serialized_instance_parses_back() {
        let instance = parse_instance(TEST_INSTANCE).unwrap();
        let content = serde_json::to_string(&instance).unwrap();

        assert!(!content.contains("\"release_time\":0"));
        assert_eq!(parse_instance(&content).unwrap(), instance);
    }

    #[test]
    fn garbage_parsing_fail() {
        assert!(matches!(parse_instance("asd"), Err(InstanceError::Json(_))));
        assert!(matches!(parse_instance("  \n"), Err(InstanceError::Empty)));
    }

    #[test]
    fn processing_time_count_mismatch() {
        let content = r#"{"res_units": [1], "jobs": [{"id": "a", "modes": [[1], [1]], "processing_time": [3]}]}"#;

        assert!(matches!(
            parse_instance(content),
            Err(InstanceError::ProcessingTimeCount { modes: 2, times: 1, .. })
        ));
    }

    #[test]
    fn request_count_mismatch() {
        let content = r#"{"res_units": [1, 1], "jobs": [{"id": "a", "modes": [[1]], "processing_time": [3]}]}"#;

        assert!(matches!(
            parse_instance(content),
            Err(InstanceError::RequestCount { found: 1, expected: 2, .. })
        ));
    }
}
