use std::collections::BTreeMap;

use log::debug;

use super::Solution;
use crate::{error::AllocationError, problem::ProblemInstance};

/// Gives every allocation concrete unit indices per resource so that no two
/// overlapping allocations hold the same unit.
///
/// Allocations are visited in stable start time order, then each one claims
/// the first free units in index order (first fit). Every unit remembers the
/// time it becomes available again. Allocations of duration 0 occupy no time
/// slot and get an empty map. The policy is a heuristic with no notion of
/// preferred units; [`AllocationError::InsufficientUnits`] is fatal and
/// points at a schedule overloading some resource at that start time.
///
/// On success the allocations end up sorted by start time with their unit
/// maps set. A failure leaves the solution untouched.
pub fn assign_resource_units(
    problem: &ProblemInstance,
    solution: &mut Solution,
) -> Result<(), AllocationError> {
    if let Some(allocation) = solution
        .job_allocations
        .iter()
        .find(|allocation| allocation.units_map.is_some())
    {
        return Err(AllocationError::UnitsAlreadyAssigned(allocation.job_id.clone()));
    }

    let mut order: Vec<usize> = (0..solution.job_allocations.len()).collect();
    order.sort_by_key(|&index| solution.job_allocations[index].start_time);

    let mut available_at: Vec<Vec<usize>> = problem
        .resources()
        .iter()
        .map(|resource| vec![0; resource.capacity])
        .collect();

    let mut units_maps = vec![BTreeMap::new(); order.len()];

    for &index in &order {
        let allocation = &solution.job_allocations[index];
        let job = problem
            .find_job(&allocation.job_id)
            .ok_or_else(|| AllocationError::UnknownJob(allocation.job_id.clone()))?;
        let mode = job
            .mode(allocation.mode_id)
            .ok_or_else(|| AllocationError::InvalidModeId {
                job: job.id.clone(),
                mode_id: allocation.mode_id,
                modes: job.modes.len(),
            })?;

        if allocation.duration == 0 {
            continue;
        }

        let units_map = &mut units_maps[index];

        for (resource, &requested) in mode.requested_units.iter().enumerate() {
            if requested == 0 {
                continue;
            }

            let units = &mut available_at[resource];
            let claimed: Vec<usize> = units
                .iter()
                .enumerate()
                .filter(|(_, available)| **available <= allocation.start_time)
                .map(|(unit, _)| unit)
                .take(requested)
                .collect();

            if claimed.len() < requested {
                return Err(AllocationError::InsufficientUnits {
                    job: job.id.clone(),
                    resource: problem.resources()[resource].id.clone(),
                    requested,
                    available: claimed.len(),
                    time: allocation.start_time,
                });
            }

            for &unit in &claimed {
                units[unit] = allocation.finish_time();
            }

            units_map.insert(resource, claimed);
        }
    }

    for (allocation, units_map) in solution.job_allocations.iter_mut().zip(units_maps) {
        allocation.units_map = Some(units_map);
    }
    solution
        .job_allocations
        .sort_by_key(|allocation| allocation.start_time);

    debug!(
        "assigned resource units to {} allocations",
        solution.job_allocations.len()
    );

    Ok(())
}
