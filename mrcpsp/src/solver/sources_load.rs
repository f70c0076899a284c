pub trait SourcesLoad {
    /// Earliest start at or after `earliest_precedence_start_time` at which the
    /// activity fits for its whole duration without resource overload.
    fn get_earliest_start_time(
        &self,
        activity_resource_requirements: &[usize],
        earliest_precedence_start_time: usize,
        activity_duration: usize,
    ) -> usize;

    /// Updates the remaining capacities with respect to the added activity.
    fn add_activity(
        &mut self,
        activity_start: usize,
        activity_stop: usize,
        activity_requirements: &[usize],
    );
}

/// Remaining capacity of every resource per time slot. Slots past the current
/// end are implicitly at full capacity and get materialized on demand.
#[derive(Debug, Clone)]
pub struct TimeResolution {
    capacity_of_resources: Vec<usize>,
    remaining_resource_capacity: Vec<Vec<usize>>,
}

impl TimeResolution {
    pub fn new(capacity_of_resources: Vec<usize>, makespan_upper_bound: usize) -> Self {
        let remaining_resource_capacity = capacity_of_resources
            .iter()
            .map(|&capacity| vec![capacity; makespan_upper_bound])
            .collect();

        Self {
            capacity_of_resources,
            remaining_resource_capacity,
        }
    }

    fn remaining(&self, resource_id: usize, t: usize) -> usize {
        self.remaining_resource_capacity[resource_id]
            .get(t)
            .copied()
            .unwrap_or(self.capacity_of_resources[resource_id])
    }

    fn fits(&self, activity_resource_requirements: &[usize], t: usize) -> bool {
        activity_resource_requirements
            .iter()
            .enumerate()
            .all(|(resource_id, requirement)| self.remaining(resource_id, t) >= *requirement)
    }
}

impl SourcesLoad for TimeResolution {
    fn get_earliest_start_time(
        &self,
        activity_resource_requirements: &[usize],
        earliest_precedence_start_time: usize,
        activity_duration: usize,
    ) -> usize {
        let horizon = self
            .remaining_resource_capacity
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0);

        let mut load_time: usize = 0;
        let mut t: usize = earliest_precedence_start_time;

        while load_time < activity_duration {
            if t >= horizon {
                // everything from here on is free
                return t - load_time;
            }

            if self.fits(activity_resource_requirements, t) {
                load_time += 1;
            } else {
                load_time = 0;
            }

            t += 1;
        }

        t - load_time
    }

    fn add_activity(
        &mut self,
        activity_start: usize,
        activity_stop: usize,
        activity_requirements: &[usize],
    ) {
        for (resource_id, remaining) in self.remaining_resource_capacity.iter_mut().enumerate() {
            if remaining.len() < activity_stop {
                remaining.resize(activity_stop, self.capacity_of_resources[resource_id]);
            }

            let requirement = activity_requirements.get(resource_id).copied().unwrap_or(0);
            for slot in &mut remaining[activity_start..activity_stop] {
                *slot = slot.saturating_sub(requirement);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SourcesLoad, TimeResolution};

    #[test]
    fn activity_waits_for_free_capacity() {
        let mut load = TimeResolution::new(vec![2], 4);
        load.add_activity(0, 3, &[2]);

        assert_eq!(load.get_earliest_start_time(&[1], 0, 2), 3);
        assert_eq!(load.get_earliest_start_time(&[0], 0, 2), 0);
        assert_eq!(load.get_earliest_start_time(&[1], 5, 2), 5);
    }

    #[test]
    fn gaps_too_short_are_skipped() {
        let mut load = TimeResolution::new(vec![1, 1], 10);
        load.add_activity(0, 1, &[1, 0]);
        load.add_activity(2, 4, &[0, 1]);

        // one free slot at 1 is not enough for two slots on both resources
        assert_eq!(load.get_earliest_start_time(&[1, 1], 0, 2), 4);
        assert_eq!(load.get_earliest_start_time(&[1, 0], 0, 2), 1);
    }

    #[test]
    fn profile_grows_past_its_horizon() {
        let mut load = TimeResolution::new(vec![1], 2);
        load.add_activity(0, 2, &[1]);

        assert_eq!(load.get_earliest_start_time(&[1], 0, 3), 2);
        load.add_activity(2, 5, &[1]);
        assert_eq!(load.get_earliest_start_time(&[1], 1, 1), 5);
        assert_eq!(load.get_earliest_start_time(&[1], 0, 0), 0);
    }
}
