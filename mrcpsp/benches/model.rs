use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use instance_io::generator::{generate_instance, GeneratorConfig};
use mrcpsp::{
    model::{build_ilp_model, build_interval_model},
    solver::{ProblemSolverCp, SolveParams, TabuSearchEngine},
    ProblemInstance, SolutionChecker, TabuOptions,
};
use rand::{rngs::StdRng, SeedableRng};

fn generated(nb_jobs: usize) -> ProblemInstance {
    let config = GeneratorConfig {
        nb_jobs,
        nb_resources: 2,
        ..GeneratorConfig::default()
    };
    let file = generate_instance(&config, &mut StdRng::seed_from_u64(nb_jobs as u64)).unwrap();
    ProblemInstance::from_instance_file(format!("generated_{nb_jobs}"), &file).unwrap()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("model");
    group.sample_size(20);
    group.sampling_mode(criterion::SamplingMode::Flat);

    for nb_jobs in [5, 10, 20] {
        let problem = generated(nb_jobs);

        group.bench_with_input(BenchmarkId::new("ilp", nb_jobs), &problem, |b, problem| {
            b.iter(|| build_ilp_model(problem).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("interval", nb_jobs), &problem, |b, problem| {
            b.iter(|| build_interval_model(problem).unwrap())
        });
    }
    group.finish();

    let mut group = c.benchmark_group("checker");
    let engine = TabuSearchEngine::new(TabuOptions {
        number_of_iterations: 50,
        seed: Some(1),
        ..TabuOptions::default()
    });

    for nb_jobs in [5, 10, 20] {
        let problem = generated(nb_jobs);
        let solver = ProblemSolverCp::new(&problem).unwrap();
        let solution = solver.solve(&engine, &SolveParams::default()).unwrap();
        let checker = SolutionChecker::new(&problem, &solution);

        group.bench_function(BenchmarkId::new("time_period", nb_jobs), |b| {
            b.iter(|| checker.check_resource_usage_over_time_period().unwrap())
        });
        group.bench_function(BenchmarkId::new("intervals", nb_jobs), |b| {
            b.iter(|| checker.check_resource_usage_over_intervals().unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
