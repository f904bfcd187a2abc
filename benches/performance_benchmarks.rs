use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ridewise::time_of_day::parse_start_time;
use ridewise::{
    compute_plan, sweep, CourseRegistry, NutritionScheduler, NutritionStrategy, RiderProfile,
    SplitCalculator, WeatherCorrelator, WeatherForecast, WeatherRequest, HourlyForecast,
};

/// Performance benchmarks for the planning engine
///
/// Single plans should stay well under a millisecond; the sweep benchmark
/// checks that parallel planning scales with the number of targets.

fn bench_split_calculation(c: &mut Criterion) {
    let registry = CourseRegistry::builtin();
    let start = parse_start_time("06:00").unwrap();

    let mut group = c.benchmark_group("Split Calculation");
    for course in registry.list() {
        group.bench_with_input(BenchmarkId::new("calculate", &course.id), course, |b, course| {
            b.iter(|| SplitCalculator::calculate(black_box(course), black_box(225.0), start))
        });
    }
    group.finish();
}

fn bench_nutrition_schedule(c: &mut Criterion) {
    let registry = CourseRegistry::builtin();
    let course = registry.get("ctct").unwrap();
    let start = parse_start_time("06:30").unwrap();
    let splits = SplitCalculator::calculate(course, 300.0, start).unwrap().unwrap();

    let mut group = c.benchmark_group("Nutrition Schedule");
    for strategy in [
        NutritionStrategy::Aggressive,
        NutritionStrategy::Standard,
        NutritionStrategy::Conservative,
    ] {
        group.bench_with_input(
            BenchmarkId::new("schedule", strategy),
            &strategy,
            |b, &strategy| {
                b.iter(|| {
                    let events =
                        NutritionScheduler::schedule(&splits, 300.0, strategy, course, start);
                    NutritionScheduler::attach(splits.clone(), &events)
                })
            },
        );
    }
    group.finish();
}

fn bench_full_plan(c: &mut Criterion) {
    let registry = CourseRegistry::builtin();
    let course = registry.get("947-joburg").unwrap();
    let start = parse_start_time("06:00").unwrap();
    let request = WeatherRequest::for_course(course, start, 225.0);
    let forecast = WeatherForecast {
        hourly: request
            .hour_keys()
            .into_iter()
            .map(|time| HourlyForecast {
                time,
                temperature: 18.0,
                wind_speed: 10.0,
                wind_direction: "N".to_string(),
                condition: "Sunny".to_string(),
                icon: "sunny".to_string(),
            })
            .collect(),
    };

    c.bench_function("compute_plan with weather", |b| {
        b.iter(|| {
            compute_plan(
                black_box(course),
                black_box(225.0),
                start,
                RiderProfile::Intermediate,
                NutritionStrategy::Standard,
                Some(&forecast),
            )
        })
    });

    let splits = SplitCalculator::calculate(course, 225.0, start).unwrap().unwrap();
    c.bench_function("weather correlation", |b| {
        b.iter(|| WeatherCorrelator::new(&forecast).correlate(black_box(splits.clone())))
    });
}

fn bench_sweep(c: &mut Criterion) {
    let registry = CourseRegistry::builtin();
    let course = registry.get("ctct").unwrap();
    let start = parse_start_time("06:30").unwrap();

    let mut group = c.benchmark_group("Target Sweep");
    for &count in &[10usize, 100, 1000] {
        let targets: Vec<f64> = (0..count).map(|i| 180.0 + i as f64 * 0.5).collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("sweep", count), &targets, |b, targets| {
            b.iter(|| {
                sweep(
                    course,
                    black_box(targets),
                    start,
                    RiderProfile::Intermediate,
                    NutritionStrategy::Standard,
                )
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_split_calculation,
    bench_nutrition_schedule,
    bench_full_plan,
    bench_sweep
);
criterion_main!(benches);
