//! Benchmarks for fare quoting and the submit/match cycle using Criterion.rs.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ride_core::lifecycle::RequestLifecycleController;
use ride_core::pricing::FareSchedule;
use ride_core::request::{RideDraft, RideKind};
use ride_core::store::MemoryRecordStore;
use ride_core::test_helpers::{test_clock, test_pickup};
use ride_core::zones::Zone;

fn bench_fare_quotes(c: &mut Criterion) {
    let schedule = FareSchedule::default();
    let mut group = c.benchmark_group("fare_quotes");
    group.bench_function("route_distance", |b| {
        b.iter(|| black_box(schedule.quote(black_box(Some(2.37)), Zone::Annex)));
    });
    group.bench_function("zone_only", |b| {
        b.iter(|| black_box(schedule.quote(None, black_box(Zone::Main))));
    });
    group.finish();
}

fn bench_submit_match_cycle(c: &mut Criterion) {
    let draft = RideDraft::new(RideKind::DestinationTrip)
        .with_pickup(test_pickup())
        .with_destination(Zone::Annex)
        .with_route_distance_km(2.0);

    let mut group = c.benchmark_group("submit_match_cycle");
    for requests in [10usize, 100, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(requests),
            &requests,
            |b, &requests| {
                b.iter(|| {
                    let clock = test_clock();
                    let mut controller =
                        RequestLifecycleController::new(MemoryRecordStore::new(), clock.clone());
                    for _ in 0..requests {
                        controller.submit(&draft).expect("submit");
                        clock.advance(Duration::from_millis(3_000));
                        black_box(controller.poll());
                    }
                    black_box(controller.history().len())
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_fare_quotes, bench_submit_match_cycle);
criterion_main!(benches);
