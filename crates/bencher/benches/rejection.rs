use std::hint::black_box;

use bencher::{TestCase, cancelled_rejections, mixed_rejections};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use micro_http::protocol::HttpRequest;
use micro_web::rejection::{Rejection, RejectionHandler, default_handler, resolve_rejections};

fn create_test_cases() -> Vec<TestCase<Vec<Rejection>>> {
    vec![
        TestCase::small("small_mixed", mixed_rejections),
        TestCase::normal("normal_mixed", mixed_rejections),
        TestCase::large("large_mixed", mixed_rejections),
        TestCase::normal("normal_cancelled", cancelled_rejections),
        TestCase::large("large_cancelled", cancelled_rejections),
    ]
}

fn benchmark_apply_transformations(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("apply_transformations");

    for case in create_test_cases() {
        group.throughput(Throughput::Elements(case.group().size() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            b.iter_batched(
                || case.input(),
                |rejections| black_box(RejectionHandler::apply_transformations(rejections)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_default_handler(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("default_handler");

    for case in create_test_cases() {
        let rejections = RejectionHandler::apply_transformations(case.input());
        group.throughput(Throughput::Elements(case.group().size() as u64));
        group.bench_with_input(BenchmarkId::new("apply", case.name()), &rejections, |b, rejections| {
            b.iter(|| black_box(default_handler().apply(rejections)));
        });
        group.bench_with_input(BenchmarkId::new("resolve", case.name()), &case, |b, case| {
            let handler = RejectionHandler::builder().result();
            b.iter_batched(
                || case.input(),
                |rejections| {
                    black_box(futures::executor::block_on(resolve_rejections(
                        &handler,
                        HttpRequest::default(),
                        rejections,
                    )))
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(rejection, benchmark_apply_transformations, benchmark_default_handler);
criterion_main!(rejection);
