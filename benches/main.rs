use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;

#[cfg(feature = "test_private")]
pub mod regular_bench;

pub fn bench_main(_c: &mut Criterion) {
    cfg_if::cfg_if! {
        if #[cfg(feature = "test_private")] {
            regular_bench::bench(_c);
        } else {
            eprintln!("ERROR: Benchmarks in preserved-marks require the test_private feature to run.");
            eprintln!("  Rerun with `cargo bench --features test_private -- bench_name`.");
            std::process::exit(1);
        }
    }
}

criterion_group!(benches, bench_main);
criterion_main!(benches);
