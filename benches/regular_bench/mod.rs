pub mod record_restore;

pub use criterion::Criterion;

pub fn bench(c: &mut Criterion) {
    record_restore::bench(c);
}
