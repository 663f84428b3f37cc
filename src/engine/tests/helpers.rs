use crate::dna::ChromosomeRecord;
use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber controlled by `RUST_LOG`. Safe to
/// call multiple times — only the first call takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds a single-chromosome record with id `0`.
pub fn one(sequence: &str) -> Vec<ChromosomeRecord> {
    init_tracing();
    vec![ChromosomeRecord::new(0, "chrA", sequence)]
}

/// Builds a two-chromosome record set, ids `0` and `1`.
pub fn two(a: &str, b: &str) -> Vec<ChromosomeRecord> {
    init_tracing();
    vec![
        ChromosomeRecord::new(0, "chrA", a),
        ChromosomeRecord::new(1, "chrB", b),
    ]
}
