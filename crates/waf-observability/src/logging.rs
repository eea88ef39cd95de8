//! Tracing init, following the teacher's `tracing_subscriber::fmt()` +
//! `EnvFilter::try_from_default_env()` convention.

pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
