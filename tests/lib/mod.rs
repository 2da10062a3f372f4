#![allow(dead_code)]
#![allow(unused_imports)]

mod limited;
pub use limited::Limited;

mod multipart;
pub use multipart::{multipart, Part};

pub fn tracing_init() {
    // From env var: `RUST_LOG`, the first test of a binary installs it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
