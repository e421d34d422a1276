//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use num_bigint::BigUint;
use proptest::prelude::*;
use tracing_subscriber::EnvFilter;

use zkir_contract_runtime::context::SharedBackend;
use zkir_contract_runtime::{ReferenceBackend, MAX_FIELD};

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

pub fn backend() -> SharedBackend {
    Arc::new(ReferenceBackend::new())
}

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(64);
    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}

/// Field elements in `[0, MAX_FIELD]`
pub fn field_element() -> impl Strategy<Value = BigUint> {
    proptest::array::uniform32(any::<u8>())
        .prop_map(|bytes| BigUint::from_bytes_le(&bytes) % (&*MAX_FIELD + 1u32))
}
