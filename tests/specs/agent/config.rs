//! Agent configuration specs
//!
//! Invalid configuration is rejected before any worker starts.

use crate::prelude::*;

#[test]
fn zero_workers_is_rejected() {
    agent()
        .args(&["--max-procs", "0"])
        .fails()
        .stderr_has("max procs must be at least 1");
}

#[test]
fn zero_workers_from_environment_is_rejected() {
    agent()
        .env("BUILDHAND_MAX_PROCS", "0")
        .fails()
        .stderr_has("max procs must be at least 1");
}

#[test]
fn malformed_filter_label_is_rejected() {
    agent()
        .args(&["--filter", "gpu"])
        .fails()
        .stderr_has("invalid filter label 'gpu'");
}

#[test]
fn non_numeric_backoff_is_rejected() {
    agent()
        .args(&["--backoff", "soon"])
        .fails()
        .stderr_has("--backoff");
}
