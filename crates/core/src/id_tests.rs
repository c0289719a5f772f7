// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn displays_the_raw_id() {
    let id = JobId::from("build-17");
    assert_eq!(id.to_string(), "build-17");
    assert_eq!(id, "build-17");
}

#[test]
fn serializes_transparently() {
    let id: JobId = serde_json::from_str("\"1234\"").unwrap();
    assert_eq!(id.as_str(), "1234");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"1234\"");
}

#[parameterized(
    plain      = { "42",          "42" },
    dashed     = { "job-1.retry", "job-1.retry" },
    separators = { "a/b\\c",      "a_b_c" },
    traversal  = { "../etc",      ".._etc" },
    dot        = { ".",           "job_" },
    dotdot     = { "..",          "job__" },
    empty      = { "",            "job" },
)]
fn dir_name_is_one_path_component(raw: &str, expected: &str) {
    let name = JobId::new(raw).dir_name();
    assert_eq!(name, expected);
    assert_eq!(std::path::Path::new(&name).components().count(), 1);
}
