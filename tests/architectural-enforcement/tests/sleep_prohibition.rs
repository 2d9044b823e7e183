//! Integration Test: Sleep Prohibition
//!
//! **Policy**: production code waits on I/O, never on the clock. Turn
//! progress is driven by stream events, so there is nothing to poll.

use architectural_enforcement::{assert_clean, production_files, Violation};

#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();

    for file in production_files() {
        for (number, code) in file.code_lines() {
            if code.contains("thread::sleep") || code.contains("time::sleep") {
                violations.push(Violation {
                    path: file.path.clone(),
                    line: number,
                    code: code.to_string(),
                    reason: "Sleep call",
                });
            }
        }
    }

    assert_clean("Sleep calls found in production code:", &violations);
}
