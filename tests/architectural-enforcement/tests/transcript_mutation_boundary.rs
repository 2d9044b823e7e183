//! Integration Test: Transcript Mutation Boundary
//!
//! **Policy**: the transcript is changed in place only by the reply fold
//! (`stream.rs`) and the reset gate (`reset.rs`), through the store's
//! crate-private `mutate`. The turn controller and front-ends orchestrate
//! but never edit message text.

use architectural_enforcement::{assert_clean, production_files, Violation};

/// Files allowed to run a raw store mutation
const MUTATORS: &[&str] = &["store.rs", "stream.rs", "reset.rs"];

#[test]
fn test_store_mutation_stays_in_fold_and_reset() {
    let mut violations = Vec::new();

    for file in production_files() {
        if MUTATORS.contains(&file.file_name()) {
            continue;
        }
        for (number, code) in file.code_lines() {
            if code.contains(".mutate(") || code.contains(".replace_all(") {
                violations.push(Violation {
                    path: file.path.clone(),
                    line: number,
                    code: code.to_string(),
                    reason: "Store mutated outside fold/reset",
                });
            }
        }
    }

    assert_clean("Transcript mutated outside its owners:", &violations);
}

#[test]
fn test_message_text_grows_only_in_messages() {
    let mut violations = Vec::new();

    for file in production_files() {
        if file.file_name() == "messages.rs" {
            continue;
        }
        for (number, code) in file.code_lines() {
            if code.contains(".text.push_str(") || code.contains(".text = ") {
                violations.push(Violation {
                    path: file.path.clone(),
                    line: number,
                    code: code.to_string(),
                    reason: "Message text edited directly",
                });
            }
        }
    }

    assert_clean("Message text edited outside Message::append:", &violations);
}
