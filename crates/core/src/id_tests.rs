// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::borrow::Borrow;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId;
}

#[test]
fn define_id_display_and_as_str() {
    let id = TestId::new("hello");
    assert_eq!(id.as_str(), "hello");
    assert_eq!(id.to_string(), "hello");
}

#[test]
fn define_id_conversions() {
    let owned: TestId = String::from("owned").into();
    let borrowed: TestId = "borrowed".into();
    assert_eq!(owned, "owned");
    assert_eq!(borrowed, *"borrowed");
}

#[test]
fn define_id_borrow_allows_str_lookup() {
    let mut map = HashMap::new();
    map.insert(TestId::new("k"), 42);
    assert_eq!(map.get("k"), Some(&42));

    let id = TestId::new("key");
    let borrowed: &str = id.borrow();
    assert_eq!(borrowed, "key");
}

#[test]
fn define_id_serializes_as_plain_string() {
    let id = TestId::new("job-1");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"job-1\"");
    let back: TestId = serde_json::from_str("\"job-1\"").unwrap();
    assert_eq!(back, id);
}

#[yare::parameterized(
    shorter   = { "abc",       8, "abc" },
    exact     = { "abcdefgh",  8, "abcdefgh" },
    truncated = { "abcdefghij", 4, "abcd" },
    empty     = { "",          3, "" },
)]
fn short_truncates(input: &str, n: usize, expected: &str) {
    assert_eq!(input.short(n), expected);
    assert_eq!(TestId::new(input).short(n), expected);
}

#[test]
fn sequential_id_gen_shares_counter_across_clones() {
    let gen = SequentialIdGen::new("task");
    let other = gen.clone();
    assert_eq!(gen.next(), "task-1");
    assert_eq!(other.next(), "task-2");
    assert_eq!(gen.next(), "task-3");
}

#[test]
fn uuid_id_gen_produces_unique_ids() {
    let gen = UuidIdGen;
    let a = gen.next();
    let b = gen.next();
    assert_ne!(a, b);
    assert_eq!(a.len(), 32);
}
