use std::collections::HashSet;

use reflex::backlog::{Backlog, BacklogKind};

#[test]
fn unified_collapses_a_burst_to_one_path() {
    let mut b = Backlog::new(BacklogKind::Unified);
    b.add("foo".to_string());
    b.add("bar".to_string());
    assert_eq!(b.next(), "foo");
    assert!(b.remove_one());
}

#[test]
#[should_panic(expected = "called on empty backlog")]
fn unified_next_on_empty_panics() {
    let b = Backlog::new(BacklogKind::Unified);
    b.next();
}

#[test]
#[should_panic(expected = "called on empty backlog")]
fn unified_remove_one_on_empty_panics() {
    let mut b = Backlog::new(BacklogKind::Unified);
    b.add("foo".to_string());
    assert!(b.remove_one());
    b.remove_one();
}

#[test]
fn unique_files_keeps_every_distinct_path() {
    let mut b = Backlog::new(BacklogKind::UniqueFiles);
    b.add("foo".to_string());
    b.add("bar".to_string());

    // The first arrival is delivered first.
    assert_eq!(b.next(), "foo");
    assert!(!b.remove_one());

    let mut seen = HashSet::new();
    seen.insert("foo".to_string());
    seen.insert(b.next().to_string());
    assert!(b.remove_one());

    let want: HashSet<String> = ["foo".to_string(), "bar".to_string()].into();
    assert_eq!(seen, want);
}

#[test]
fn unique_files_deduplicates() {
    let mut b = Backlog::new(BacklogKind::UniqueFiles);
    b.add("foo".to_string());
    b.add("foo".to_string());
    assert_eq!(b.next(), "foo");
    assert!(b.remove_one());
}

#[test]
fn unique_files_ignores_re_add_of_current_next() {
    let mut b = Backlog::new(BacklogKind::UniqueFiles);
    b.add("foo".to_string());
    b.add("bar".to_string());
    b.add("foo".to_string());

    let mut emitted = Vec::new();
    emitted.push(b.next().to_string());
    while !b.remove_one() {
        emitted.push(b.next().to_string());
    }
    emitted.sort();
    assert_eq!(emitted, vec!["bar".to_string(), "foo".to_string()]);
}

#[test]
#[should_panic(expected = "called on empty backlog")]
fn unique_files_next_on_empty_panics() {
    let b = Backlog::new(BacklogKind::UniqueFiles);
    b.next();
}
