use std::path::Path;

use reflex::watcher::{normalize, relative_name};

#[test]
fn normalize_appends_a_slash_to_directories() {
    assert_eq!(normalize("src", true), "src/");
    assert_eq!(normalize("src/sub", true), "src/sub/");
    assert_eq!(normalize("src/main.rs", false), "src/main.rs");
}

#[test]
fn normalize_keeps_an_existing_trailing_slash() {
    assert_eq!(normalize("src/", true), "src/");
}

#[test]
fn relative_name_strips_the_working_directory() {
    let cwd = Path::new("/home/user/project");
    assert_eq!(
        relative_name(cwd, Path::new("/home/user/project/src/main.rs")),
        "src/main.rs"
    );
    assert_eq!(
        relative_name(cwd, Path::new("/home/user/project/Makefile")),
        "Makefile"
    );
}

#[test]
fn relative_name_keeps_paths_outside_the_working_directory() {
    let cwd = Path::new("/home/user/project");
    assert_eq!(relative_name(cwd, Path::new("/etc/hosts")), "/etc/hosts");
}

#[test]
fn relative_name_strips_a_leading_dot_slash() {
    let cwd = Path::new("/home/user/project");
    assert_eq!(relative_name(cwd, Path::new("./foo/bar.txt")), "foo/bar.txt");
    assert_eq!(relative_name(cwd, Path::new("foo/bar.txt")), "foo/bar.txt");
}
