use std::time::Duration;

use reflex::backlog::BacklogKind;
use reflex::cli::DEFAULT_SHUTDOWN_TIMEOUT;
use reflex::config::{parse_configs, parse_duration};
use reflex::rule::Rule;

fn strs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn read_configs_round_trip() {
    let input = "-g '*.go' echo {}\n\
                 \n\
                 # Some comment here\n\
                 -r '^a[0-9]+\\.txt$' --only-dirs --substitute='[]' echo []\n\
                 -g '*.go' -s --only-files echo hi\n\
                 -r foo -r bar -R baz -g a -G b -G c echo hi\n";

    let configs = parse_configs(input, "test input").unwrap();
    assert_eq!(configs.len(), 4);

    let c = &configs[0];
    assert_eq!(c.source, "test input, line 1");
    assert_eq!(c.opts.globs, strs(&["*.go"]));
    assert_eq!(c.opts.sub_symbol, "{}");
    assert_eq!(c.opts.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT);
    assert_eq!(c.command, strs(&["echo", "{}"]));

    let c = &configs[1];
    assert_eq!(c.source, "test input, line 4");
    assert_eq!(c.opts.regexes, strs(&["^a[0-9]+\\.txt$"]));
    assert_eq!(c.opts.sub_symbol, "[]");
    assert!(c.opts.only_dirs);
    assert!(!c.opts.only_files);
    assert_eq!(c.command, strs(&["echo", "[]"]));

    let c = &configs[2];
    assert_eq!(c.source, "test input, line 5");
    assert_eq!(c.opts.globs, strs(&["*.go"]));
    assert!(c.opts.start_service);
    assert!(c.opts.only_files);
    assert_eq!(c.command, strs(&["echo", "hi"]));

    let c = &configs[3];
    assert_eq!(c.source, "test input, line 6");
    assert_eq!(c.opts.regexes, strs(&["foo", "bar"]));
    assert_eq!(c.opts.inverse_regexes, strs(&["baz"]));
    assert_eq!(c.opts.globs, strs(&["a"]));
    assert_eq!(c.opts.inverse_globs, strs(&["b", "c"]));
    assert_eq!(c.command, strs(&["echo", "hi"]));
}

#[test]
fn bad_configs_are_rejected() {
    for input in [
        "--abc echo hi",
        "-g '*.go'",
        "--substitute='' echo hi",
        "-s echo {}",
        "--only-files --only-dirs echo hi",
        "-t 0ms echo hi",
    ] {
        let rejected = match parse_configs(input, "test input") {
            Err(_) => true,
            Ok(configs) => configs
                .iter()
                .all(|config| Rule::new(config, 0).is_err()),
        };
        assert!(rejected, "config {input:?} should have been rejected");
    }
}

#[test]
fn backslash_continues_a_logical_line() {
    let input = "-g '*.go' echo one \\\ntwo\n";
    let configs = parse_configs(input, "test input").unwrap();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].command, strs(&["echo", "one", "two"]));
    assert_eq!(configs[0].source, "test input, line 1");
}

#[test]
fn open_quote_continues_a_logical_line() {
    let input = "-r foo echo 'a\nb'\n";
    let configs = parse_configs(input, "test input").unwrap();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].command, strs(&["echo", "a\nb"]));
}

#[test]
fn unterminated_quote_at_eof_is_an_error() {
    let err = parse_configs("-r foo echo 'oops\n", "test input").unwrap_err();
    assert!(err.to_string().contains("line 1 of test input"));
}

#[test]
fn rule_backlog_follows_substitution() {
    let configs = parse_configs("-r '\\.txt$' echo {}\n-g '*.c' make\n", "test input").unwrap();
    let with_substitution = Rule::new(&configs[0], 0).unwrap();
    assert_eq!(with_substitution.backlog, BacklogKind::UniqueFiles);
    let without = Rule::new(&configs[1], 1).unwrap();
    assert_eq!(without.backlog, BacklogKind::Unified);
}

#[test]
fn rules_carry_default_excludes_unless_all_is_set() {
    let configs = parse_configs("-g '*' echo hi\n--all -g '*' echo hi\n", "test input").unwrap();
    let default = Rule::new(&configs[0], 0).unwrap();
    assert!(default.matcher.matches("foo"));
    assert!(!default.matcher.matches("foo~"));
    let all = Rule::new(&configs[1], 1).unwrap();
    assert!(all.matcher.matches("foo~"));
}

#[test]
fn parse_duration_formats() {
    assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
    assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
    assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
    assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("5").is_err());
    assert!(parse_duration("xyz").is_err());
    assert!(parse_duration("5d").is_err());
}
