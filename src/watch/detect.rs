//! # Watch-mode detection from process arguments.
//!
//! The host runs in watch mode when any of these hold:
//! - `--watch` / `-w` is present and truthy,
//! - `--watch-stdin` / `--stdin` is present and truthy,
//! - some argument contains `webpack-serve` or `webpack-dev-server`.
//!
//! ## Flag values
//! Flags are lenient: a bare flag is `true`; a value may be attached
//! (`--watch=false`) or given as a following boolean literal (`--watch false`).
//! `false`, `0` and the empty string are falsy, `--no-<flag>` negates, and the
//! last occurrence wins. Everything after a lone `--` is positional.

/// Substrings that mark a dev-server host.
const SERVER_MARKERS: [&str; 2] = ["webpack-serve", "webpack-dev-server"];

/// A boolean flag and its aliases.
struct Flag {
    long: &'static [&'static str],
    short: &'static [char],
}

const WATCH: Flag = Flag {
    long: &["watch"],
    short: &['w'],
};

const WATCH_STDIN: Flag = Flag {
    long: &["watch-stdin", "watchStdin", "stdin"],
    short: &[],
};

/// Returns `true` if `argv` describes a persistent (watch) build.
///
/// Total over any input; never fails.
///
/// # Example
/// ```
/// use nimvisor::is_watch_mode;
///
/// assert!(is_watch_mode(&["node", "webpack", "--watch"]));
/// assert!(is_watch_mode(&["node", "/usr/lib/webpack-dev-server/bin.js"]));
/// assert!(!is_watch_mode(&["node", "webpack", "--mode", "production"]));
/// ```
pub fn is_watch_mode<S: AsRef<str>>(argv: &[S]) -> bool {
    let server = argv
        .iter()
        .any(|arg| SERVER_MARKERS.iter().any(|m| arg.as_ref().contains(m)));

    server || flag_set(argv, &WATCH) || flag_set(argv, &WATCH_STDIN)
}

/// Detects watch mode for the current process.
pub fn is_watch_mode_env() -> bool {
    let argv: Vec<String> = std::env::args().collect();
    is_watch_mode(&argv)
}

fn truthy(value: &str) -> bool {
    !matches!(value, "" | "0" | "false")
}

/// Scans `argv` for `flag`, returning its final truthiness.
fn flag_set<S: AsRef<str>>(argv: &[S], flag: &Flag) -> bool {
    let mut state = false;
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_ref();
        let next: Option<&str> = argv.get(i + 1).map(|s| s.as_ref());
        i += 1;

        if arg == "--" {
            break;
        }

        if let Some(body) = arg.strip_prefix("--") {
            let (name, inline) = match body.split_once('=') {
                Some((n, v)) => (n, Some(v)),
                None => (body, None),
            };
            if flag.long.contains(&name) {
                state = match inline {
                    Some(v) => truthy(v),
                    None => match value_token(next) {
                        Some(v) => {
                            i += 1;
                            truthy(v)
                        }
                        None => true,
                    },
                };
            } else if let Some(negated) = name.strip_prefix("no-") {
                if flag.long.contains(&negated) {
                    state = false;
                }
            }
            continue;
        }

        if let Some(group) = arg.strip_prefix('-') {
            if group.is_empty() || group.starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            let group = group.split_once('=').map_or(group, |(g, _)| g);
            let last = group.chars().last();
            for c in group.chars() {
                if !flag.short.contains(&c) {
                    continue;
                }
                state = if Some(c) == last {
                    match value_token(next) {
                        Some(v) => {
                            i += 1;
                            truthy(v)
                        }
                        None => true,
                    }
                } else {
                    true
                };
            }
        }
    }
    state
}

/// A following token counts as a value only when it is not itself a flag.
fn value_token(next: Option<&str>) -> Option<&str> {
    next.filter(|v| matches!(*v, "true" | "false" | "0" | "1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truth_table() {
        let yes: &[&[&str]] = &[
            &["node", "webpack", "--watch"],
            &["node", "webpack", "-w"],
            &["node", "webpack", "--watch-stdin"],
            &["node", "webpack", "--stdin"],
            &["node", "/opt/webpack-serve/cli.js"],
            &["node", "node_modules/.bin/webpack-dev-server", "--hot"],
        ];
        for argv in yes {
            assert!(is_watch_mode(argv), "{argv:?} should be watch mode");
        }

        let no: &[&[&str]] = &[
            &[],
            &["node", "webpack"],
            &["node", "webpack", "--mode", "production", "--config", "a.js"],
            &["node", "webpack", "--watcher"],
        ];
        for argv in no {
            assert!(!is_watch_mode(argv), "{argv:?} should not be watch mode");
        }
    }

    #[test]
    fn falsy_values_disable_the_flag() {
        assert!(!is_watch_mode(&["webpack", "--watch=false"]));
        assert!(!is_watch_mode(&["webpack", "--watch", "false"]));
        assert!(!is_watch_mode(&["webpack", "--watch=0"]));
        assert!(!is_watch_mode(&["webpack", "--stdin="]));
        assert!(!is_watch_mode(&["webpack", "-w", "false"]));
        assert!(is_watch_mode(&["webpack", "--watch=true"]));
        assert!(is_watch_mode(&["webpack", "--watch", "1"]));
    }

    #[test]
    fn last_occurrence_wins() {
        assert!(!is_watch_mode(&["webpack", "--watch", "--no-watch"]));
        assert!(is_watch_mode(&["webpack", "--no-watch", "-w"]));
    }

    #[test]
    fn short_groups_and_positionals() {
        assert!(is_watch_mode(&["webpack", "-pw"]));
        assert!(is_watch_mode(&["webpack", "-wp"]));
        assert!(!is_watch_mode(&["webpack", "--", "--watch"]));
        assert!(!is_watch_mode(&["webpack", "-", "-1"]));
    }

    #[test]
    fn bare_flag_followed_by_path_stays_true() {
        assert!(is_watch_mode(&["webpack", "--watch", "src/main.nim"]));
    }

    #[test]
    fn dev_server_marker_survives_double_dash() {
        assert!(is_watch_mode(&["node", "--", "webpack-dev-server"]));
    }
}
