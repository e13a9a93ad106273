//! Expansion of time templates and glob patterns in configured paths.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use glob::MatchOptions;

/// Replace strftime directives in `template` using `now`.
///
/// Templates containing invalid directives are returned unchanged.
pub fn expand_time(template: &str, now: &DateTime<Local>) -> String {
    let items = StrftimeItems::new(template);
    if items.clone().any(|item| item == Item::Error) {
        log::warn!(target: "expand", "Invalid time format in '{template}', leaving it unexpanded");
        return template.to_string();
    }

    now.format_with_items(items).to_string()
}

/// Expand every pattern in `patterns` into the paths it refers to.
///
/// Each pattern is time expanded first and then matched against the
/// filesystem. Patterns matching nothing are kept verbatim, like an
/// interactive shell does. An empty pattern list yields no paths.
pub fn expand_paths<S: AsRef<str>>(patterns: &[S], now: &DateTime<Local>) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|pattern| {
            let pattern = expand_time(pattern.as_ref(), now);
            let matches = expand_glob(&pattern);
            if matches.is_empty() {
                log::trace!(target: "expand", "Pattern '{pattern}' matched nothing");
                vec![pattern]
            } else {
                matches
            }
        })
        .collect()
}

fn expand_glob(pattern: &str) -> Vec<String> {
    // `*` and `?` skip dotfiles, as in the shell
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    match glob::glob_with(pattern, options) {
        Ok(paths) => paths
            .filter_map(Result::ok)
            .map(|path| path.display().to_string())
            .collect(),
        Err(e) => {
            log::debug!(target: "expand", "Malformed glob pattern '{pattern}': {e}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::TimeZone;

    use super::*;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 4, 5, 6).unwrap()
    }

    #[test]
    fn time_directives_are_replaced() {
        let now = fixed_now();
        assert_eq!(
            expand_time("/backup/%Y/%m/%d/www-%H%M.tar", &now),
            "/backup/2024/03/09/www-0405.tar"
        );
        assert_eq!(expand_time("/plain/path", &now), "/plain/path");
    }

    #[test]
    fn invalid_directive_is_left_alone() {
        let now = fixed_now();
        assert_eq!(expand_time("/backup/%Q-x", &now), "/backup/%Q-x");
    }

    #[test]
    fn empty_pattern_list() {
        let patterns: Vec<String> = Vec::new();
        assert!(expand_paths(&patterns, &fixed_now()).is_empty());
    }

    #[test]
    fn globs_match_existing_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.conf", "a.conf", "c.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let pattern = format!("{}/*.conf", dir.path().display());

        let paths = expand_paths(&[pattern], &fixed_now());

        assert_eq!(
            paths,
            vec![
                format!("{}/a.conf", dir.path().display()),
                format!("{}/b.conf", dir.path().display()),
            ]
        );
    }

    #[test]
    fn globs_skip_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in [".secret", "visible"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let pattern = format!("{}/*", dir.path().display());

        let paths = expand_paths(&[pattern], &fixed_now());

        assert_eq!(paths, vec![format!("{}/visible", dir.path().display())]);
    }

    #[test]
    fn unmatched_and_malformed_patterns_stay_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let missing = format!("{}/nothing-*", dir.path().display());
        let malformed = format!("{}/[", dir.path().display());

        let paths = expand_paths(&[missing.clone(), malformed.clone()], &fixed_now());

        assert_eq!(paths, vec![missing, malformed]);
    }
}
