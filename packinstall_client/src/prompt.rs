use std::{
    collections::HashSet,
    io::{BufRead, Write},
};

use colored::Colorize;
use indicatif::ProgressBar;
use log::warn;
use packinstall_core::{selector::OptionalFile, OptionalFileSelector};

/// Asks on stdin which optional files to install.
pub struct PromptSelector {
    bar: ProgressBar,
}

impl PromptSelector {
    pub fn new(bar: ProgressBar) -> Self {
        PromptSelector { bar }
    }
}

impl OptionalFileSelector for PromptSelector {
    fn select(&self, candidates: &[OptionalFile]) -> HashSet<String> {
        self.bar.suspend(|| {
            println!("{}", "This pack has optional files:".bold());
            for (index, file) in candidates.iter().enumerate() {
                println!("  [{}] {} ({})", index + 1, file.label.blue(), file.path);
            }
            print!("Install which? (comma separated numbers, empty for none): ");
            std::io::stdout().flush().ok();

            let mut line = String::new();
            if let Err(err) = std::io::stdin().lock().read_line(&mut line) {
                warn!("Could not read selection, skipping optional files: {}", err);
                return HashSet::new();
            }
            parse_selection(&line, candidates)
        })
    }
}

/// Maps 1-based indices to candidate paths. Anything unparsable or out of
/// range is reported and dropped.
fn parse_selection(line: &str, candidates: &[OptionalFile]) -> HashSet<String> {
    line.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let file = token
                .parse::<usize>()
                .ok()
                .and_then(|index| index.checked_sub(1))
                .and_then(|index| candidates.get(index));
            if file.is_none() {
                warn!("Ignoring invalid selection {}", token);
            }
            file
        })
        .map(|file| file.path.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<OptionalFile> {
        ["mods/a.jar", "mods/b.jar", "mods/c.jar"]
            .iter()
            .map(|path| OptionalFile {
                label: path.to_string(),
                path: path.to_string(),
            })
            .collect()
    }

    #[test]
    fn parses_indices() {
        let selected = parse_selection(" 1, 3 ,x,0,9\n", &candidates());
        assert_eq!(
            selected,
            HashSet::from(["mods/a.jar".to_string(), "mods/c.jar".to_string()])
        );
        assert!(parse_selection("\n", &candidates()).is_empty());
    }
}
