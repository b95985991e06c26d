//! Level filters parsed from `<level>,<module>=<level>` expressions

use log::LevelFilter;
use log4rs::config::Logger;
use std::collections::BTreeMap;

#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct Filters {
    root: Option<LevelFilter>,
    modules: BTreeMap<String, LevelFilter>,
}

/// One comma separated entry. A bare module name enables everything for that module.
fn parse_directive(directive: &str) -> Option<(Option<&str>, LevelFilter)> {
    match directive.split_once('=') {
        None => match directive.parse() {
            Ok(level) => Some((None, level)),
            Err(_) => Some((Some(directive), LevelFilter::max())),
        },
        Some((module, level)) => {
            let (module, level) = (module.trim(), level.trim());
            if module.is_empty() || level.contains('=') {
                return None;
            }
            if level.is_empty() {
                return Some((Some(module), LevelFilter::max()));
            }
            level.parse().ok().map(|level| (Some(module), level))
        }
    }
}

impl Filters {
    pub fn parse(expression: &str) -> Self {
        let mut filters = Self::default();
        for directive in expression.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match parse_directive(directive) {
                Some((None, level)) => filters.root = Some(level),
                Some((Some(module), level)) => {
                    filters.modules.insert(module.to_string(), level);
                }
                None => println!("Ignoring invalid logging directive '{}'", directive),
            }
        }
        filters
    }

    /// Filters from the environment variable `var`, empty if unset
    pub fn from_env(var: &str) -> Self {
        std::env::var(var).map(|expression| Self::parse(&expression)).unwrap_or_default()
    }

    /// Overlays `other` on `self`, entries of `other` winning
    pub fn merge(mut self, other: Filters) -> Self {
        if other.root.is_some() {
            self.root = other.root;
        }
        self.modules.extend(other.modules);
        self
    }

    pub fn root_level(&self) -> LevelFilter {
        self.root.unwrap_or(LevelFilter::Error)
    }

    /// One log4rs logger per module filter, writing to `appenders`
    pub fn loggers(&self, appenders: &[&'static str]) -> Vec<Logger> {
        self.modules
            .iter()
            .map(|(module, level)| Logger::builder().appenders(appenders.iter().copied()).build(module.clone(), *level))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let filters = Filters::parse("info, karaid_lib=trace , karai_database= ,,bogus=level,=warn");
        assert_eq!(filters.root_level(), LevelFilter::Info);
        assert_eq!(
            filters.modules.into_iter().collect::<Vec<_>>(),
            vec![("karai_database".to_string(), LevelFilter::Trace), ("karaid_lib".to_string(), LevelFilter::Trace)]
        );
    }

    #[test]
    fn test_root_level_defaults_to_error() {
        let filters = Filters::parse("");
        assert_eq!(filters.root_level(), LevelFilter::Error);
        assert_eq!(filters, Filters::default());
    }

    #[test]
    fn test_merge_prefers_later_filters() {
        let filters = Filters::parse("info,karai_database=debug").merge(Filters::parse("karai_database=warn,karaid_lib=trace"));
        assert_eq!(filters.root_level(), LevelFilter::Info);
        assert_eq!(filters.modules.get("karai_database"), Some(&LevelFilter::Warn));
        assert_eq!(filters.loggers(&["stdout"]).len(), 2);

        let filters = Filters::parse("info").merge(Filters::parse("debug"));
        assert_eq!(filters.root_level(), LevelFilter::Debug);
    }
}
