//! Build configuration, with environment overrides.

/// Directory names never descended into during discovery.
pub const IMPLICIT_IGNORED_DIRS: &[&str] = &[".git", "__pycache__"];

/// Knobs for source discovery and parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildConfig {
    /// Threads used for reading and parsing files.
    pub workers: usize,
    /// Glob patterns excluded from discovery, matched against root-relative paths.
    pub exclude_patterns: Vec<String>,
    pub respect_gitignore: bool,
    pub include_hidden: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            exclude_patterns: Vec::new(),
            respect_gitignore: true,
            include_hidden: false,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn parse_flag(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    !matches!(v.as_str(), "" | "0" | "false" | "no" | "off")
}

fn parse_patterns(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

impl BuildConfig {
    /// Defaults overridden by `CARTOGRAPHER_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(workers) = lookup("CARTOGRAPHER_WORKERS") {
            match workers.trim().parse::<usize>() {
                Ok(n) => config.workers = n.max(1),
                Err(_) => tracing::warn!("Ignoring invalid CARTOGRAPHER_WORKERS value {workers:?}"),
            }
        }
        if let Some(excludes) = lookup("CARTOGRAPHER_EXCLUDE") {
            config.exclude_patterns = parse_patterns(&excludes);
        }
        if let Some(flag) = lookup("CARTOGRAPHER_RESPECT_GITIGNORE") {
            config.respect_gitignore = parse_flag(&flag);
        }
        if let Some(flag) = lookup("CARTOGRAPHER_INCLUDE_HIDDEN") {
            config.include_hidden = parse_flag(&flag);
        }
        config
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }
}
