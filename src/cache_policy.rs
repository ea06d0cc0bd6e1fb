const IMMUTABLE_PREFIXES: [&str; 2] = ["static/", "_next/"];

/// Cache-Control settings applied to promoted objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// `max-age` for fingerprinted assets under `static/` and `_next/`.
    pub max_age_static: u64,
    /// `s-maxage` for everything else.
    pub s_maxage_root: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy {
            max_age_static: 30 * 24 * 60 * 60,
            s_maxage_root: 15,
        }
    }
}

impl CachePolicy {
    pub fn cache_control(&self, destination_path: &str) -> String {
        if is_immutable(destination_path) {
            format!("max-age={}, immutable", self.max_age_static)
        } else {
            format!("max-age=0, s-maxage={}", self.s_maxage_root)
        }
    }
}

fn is_immutable(path: &str) -> bool {
    IMMUTABLE_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}
