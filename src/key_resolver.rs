const VERSION_LEN: usize = 19;
const ANCHOR_NAMES: [&str; 2] = ["index.html", "asset-manifest.json"];

/// Prefix under which a build lives in the source bucket.
pub fn source_prefix(frontend: &str, version: &str) -> String {
    let version: String = version.chars().take(VERSION_LEN).collect();
    format!("{}/{}/", frontend, version)
}

/// Maps a source key to its key in the destination bucket.
pub fn destination_path<'a>(
    source_key: &'a str,
    source_prefix: &str,
    strip_extension: bool,
) -> &'a str {
    let path = source_key.strip_prefix(source_prefix).unwrap_or(source_key);
    if strip_extension {
        path.strip_suffix(".html").unwrap_or(path)
    } else {
        path
    }
}

pub fn depth(key: &str) -> usize {
    key.matches('/').count()
}

/// Entry points that clients fetch first and should be overwritten last.
pub fn is_anchor(key: &str) -> bool {
    let name = key.rsplit('/').next().unwrap_or(key);
    ANCHOR_NAMES.contains(&name)
}
