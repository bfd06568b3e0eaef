//! Case-insensitive wildcard matching for rule patterns and name filters.
//!
//! Supported syntax:
//! - `*` matches zero or more characters, including `/`.
//! - `?` matches exactly one character.
//! - everything else is literal.
//!
//! Both sides are lowercased before comparison. A pattern without `/` is also
//! tried against the last segment of the path, so `foo.txt` classifies
//! `sub/foo.txt`.

/// Match `pattern` against a `/`-separated relative path.
pub fn matches(pattern: &str, relative_path: &str) -> bool {
    let pattern = fold(pattern);
    let path = fold(relative_path);
    if wildcard_match(&pattern, &path) {
        return true;
    }
    if !pattern.contains(&'/')
        && let Some(pos) = path.iter().rposition(|c| *c == '/')
    {
        return wildcard_match(&pattern, &path[pos + 1..]);
    }
    false
}

/// Match `pattern` against a single name, without base-name fallback.
pub fn matches_name(pattern: &str, name: &str) -> bool {
    wildcard_match(&fold(pattern), &fold(name))
}

/// True when the pattern contains wildcard characters.
pub fn has_wildcards(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

fn fold(s: &str) -> Vec<char> {
    s.chars().flat_map(char::to_lowercase).collect()
}

// Iterative matcher with single-star backtracking; consecutive stars collapse.
fn wildcard_match(pattern: &[char], text: &[char]) -> bool {
    let mut p = 0usize;
    let mut t = 0usize;
    let mut star: Option<usize> = None;
    let mut resume = 0usize;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            p += 1;
            resume = t;
        } else if let Some(star_pos) = star {
            p = star_pos + 1;
            resume += 1;
            t = resume;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}
