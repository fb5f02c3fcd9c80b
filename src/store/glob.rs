//! Glob Matching Module
//!
//! Redis-style key patterns: `*`, `?`, `[abc]`, `[^abc]`, `[a-z]` and `\` escapes.

/// Returns true if `text` matches the glob `pattern`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    matches(pattern.as_bytes(), text.as_bytes())
}

/// Two-pointer match. On a mismatch only the most recent `*` is widened, so
/// the cost is bounded by `pattern.len() * text.len()`.
fn matches(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Pattern index after the last `*`, and the text index it currently absorbs up to.
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if pattern.get(p) == Some(&b'*') {
            p += 1;
            star = Some((p, t));
            continue;
        }
        if let Some(next) = step(pattern, p, text[t]) {
            p = next;
            t += 1;
            continue;
        }
        match star {
            Some((after_star, absorbed)) => {
                p = after_star;
                t = absorbed + 1;
                star = Some((after_star, t));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&b| b == b'*')
}

/// Matches the single-character token at `pattern[p]` against `c`.
///
/// Returns the index of the next token on a hit.
fn step(pattern: &[u8], p: usize, c: u8) -> Option<usize> {
    match *pattern.get(p)? {
        b'?' => Some(p + 1),
        b'[' => {
            let (hit, after) = class(&pattern[p + 1..], c)?;
            hit.then(|| pattern.len() - after.len())
        }
        b'\\' if p + 1 < pattern.len() => (pattern[p + 1] == c).then_some(p + 2),
        literal => (literal == c).then_some(p + 1),
    }
}

/// Evaluates a bracket class (the part after `[`) against `c`.
///
/// Returns whether `c` is in the class and the pattern after the closing `]`,
/// or `None` if the class is never closed.
fn class(pattern: &[u8], c: u8) -> Option<(bool, &[u8])> {
    let (negate, mut i) = match pattern.first() {
        Some(b'^') => (true, 1),
        _ => (false, 0),
    };
    let mut hit = false;

    while i < pattern.len() && pattern[i] != b']' {
        if pattern[i] == b'\\' && i + 1 < pattern.len() {
            hit |= pattern[i + 1] == c;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == b'-' && pattern[i + 2] != b']' {
            let (lo, hi) = if pattern[i] <= pattern[i + 2] {
                (pattern[i], pattern[i + 2])
            } else {
                (pattern[i + 2], pattern[i])
            };
            hit |= (lo..=hi).contains(&c);
            i += 3;
        } else {
            hit |= pattern[i] == c;
            i += 1;
        }
    }

    if i >= pattern.len() {
        return None;
    }
    Some((hit != negate, &pattern[i + 1..]))
}
