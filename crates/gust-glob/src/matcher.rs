//! Single-segment glob matching.
//!
//! Shell-style semantics:
//! - `*` matches zero or more characters
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]` match one character from a set or range
//! - `[!abc]` / `[^abc]` negate the set
//! - `{a,b,c}` brace alternatives, nesting allowed
//! - `\x` escapes the next character

/// Total backtracking steps allowed per match. Bounds the cost of
/// pathological patterns like `*a*a*a*...*b` against long inputs.
const MAX_STEPS: usize = 100_000;

/// True if `s` contains any glob metacharacter.
///
/// Lets callers decide whether an argument is a pattern or a plain path.
pub fn contains_glob(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[') || s.contains('{')
}

/// Match `input` against a glob `pattern`. The pattern must cover the whole
/// input; there is no implicit anchoring to do.
///
/// # Examples
/// ```
/// use gust_glob::glob_match;
///
/// assert!(glob_match("*.js", "checkout.js"));
/// assert!(glob_match("load-?.js", "load-1.js"));
/// assert!(glob_match("*.{js,ts}", "spike.ts"));
/// assert!(!glob_match("*.js", "readme.md"));
/// ```
pub fn glob_match(pattern: &str, input: &str) -> bool {
    let steps = std::cell::Cell::new(0usize);
    let input: Vec<char> = input.chars().collect();
    expand_braces(pattern).iter().any(|pat| {
        let pat: Vec<char> = pat.chars().collect();
        match_from(&pat, 0, &input, 0, &steps)
    })
}

/// Expand `{a,b}` alternatives into the full set of brace-free patterns.
///
/// Nested groups expand recursively; a pattern without braces comes back
/// as a single-element vector.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let chars: Vec<char> = pattern.chars().collect();

    // Locate the first balanced top-level group.
    let mut depth = 0usize;
    let mut open = None;
    let mut close = None;
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '{' => {
                if depth == 0 {
                    open = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }

    let (open, close) = match (open, close) {
        (Some(o), Some(c)) => (o, c),
        // Unbalanced braces are literal characters.
        _ => return vec![pattern.to_string()],
    };

    let prefix: String = chars[..open].iter().collect();
    let body: String = chars[open + 1..close].iter().collect();
    let suffix: String = chars[close + 1..].iter().collect();

    let mut out = Vec::new();
    for alt in split_alternatives(&body) {
        // Re-expand in case the suffix (or a nested group) has more braces.
        out.extend(expand_braces(&format!("{prefix}{alt}{suffix}")));
    }
    out
}

/// Split brace-group content on top-level commas only.
fn split_alternatives(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in body.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Recursive matcher with `*` backtracking, counting total steps.
fn match_from(
    pat: &[char],
    pi: usize,
    input: &[char],
    ii: usize,
    steps: &std::cell::Cell<usize>,
) -> bool {
    let n = steps.get() + 1;
    steps.set(n);
    if n > MAX_STEPS {
        return false;
    }

    if pi >= pat.len() {
        return ii >= input.len();
    }

    match pat[pi] {
        '*' => {
            // Collapse a run of stars into one.
            let mut next = pi;
            while next < pat.len() && pat[next] == '*' {
                next += 1;
            }
            if next >= pat.len() {
                return true;
            }
            (ii..=input.len()).any(|skip| match_from(pat, next, input, skip, steps))
        }
        '?' => ii < input.len() && match_from(pat, pi + 1, input, ii + 1, steps),
        '[' => {
            if ii >= input.len() {
                return false;
            }
            let (hit, consumed) = match_class(&pat[pi..], input[ii]);
            hit && match_from(pat, pi + consumed, input, ii + 1, steps)
        }
        '\\' if pi + 1 < pat.len() => {
            ii < input.len()
                && pat[pi + 1] == input[ii]
                && match_from(pat, pi + 2, input, ii + 1, steps)
        }
        c => ii < input.len() && c == input[ii] && match_from(pat, pi + 1, input, ii + 1, steps),
    }
}

/// Evaluate a `[...]` class against one character.
///
/// Returns (matched, pattern chars consumed). A `]` in first position is
/// literal; an unclosed class falls back to matching a literal `[`.
fn match_class(pat: &[char], ch: char) -> (bool, usize) {
    debug_assert_eq!(pat.first(), Some(&'['));

    let mut i = 1;
    let negated = matches!(pat.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }

    let first = i;
    let mut hit = false;
    let mut closed = false;
    while i < pat.len() {
        if pat[i] == ']' && i > first {
            i += 1;
            closed = true;
            break;
        }
        // Range like a-z, unless the dash is trailing.
        if i + 2 < pat.len() && pat[i + 1] == '-' && pat[i + 2] != ']' {
            if ch >= pat[i] && ch <= pat[i + 2] {
                hit = true;
            }
            i += 3;
        } else {
            if pat[i] == ch {
                hit = true;
            }
            i += 1;
        }
    }

    if !closed {
        return (ch == '[', 1);
    }
    (hit != negated, i)
}
