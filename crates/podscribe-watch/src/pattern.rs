use regex::Regex;

/// Marker that switches a pattern from exact comparison to glob matching
const WILDCARD: char = '*';

/// A single compiled name pattern
#[derive(Clone, Debug)]
enum NamePattern {
    Exact(String),
    Glob(Regex),

    /// A glob that failed to compile; matches nothing
    Invalid,
}

impl NamePattern {
    fn compile(pattern: &str) -> Self {
        if !pattern.contains(WILDCARD) {
            return Self::Exact(pattern.to_string());
        }

        match glob_to_regex(pattern).and_then(|re| Regex::new(&re).ok()) {
            Some(re) => Self::Glob(re),
            None => {
                tracing::warn!(pattern, "Ignoring malformed glob pattern");
                Self::Invalid
            }
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == name,
            Self::Glob(re) => re.is_match(name),
            Self::Invalid => false,
        }
    }
}

/// A list of name patterns compiled once; an empty list matches everything
#[derive(Clone, Debug, Default)]
pub struct PatternList {
    patterns: Vec<NamePattern>,
    raw: Vec<String>,
}

impl PatternList {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw: Vec<String> = patterns.into_iter().map(Into::into).collect();
        Self {
            patterns: raw.iter().map(|p| NamePattern::compile(p)).collect(),
            raw,
        }
    }

    /// True if the list is empty or any pattern matches `name`
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(name))
    }

    /// Check if the list is empty (matches everything)
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The patterns as given
    pub fn as_slice(&self) -> &[String] {
        &self.raw
    }

    /// The single pattern of the list if it is an exact name
    pub fn single_exact(&self) -> Option<&str> {
        match self.patterns.as_slice() {
            [NamePattern::Exact(name)] => Some(name.as_str()),
            _ => None,
        }
    }
}

/// Match `name` against one pattern: glob if it contains `*`, exact otherwise
pub fn name_matches(name: &str, pattern: &str) -> bool {
    NamePattern::compile(pattern).matches(name)
}

/// Match `name` against any of `patterns`; an empty slice matches everything
pub fn matches_any<S: AsRef<str>>(name: &str, patterns: &[S]) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| name_matches(name, p.as_ref()))
}

/// Translate a shell glob into an anchored regex.
///
/// `*` and `?` never cross a `/`, classes accept `^` or `!` for negation and
/// `\` escapes the next character. Returns `None` for malformed globs.
fn glob_to_regex(glob: &str) -> Option<String> {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');

    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '\\' => out.push_str(&regex::escape(&chars.next()?.to_string())),
            '[' => {
                out.push('[');
                if matches!(chars.peek(), Some(&'^') | Some(&'!')) {
                    chars.next();
                    out.push('^');
                }

                let mut empty = true;
                loop {
                    let c = match chars.next()? {
                        ']' if !empty => break,
                        '\\' => chars.next()?,
                        c => c,
                    };
                    empty = false;
                    out.push_str(&regex::escape(&c.to_string()));

                    if chars.peek() == Some(&'-') {
                        chars.next();
                        let hi = match chars.next()? {
                            ']' => return None,
                            '\\' => chars.next()?,
                            hi => hi,
                        };
                        out.push('-');
                        out.push_str(&regex::escape(&hi.to_string()));
                    }
                }
                out.push(']');
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }

    out.push('$');
    Some(out)
}
