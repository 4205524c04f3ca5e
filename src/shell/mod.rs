//! Variable substitution for instruction arguments
//!
//! Implements the subset of shell word expansion build instructions use:
//! escapes, single and double quotes, `$NAME`, `${NAME}` and the `-`, `+`
//! and `?` modifiers (with or without `:`).

use crate::error::{StratumError, StratumResult};
use crate::image::config::lookup_env;

/// Expand variable references in `value` against `env` (`KEY=VALUE` list).
///
/// With `is_filepath` set, the result is lexically cleaned and a trailing
/// `/` on the raw value is kept, so `dir/` still names a directory.
pub fn resolve_environment_replacement(
    value: &str,
    env: &[String],
    is_filepath: bool,
) -> StratumResult<String> {
    let resolved = Lexer::new(value, env).process()?;
    if !is_filepath {
        return Ok(resolved);
    }

    let mut cleaned = clean_path(&resolved);
    if value.ends_with('/') && !cleaned.ends_with('/') {
        cleaned.push('/');
    }
    Ok(cleaned)
}

/// Lexically clean a slash-separated path.
///
/// Collapses repeated separators, drops `.` elements and folds `..` into the
/// preceding element. `..` never climbs above the root of an absolute path.
/// An empty result becomes `.`.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Join `elem` onto `base` and clean the result, ignoring an empty base
pub fn join_path(base: &str, elem: &str) -> String {
    if base.is_empty() {
        clean_path(elem)
    } else {
        clean_path(&format!("{}/{}", base, elem))
    }
}

struct Lexer<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
    env: &'a [String],
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str, env: &'a [String]) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
            env,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn error(&self, reason: impl Into<String>) -> StratumError {
        StratumError::substitution(self.input, reason)
    }

    fn process(&mut self) -> StratumResult<String> {
        let mut out = String::new();
        while let Some(ch) = self.next() {
            match ch {
                '\\' => out.push(self.next().unwrap_or('\\')),
                '\'' => self.single_quoted(&mut out)?,
                '"' => self.double_quoted(&mut out)?,
                '$' => self.dollar(&mut out)?,
                other => out.push(other),
            }
        }
        Ok(out)
    }

    fn single_quoted(&mut self, out: &mut String) -> StratumResult<()> {
        loop {
            match self.next() {
                Some('\'') => return Ok(()),
                Some(ch) => out.push(ch),
                None => return Err(self.error("unexpected end of input looking for matching '")),
            }
        }
    }

    fn double_quoted(&mut self, out: &mut String) -> StratumResult<()> {
        loop {
            match self.next() {
                Some('"') => return Ok(()),
                Some('\\') => match self.next() {
                    Some(ch @ ('"' | '\\' | '$')) => out.push(ch),
                    Some(ch) => {
                        out.push('\\');
                        out.push(ch);
                    }
                    None => break,
                },
                Some('$') => self.dollar(out)?,
                Some(ch) => out.push(ch),
                None => break,
            }
        }
        Err(self.error("unexpected end of input looking for matching \""))
    }

    fn dollar(&mut self, out: &mut String) -> StratumResult<()> {
        match self.peek() {
            Some('{') => {
                self.pos += 1;
                self.braced(out)
            }
            Some(ch) if is_name_char(ch) => {
                let name = self.name();
                out.push_str(self.lookup(&name).unwrap_or_default());
                Ok(())
            }
            _ => {
                out.push('$');
                Ok(())
            }
        }
    }

    fn name(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.peek().filter(|ch| is_name_char(*ch)) {
            name.push(ch);
            self.pos += 1;
        }
        name
    }

    fn braced(&mut self, out: &mut String) -> StratumResult<()> {
        let name = self.name();
        if name.is_empty() {
            return Err(self.error("bad substitution: missing variable name"));
        }

        let colon = match self.next() {
            Some('}') => {
                out.push_str(self.lookup(&name).unwrap_or_default());
                return Ok(());
            }
            Some(':') => true,
            Some(_) => {
                self.pos -= 1;
                false
            }
            None => return Err(self.error("missing '}'")),
        };

        let modifier = match self.next() {
            Some(ch @ ('-' | '+' | '?')) => ch,
            Some(ch) => {
                return Err(self.error(format!("unsupported modifier '{}' in ${{{}}}", ch, name)))
            }
            None => return Err(self.error("missing '}'")),
        };
        let word = self.word()?;

        let value = self.lookup(&name);
        let is_set = match value {
            Some(v) => !colon || !v.is_empty(),
            None => false,
        };

        match modifier {
            '-' if is_set => out.push_str(value.unwrap_or_default()),
            '-' => out.push_str(&word),
            '+' if is_set => out.push_str(&word),
            '+' => {}
            _ if is_set => out.push_str(value.unwrap_or_default()),
            _ if word.is_empty() => {
                return Err(self.error(format!("{} is not allowed to be unset", name)))
            }
            _ => return Err(self.error(format!("{}: {}", name, word))),
        }
        Ok(())
    }

    /// Modifier operand, up to the closing brace
    fn word(&mut self) -> StratumResult<String> {
        let mut word = String::new();
        loop {
            match self.next() {
                Some('}') => return Ok(word),
                Some('\\') => match self.next() {
                    Some(ch) => word.push(ch),
                    None => break,
                },
                Some('$') => self.dollar(&mut word)?,
                Some(ch) => word.push(ch),
                None => break,
            }
        }
        Err(self.error("missing '}'"))
    }

    fn lookup(&self, name: &str) -> Option<&'a str> {
        lookup_env(self.env, name)
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
