//! Route pattern compilation, matching and reversal.
//!
//! A pattern is a path template made of four kinds of pieces:
//!
//! - literal text (`/books`)
//! - required dynamic segments (`:id`), matching one path segment
//! - greedy wildcards (`*path`), matching the remainder of the path
//! - optional groups (`(/:format)`), which may wrap any sub-pattern
//!
//! Patterns are compiled once into an anchored [`Regex`] for matching and
//! kept as a token tree for reverse routing.
//!
//! # Example
//!
//! ```rust
//! use trellis_router::RoutePattern;
//!
//! let pattern = RoutePattern::normalized("/books/:id").unwrap();
//! assert_eq!(pattern.source(), "/books/:id(/)");
//!
//! let params = pattern.match_path("/books/42/").unwrap();
//! assert_eq!(params.get("id"), Some("42"));
//! assert_eq!(pattern.reverse(&params).as_deref(), Some("/books/42"));
//! ```

use std::fmt;

use regex::Regex;
use thiserror::Error;

use crate::params::Params;

/// Errors produced while compiling a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// A `:` or `*` was not followed by a parameter name.
    #[error("missing parameter name at offset {offset} in pattern `{pattern}`")]
    EmptyName {
        /// The offending pattern.
        pattern: String,
        /// Byte offset of the sigil.
        offset: usize,
    },

    /// A `)` appeared without a matching `(`.
    #[error("unbalanced `)` at offset {offset} in pattern `{pattern}`")]
    UnbalancedGroup {
        /// The offending pattern.
        pattern: String,
        /// Byte offset of the parenthesis.
        offset: usize,
    },

    /// An optional group was never closed.
    #[error("unclosed optional group in pattern `{pattern}`")]
    UnclosedGroup {
        /// The offending pattern.
        pattern: String,
    },

    /// The compiled expression was rejected by the regex engine.
    #[error("pattern `{pattern}` failed to compile: {reason}")]
    Compile {
        /// The offending pattern.
        pattern: String,
        /// Reason reported by the regex engine.
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Param(String),
    Splat(String),
    Optional(Vec<Token>),
}

/// A compiled, immutable route pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    tokens: Vec<Token>,
    names: Vec<String>,
    regex: Regex,
}

/// Normalizes a pattern the way the route DSL registers it.
///
/// A leading slash is enforced, a single trailing slash is stripped and an
/// optional trailing-slash group is appended, so `/foo` and `/foo/` match
/// the same paths.
///
/// ```rust
/// use trellis_router::normalize;
///
/// assert_eq!(normalize("books"), "/books(/)");
/// assert_eq!(normalize("/books/"), "/books(/)");
/// assert_eq!(normalize("/"), "(/)");
/// ```
#[must_use]
pub fn normalize(pattern: &str) -> String {
    let mut normalized = if pattern.starts_with('/') {
        pattern.to_string()
    } else {
        format!("/{pattern}")
    };
    if normalized.ends_with('/') {
        normalized.pop();
    }
    normalized.push_str("(/)");
    normalized
}

impl RoutePattern {
    /// Compiles a pattern exactly as written.
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let mut parser = Parser {
            source,
            chars: source.char_indices().peekable(),
        };
        let tokens = parser.sequence(0)?;

        let mut names = Vec::new();
        let mut expr = String::from("^");
        compile(&tokens, &mut expr, &mut names);
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| PatternError::Compile {
            pattern: source.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: source.to_string(),
            tokens,
            names,
            regex,
        })
    }

    /// Normalizes a pattern (see [`normalize`]) and compiles it.
    pub fn normalized(source: &str) -> Result<Self, PatternError> {
        Self::parse(&normalize(source))
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the dynamic and wildcard names in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Returns `true` if the path matches this pattern.
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches a path, returning the captured parameters.
    ///
    /// Parameters inside optional groups that did not participate in the
    /// match are absent from the result.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let captures = self.regex.captures(path)?;
        let mut params = Params::with_capacity(self.names.len());
        for (index, name) in self.names.iter().enumerate() {
            if let Some(value) = captures.get(index + 1) {
                params.push(name.as_str(), value.as_str());
            }
        }
        Some(params)
    }

    /// Renders a concrete URL from parameter data.
    ///
    /// Returns `None` when a required parameter is missing. Optional groups
    /// are rendered only when they contain parameters and every one of them
    /// is supplied; groups made purely of literals are dropped.
    #[must_use]
    pub fn reverse(&self, data: &Params) -> Option<String> {
        let mut url = reverse_tokens(&self.tokens, data)?;
        if url.is_empty() {
            url.push('/');
        }
        Some(url)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl Parser<'_> {
    fn sequence(&mut self, depth: usize) -> Result<Vec<Token>, PatternError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();

        while let Some((offset, c)) = self.chars.next() {
            match c {
                ':' | '*' => {
                    flush(&mut literal, &mut tokens);
                    let name = self.name();
                    if name.is_empty() {
                        return Err(PatternError::EmptyName {
                            pattern: self.source.to_string(),
                            offset,
                        });
                    }
                    tokens.push(if c == ':' {
                        Token::Param(name)
                    } else {
                        Token::Splat(name)
                    });
                }
                '(' => {
                    flush(&mut literal, &mut tokens);
                    let inner = self.sequence(depth + 1)?;
                    tokens.push(Token::Optional(inner));
                }
                ')' => {
                    if depth == 0 {
                        return Err(PatternError::UnbalancedGroup {
                            pattern: self.source.to_string(),
                            offset,
                        });
                    }
                    flush(&mut literal, &mut tokens);
                    return Ok(tokens);
                }
                _ => literal.push(c),
            }
        }

        if depth > 0 {
            return Err(PatternError::UnclosedGroup {
                pattern: self.source.to_string(),
            });
        }
        flush(&mut literal, &mut tokens);
        Ok(tokens)
    }

    fn name(&mut self) -> String {
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        name
    }
}

fn flush(literal: &mut String, tokens: &mut Vec<Token>) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

fn compile(tokens: &[Token], expr: &mut String, names: &mut Vec<String>) {
    for token in tokens {
        match token {
            Token::Literal(text) => expr.push_str(&regex::escape(text)),
            Token::Param(name) => {
                names.push(name.clone());
                expr.push_str("([^/?]+)");
            }
            Token::Splat(name) => {
                names.push(name.clone());
                expr.push_str("([^?]*?)");
            }
            Token::Optional(inner) => {
                expr.push_str("(?:");
                compile(inner, expr, names);
                expr.push_str(")?");
            }
        }
    }
}

fn has_params(tokens: &[Token]) -> bool {
    tokens.iter().any(|token| match token {
        Token::Literal(_) => false,
        Token::Param(_) | Token::Splat(_) => true,
        Token::Optional(inner) => has_params(inner),
    })
}

fn reverse_tokens(tokens: &[Token], data: &Params) -> Option<String> {
    let mut url = String::new();
    for token in tokens {
        match token {
            Token::Literal(text) => url.push_str(text),
            Token::Param(name) | Token::Splat(name) => url.push_str(data.get(name)?),
            Token::Optional(inner) => {
                if has_params(inner) {
                    if let Some(rendered) = reverse_tokens(inner, data) {
                        url.push_str(&rendered);
                    }
                }
            }
        }
    }
    Some(url)
}
