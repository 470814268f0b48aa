//! Named-parameter query compiler.
//!
//! Templates refer to parameters as `:name`. Compiling a template rewrites
//! each occurrence to SQLite's positional `?` marker and records the names
//! in occurrence order, repeats included, so the binder can produce one
//! value per marker.

use crate::errors::BackendError;

/// Positional marker understood by SQLite.
pub const POSITIONAL_MARKER: char = '?';

/// A template rewritten to positional markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStatement {
    /// Statement text with `?` markers.
    pub sql: String,

    /// One entry per marker, in the order the markers appear.
    pub names: Vec<String>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Compile a named-parameter template.
///
/// `::` produces a literal colon, and anything inside a single-quoted SQL
/// literal is copied as is.
///
/// # Arguments
/// * `template` - The statement template.
///
/// # Returns
/// The compiled statement, or `BackendError::Parse` when a `:` is not
/// followed by an identifier.
pub fn compile(template: &str) -> Result<CompiledStatement, BackendError> {
    let mut sql = String::with_capacity(template.len());
    let mut names = Vec::new();
    let mut chars = template.char_indices().peekable();
    let mut in_literal = false;

    while let Some((pos, c)) = chars.next() {
        if in_literal {
            sql.push(c);
            if c == '\'' {
                // '' stays inside the literal
                if matches!(chars.peek(), Some((_, '\''))) {
                    sql.push('\'');
                    chars.next();
                } else {
                    in_literal = false;
                }
            }
            continue;
        }

        match c {
            '\'' => {
                in_literal = true;
                sql.push(c);
            }
            ':' => match chars.peek() {
                Some((_, ':')) => {
                    chars.next();
                    sql.push(':');
                }
                Some((_, next)) if is_name_char(*next) => {
                    let mut name = String::new();
                    while let Some((_, n)) = chars.peek() {
                        if !is_name_char(*n) {
                            break;
                        }
                        name.push(*n);
                        chars.next();
                    }
                    sql.push(POSITIONAL_MARKER);
                    names.push(name);
                }
                Some((_, next)) => {
                    return Err(BackendError::Parse {
                        position: pos,
                        reason: format!("expected parameter name after ':', found {next:?}"),
                    });
                }
                None => {
                    return Err(BackendError::Parse {
                        position: pos,
                        reason: "template ends with ':'".into(),
                    });
                }
            },
            _ => sql.push(c),
        }
    }

    if in_literal {
        return Err(BackendError::Parse {
            position: template.len(),
            reason: "unterminated string literal".into(),
        });
    }

    Ok(CompiledStatement { sql, names })
}
