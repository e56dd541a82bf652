//! Shell-word splitting
//!
//! Commands are split into argument vectors with POSIX quoting rules and
//! executed directly, so no shell ever interprets a password. Supported:
//! single quotes, double quotes and backslash escapes. Expansions
//! (`$VAR`, globs, backticks) are not performed; their characters are kept
//! literally.

use thiserror::Error;

/// Why a command line could not be split
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShellWordsError {
    #[error("unterminated single quote starting at byte {0}")]
    UnterminatedSingleQuote(usize),

    #[error("unterminated double quote starting at byte {0}")]
    UnterminatedDoubleQuote(usize),

    #[error("dangling backslash at end of input")]
    DanglingEscape,
}

#[derive(Clone, Copy)]
enum State {
    /// Between words
    Blank,
    /// Inside an unquoted word
    Word,
    /// Inside '...', opened at the given byte
    Single(usize),
    /// Inside "...", opened at the given byte
    Double(usize),
}

/// Split a command line into words.
///
/// Empty or whitespace-only input yields an empty vector.
pub fn split(input: &str) -> Result<Vec<String>, ShellWordsError> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut state = State::Blank;
    let mut chars = input.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        state = match state {
            State::Blank | State::Word => match c {
                c if c.is_whitespace() => {
                    if let State::Word = state {
                        words.push(std::mem::take(&mut word));
                    }
                    State::Blank
                }
                '\'' => State::Single(pos),
                '"' => State::Double(pos),
                '\\' => match chars.next() {
                    // Line continuation
                    Some((_, '\n')) => state,
                    Some((_, escaped)) => {
                        word.push(escaped);
                        State::Word
                    }
                    None => return Err(ShellWordsError::DanglingEscape),
                },
                c => {
                    word.push(c);
                    State::Word
                }
            },
            State::Single(start) => match c {
                '\'' => State::Word,
                c => {
                    word.push(c);
                    State::Single(start)
                }
            },
            State::Double(start) => match c {
                '"' => State::Word,
                '\\' => {
                    match chars.peek() {
                        Some(&(_, next @ ('$' | '`' | '"' | '\\'))) => {
                            word.push(next);
                            chars.next();
                        }
                        Some(&(_, '\n')) => {
                            chars.next();
                        }
                        Some(_) => word.push('\\'),
                        None => return Err(ShellWordsError::UnterminatedDoubleQuote(start)),
                    }
                    State::Double(start)
                }
                c => {
                    word.push(c);
                    State::Double(start)
                }
            },
        };
    }

    match state {
        State::Blank => {}
        State::Word => words.push(word),
        State::Single(start) => return Err(ShellWordsError::UnterminatedSingleQuote(start)),
        State::Double(start) => return Err(ShellWordsError::UnterminatedDoubleQuote(start)),
    }

    Ok(words)
}
