use logos::Logos;
use std::ops::Range;

/// Inline token types for paragraph, heading and list item text
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'src> {
    #[token("**")]
    DoubleStar,

    #[token("__")]
    DoubleUnderscore,

    #[token("*")]
    Star,

    #[token("_")]
    Underscore,

    // Code span, backticks stripped
    #[regex(r"`[^`\n]+`", |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    Code(&'src str),

    // Whole `[label](href)` slice, split by `split_link`
    #[regex(r"\[[^\]\n]*\]\([^)\s]*\)", |lex| lex.slice())]
    Link(&'src str),

    // Backslash escape, backslash stripped
    #[regex(r"\\[\\`*_{}\[\]()#+\-.!>|~]", |lex| &lex.slice()[1..])]
    Escaped(&'src str),

    #[token("`")]
    Backtick,

    #[token("[")]
    LBracket,

    #[token("\\")]
    Backslash,

    #[regex(r"[^*_`\[\\]+", |lex| lex.slice())]
    Text(&'src str),
}

impl<'src> Token<'src> {
    /// Literal source text for tokens that degrade to plain text
    pub fn literal(&self) -> &'src str {
        match self {
            Token::DoubleStar => "**",
            Token::DoubleUnderscore => "__",
            Token::Star => "*",
            Token::Underscore => "_",
            Token::Backtick => "`",
            Token::LBracket => "[",
            Token::Backslash => "\\",
            Token::Code(s) | Token::Link(s) | Token::Escaped(s) | Token::Text(s) => *s,
        }
    }
}

/// Tokenize inline text.
///
/// Every byte of the input lands in some token. When a longer pattern such
/// as a link or code span starts matching and then fails, only its first
/// character is rejected: it becomes a single-character token and lexing
/// resumes right after it.
pub fn tokenize(source: &str) -> Vec<(Token<'_>, Range<usize>)> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    'restart: while offset < source.len() {
        let mut lexer = Token::lexer(&source[offset..]);
        while let Some(result) = lexer.next() {
            let span = lexer.span();
            let start = offset + span.start;
            match result {
                Ok(token) => tokens.push((token, start..offset + span.end)),
                Err(()) => {
                    let width = source[start..].chars().next().map_or(1, char::len_utf8);
                    let end = start + width;
                    tokens.push((single_char(&source[start..end]), start..end));
                    offset = end;
                    continue 'restart;
                }
            }
        }
        break;
    }

    tokens
}

fn single_char(slice: &str) -> Token<'_> {
    match slice {
        "[" => Token::LBracket,
        "`" => Token::Backtick,
        "\\" => Token::Backslash,
        "*" => Token::Star,
        "_" => Token::Underscore,
        other => Token::Text(other),
    }
}

/// Split a `[label](href)` slice into `(label, href)`
pub fn split_link(slice: &str) -> (&str, &str) {
    let inner = slice.strip_prefix('[').unwrap_or(slice);
    let inner = inner.strip_suffix(')').unwrap_or(inner);
    match inner.split_once("](") {
        Some((label, href)) => (label, href),
        None => (inner, ""),
    }
}
