use crate::{
    error::SlayError,
    token::{Token, TokenKind},
};
use std::{iter::Peekable, str::Chars};

#[derive(Debug)]
pub struct Lexer<'a> {
    stream: Peekable<Chars<'a>>,
    line: usize,
    // Newlines inside (), [] and {} are insignificant and suppressed,
    // so expressions can span lines.
    bracket_depth: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            stream: source.chars().peekable(),
            line: 1,
            bracket_depth: 0,
        }
    }

    /// Lexes the entire source, aborting on the first stray character,
    /// unterminated string, or unterminated block comment.
    pub fn lex_all(mut self) -> Result<Vec<Token>, SlayError> {
        let mut tokens: Vec<Token> = Vec::default();
        loop {
            let token = self.lex()?;
            if token.kind == TokenKind::EOF {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }

    pub fn lex(&mut self) -> Result<Token, SlayError> {
        loop {
            let Some(c) = self.advance() else {
                return Ok(self.make_token(TokenKind::EOF, "end of file"));
            };
            match c {
                ' ' | '\t' | '\r' => continue,
                '\n' => {
                    let line = self.line;
                    self.line += 1;
                    if self.bracket_depth == 0 {
                        return Ok(Token::new(TokenKind::NEWLINE, "\\n".to_string(), line));
                    }
                }
                '~' => self.skip_comment()?,
                '"' | '\'' => return self.lex_string(c),
                '*' => {
                    return Ok(if self.advance_if(|c| c == '*').is_some() {
                        self.make_token(TokenKind::POWER, "**")
                    } else {
                        self.make_token(TokenKind::STAR, "*")
                    })
                }
                _ => {
                    if let Some(kind) = TokenKind::from_char(c) {
                        match c {
                            '(' | '[' | '{' => self.bracket_depth += 1,
                            ')' | ']' | '}' => {
                                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                            }
                            _ => (),
                        }
                        return Ok(self.make_token(kind, c));
                    } else if c.is_ascii_digit() {
                        return self.lex_number(c);
                    } else if c.is_alphabetic() || c == '_' {
                        return Ok(self.lex_ident(c));
                    }
                    return Err(SlayError::dark_magic(
                        format!("unexpected character '{c}'"),
                        self.line,
                    ));
                }
            }
        }
    }

    fn lex_ident(&mut self, first: char) -> Token {
        let mut text = String::from(first);
        while let Some(c) = self.advance_if(|c| c.is_alphanumeric() || c == '_') {
            text.push(c);
        }
        if let Some(kind) = TokenKind::from_keyword(&text) {
            Token::new(kind, text, self.line)
        } else {
            Token::new(TokenKind::IDENT, text, self.line)
        }
    }

    fn lex_number(&mut self, first: char) -> Result<Token, SlayError> {
        let mut text = String::from(first);
        while let Some(c) = self.advance_if(|c| c.is_ascii_digit()) {
            text.push(c);
        }
        // A dot makes this a potion literal, but only when followed by a
        // digit; `xs[0].member` must not eat the dot.
        if self.stream.peek() == Some(&'.') && self.peek_next_is_digit() {
            text.push(self.advance().unwrap_or('.'));
            while let Some(c) = self.advance_if(|c| c.is_ascii_digit()) {
                text.push(c);
            }
            return Ok(Token::new(TokenKind::FLOAT, text, self.line));
        }
        Ok(Token::new(TokenKind::INTEGER, text, self.line))
    }

    fn lex_string(&mut self, quote: char) -> Result<Token, SlayError> {
        let mut text = String::default();
        loop {
            let Some(c) = self.advance() else {
                return Err(SlayError::dark_magic("unterminated string", self.line));
            };
            if c == quote {
                break;
            }
            if c == '\n' {
                self.line += 1;
                text.push(c);
            } else if c == '\\' {
                match self.advance() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(escaped) => text.push(escaped),
                    None => {
                        return Err(SlayError::dark_magic("unterminated string", self.line));
                    }
                }
            } else {
                text.push(c);
            }
        }
        Ok(Token::new(TokenKind::STRING, text, self.line))
    }

    /// Skips a `~` comment to end of line, or a `~~ ... ~~` block comment
    /// to its closing delimiter.
    fn skip_comment(&mut self) -> Result<(), SlayError> {
        if self.advance_if(|c| c == '~').is_some() {
            loop {
                match self.advance() {
                    Some('~') if self.advance_if(|c| c == '~').is_some() => return Ok(()),
                    Some('\n') => self.line += 1,
                    Some(_) => (),
                    None => {
                        return Err(SlayError::dark_magic(
                            "unterminated multi-line comment",
                            self.line,
                        ))
                    }
                }
            }
        }
        while self.stream.peek().filter(|&&c| c != '\n').is_some() {
            self.advance();
        }
        Ok(())
    }

    fn make_token(&self, kind: TokenKind, lexeme: impl ToString) -> Token {
        Token::new(kind, lexeme.to_string(), self.line)
    }

    fn advance(&mut self) -> Option<char> {
        self.stream.next()
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<char>
    where
        F: FnOnce(char) -> bool,
    {
        if self.stream.peek().filter(|&&c| cond(c)).is_some() {
            self.advance()
        } else {
            None
        }
    }

    fn peek_next_is_digit(&self) -> bool {
        // Peekable offers no second lookahead, so clone the cheap
        // char iterator and step past the dot.
        let mut ahead = self.stream.clone();
        ahead.next();
        ahead.peek().is_some_and(|c| c.is_ascii_digit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .lex_all()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn declaration() {
        assert_eq!(
            kinds("conjure count as 0"),
            vec![
                TokenKind::CONJURE,
                TokenKind::IDENT,
                TokenKind::AS,
                TokenKind::INTEGER
            ]
        );
    }

    #[test]
    fn keywords_and_idents() {
        let tokens = Lexer::new("patrol until slayer_count atleast 3").lex_all().unwrap();
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::PATROL,
                TokenKind::UNTIL,
                TokenKind::IDENT,
                TokenKind::ATLEAST,
                TokenKind::INTEGER
            ]
        );
        assert_eq!(tokens[2].lexeme, "slayer_count");
    }

    #[test]
    fn numbers() {
        let tokens = Lexer::new("42 3.14").lex_all().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::INTEGER);
        assert_eq!(tokens[0].lexeme, "42");
        assert_eq!(tokens[1].kind, TokenKind::FLOAT);
        assert_eq!(tokens[1].lexeme, "3.14");
    }

    #[test]
    fn integer_followed_by_dot_member() {
        assert_eq!(
            kinds("x[0].name"),
            vec![
                TokenKind::IDENT,
                TokenKind::LBRACKET,
                TokenKind::INTEGER,
                TokenKind::RBRACKET,
                TokenKind::DOT,
                TokenKind::IDENT
            ]
        );
    }

    #[test]
    fn string_escapes() {
        let tokens = Lexer::new(r#""a\nb\t\"c\"""#).lex_all().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::STRING);
        assert_eq!(tokens[0].lexeme, "a\nb\t\"c\"");
    }

    #[test]
    fn single_quoted_string() {
        let tokens = Lexer::new("'buffy'").lex_all().unwrap();
        assert_eq!(tokens[0].lexeme, "buffy");
    }

    #[test]
    fn unterminated_string() {
        let err = Lexer::new("\"no end").lex_all().unwrap_err();
        assert_eq!(err.kind, ErrorKind::DarkMagic);
    }

    #[test]
    fn power_before_star() {
        assert_eq!(
            kinds("2 ** 3 * 4"),
            vec![
                TokenKind::INTEGER,
                TokenKind::POWER,
                TokenKind::INTEGER,
                TokenKind::STAR,
                TokenKind::INTEGER
            ]
        );
    }

    #[test]
    fn line_comment() {
        assert_eq!(
            kinds("1 ~ the rest is ignored\n2"),
            vec![TokenKind::INTEGER, TokenKind::NEWLINE, TokenKind::INTEGER]
        );
    }

    #[test]
    fn block_comment() {
        assert_eq!(
            kinds("1 ~~ spans\ntwo lines ~~ 2"),
            vec![TokenKind::INTEGER, TokenKind::INTEGER]
        );
    }

    #[test]
    fn unterminated_block_comment() {
        let err = Lexer::new("~~ never closed").lex_all().unwrap_err();
        assert_eq!(err.kind, ErrorKind::DarkMagic);
    }

    #[test]
    fn newlines_suppressed_in_brackets() {
        assert_eq!(
            kinds("[1,\n2]"),
            vec![
                TokenKind::LBRACKET,
                TokenKind::INTEGER,
                TokenKind::COMMA,
                TokenKind::INTEGER,
                TokenKind::RBRACKET
            ]
        );
    }

    #[test]
    fn unexpected_character() {
        let err = Lexer::new("conjure x as @").lex_all().unwrap_err();
        assert_eq!(err.kind, ErrorKind::DarkMagic);
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn line_numbers() {
        let tokens = Lexer::new("1\n2\n3").lex_all().unwrap();
        let lines: Vec<usize> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::INTEGER)
            .map(|t| t.line)
            .collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }
}
