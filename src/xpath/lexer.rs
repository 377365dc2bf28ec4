//! XPath Lexer
//!
//! Splits an XPath 1.0 expression into tokens.
//!
//! `*` and the operator names (`and`, `or`, `mod`, `div`) are ambiguous on
//! their own. Following the XPath 1.0 lexical rules, they are operators only
//! when a preceding token exists and it is not `@`, `::`, `(`, `[`, `,`, `$`
//! or another operator. Everywhere else they are name tests, so `//div` and
//! `/mod/*` select elements.

use crate::error::QueryError;

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Multiply,    // * in operator position
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,
    Or,
    Mod,
    Div,

    // Brackets
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,

    // Literals
    Number(f64),
    Literal(String),

    // Name tests
    Star,                         // *
    Name(String),                 // NCName
    QName(String, String),        // prefix:local
    PrefixWildcard(String),       // prefix:*
    NodeType(String),             // node( text( comment( processing-instruction(
    Axis(String),                 // name followed by ::

    // Special
    DoubleColon,
    Comma,
    Dollar,

    Eof,
}

impl Token {
    /// Whether a `*` or operator name after this token is an operator
    fn ends_operand(&self) -> bool {
        !matches!(
            self,
            Token::At
                | Token::DoubleColon
                | Token::LeftParen
                | Token::LeftBracket
                | Token::Comma
                | Token::Dollar
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Multiply
                | Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::LtEq
                | Token::Gt
                | Token::GtEq
                | Token::And
                | Token::Or
                | Token::Mod
                | Token::Div
        )
    }
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    previous: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            previous: None,
        }
    }

    /// Byte offset of the next unread character
    pub fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\r' | '\n') {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Next character after any whitespace, without consuming anything
    fn peek_past_whitespace(&self) -> (Option<char>, Option<char>) {
        let mut rest = self.remaining().trim_start_matches([' ', '\t', '\r', '\n']).chars();
        (rest.next(), rest.next())
    }

    fn operator_expected(&self) -> bool {
        self.previous.as_ref().is_some_and(Token::ends_operand)
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, QueryError> {
        let token = self.scan()?;
        self.previous = Some(token.clone());
        Ok(token)
    }

    fn scan(&mut self) -> Result<Token, QueryError> {
        self.skip_whitespace();

        let start = self.pos;
        let Some(c) = self.bump() else {
            return Ok(Token::Eof);
        };

        let token = match c {
            '/' => {
                if self.peek() == Some('/') {
                    self.pos += 1;
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '.' => match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    Token::DoubleDot
                }
                Some(d) if d.is_ascii_digit() => {
                    self.pos = start;
                    return self.read_number();
                }
                _ => Token::Dot,
            },
            '@' => Token::At,
            '|' => Token::Pipe,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => {
                if self.operator_expected() {
                    Token::Multiply
                } else {
                    Token::Star
                }
            }
            '=' => Token::Eq,
            '!' => {
                if self.peek() == Some('=') {
                    self.pos += 1;
                    Token::NotEq
                } else {
                    return Err(self.unexpected('!', start));
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.pos += 1;
                    Token::LtEq
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.pos += 1;
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            ',' => Token::Comma,
            '$' => Token::Dollar,
            ':' => {
                if self.peek() == Some(':') {
                    self.pos += 1;
                    Token::DoubleColon
                } else {
                    return Err(self.unexpected(':', start));
                }
            }
            '"' | '\'' => return self.read_literal(c, start),
            d if d.is_ascii_digit() => {
                self.pos = start;
                return self.read_number();
            }
            n if is_name_start_char(n) => {
                self.pos = start;
                return Ok(self.read_name());
            }
            other => return Err(self.unexpected(other, start)),
        };

        Ok(token)
    }

    fn unexpected(&self, c: char, at: usize) -> QueryError {
        QueryError::Syntax(format!("unexpected character '{}' at position {}", c, at + 1))
    }

    fn read_number(&mut self) -> Result<Token, QueryError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| QueryError::Syntax(format!("invalid number '{}'", text)))
    }

    fn read_literal(&mut self, quote: char, start: usize) -> Result<Token, QueryError> {
        let body = self.pos;
        match self.remaining().find(quote) {
            Some(len) => {
                self.pos = body + len + 1;
                Ok(Token::Literal(self.input[body..body + len].to_string()))
            }
            None => Err(QueryError::Syntax(format!(
                "unterminated string literal starting at position {}",
                start + 1
            ))),
        }
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        if self.peek().is_some_and(is_name_start_char) {
            while let Some(c) = self.peek() {
                if is_name_char(c) {
                    self.pos += c.len_utf8();
                } else {
                    break;
                }
            }
        }
        &self.input[start..self.pos]
    }

    fn read_name(&mut self) -> Token {
        let name = self.read_ncname();

        if self.operator_expected() {
            match name {
                "and" => return Token::And,
                "or" => return Token::Or,
                "mod" => return Token::Mod,
                "div" => return Token::Div,
                _ => {}
            }
        }

        // prefix:local or prefix:*, but not the axis separator
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            match self.peek_at(1) {
                Some('*') => {
                    self.pos += 2;
                    return Token::PrefixWildcard(name.to_string());
                }
                Some(c) if is_name_start_char(c) => {
                    self.pos += 1;
                    let local = self.read_ncname();
                    return Token::QName(name.to_string(), local.to_string());
                }
                _ => {}
            }
        }

        match self.peek_past_whitespace() {
            (Some(':'), Some(':')) => return Token::Axis(name.to_string()),
            (Some('('), _) if is_node_type(name) => return Token::NodeType(name.to_string()),
            _ => {}
        }

        Token::Name(name.to_string())
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, QueryError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if matches!(token, Token::Eof) {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn is_node_type(name: &str) -> bool {
    matches!(name, "node" | "text" | "comment" | "processing-instruction")
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_simple_path() {
        assert_eq!(
            tokens("/root/child"),
            vec![
                Token::Slash,
                Token::Name("root".to_string()),
                Token::Slash,
                Token::Name("child".to_string()),
            ]
        );
    }

    #[test]
    fn test_predicate() {
        assert_eq!(
            tokens("item[@id='test']"),
            vec![
                Token::Name("item".to_string()),
                Token::LeftBracket,
                Token::At,
                Token::Name("id".to_string()),
                Token::Eq,
                Token::Literal("test".to_string()),
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_axis_and_node_type() {
        assert_eq!(
            tokens("child :: text()"),
            vec![
                Token::Axis("child".to_string()),
                Token::DoubleColon,
                Token::NodeType("text".to_string()),
                Token::LeftParen,
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(
            tokens("p:a/p:*"),
            vec![
                Token::QName("p".to_string(), "a".to_string()),
                Token::Slash,
                Token::PrefixWildcard("p".to_string()),
            ]
        );
    }

    #[test]
    fn test_operator_names_depend_on_position() {
        assert_eq!(
            tokens("//div"),
            vec![Token::DoubleSlash, Token::Name("div".to_string())]
        );
        assert_eq!(
            tokens("6 div 2"),
            vec![Token::Number(6.0), Token::Div, Token::Number(2.0)]
        );
        assert_eq!(
            tokens("a and or"),
            vec![
                Token::Name("a".to_string()),
                Token::And,
                Token::Name("or".to_string()),
            ]
        );
    }

    #[test]
    fn test_star_as_name_test_or_multiply() {
        assert_eq!(tokens("/*"), vec![Token::Slash, Token::Star]);
        assert_eq!(
            tokens("2 * 3"),
            vec![Token::Number(2.0), Token::Multiply, Token::Number(3.0)]
        );
        assert_eq!(
            tokens("count(*)*2"),
            vec![
                Token::Name("count".to_string()),
                Token::LeftParen,
                Token::Star,
                Token::RightParen,
                Token::Multiply,
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokens(".5"), vec![Token::Number(0.5)]);
        assert_eq!(tokens("12.25"), vec![Token::Number(12.25)]);
        assert_eq!(tokens(".."), vec![Token::DoubleDot]);
    }

    #[test]
    fn test_unterminated_literal() {
        let err = Lexer::new("a['x]").tokenize().unwrap_err();
        assert!(matches!(err, QueryError::Syntax(m) if m.contains("unterminated")));
    }

    #[test]
    fn test_unexpected_character() {
        assert!(Lexer::new("a # b").tokenize().is_err());
        assert!(Lexer::new("a!b").tokenize().is_err());
    }
}
