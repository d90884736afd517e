use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Word(String),
    Less,      // <
    Greater,   // >
    Pipe,      // |
    And,       // &&
    Or,        // ||
    Semi,      // ;
    LParen,    // (
    RParen,    // )
    End,
    Error(&'static str),
}

impl Token {
    /// Short rendering for syntax diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Token::Word(word) => word.clone(),
            Token::Less => "<".to_string(),
            Token::Greater => ">".to_string(),
            Token::Pipe => "|".to_string(),
            Token::And => "&&".to_string(),
            Token::Or => "||".to_string(),
            Token::Semi => ";".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::End => "end of line".to_string(),
            Token::Error(msg) => msg.to_string(),
        }
    }
}

const OPERATOR_CHARS: &str = "<>|&;()";

/// Single-pass scanner over one input line. Tokens are handed out one at a
/// time; the cursor never moves backwards.
pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.chars().peekable(),
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.peek_char() {
            None => Token::End,
            Some(c) => match c {
                '&' => {
                    self.read_char();
                    if self.peek_char() == Some('&') {
                        self.read_char();
                        Token::And
                    } else {
                        Token::Error("unexpected '&'")
                    }
                }
                '|' => {
                    self.read_char();
                    if self.peek_char() == Some('|') {
                        self.read_char();
                        Token::Or
                    } else {
                        Token::Pipe
                    }
                }
                '<' => {
                    self.read_char();
                    Token::Less
                }
                '>' => {
                    self.read_char();
                    Token::Greater
                }
                ';' => {
                    self.read_char();
                    Token::Semi
                }
                '(' => {
                    self.read_char();
                    Token::LParen
                }
                ')' => {
                    self.read_char();
                    Token::RParen
                }
                _ => self.read_word(),
            },
        }
    }

    fn read_char(&mut self) -> Option<char> {
        self.input.next()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            self.read_char();
        }
    }

    fn read_word(&mut self) -> Token {
        let mut word = String::new();

        while let Some(c) = self.peek_char() {
            if c.is_whitespace() || OPERATOR_CHARS.contains(c) {
                break;
            }
            word.push(c);
            self.read_char();
        }

        Token::Word(word)
    }
}
