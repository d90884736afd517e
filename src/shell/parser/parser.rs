use log::trace;
use thiserror::Error;

use super::ast::{Node, Redirections, SimpleCommand, Subshell};
use super::lexer::{Lexer, Token};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected end of line")]
    UnexpectedEnd,
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),
    #[error("expected a file name after `{0}`")]
    MissingRedirectTarget(char),
    #[error("{0}")]
    Lexer(&'static str),
    #[error("unexpected `{0}` after complete command")]
    TrailingInput(String),
}

/// Parse one line into a command tree.
pub fn parse_line(line: &str) -> Result<Node, ParseError> {
    let mut parser = Parser::new(line);
    let node = parser.parse_sequence()?;

    match &parser.current_token {
        Token::End => Ok(node),
        Token::Error(msg) => Err(ParseError::Lexer(msg)),
        other => Err(ParseError::TrailingInput(other.describe())),
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
        }
    }

    fn next_token(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    /// Hands the current token to the caller and advances.
    fn take_token(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current_token, next)
    }

    /// sequence := and_or (';' and_or)*
    pub fn parse_sequence(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_and_or()?;

        while self.current_token == Token::Semi {
            self.next_token();
            let right = self.parse_and_or()?;
            left = Node::Sequence(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// and_or := pipeline (('&&' | '||') pipeline)*
    fn parse_and_or(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_pipeline()?;

        loop {
            let is_and = match self.current_token {
                Token::And => true,
                Token::Or => false,
                _ => break,
            };
            self.next_token();
            let right = self.parse_pipeline()?;
            left = if is_and {
                Node::And(Box::new(left), Box::new(right))
            } else {
                Node::Or(Box::new(left), Box::new(right))
            };
        }

        Ok(left)
    }

    /// pipeline := command ('|' command)*
    fn parse_pipeline(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_command()?;

        while self.current_token == Token::Pipe {
            self.next_token();
            let right = self.parse_command()?;
            left = Node::Pipe(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// command := '(' sequence ')' redirect* | WORD (WORD | redirect)*
    fn parse_command(&mut self) -> Result<Node, ParseError> {
        match self.take_token() {
            Token::LParen => {
                let body = self.parse_sequence()?;
                match self.take_token() {
                    Token::RParen => {}
                    other => return Err(unexpected(other)),
                }

                let mut redirections = Redirections::default();
                while self.parse_redirection(&mut redirections)? {}

                trace!("parsed subshell: ({})", body);
                Ok(Node::Subshell(Subshell {
                    body: Box::new(body),
                    redirections,
                }))
            }
            Token::Word(program) => {
                let mut command = SimpleCommand {
                    argv: vec![program],
                    redirections: Redirections::default(),
                };

                loop {
                    if let Token::Word(_) = self.current_token {
                        if let Token::Word(arg) = self.take_token() {
                            command.argv.push(arg);
                        }
                        continue;
                    }
                    if !self.parse_redirection(&mut command.redirections)? {
                        break;
                    }
                }

                Ok(Node::Simple(command))
            }
            other => Err(unexpected(other)),
        }
    }

    /// Consumes one `< WORD` or `> WORD` if present. A repeated redirect
    /// replaces the earlier one.
    fn parse_redirection(&mut self, redirections: &mut Redirections) -> Result<bool, ParseError> {
        let op = match self.current_token {
            Token::Less => '<',
            Token::Greater => '>',
            _ => return Ok(false),
        };
        self.next_token(); // 跳过重定向操作符

        let target = match self.take_token() {
            Token::Word(filename) => filename,
            Token::Error(msg) => return Err(ParseError::Lexer(msg)),
            _ => return Err(ParseError::MissingRedirectTarget(op)),
        };

        if op == '<' {
            redirections.input = Some(target);
        } else {
            redirections.output = Some(target);
        }
        Ok(true)
    }
}

fn unexpected(token: Token) -> ParseError {
    match token {
        Token::End => ParseError::UnexpectedEnd,
        Token::Error(msg) => ParseError::Lexer(msg),
        other => ParseError::UnexpectedToken(other.describe()),
    }
}
