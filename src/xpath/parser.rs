//! XPath Parser
//!
//! Recursive descent parser for XPath 1.0 expressions.

use super::lexer::{Lexer, Token};
use crate::error::QueryError;

/// XPath expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Root path (/)
    Root,
    /// Union of two expressions (|)
    Union(Box<Expr>, Box<Expr>),
    /// Path expression (expr/step)
    Path(Box<Expr>, Box<Step>),
    /// Filter expression: a primary expression with a predicate
    Filter(Box<Expr>, Box<Expr>),
    Function(String, Vec<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Negate(Box<Expr>),
    Number(f64),
    String(String),
    Variable(String),
    /// Relative location step from the context node
    Step(Box<Step>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Location step in a path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn new(axis: Axis, node_test: NodeTest) -> Self {
        Step {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }

    /// `descendant-or-self::node()`, the expansion of `//`
    fn descendant_or_self() -> Self {
        Step::new(Axis::DescendantOrSelf, NodeTest::Node)
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            "namespace" => Some(Axis::Namespace),
            _ => None,
        }
    }

    /// Reverse axes number their nodes nearest-first
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent
                | Axis::Ancestor
                | Axis::AncestorOrSelf
                | Axis::PrecedingSibling
                | Axis::Preceding
        )
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// `*`: any node of the axis' principal type
    Any,
    /// Unprefixed name; matches only names without a namespace
    Name(String),
    /// prefix:local
    QName(String, String),
    /// prefix:*
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

/// XPath parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peeked: Option<Token>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Result<Self, QueryError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            peeked: None,
        })
    }

    /// Parse a complete expression; trailing tokens are an error
    pub fn parse(&mut self) -> Result<Expr, QueryError> {
        let expr = self.parse_expr()?;
        if self.current != Token::Eof {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn advance(&mut self) -> Result<(), QueryError> {
        self.current = match self.peeked.take() {
            Some(t) => t,
            None => self.lexer.next_token()?,
        };
        Ok(())
    }

    fn peek(&mut self) -> Result<&Token, QueryError> {
        let token = match self.peeked.take() {
            Some(t) => t,
            None => self.lexer.next_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), QueryError> {
        if self.current != token {
            return Err(QueryError::Syntax(format!(
                "expected {} but found {}",
                what,
                describe(&self.current)
            )));
        }
        self.advance()
    }

    fn unexpected(&self) -> QueryError {
        QueryError::Syntax(format!("unexpected {}", describe(&self.current)))
    }

    fn parse_expr(&mut self) -> Result<Expr, QueryError> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_and_expr()?;
        while self.current == Token::Or {
            self.advance()?;
            let right = self.parse_and_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_equality_expr()?;
        while self.current == Token::And {
            self.advance()?;
            let right = self.parse_equality_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_relational_expr()?;
        loop {
            let op = match self.current {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_relational_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_additive_expr()?;
        loop {
            let op = match self.current {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.current {
                Token::Multiply => BinaryOp::Mul,
                Token::Div => BinaryOp::Div,
                Token::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, QueryError> {
        if self.current == Token::Minus {
            self.advance()?;
            let expr = self.parse_unary_expr()?;
            Ok(Expr::Negate(Box::new(expr)))
        } else {
            self.parse_union_expr()
        }
    }

    fn parse_union_expr(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_path_expr()?;
        while self.current == Token::Pipe {
            self.advance()?;
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Whether the current token can begin a location step
    fn at_step_start(&self) -> bool {
        matches!(
            self.current,
            Token::Star
                | Token::Name(_)
                | Token::QName(..)
                | Token::PrefixWildcard(_)
                | Token::NodeType(_)
                | Token::Axis(_)
                | Token::At
                | Token::Dot
                | Token::DoubleDot
        )
    }

    fn parse_path_expr(&mut self) -> Result<Expr, QueryError> {
        let expr = if self.current == Token::Slash {
            self.advance()?;
            if !self.at_step_start() {
                return Ok(Expr::Root);
            }
            let step = self.parse_step()?;
            Expr::Path(Box::new(Expr::Root), Box::new(step))
        } else if self.current == Token::DoubleSlash {
            self.advance()?;
            let desc = Expr::Path(Box::new(Expr::Root), Box::new(Step::descendant_or_self()));
            let step = self.parse_step()?;
            Expr::Path(Box::new(desc), Box::new(step))
        } else if self.at_step_start() && !self.at_function_call()? {
            let step = self.parse_step()?;
            Expr::Step(Box::new(step))
        } else {
            self.parse_filter_expr()?
        };
        self.parse_path_tail(expr)
    }

    /// A plain name followed by `(` is a function call, not a step
    fn at_function_call(&mut self) -> Result<bool, QueryError> {
        match self.current {
            Token::Name(_) | Token::QName(..) => Ok(*self.peek()? == Token::LeftParen),
            _ => Ok(false),
        }
    }

    /// `/step` and `//step` continuations
    fn parse_path_tail(&mut self, mut expr: Expr) -> Result<Expr, QueryError> {
        loop {
            match self.current {
                Token::Slash => {
                    self.advance()?;
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                Token::DoubleSlash => {
                    self.advance()?;
                    let desc = Expr::Path(Box::new(expr), Box::new(Step::descendant_or_self()));
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(desc), Box::new(step));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_filter_expr(&mut self) -> Result<Expr, QueryError> {
        let mut expr = self.parse_primary_expr()?;
        while self.current == Token::LeftBracket {
            let pred = self.parse_predicate()?;
            expr = Expr::Filter(Box::new(expr), Box::new(pred));
        }
        Ok(expr)
    }

    fn parse_predicate(&mut self) -> Result<Expr, QueryError> {
        self.expect(Token::LeftBracket, "'['")?;
        let pred = self.parse_expr()?;
        self.expect(Token::RightBracket, "']'")?;
        Ok(pred)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, QueryError> {
        match &self.current {
            Token::Number(n) => {
                let n = *n;
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::Literal(s) => {
                let s = s.clone();
                self.advance()?;
                Ok(Expr::String(s))
            }
            Token::Dollar => {
                self.advance()?;
                let name = match &self.current {
                    Token::Name(name) => name.clone(),
                    Token::QName(prefix, local) => format!("{}:{}", prefix, local),
                    _ => return Err(QueryError::Syntax("expected variable name after '$'".to_string())),
                };
                self.advance()?;
                Ok(Expr::Variable(name))
            }
            Token::LeftParen => {
                self.advance()?;
                let expr = self.parse_expr()?;
                self.expect(Token::RightParen, "')'")?;
                Ok(expr)
            }
            Token::Name(name) => {
                let name = name.clone();
                self.parse_function_call(name)
            }
            Token::QName(prefix, local) => {
                let name = format!("{}:{}", prefix, local);
                self.parse_function_call(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_function_call(&mut self, name: String) -> Result<Expr, QueryError> {
        self.advance()?;
        self.expect(Token::LeftParen, "'('")?;
        let args = self.parse_function_args()?;
        Ok(Expr::Function(name, args))
    }

    fn parse_step(&mut self) -> Result<Step, QueryError> {
        match self.current {
            Token::Dot => {
                self.advance()?;
                return Ok(Step::new(Axis::Self_, NodeTest::Node));
            }
            Token::DoubleDot => {
                self.advance()?;
                return Ok(Step::new(Axis::Parent, NodeTest::Node));
            }
            _ => {}
        }

        let mut axis = Axis::Child;
        if self.current == Token::At {
            axis = Axis::Attribute;
            self.advance()?;
        } else if let Token::Axis(name) = &self.current {
            axis = Axis::from_name(name)
                .ok_or_else(|| QueryError::Syntax(format!("unknown axis '{}'", name)))?;
            self.advance()?;
            self.expect(Token::DoubleColon, "'::'")?;
        }

        let node_test = self.parse_node_test()?;
        let mut step = Step::new(axis, node_test);
        while self.current == Token::LeftBracket {
            step.predicates.push(self.parse_predicate()?);
        }
        Ok(step)
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, QueryError> {
        let test = match &self.current {
            Token::Star => NodeTest::Any,
            Token::Name(name) => NodeTest::Name(name.clone()),
            Token::QName(prefix, local) => NodeTest::QName(prefix.clone(), local.clone()),
            Token::PrefixWildcard(prefix) => NodeTest::NamespaceWildcard(prefix.clone()),
            Token::NodeType(kind) => {
                let kind = kind.clone();
                self.advance()?;
                self.expect(Token::LeftParen, "'('")?;
                let test = match kind.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => {
                        let target = match &self.current {
                            Token::Literal(s) => Some(s.clone()),
                            _ => None,
                        };
                        if target.is_some() {
                            self.advance()?;
                        }
                        NodeTest::ProcessingInstruction(target)
                    }
                };
                self.expect(Token::RightParen, "')'")?;
                return Ok(test);
            }
            _ => {
                return Err(QueryError::Syntax(format!(
                    "expected a node test but found {}",
                    describe(&self.current)
                )))
            }
        };
        self.advance()?;
        Ok(test)
    }

    fn parse_function_args(&mut self) -> Result<Vec<Expr>, QueryError> {
        let mut args = Vec::new();
        if self.current != Token::RightParen {
            args.push(self.parse_expr()?);
            while self.current == Token::Comma {
                self.advance()?;
                args.push(self.parse_expr()?);
            }
        }
        self.expect(Token::RightParen, "')'")?;
        Ok(args)
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Eof => "end of expression".to_string(),
        Token::Name(n) => format!("'{}'", n),
        Token::QName(p, l) => format!("'{}:{}'", p, l),
        Token::Literal(s) => format!("string '{}'", s),
        Token::Number(n) => format!("number {}", n),
        other => format!("{:?}", other),
    }
}

/// Parse an XPath expression string
pub fn parse(input: &str) -> Result<Expr, QueryError> {
    Parser::new(input)?.parse()
}
