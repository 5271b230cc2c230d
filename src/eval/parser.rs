use super::lexer::{tokenize, Token};

/// Expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// A single statement: either an assignment or a bare expression.
/// Assignment is statement-level only, so `=` can never be confused with
/// the `==` comparison inside an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign(String, Expr),
    Expr(Expr),
}

/// A parsed script: semicolon-separated statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub stmts: Vec<Stmt>,
}

impl Script {
    /// True when the script could mutate variable state.
    pub fn has_assignment(&self) -> bool {
        self.stmts.iter().any(|s| matches!(s, Stmt::Assign(_, _)))
    }

    /// True when the script is a single read-only expression, the only form
    /// `evaluate` accepts.
    pub fn is_pure_expression(&self) -> bool {
        self.stmts.len() == 1 && !self.has_assignment()
    }
}

/// Parses a full script (statements separated by `;`, trailing `;` allowed).
pub fn parse_script(text: &str) -> Result<Script, String> {
    let tokens = tokenize(text)?;
    let mut parser = Parser::new(&tokens);
    let mut stmts = Vec::new();

    while !parser.at_end() {
        stmts.push(parser.statement()?);
        match parser.peek() {
            Some(Token::Semicolon) => {
                while parser.peek() == Some(&Token::Semicolon) {
                    parser.advance();
                }
            }
            Some(other) => return Err(format!("Expected ';', found {other:?}")),
            None => break,
        }
    }

    Ok(Script { stmts })
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("Expected {expected:?}, found {token:?}")),
            None => Err(format!("Expected {expected:?}, found end of input")),
        }
    }

    fn statement(&mut self) -> Result<Stmt, String> {
        if let (Some(Token::Ident(name)), Some(Token::Assign)) =
            (self.peek(), self.peek_ahead(1))
        {
            let name = name.clone();
            self.advance();
            self.advance();
            let value = self.expression()?;
            return Ok(Stmt::Assign(name, value));
        }

        let expr = self.expression()?;
        if self.peek() == Some(&Token::Assign) {
            return Err("Assignment target must be a plain identifier".to_string());
        }
        Ok(Stmt::Expr(expr))
    }

    fn expression(&mut self) -> Result<Expr, String> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.and_expr()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.equality()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, String> {
        let mut left = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.comparison()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)))
            }
            Some(Token::Not) => {
                self.advance();
                Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.advance().cloned() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if self.peek() != Some(&Token::RParen) {
                        loop {
                            args.push(self.expression()?);
                            match self.peek() {
                                Some(Token::Comma) => {
                                    self.advance();
                                }
                                _ => break,
                            }
                        }
                    }
                    self.expect(&Token::RParen)?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(token) => Err(format!("Unexpected token {token:?}")),
            None => Err("Unexpected end of input".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_precedence() {
        let script = parse_script("1 + 2 * 3").unwrap();
        assert!(script.is_pure_expression());
        match &script.stmts[0] {
            Stmt::Expr(Expr::Binary(BinaryOp::Add, _, right)) => {
                assert!(matches!(**right, Expr::Binary(BinaryOp::Mul, _, _)));
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn parses_assignment_statements() {
        let script = parse_script("x = 5; y = x * 2;").unwrap();
        assert_eq!(script.stmts.len(), 2);
        assert!(script.has_assignment());
        assert!(matches!(&script.stmts[0], Stmt::Assign(name, _) if name == "x"));
    }

    #[test]
    fn parses_calls_with_arguments() {
        let script = parse_script("atan2(y, x)").unwrap();
        match &script.stmts[0] {
            Stmt::Expr(Expr::Call(name, args)) => {
                assert_eq!(name, "atan2");
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn equality_is_not_assignment() {
        let script = parse_script("x == 5").unwrap();
        assert!(!script.has_assignment());
    }

    #[test]
    fn rejects_non_identifier_assignment_target() {
        assert!(parse_script("(x) = 5").is_err());
        assert!(parse_script("3 = 5").is_err());
    }

    #[test]
    fn rejects_missing_semicolon() {
        assert!(parse_script("x = 1 y = 2").is_err());
    }

    #[test]
    fn rejects_dangling_operator() {
        assert!(parse_script("1 +").is_err());
        assert!(parse_script("sin(").is_err());
    }

    #[test]
    fn empty_script_is_valid() {
        let script = parse_script("   ").unwrap();
        assert!(script.stmts.is_empty());
        assert!(!script.is_pure_expression());
    }
}
