use crate::ast::{Block, Expr, Ident, InfixOp, PrefixOp, Program, Stmt};
use crate::error::ScriptError;
use crate::scanner::Scanner;
use crate::token::{Token, TokenKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Assign,
    Or,
    And,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Assign | TokenKind::PlusAssign | TokenKind::MinusAssign => Precedence::Assign,
        TokenKind::Or => Precedence::Or,
        TokenKind::And => Precedence::And,
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => {
            Precedence::LessGreater
        }
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Asterisk | TokenKind::Slash | TokenKind::Percent => Precedence::Product,
        TokenKind::LParen
        | TokenKind::LBracket
        | TokenKind::Dot
        | TokenKind::PlusPlus
        | TokenKind::MinusMinus => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

pub fn parse(source: &str) -> Result<Program, Vec<ScriptError>> {
    let tokens = Scanner::new(source).tokens();
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    if parser.errors.is_empty() {
        Ok(program)
    } else {
        Err(parser.errors)
    }
}

// Automatic semicolon insertion, Go-style: a newline terminates the
// statement when the line ends in a token that can end one.
fn insert_automatic_semicolons(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let insert = match out.last() {
            Some(prev) if token.line > prev.line && ends_statement(prev.kind) => {
                Some((prev.line, prev.column))
            }
            _ => None,
        };
        if let Some((line, column)) = insert {
            out.push(Token::new(TokenKind::Semicolon, ";", line, column));
        }
        out.push(token);
    }
    out
}

fn ends_statement(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Str
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus
            | TokenKind::Return
            | TokenKind::Break
            | TokenKind::Continue
    )
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ScriptError>,
    // While > 0, a bare `{` terminates expression parsing instead of opening
    // a map literal; reset inside parentheses.
    blocked_braces: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: insert_automatic_semicolons(tokens),
            pos: 0,
            errors: Vec::new(),
            blocked_braces: 0,
        }
    }

    pub fn errors(&self) -> &[ScriptError] {
        &self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while !self.cur_is(TokenKind::Eof) {
            if self.cur_is(TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            match self.parse_statement() {
                Some(stmt) => {
                    statements.push(stmt);
                    self.advance();
                }
                None => self.synchronize(),
            }
        }
        Program { statements }
    }

    fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn cur_is(&self, kind: TokenKind) -> bool {
        self.cur().kind == kind
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_is(kind) {
            self.advance();
            return true;
        }
        let peek = self.peek().clone();
        self.error_at(
            &peek,
            format!(
                "expected next token to be {}, got {}",
                kind.describe(),
                peek.kind.describe()
            ),
        );
        false
    }

    fn error_at(&mut self, token: &Token, message: String) {
        self.errors
            .push(ScriptError::parse(message, token.line, token.column));
    }

    // Error recovery: skip the rest of the source line so one malformed
    // statement reports once instead of cascading.
    fn synchronize(&mut self) {
        let line = self.cur().line;
        self.advance();
        while !matches!(
            self.cur().kind,
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        ) && self.cur().line == line
        {
            self.advance();
        }
        if self.cur_is(TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.cur().kind {
            TokenKind::Var => self.parse_var_statement(false),
            TokenKind::Const => self.parse_var_statement(true),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Break => {
                let token = self.cur().clone();
                self.eat_trailing_semicolon();
                Some(Stmt::Break { token })
            }
            TokenKind::Continue => {
                let token = self.cur().clone();
                self.eat_trailing_semicolon();
                Some(Stmt::Continue { token })
            }
            TokenKind::Function if self.peek_is(TokenKind::Ident) => {
                self.parse_function_declaration()
            }
            TokenKind::Ident if self.looks_like_short_decl() => self.parse_short_decl(),
            _ => self.parse_expression_statement(),
        }
    }

    fn eat_trailing_semicolon(&mut self) {
        if self.peek_is(TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn looks_like_short_decl(&self) -> bool {
        let mut pos = self.pos;
        loop {
            if self.tokens.get(pos).map(|t| t.kind) != Some(TokenKind::Ident) {
                return false;
            }
            match self.tokens.get(pos + 1).map(|t| t.kind) {
                Some(TokenKind::Declare) => return true,
                Some(TokenKind::Comma) => pos += 2,
                _ => return false,
            }
        }
    }

    fn parse_name_list(&mut self) -> Option<Vec<Ident>> {
        let mut names = vec![Ident {
            token: self.cur().clone(),
            name: self.cur().literal.clone(),
        }];
        while self.peek_is(TokenKind::Comma) {
            self.advance();
            if !self.expect_peek(TokenKind::Ident) {
                return None;
            }
            names.push(Ident {
                token: self.cur().clone(),
                name: self.cur().literal.clone(),
            });
        }
        Some(names)
    }

    fn parse_var_statement(&mut self, constant: bool) -> Option<Stmt> {
        let token = self.cur().clone();
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let names = self.parse_name_list()?;
        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.eat_trailing_semicolon();
        Some(Stmt::Var {
            token,
            names,
            value,
            constant,
        })
    }

    fn parse_short_decl(&mut self) -> Option<Stmt> {
        let names = self.parse_name_list()?;
        if !self.expect_peek(TokenKind::Declare) {
            return None;
        }
        let token = self.cur().clone();
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.eat_trailing_semicolon();
        Some(Stmt::ShortDecl {
            token,
            names,
            value,
        })
    }

    fn parse_return_statement(&mut self) -> Option<Stmt> {
        let token = self.cur().clone();
        if self.peek_is(TokenKind::Semicolon) {
            self.advance();
            return Some(Stmt::Return { token, value: None });
        }
        // An implicit null return at the end of a block, or before a token
        // that cannot start an expression.
        if matches!(
            self.peek().kind,
            TokenKind::RBrace | TokenKind::Eof | TokenKind::Var | TokenKind::Return
        ) {
            return Some(Stmt::Return { token, value: None });
        }
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.eat_trailing_semicolon();
        Some(Stmt::Return {
            token,
            value: Some(value),
        })
    }

    fn parse_function_declaration(&mut self) -> Option<Stmt> {
        // func name(..) { .. }  desugars to  var name = func(..) { .. }
        let token = self.cur().clone();
        self.advance();
        let name = Ident {
            token: self.cur().clone(),
            name: self.cur().literal.clone(),
        };
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let params = self.parse_function_params()?;
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block();
        let value = Expr::Function {
            token: token.clone(),
            name: Some(name.name.clone()),
            params,
            body,
        };
        Some(Stmt::Var {
            token,
            names: vec![name],
            value,
            constant: false,
        })
    }

    fn parse_for_statement(&mut self) -> Option<Stmt> {
        let token = self.cur().clone();
        self.advance();

        // for { body }
        if self.cur_is(TokenKind::LBrace) {
            let body = self.parse_block();
            return Some(Stmt::For {
                token,
                init: None,
                cond: None,
                post: None,
                body,
            });
        }

        // for name in iterable { body }
        if self.cur_is(TokenKind::Ident) && self.peek_is(TokenKind::In) {
            let name = Ident {
                token: self.cur().clone(),
                name: self.cur().literal.clone(),
            };
            self.advance();
            self.advance();
            let iterable = self.parse_blocked_expression()?;
            if !self.expect_peek(TokenKind::LBrace) {
                return None;
            }
            let body = self.parse_block();
            return Some(Stmt::ForIn {
                token,
                name,
                iterable,
                body,
            });
        }

        // C-style with a declaration init.
        if self.cur_is(TokenKind::Var) {
            let init = self.parse_var_statement(false)?;
            return self.parse_for_tail(token, Some(Box::new(init)));
        }
        if self.cur_is(TokenKind::Ident) && self.looks_like_short_decl() {
            let init = self.parse_short_decl()?;
            return self.parse_for_tail(token, Some(Box::new(init)));
        }

        // Either `for cond { .. }` or `for init; cond; post { .. }` with an
        // expression init.
        let expr = self.parse_blocked_expression()?;
        if self.peek_is(TokenKind::Semicolon) {
            let init_token = self.cur().clone();
            let init = Stmt::Expr {
                token: init_token,
                expr,
            };
            self.advance();
            return self.parse_for_tail(token, Some(Box::new(init)));
        }

        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block();
        Some(Stmt::For {
            token,
            init: None,
            cond: Some(expr),
            post: None,
            body,
        })
    }

    // Parses `cond; post { body }` after the init statement. The init parse
    // leaves the cursor on the init's final token or its semicolon.
    fn parse_for_tail(&mut self, token: Token, init: Option<Box<Stmt>>) -> Option<Stmt> {
        if !self.cur_is(TokenKind::Semicolon) && !self.expect_peek(TokenKind::Semicolon) {
            return None;
        }
        self.advance();

        let cond = if self.cur_is(TokenKind::Semicolon) {
            None
        } else {
            let cond = self.parse_blocked_expression()?;
            if !self.expect_peek(TokenKind::Semicolon) {
                return None;
            }
            Some(cond)
        };
        self.advance();

        let post = if self.cur_is(TokenKind::LBrace) {
            None
        } else {
            let post_token = self.cur().clone();
            let expr = self.parse_blocked_expression()?;
            if !self.expect_peek(TokenKind::LBrace) {
                return None;
            }
            Some(Box::new(Stmt::Expr {
                token: post_token,
                expr,
            }))
        };

        if !self.cur_is(TokenKind::LBrace) {
            let cur = self.cur().clone();
            self.error_at(&cur, "expected '{' to start for body".to_string());
            return None;
        }
        let body = self.parse_block();
        Some(Stmt::For {
            token,
            init,
            cond,
            post,
            body,
        })
    }

    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let token = self.cur().clone();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.eat_trailing_semicolon();
        Some(Stmt::Expr { token, expr })
    }

    fn parse_block(&mut self) -> Block {
        let token = self.cur().clone();
        self.advance();
        let mut statements = Vec::new();
        while !self.cur_is(TokenKind::RBrace) && !self.cur_is(TokenKind::Eof) {
            if self.cur_is(TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            match self.parse_statement() {
                Some(stmt) => {
                    statements.push(stmt);
                    self.advance();
                }
                None => self.synchronize(),
            }
        }
        Block { token, statements }
    }

    fn parse_blocked_expression(&mut self) -> Option<Expr> {
        self.blocked_braces += 1;
        let expr = self.parse_expression(Precedence::Lowest);
        self.blocked_braces -= 1;
        expr
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix()?;
        while !self.peek_is(TokenKind::Semicolon) && precedence < precedence_of(self.peek().kind)
        {
            self.advance();
            left = self.parse_infix(left)?;
        }
        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expr> {
        let token = self.cur().clone();
        match token.kind {
            TokenKind::Ident => Some(Expr::Ident(Ident {
                name: token.literal.clone(),
                token,
            })),
            TokenKind::Int => match token.literal.parse::<i64>() {
                Ok(value) => Some(Expr::Int { token, value }),
                Err(_) => {
                    self.error_at(
                        &token,
                        format!("could not parse {:?} as integer", token.literal),
                    );
                    None
                }
            },
            TokenKind::Float => match token.literal.parse::<f64>() {
                Ok(value) => Some(Expr::Float { token, value }),
                Err(_) => {
                    self.error_at(
                        &token,
                        format!("could not parse {:?} as float", token.literal),
                    );
                    None
                }
            },
            TokenKind::Str => Some(Expr::Str {
                value: token.literal.clone(),
                token,
            }),
            TokenKind::True => Some(Expr::Bool { token, value: true }),
            TokenKind::False => Some(Expr::Bool {
                token,
                value: false,
            }),
            TokenKind::Null => Some(Expr::Null { token }),
            TokenKind::Bang => self.parse_prefix_op(token, PrefixOp::Not),
            TokenKind::Minus => self.parse_prefix_op(token, PrefixOp::Neg),
            TokenKind::Plus => self.parse_prefix_op(token, PrefixOp::Plus),
            TokenKind::LParen => {
                self.advance();
                let blocked = std::mem::replace(&mut self.blocked_braces, 0);
                let expr = self.parse_expression(Precedence::Lowest);
                self.blocked_braces = blocked;
                let expr = expr?;
                if !self.expect_peek(TokenKind::RParen) {
                    return None;
                }
                Some(expr)
            }
            TokenKind::If => self.parse_if_expression(token),
            TokenKind::Function => self.parse_function_literal(token),
            TokenKind::LBracket => {
                let elements = self.parse_expression_list(TokenKind::RBracket)?;
                Some(Expr::Array { token, elements })
            }
            TokenKind::LBrace => {
                if self.blocked_braces > 0 {
                    self.error_at(
                        &token,
                        "map literal not allowed here; wrap it in parentheses".to_string(),
                    );
                    return None;
                }
                self.parse_map_literal(token)
            }
            TokenKind::Illegal => {
                self.error_at(&token, format!("illegal token {:?}", token.literal));
                None
            }
            other => {
                self.error_at(&token, format!("unexpected token {}", other.describe()));
                None
            }
        }
    }

    fn parse_prefix_op(&mut self, token: Token, op: PrefixOp) -> Option<Expr> {
        self.advance();
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expr::Prefix {
            token,
            op,
            right: Box::new(right),
        })
    }

    fn parse_if_expression(&mut self, token: Token) -> Option<Expr> {
        self.advance();
        let cond = self.parse_blocked_expression()?;
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let consequence = self.parse_block();
        let alternative = if self.peek_is(TokenKind::Else) {
            self.advance();
            if !self.expect_peek(TokenKind::LBrace) {
                return None;
            }
            Some(self.parse_block())
        } else {
            None
        };
        Some(Expr::If {
            token,
            cond: Box::new(cond),
            consequence,
            alternative,
        })
    }

    fn parse_function_literal(&mut self, token: Token) -> Option<Expr> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let params = self.parse_function_params()?;
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block();
        Some(Expr::Function {
            token,
            name: None,
            params,
            body,
        })
    }

    fn parse_function_params(&mut self) -> Option<Vec<Ident>> {
        let mut params = Vec::new();
        if self.peek_is(TokenKind::RParen) {
            self.advance();
            return Some(params);
        }
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        params.push(Ident {
            token: self.cur().clone(),
            name: self.cur().literal.clone(),
        });
        while self.peek_is(TokenKind::Comma) {
            self.advance();
            if !self.expect_peek(TokenKind::Ident) {
                return None;
            }
            params.push(Ident {
                token: self.cur().clone(),
                name: self.cur().literal.clone(),
            });
        }
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(params)
    }

    // Synthetic semicolons from line breaks are meaningless inside brackets,
    // so the list parse skips over them.
    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expr>> {
        let mut list = Vec::new();
        self.skip_peek_semicolons();
        if self.peek_is(end) {
            self.advance();
            return Some(list);
        }
        self.advance();
        list.push(self.parse_expression(Precedence::Lowest)?);
        loop {
            self.skip_peek_semicolons();
            if !self.peek_is(TokenKind::Comma) {
                break;
            }
            self.advance();
            self.skip_peek_semicolons();
            if self.peek_is(end) {
                break;
            }
            self.advance();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }
        self.skip_peek_semicolons();
        if !self.expect_peek(end) {
            return None;
        }
        Some(list)
    }

    fn skip_peek_semicolons(&mut self) {
        while self.peek_is(TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn parse_map_literal(&mut self, token: Token) -> Option<Expr> {
        let mut pairs = Vec::new();
        while !self.peek_is(TokenKind::RBrace) {
            self.advance();
            if self.cur_is(TokenKind::Semicolon) {
                continue;
            }
            let key = self.parse_expression(Precedence::Lowest)?;
            if !self.expect_peek(TokenKind::Colon) {
                return None;
            }
            self.advance();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));
            if !self.peek_is(TokenKind::RBrace) {
                if !self.peek_is(TokenKind::Comma) && !self.peek_is(TokenKind::Semicolon) {
                    let peek = self.peek().clone();
                    self.error_at(
                        &peek,
                        format!(
                            "expected ',' or '}}' in map literal, got {}",
                            peek.kind.describe()
                        ),
                    );
                    return None;
                }
                self.advance();
                while self.peek_is(TokenKind::Semicolon) {
                    self.advance();
                }
            }
        }
        if !self.expect_peek(TokenKind::RBrace) {
            return None;
        }
        Some(Expr::Map { token, pairs })
    }

    fn parse_infix(&mut self, left: Expr) -> Option<Expr> {
        let token = self.cur().clone();
        match token.kind {
            TokenKind::Plus => self.parse_infix_op(token, InfixOp::Add, left),
            TokenKind::Minus => self.parse_infix_op(token, InfixOp::Sub, left),
            TokenKind::Asterisk => self.parse_infix_op(token, InfixOp::Mul, left),
            TokenKind::Slash => self.parse_infix_op(token, InfixOp::Div, left),
            TokenKind::Percent => self.parse_infix_op(token, InfixOp::Mod, left),
            TokenKind::Eq => self.parse_infix_op(token, InfixOp::Eq, left),
            TokenKind::NotEq => self.parse_infix_op(token, InfixOp::NotEq, left),
            TokenKind::Lt => self.parse_infix_op(token, InfixOp::Lt, left),
            TokenKind::Gt => self.parse_infix_op(token, InfixOp::Gt, left),
            TokenKind::LtEq => self.parse_infix_op(token, InfixOp::LtEq, left),
            TokenKind::GtEq => self.parse_infix_op(token, InfixOp::GtEq, left),
            TokenKind::And => self.parse_infix_op(token, InfixOp::And, left),
            TokenKind::Or => self.parse_infix_op(token, InfixOp::Or, left),
            TokenKind::LParen => {
                let args = self.parse_expression_list(TokenKind::RParen)?;
                Some(Expr::Call {
                    token,
                    callee: Box::new(left),
                    args,
                })
            }
            TokenKind::LBracket => self.parse_index_expression(token, left),
            TokenKind::Dot => {
                if !self.expect_peek(TokenKind::Ident) {
                    return None;
                }
                Some(Expr::Member {
                    token,
                    object: Box::new(left),
                    name: self.cur().literal.clone(),
                })
            }
            TokenKind::Assign => self.parse_assign(token, left),
            TokenKind::PlusAssign => self.parse_compound_assign(token, left, InfixOp::Add),
            TokenKind::MinusAssign => self.parse_compound_assign(token, left, InfixOp::Sub),
            TokenKind::PlusPlus => self.parse_postfix_step(token, left, InfixOp::Add),
            TokenKind::MinusMinus => self.parse_postfix_step(token, left, InfixOp::Sub),
            other => {
                self.error_at(&token, format!("unexpected token {}", other.describe()));
                None
            }
        }
    }

    fn parse_infix_op(&mut self, token: Token, op: InfixOp, left: Expr) -> Option<Expr> {
        let precedence = precedence_of(token.kind);
        self.advance();
        let right = self.parse_expression(precedence)?;
        Some(Expr::Infix {
            token,
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_index_expression(&mut self, token: Token, left: Expr) -> Option<Expr> {
        self.advance();

        // `[:`  -- slice with no start bound.
        if self.cur_is(TokenKind::Colon) {
            self.advance();
            if self.cur_is(TokenKind::RBracket) {
                return Some(Expr::Slice {
                    token,
                    left: Box::new(left),
                    start: None,
                    end: None,
                });
            }
            let end = self.parse_expression(Precedence::Lowest)?;
            if !self.expect_peek(TokenKind::RBracket) {
                return None;
            }
            return Some(Expr::Slice {
                token,
                left: Box::new(left),
                start: None,
                end: Some(Box::new(end)),
            });
        }

        let expr = self.parse_expression(Precedence::Lowest)?;

        if self.peek_is(TokenKind::Colon) {
            self.advance();
            self.advance();
            if self.cur_is(TokenKind::RBracket) {
                return Some(Expr::Slice {
                    token,
                    left: Box::new(left),
                    start: Some(Box::new(expr)),
                    end: None,
                });
            }
            let end = self.parse_expression(Precedence::Lowest)?;
            if !self.expect_peek(TokenKind::RBracket) {
                return None;
            }
            return Some(Expr::Slice {
                token,
                left: Box::new(left),
                start: Some(Box::new(expr)),
                end: Some(Box::new(end)),
            });
        }

        if !self.expect_peek(TokenKind::RBracket) {
            return None;
        }
        Some(Expr::Index {
            token,
            left: Box::new(left),
            index: Box::new(expr),
        })
    }

    fn check_assign_target(&mut self, token: &Token, target: &Expr) -> bool {
        match target {
            Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. } => true,
            _ => {
                self.error_at(token, "invalid assignment target".to_string());
                false
            }
        }
    }

    fn parse_assign(&mut self, token: Token, target: Expr) -> Option<Expr> {
        if !self.check_assign_target(&token, &target) {
            return None;
        }
        self.advance();
        // Parse the value below Assign precedence so `a = b = c` groups as
        // `a = (b = c)`.
        let value = self.parse_expression(Precedence::Lowest)?;
        Some(Expr::Assign {
            token,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_compound_assign(&mut self, token: Token, target: Expr, op: InfixOp) -> Option<Expr> {
        if !self.check_assign_target(&token, &target) {
            return None;
        }
        self.advance();
        let rhs = self.parse_expression(Precedence::Lowest)?;
        let value = Expr::Infix {
            token: token.clone(),
            op,
            left: Box::new(target.clone()),
            right: Box::new(rhs),
        };
        Some(Expr::Assign {
            token,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_postfix_step(&mut self, token: Token, target: Expr, op: InfixOp) -> Option<Expr> {
        if !self.check_assign_target(&token, &target) {
            return None;
        }
        let one = Expr::Int {
            token: Token::new(TokenKind::Int, "1", token.line, token.column),
            value: 1,
        };
        let value = Expr::Infix {
            token: token.clone(),
            op,
            left: Box::new(target.clone()),
            right: Box::new(one),
        };
        Some(Expr::Assign {
            token,
            target: Box::new(target),
            value: Box::new(value),
        })
    }
}
