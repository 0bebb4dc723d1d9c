//! Recursive descent parser with precedence climbing for ML statements.

use crate::compiler::ast::*;
use crate::compiler::lexer::{LexError, Lexer};
use crate::compiler::tokens::{Pos, Token, TokenKind};
use num_bigint::BigInt;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected token {found} at line {line}, col {col}; expected {expected}")]
    Unexpected {
        found: String,
        expected: String,
        line: usize,
        col: usize,
    },
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid record label {label} at line {line}, col {col}")]
    InvalidLabel {
        label: String,
        line: usize,
        col: usize,
    },
    #[error("function clause name {found} does not match {expected} at line {line}, col {col}")]
    MixedFunNames {
        expected: String,
        found: String,
        line: usize,
        col: usize,
    },
}

/// Parse a statement: a declaration, or an expression lifted into `val it = …`.
pub fn parse_statement(text: &str) -> Result<Decl, ParseError> {
    let mut parser = Parser::from_source(text)?;
    let decl = parser.statement()?;
    parser.expect_end()?;
    Ok(decl)
}

pub fn parse_decl(text: &str) -> Result<Decl, ParseError> {
    let mut parser = Parser::from_source(text)?;
    let decl = parser.decl()?;
    parser.expect_end()?;
    Ok(decl)
}

pub fn parse_expression(text: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::from_source(text)?;
    let exp = parser.expr()?;
    parser.expect_end()?;
    Ok(exp)
}

pub fn parse_literal(text: &str) -> Result<Literal, ParseError> {
    let mut parser = Parser::from_source(text)?;
    let exp = parser.expr()?;
    parser.expect_end()?;
    match exp {
        Expr::Literal(lit, _) => Ok(lit),
        other => Err(ParseError::Unexpected {
            found: other.to_string(),
            expected: "literal".to_string(),
            line: other.pos().start_line,
            col: other.pos().start_col,
        }),
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn from_source(text: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(text).tokenize()?;
        Ok(Self { tokens, pos: 0 })
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek2(&self) -> &TokenKind {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].kind
    }

    fn here(&self) -> Pos {
        self.tokens[self.pos.min(self.tokens.len() - 1)].pos
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn unexpected<T>(&self, expected: &str) -> Result<T, ParseError> {
        if matches!(self.peek(), TokenKind::Eof) {
            return Err(ParseError::UnexpectedEof);
        }
        let pos = self.here();
        Err(ParseError::Unexpected {
            found: self.peek().to_string(),
            expected: expected.to_string(),
            line: pos.start_line,
            col: pos.start_col,
        })
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.peek() == &kind {
            Ok(self.advance())
        } else {
            self.unexpected(&kind.to_string())
        }
    }

    fn expect_symbol(&mut self, sym: &str) -> Result<Token, ParseError> {
        match self.peek() {
            TokenKind::Symbolic(s) if s == sym => Ok(self.advance()),
            _ => self.unexpected(sym),
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        self.eat(&TokenKind::Semi);
        if matches!(self.peek(), TokenKind::Eof) {
            Ok(())
        } else {
            self.unexpected("end of input")
        }
    }

    fn ident(&mut self, expected: &str) -> Result<(String, Pos), ParseError> {
        match self.peek() {
            TokenKind::Ident(_) => {
                let t = self.advance();
                if let TokenKind::Ident(name) = t.kind {
                    Ok((name, t.pos))
                } else {
                    unreachable!()
                }
            }
            _ => self.unexpected(expected),
        }
    }

    /// A record label: a simple identifier or a positive integer. Integer
    /// label 0 is a syntax error.
    fn label(&mut self) -> Result<(String, Pos), ParseError> {
        let pos = self.here();
        match self.peek().clone() {
            TokenKind::Ident(name) if !name.contains('.') => {
                self.advance();
                Ok((name, pos))
            }
            TokenKind::Int(n) => {
                self.advance();
                if n <= BigInt::from(0) {
                    return Err(ParseError::InvalidLabel {
                        label: n.to_string(),
                        line: pos.start_line,
                        col: pos.start_col,
                    });
                }
                Ok((n.to_string(), pos))
            }
            _ => self.unexpected("record label"),
        }
    }

    // ── Statements and declarations ──

    pub fn statement(&mut self) -> Result<Decl, ParseError> {
        match self.peek() {
            TokenKind::Val | TokenKind::Fun | TokenKind::Datatype => self.decl(),
            _ => {
                let exp = self.expr()?;
                let pos = exp.pos();
                Ok(Decl::Val(
                    vec![ValBind {
                        rec: false,
                        pat: Pat::Id("it".to_string(), Pos::ZERO),
                        exp,
                        pos,
                    }],
                    pos,
                ))
            }
        }
    }

    pub fn decl(&mut self) -> Result<Decl, ParseError> {
        match self.peek() {
            TokenKind::Val => self.val_decl(),
            TokenKind::Fun => self.fun_decl(),
            TokenKind::Datatype => self.datatype_decl(),
            _ => self.unexpected("declaration"),
        }
    }

    fn val_decl(&mut self) -> Result<Decl, ParseError> {
        let start = self.expect(TokenKind::Val)?.pos;
        let mut binds = Vec::new();
        loop {
            let rec = self.eat(&TokenKind::Rec);
            let pat = self.pat()?;
            self.expect_symbol("=")?;
            let exp = self.expr()?;
            let pos = pat.pos().plus(exp.pos());
            binds.push(ValBind { rec, pat, exp, pos });
            if !self.eat(&TokenKind::And) {
                break;
            }
        }
        let pos = start.plus(binds.last().map(|b| b.pos).unwrap_or(start));
        Ok(Decl::Val(binds, pos))
    }

    fn fun_decl(&mut self) -> Result<Decl, ParseError> {
        let start = self.expect(TokenKind::Fun)?.pos;
        let mut binds = Vec::new();
        loop {
            binds.push(self.fun_bind()?);
            if !self.eat(&TokenKind::And) {
                break;
            }
        }
        let pos = start.plus(binds.last().map(|b| b.pos).unwrap_or(start));
        Ok(Decl::Fun(binds, pos))
    }

    fn fun_bind(&mut self) -> Result<FunBind, ParseError> {
        let (name, name_pos) = self.ident("function name")?;
        let mut clauses = vec![self.fun_clause()?];
        while self.eat(&TokenKind::Bar) {
            let (clause_name, clause_pos) = self.ident("function name")?;
            if clause_name != name {
                return Err(ParseError::MixedFunNames {
                    expected: name,
                    found: clause_name,
                    line: clause_pos.start_line,
                    col: clause_pos.start_col,
                });
            }
            clauses.push(self.fun_clause()?);
        }
        let pos = name_pos.plus(clauses.last().map(|c| c.pos).unwrap_or(name_pos));
        Ok(FunBind { name, clauses, pos })
    }

    fn fun_clause(&mut self) -> Result<FunClause, ParseError> {
        let mut pats = vec![self.pat_atom()?];
        while self.starts_pat_atom() {
            pats.push(self.pat_atom()?);
        }
        let annotation = if self.eat(&TokenKind::Colon) {
            Some(self.type_exp()?)
        } else {
            None
        };
        self.expect_symbol("=")?;
        let mut exp = self.expr()?;
        if let Some(ty) = annotation {
            let pos = exp.pos();
            exp = Expr::Annotated(Box::new(exp), ty, pos);
        }
        let pos = pats[0].pos().plus(exp.pos());
        Ok(FunClause { pats, exp, pos })
    }

    fn datatype_decl(&mut self) -> Result<Decl, ParseError> {
        let start = self.expect(TokenKind::Datatype)?.pos;
        let mut binds = Vec::new();
        loop {
            binds.push(self.dat_bind()?);
            if !self.eat(&TokenKind::And) {
                break;
            }
        }
        let pos = start.plus(binds.last().map(|b| b.pos).unwrap_or(start));
        Ok(Decl::Datatype(binds, pos))
    }

    fn dat_bind(&mut self) -> Result<DatBind, ParseError> {
        let start = self.here();
        let mut ty_vars = Vec::new();
        match self.peek().clone() {
            TokenKind::TyVar(v) => {
                self.advance();
                ty_vars.push(v);
            }
            TokenKind::LParen => {
                self.advance();
                loop {
                    match self.peek().clone() {
                        TokenKind::TyVar(v) => {
                            self.advance();
                            ty_vars.push(v);
                        }
                        _ => return self.unexpected("type variable"),
                    }
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen)?;
            }
            _ => {}
        }
        let (name, _) = self.ident("datatype name")?;
        self.expect_symbol("=")?;
        let mut cons = Vec::new();
        loop {
            let (con_name, con_pos) = self.ident("constructor name")?;
            let ty = if self.eat(&TokenKind::Of) {
                Some(self.type_exp()?)
            } else {
                None
            };
            cons.push(ConBind {
                name: con_name,
                ty,
                pos: con_pos,
            });
            if !self.eat(&TokenKind::Bar) {
                break;
            }
        }
        let pos = start.plus(cons.last().map(|c| c.pos).unwrap_or(start));
        Ok(DatBind {
            ty_vars,
            name,
            cons,
            pos,
        })
    }

    // ── Expressions ──

    pub fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut exp = match self.peek() {
            TokenKind::If => self.if_expr()?,
            TokenKind::Case => self.case_expr()?,
            TokenKind::Fn => self.fn_expr()?,
            TokenKind::Let => self.let_expr()?,
            TokenKind::From => self.from_expr()?,
            _ => self.infix_expr(1)?,
        };
        while self.eat(&TokenKind::Colon) {
            let ty = self.type_exp()?;
            let pos = exp.pos().plus(ty.pos());
            exp = Expr::Annotated(Box::new(exp), ty, pos);
        }
        Ok(exp)
    }

    /// The next infix operator, if any: `(name, precedence, associativity)`.
    fn peek_infix(&self) -> Option<(String, u8, Assoc)> {
        match self.peek() {
            TokenKind::Symbolic(s) | TokenKind::Ident(s) => {
                infix_prec(s).map(|(p, a)| (s.clone(), p, a))
            }
            TokenKind::Andalso => Some(("andalso".to_string(), 2, Assoc::Left)),
            TokenKind::Orelse => Some(("orelse".to_string(), 1, Assoc::Left)),
            _ => None,
        }
    }

    fn infix_expr(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.prefix_expr()?;
        while let Some((op, prec, assoc)) = self.peek_infix() {
            if prec < min_prec {
                break;
            }
            self.advance();
            let next_min = match assoc {
                Assoc::Left => prec + 1,
                Assoc::Right => prec,
            };
            let rhs = self.infix_expr(next_min)?;
            let pos = lhs.pos().plus(rhs.pos());
            lhs = match op.as_str() {
                "andalso" => Expr::AndAlso(Box::new(lhs), Box::new(rhs), pos),
                "orelse" => Expr::OrElse(Box::new(lhs), Box::new(rhs), pos),
                _ => Expr::InfixCall(op, Box::new(lhs), Box::new(rhs), pos),
            };
        }
        Ok(lhs)
    }

    fn prefix_expr(&mut self) -> Result<Expr, ParseError> {
        if let TokenKind::Symbolic(s) = self.peek() {
            if s == "~" {
                let start = self.advance().pos;
                let arg = self.apply_expr()?;
                let pos = start.plus(arg.pos());
                return Ok(Expr::PrefixCall("~".to_string(), Box::new(arg), pos));
            }
        }
        self.apply_expr()
    }

    fn apply_expr(&mut self) -> Result<Expr, ParseError> {
        let mut exp = self.atom_expr()?;
        while self.starts_atom_expr() {
            let arg = self.atom_expr()?;
            let pos = exp.pos().plus(arg.pos());
            exp = Expr::Apply(Box::new(exp), Box::new(arg), pos);
        }
        Ok(exp)
    }

    fn starts_atom_expr(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Int(_)
                | TokenKind::Real(_)
                | TokenKind::Str(_)
                | TokenKind::Char(_)
                | TokenKind::Ident(_)
                | TokenKind::Hash
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
        )
    }

    fn atom_expr(&mut self) -> Result<Expr, ParseError> {
        let pos = self.here();
        match self.peek().clone() {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Int(n), pos))
            }
            TokenKind::Real(v) => {
                self.advance();
                Ok(Expr::Literal(Literal::Real(v), pos))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s), pos))
            }
            TokenKind::Char(c) => {
                self.advance();
                Ok(Expr::Literal(Literal::Char(c), pos))
            }
            TokenKind::Ident(name) => {
                self.advance();
                match name.as_str() {
                    "true" => Ok(Expr::Literal(Literal::Bool(true), pos)),
                    "false" => Ok(Expr::Literal(Literal::Bool(false), pos)),
                    _ => Ok(Expr::Id(name, pos)),
                }
            }
            TokenKind::Hash => {
                self.advance();
                let (label, label_pos) = self.label()?;
                Ok(Expr::RecordSelector(label, pos.plus(label_pos)))
            }
            TokenKind::LParen => {
                self.advance();
                if self.peek() == &TokenKind::RParen {
                    let end = self.advance().pos;
                    return Ok(Expr::Literal(Literal::Unit, pos.plus(end)));
                }
                let first = self.expr()?;
                if self.eat(&TokenKind::Comma) {
                    let mut items = vec![first];
                    loop {
                        items.push(self.expr()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    let end = self.expect(TokenKind::RParen)?.pos;
                    Ok(Expr::Tuple(items, pos.plus(end)))
                } else {
                    self.expect(TokenKind::RParen)?;
                    Ok(first)
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if self.peek() != &TokenKind::RBracket {
                    loop {
                        items.push(self.expr()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let end = self.expect(TokenKind::RBracket)?.pos;
                Ok(Expr::List(items, pos.plus(end)))
            }
            TokenKind::LBrace => {
                self.advance();
                if self.peek() == &TokenKind::RBrace {
                    let end = self.advance().pos;
                    return Ok(Expr::Literal(Literal::Unit, pos.plus(end)));
                }
                let mut fields = Vec::new();
                loop {
                    let (label, _) = self.label()?;
                    self.expect_symbol("=")?;
                    let exp = self.expr()?;
                    fields.push((label, exp));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                let end = self.expect(TokenKind::RBrace)?.pos;
                Ok(Expr::record(fields, pos.plus(end)))
            }
            _ => self.unexpected("expression"),
        }
    }

    fn if_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(TokenKind::If)?.pos;
        let cond = self.expr()?;
        self.expect(TokenKind::Then)?;
        let then_exp = self.expr()?;
        self.expect(TokenKind::Else)?;
        let else_exp = self.expr()?;
        let pos = start.plus(else_exp.pos());
        Ok(Expr::If(
            Box::new(cond),
            Box::new(then_exp),
            Box::new(else_exp),
            pos,
        ))
    }

    fn case_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(TokenKind::Case)?.pos;
        let scrutinee = self.expr()?;
        self.expect(TokenKind::Of)?;
        let rules = self.match_rules()?;
        let pos = start.plus(rules.last().map(|r| r.pos).unwrap_or(start));
        Ok(Expr::Case(Box::new(scrutinee), rules, pos))
    }

    fn fn_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(TokenKind::Fn)?.pos;
        let rules = self.match_rules()?;
        let pos = start.plus(rules.last().map(|r| r.pos).unwrap_or(start));
        Ok(Expr::Fn(rules, pos))
    }

    fn match_rules(&mut self) -> Result<Vec<MatchRule>, ParseError> {
        let mut rules = Vec::new();
        loop {
            let pat = self.pat()?;
            self.expect(TokenKind::DoubleArrow)?;
            let exp = self.expr()?;
            let pos = pat.pos().plus(exp.pos());
            rules.push(MatchRule { pat, exp, pos });
            if !self.eat(&TokenKind::Bar) {
                break;
            }
        }
        Ok(rules)
    }

    fn let_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(TokenKind::Let)?.pos;
        let mut decls = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Val | TokenKind::Fun | TokenKind::Datatype => {
                    decls.push(self.decl()?);
                    self.eat(&TokenKind::Semi);
                }
                _ => break,
            }
        }
        if decls.is_empty() {
            return self.unexpected("declaration");
        }
        self.expect(TokenKind::In)?;
        let body = self.expr()?;
        let end = self.expect(TokenKind::End)?.pos;
        Ok(Expr::Let(decls, Box::new(body), start.plus(end)))
    }

    fn from_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.expect(TokenKind::From)?.pos;
        let mut sources = Vec::new();
        loop {
            let exp = self.infix_expr(1)?;
            self.expect(TokenKind::As)?;
            let (name, name_pos) = self.ident("source name")?;
            let pos = exp.pos().plus(name_pos);
            sources.push(QuerySource { exp, name, pos });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let where_exp = if self.eat(&TokenKind::Where) {
            Some(Box::new(self.infix_expr(1)?))
        } else {
            None
        };
        let mut group = Vec::new();
        let mut compute = Vec::new();
        if self.eat(&TokenKind::Group) {
            loop {
                let exp = self.infix_expr(1)?;
                self.expect(TokenKind::As)?;
                let (label, label_pos) = self.ident("group label")?;
                let pos = exp.pos().plus(label_pos);
                group.push(GroupKey { exp, label, pos });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            if self.eat(&TokenKind::Compute) {
                loop {
                    let agg = self.apply_expr()?;
                    self.expect(TokenKind::Of)?;
                    let arg = self.infix_expr(1)?;
                    self.expect(TokenKind::As)?;
                    let (label, label_pos) = self.ident("aggregate label")?;
                    let pos = agg.pos().plus(label_pos);
                    compute.push(Aggregate {
                        agg,
                        arg,
                        label,
                        pos,
                    });
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
        }
        let yield_exp = if self.eat(&TokenKind::Yield) {
            Some(Box::new(self.expr()?))
        } else {
            None
        };
        let end = yield_exp
            .as_ref()
            .map(|e| e.pos())
            .or_else(|| compute.last().map(|a| a.pos))
            .or_else(|| group.last().map(|g| g.pos))
            .or_else(|| where_exp.as_ref().map(|e| e.pos()))
            .or_else(|| sources.last().map(|s| s.pos))
            .unwrap_or(start);
        Ok(Expr::From(
            FromExpr {
                sources,
                where_exp,
                group,
                compute,
                yield_exp,
            },
            start.plus(end),
        ))
    }

    // ── Patterns ──

    pub fn pat(&mut self) -> Result<Pat, ParseError> {
        let mut pat = self.pat_cons()?;
        while self.eat(&TokenKind::Colon) {
            let ty = self.type_exp()?;
            let pos = pat.pos().plus(ty.pos());
            pat = Pat::Annotated(Box::new(pat), ty, pos);
        }
        Ok(pat)
    }

    fn pat_cons(&mut self) -> Result<Pat, ParseError> {
        let head = self.pat_app()?;
        if let TokenKind::Symbolic(s) = self.peek() {
            if s == "::" {
                self.advance();
                let tail = self.pat_cons()?;
                let pos = head.pos().plus(tail.pos());
                return Ok(Pat::Cons(Box::new(head), Box::new(tail), pos));
            }
        }
        Ok(head)
    }

    fn pat_app(&mut self) -> Result<Pat, ParseError> {
        // Layered pattern: `name as pat`.
        if let TokenKind::Ident(name) = self.peek().clone() {
            if self.peek2() == &TokenKind::As {
                let start = self.advance().pos;
                self.advance(); // as
                let inner = self.pat_cons()?;
                let pos = start.plus(inner.pos());
                return Ok(Pat::Layered(name, Box::new(inner), pos));
            }
        }
        let atom = self.pat_atom()?;
        if let Pat::Id(name, pos) = &atom {
            if self.starts_pat_atom() {
                let arg = self.pat_atom()?;
                let span = pos.plus(arg.pos());
                return Ok(Pat::Con(name.clone(), Box::new(arg), span));
            }
        }
        Ok(atom)
    }

    fn starts_pat_atom(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Int(_)
                | TokenKind::Real(_)
                | TokenKind::Str(_)
                | TokenKind::Char(_)
                | TokenKind::Ident(_)
                | TokenKind::Underscore
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
        )
    }

    fn pat_atom(&mut self) -> Result<Pat, ParseError> {
        let pos = self.here();
        match self.peek().clone() {
            TokenKind::Underscore => {
                self.advance();
                Ok(Pat::Wildcard(pos))
            }
            TokenKind::Int(n) => {
                self.advance();
                Ok(Pat::Literal(Literal::Int(n), pos))
            }
            TokenKind::Real(v) => {
                self.advance();
                Ok(Pat::Literal(Literal::Real(v), pos))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Pat::Literal(Literal::Str(s), pos))
            }
            TokenKind::Char(c) => {
                self.advance();
                Ok(Pat::Literal(Literal::Char(c), pos))
            }
            TokenKind::Ident(name) => {
                self.advance();
                match name.as_str() {
                    "true" => Ok(Pat::Literal(Literal::Bool(true), pos)),
                    "false" => Ok(Pat::Literal(Literal::Bool(false), pos)),
                    _ => Ok(Pat::Id(name, pos)),
                }
            }
            TokenKind::LParen => {
                self.advance();
                if self.peek() == &TokenKind::RParen {
                    let end = self.advance().pos;
                    return Ok(Pat::Literal(Literal::Unit, pos.plus(end)));
                }
                let first = self.pat()?;
                if self.eat(&TokenKind::Comma) {
                    let mut items = vec![first];
                    loop {
                        items.push(self.pat()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    let end = self.expect(TokenKind::RParen)?.pos;
                    Ok(Pat::Tuple(items, pos.plus(end)))
                } else {
                    self.expect(TokenKind::RParen)?;
                    Ok(first)
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if self.peek() != &TokenKind::RBracket {
                    loop {
                        items.push(self.pat()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let end = self.expect(TokenKind::RBracket)?.pos;
                Ok(Pat::List(items, pos.plus(end)))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut fields = Vec::new();
                let mut ellipsis = false;
                if self.peek() != &TokenKind::RBrace {
                    loop {
                        if self.eat(&TokenKind::Ellipsis) {
                            ellipsis = true;
                            break;
                        }
                        let (label, label_pos) = self.label()?;
                        let pat = if self.eat_symbol("=") {
                            self.pat()?
                        } else {
                            Pat::Id(label.clone(), label_pos)
                        };
                        fields.push((label, pat));
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let end = self.expect(TokenKind::RBrace)?.pos;
                Ok(Pat::record(fields, ellipsis, pos.plus(end)))
            }
            _ => self.unexpected("pattern"),
        }
    }

    fn eat_symbol(&mut self, sym: &str) -> bool {
        match self.peek() {
            TokenKind::Symbolic(s) if s == sym => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    // ── Types ──

    pub fn type_exp(&mut self) -> Result<TypeExp, ParseError> {
        let dom = self.type_tuple()?;
        if self.eat(&TokenKind::Arrow) {
            let cod = self.type_exp()?;
            let pos = dom.pos().plus(cod.pos());
            return Ok(TypeExp::Fn(Box::new(dom), Box::new(cod), pos));
        }
        Ok(dom)
    }

    fn type_tuple(&mut self) -> Result<TypeExp, ParseError> {
        let mut items = vec![self.type_app()?];
        while self.eat_symbol("*") {
            items.push(self.type_app()?);
        }
        if items.len() == 1 {
            Ok(items.pop().unwrap())
        } else {
            let pos = Pos::sum(items.iter().map(|t| t.pos()));
            Ok(TypeExp::Tuple(items, pos))
        }
    }

    fn type_app(&mut self) -> Result<TypeExp, ParseError> {
        let mut ty = self.type_atom()?;
        while let TokenKind::Ident(name) = self.peek().clone() {
            let end = self.advance().pos;
            let pos = ty.pos().plus(end);
            ty = TypeExp::Con(name, vec![ty], pos);
        }
        Ok(ty)
    }

    fn type_atom(&mut self) -> Result<TypeExp, ParseError> {
        let pos = self.here();
        match self.peek().clone() {
            TokenKind::TyVar(name) => {
                self.advance();
                Ok(TypeExp::Var(name, pos))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(TypeExp::Con(name, Vec::new(), pos))
            }
            TokenKind::LParen => {
                self.advance();
                let first = self.type_exp()?;
                if self.eat(&TokenKind::Comma) {
                    let mut args = vec![first];
                    loop {
                        args.push(self.type_exp()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    let (name, name_pos) = self.ident("type constructor")?;
                    Ok(TypeExp::Con(name, args, pos.plus(name_pos)))
                } else {
                    self.expect(TokenKind::RParen)?;
                    Ok(first)
                }
            }
            TokenKind::LBrace => {
                self.advance();
                let mut fields = Vec::new();
                if self.peek() != &TokenKind::RBrace {
                    loop {
                        let (label, _) = self.label()?;
                        self.expect(TokenKind::Colon)?;
                        let ty = self.type_exp()?;
                        fields.push((label, ty));
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let end = self.expect(TokenKind::RBrace)?.pos;
                Ok(TypeExp::record(fields, pos.plus(end)))
            }
            _ => self.unexpected("type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(source: &str) -> String {
        parse_expression(source).expect("parse failure").to_string()
    }

    #[test]
    fn left_assoc_parens_disappear() {
        assert_eq!(round_trip("(1 + 2) + 3"), "1 + 2 + 3");
        assert_eq!(round_trip("1 + 2 + 3"), "1 + 2 + 3");
    }

    #[test]
    fn right_grouping_parens_survive() {
        assert_eq!(round_trip("1 + (2 + 3)"), "1 + (2 + 3)");
        assert_eq!(round_trip("1 - (2 - 3)"), "1 - (2 - 3)");
    }

    #[test]
    fn precedence_mix() {
        assert_eq!(round_trip("1 + 2 * 3"), "1 + 2 * 3");
        assert_eq!(round_trip("(1 + 2) * 3"), "(1 + 2) * 3");
    }

    #[test]
    fn cons_is_right_associative() {
        assert_eq!(round_trip("1 :: 2 :: [3]"), "1 :: 2 :: [3]");
        assert_eq!(round_trip("(1 :: [2]) @ [3]"), "(1 :: [2]) @ [3]");
    }

    #[test]
    fn record_fields_sort() {
        assert_eq!(round_trip("{b = 1, a = 2}"), "{a = 2, b = 1}");
    }

    #[test]
    fn tuple_and_selector() {
        assert_eq!(round_trip("#1 (true, 0)"), "#1 (true, 0)");
        assert_eq!(round_trip("#b {a = 1, b = true}"), "#b {a = 1, b = true}");
    }

    #[test]
    fn from_round_trip() {
        assert_eq!(
            round_trip("from emps as e where #deptno e = 30 yield #id e"),
            "from emps as e where #deptno e = 30 yield #id e"
        );
    }

    #[test]
    fn fun_with_clauses() {
        let decl = parse_decl("fun len [] = 0 | len (h :: t) = 1 + len t").expect("parse");
        assert_eq!(decl.to_string(), "fun len [] = 0 | len (h :: t) = 1 + len t");
    }

    #[test]
    fn mixed_fun_names_rejected() {
        assert!(matches!(
            parse_decl("fun f x = 1 | g x = 2"),
            Err(ParseError::MixedFunNames { .. })
        ));
    }

    #[test]
    fn zero_label_rejected() {
        assert!(matches!(
            parse_expression("{0 = 1}"),
            Err(ParseError::InvalidLabel { .. })
        ));
    }

    #[test]
    fn statement_lifts_expression_to_it() {
        let decl = parse_statement("1 + 2").expect("parse");
        match decl {
            Decl::Val(binds, _) => {
                assert_eq!(binds.len(), 1);
                assert!(matches!(&binds[0].pat, Pat::Id(name, _) if name == "it"));
            }
            other => panic!("expected val declaration, got {:?}", other),
        }
    }
}
