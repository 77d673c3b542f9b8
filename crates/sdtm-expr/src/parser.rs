//! Recursive-descent parser for mapping expressions.
//!
//! Grammar:
//!
//! ```text
//! condition := and_expr ( '||' and_expr )*
//! and_expr  := cmp_expr ( '&&' cmp_expr )*
//! cmp_expr  := value ( ('==' | '!=' | '>' | '<' | '>=' | '<=') value )?
//! value     := STRING | NUMBER | funcCall | fieldRef | '(' condition ')'
//! funcCall  := NAME '(' condition ( ',' condition )* ')'
//! fieldRef  := [ NAME '.' ] NAME
//! ```
//!
//! Value expressions and conditions share one grammar; a comparison that
//! appears in value position simply evaluates to a flag string.

use crate::ast::{BinOp, Expr, Func};
use crate::dates::DateFormat;
use crate::error::ExprError;
use crate::lexer::{Spanned, Token, tokenize};

/// Parse one expression, consuming all input.
pub fn parse(input: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser { tokens, cursor: 0 };
    let expr = parser.condition()?;
    if let Some(spanned) = parser.peek() {
        return Err(ExprError::TrailingInput { pos: spanned.pos });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.cursor)
    }

    fn bump(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.cursor).cloned();
        if spanned.is_some() {
            self.cursor += 1;
        }
        spanned
    }

    fn eof_pos(&self) -> usize {
        self.tokens.last().map(|s| s.pos + 1).unwrap_or(0)
    }

    fn expect(&mut self, want: &Token, expected: &'static str) -> Result<(), ExprError> {
        match self.bump() {
            Some(spanned) if &spanned.token == want => Ok(()),
            Some(spanned) => Err(ExprError::UnexpectedToken {
                pos: spanned.pos,
                found: spanned.token.describe(),
                expected,
            }),
            None => Err(ExprError::UnexpectedToken {
                pos: self.eof_pos(),
                found: "end of input".to_string(),
                expected,
            }),
        }
    }

    fn condition(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.and_expr()?;
        while let Some(Spanned { token: Token::Op(BinOp::Or), .. }) = self.peek() {
            self.bump();
            let rhs = self.and_expr()?;
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.cmp_expr()?;
        while let Some(Spanned { token: Token::Op(BinOp::And), .. }) = self.peek() {
            self.bump();
            let rhs = self.cmp_expr()?;
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn cmp_expr(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.value()?;
        let op = match self.peek() {
            Some(Spanned { token: Token::Op(op), .. })
                if !matches!(*op, BinOp::And | BinOp::Or) =>
            {
                *op
            }
            _ => return Ok(lhs),
        };
        self.bump();
        let rhs = self.value()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn value(&mut self) -> Result<Expr, ExprError> {
        let spanned = self.bump().ok_or_else(|| ExprError::UnexpectedToken {
            pos: self.eof_pos(),
            found: "end of input".to_string(),
            expected: "a value",
        })?;

        match spanned.token {
            Token::Str(text) => Ok(Expr::Literal(text)),
            Token::Number(text) => Ok(Expr::Literal(text)),
            Token::LParen => {
                let inner = self.condition()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Ident(name) => self.ident_tail(name, spanned.pos),
            other => Err(ExprError::UnexpectedToken {
                pos: spanned.pos,
                found: other.describe(),
                expected: "a value",
            }),
        }
    }

    /// An identifier starts a function call, a qualified field reference,
    /// or a bare column reference.
    fn ident_tail(&mut self, name: String, pos: usize) -> Result<Expr, ExprError> {
        match self.peek() {
            Some(Spanned { token: Token::LParen, .. }) => {
                let func = Func::parse(&name)
                    .ok_or(ExprError::UnknownFunction { pos, name: name.clone() })?;
                self.bump();
                let args = self.arguments()?;
                check_call(func, &args)?;
                Ok(Expr::Call { func, args })
            }
            Some(Spanned { token: Token::Dot, .. }) => {
                self.bump();
                match self.bump() {
                    Some(Spanned { token: Token::Ident(column), .. }) => Ok(Expr::Field {
                        table: Some(name),
                        column,
                    }),
                    Some(spanned) => Err(ExprError::UnexpectedToken {
                        pos: spanned.pos,
                        found: spanned.token.describe(),
                        expected: "a column name",
                    }),
                    None => Err(ExprError::UnexpectedToken {
                        pos: self.eof_pos(),
                        found: "end of input".to_string(),
                        expected: "a column name",
                    }),
                }
            }
            _ => Ok(Expr::Field {
                table: None,
                column: name,
            }),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if let Some(Spanned { token: Token::RParen, .. }) = self.peek() {
            self.bump();
            return Ok(args);
        }
        loop {
            args.push(self.condition()?);
            match self.bump() {
                Some(Spanned { token: Token::Comma, .. }) => continue,
                Some(Spanned { token: Token::RParen, .. }) => break,
                Some(spanned) => {
                    return Err(ExprError::UnexpectedToken {
                        pos: spanned.pos,
                        found: spanned.token.describe(),
                        expected: "',' or ')'",
                    });
                }
                None => {
                    return Err(ExprError::UnexpectedToken {
                        pos: self.eof_pos(),
                        found: "end of input".to_string(),
                        expected: "',' or ')'",
                    });
                }
            }
        }
        Ok(args)
    }
}

/// Arity and argument-shape checks performed at parse time, so every
/// malformed rule fails before any data is touched.
fn check_call(func: Func, args: &[Expr]) -> Result<(), ExprError> {
    let (min, max) = func.arity();
    let ok = args.len() >= min && max.is_none_or(|max| args.len() <= max);
    if !ok {
        return Err(ExprError::BadArity {
            func: func.name(),
            expected: func.arity_text(),
            found: args.len(),
        });
    }

    match func {
        Func::Iso8601DateFormat => require_format_name(func, &args[1], 2)?,
        Func::Iso8601DateTimeFormats => {
            for (offset, arg) in args[1..].iter().enumerate() {
                require_format_name(func, arg, offset + 2)?;
            }
        }
        Func::Format => {
            if !matches!(args[1], Expr::Literal(_)) {
                return Err(ExprError::BadArgument {
                    func: func.name(),
                    position: 2,
                    expected: "a codelist name literal",
                });
            }
        }
        Func::Sequence | Func::StudyDay | Func::BaselineFlag => {
            for (idx, arg) in args.iter().enumerate() {
                if !matches!(arg, Expr::Field { table: None, .. }) {
                    return Err(ExprError::BadArgument {
                        func: func.name(),
                        position: idx + 1,
                        expected: "an unqualified output variable reference",
                    });
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn require_format_name(func: Func, arg: &Expr, position: usize) -> Result<(), ExprError> {
    match arg {
        Expr::Literal(name) => {
            if DateFormat::parse_name(name).is_none() {
                return Err(ExprError::UnknownDateFormat { name: name.clone() });
            }
            Ok(())
        }
        _ => Err(ExprError::BadArgument {
            func: func.name(),
            position,
            expected: "a date format name literal",
        }),
    }
}
