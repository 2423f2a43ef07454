// HeapExprEvaluator - the built-in expression language
//
// A compact backing for the expression-evaluation port: literals, bound
// identifiers, property access on heap values, arithmetic, comparison,
// boolean logic, indexing, and list literals. Hosts embedding a richer
// language plug in their own evaluator through the same port.
//
// Grammar (precedence low to high):
//   or     := and ( '||' and )*
//   and    := cmp ( '&&' cmp )*
//   cmp    := sum ( ('=='|'!='|'<'|'<='|'>'|'>=') sum )?
//   sum    := term ( ('+'|'-') term )*
//   term   := unary ( ('*'|'/'|'%') unary )*
//   unary  := ('!'|'-') unary | postfix
//   postfix:= primary ( '.' ident | '[' or ']' )*
//   primary:= int | float | string | 'null' | 'true' | 'false'
//          | ident | '(' or ')' | '[' or (',' or)* ']'

use crate::errors::EvalError;
use crate::features::heap_graph::HeapGraph;
use crate::shared::models::{FieldData, FieldValue, Instance, PrimitiveValue, Value};

use super::super::ports::{Bindings, ExpressionEvaluator};

/// Evaluates the built-in expression language against a heap graph.
pub struct HeapExprEvaluator<'h> {
    graph: &'h HeapGraph<'h>,
}

impl<'h> HeapExprEvaluator<'h> {
    pub fn new(graph: &'h HeapGraph<'h>) -> Self {
        Self { graph }
    }

    fn eval(&self, expr: &Expr, env: &Bindings) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::new(format!("unbound identifier '{name}'"))),
            Expr::Property(base, name) => {
                let base = self.eval(base, env)?;
                self.property(&base, name)
            }
            Expr::Index(base, index) => {
                let base = self.eval(base, env)?;
                let index = self.eval(index, env)?;
                self.index(&base, &index)
            }
            Expr::ListLiteral(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, env)?);
                }
                Ok(Value::List(values))
            }
            Expr::Unary(op, inner) => {
                let value = self.eval(inner, env)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => match value {
                        Value::Int(n) => Ok(Value::Int(-n)),
                        Value::Float(f) => Ok(Value::Float(-f)),
                        other => Err(EvalError::new(format!(
                            "cannot negate {}",
                            kind_name(&other)
                        ))),
                    },
                }
            }
            Expr::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs, env),
        }
    }

    fn binary(
        &self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        env: &Bindings,
    ) -> Result<Value, EvalError> {
        // short-circuit forms first
        match op {
            BinaryOp::And => {
                let left = self.eval(lhs, env)?;
                if !left.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                let right = self.eval(rhs, env)?;
                return Ok(Value::Bool(right.is_truthy()));
            }
            BinaryOp::Or => {
                let left = self.eval(lhs, env)?;
                if left.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval(rhs, env)?;
                return Ok(Value::Bool(right.is_truthy()));
            }
            _ => {}
        }

        let left = self.eval(lhs, env)?;
        let right = self.eval(rhs, env)?;
        match op {
            BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
            BinaryOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
            BinaryOp::Lt => compare(&left, &right, |o| o == std::cmp::Ordering::Less),
            BinaryOp::Le => compare(&left, &right, |o| o != std::cmp::Ordering::Greater),
            BinaryOp::Gt => compare(&left, &right, |o| o == std::cmp::Ordering::Greater),
            BinaryOp::Ge => compare(&left, &right, |o| o != std::cmp::Ordering::Less),
            BinaryOp::Add => add(&left, &right),
            BinaryOp::Sub => arithmetic(&left, &right, "-", |a, b| a - b, i64::checked_sub),
            BinaryOp::Mul => arithmetic(&left, &right, "*", |a, b| a * b, i64::checked_mul),
            BinaryOp::Div => divide(&left, &right),
            BinaryOp::Rem => remainder(&left, &right),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn property(&self, base: &Value, name: &str) -> Result<Value, EvalError> {
        match base {
            Value::Instance(instance) => self.instance_property(instance, name),
            Value::Class(class) => match name {
                "name" => Ok(Value::Str(class.name.clone())),
                "id" => Ok(Value::Int(class.id.0 as i64)),
                "superclass" => Ok(class
                    .super_class
                    .and_then(|id| self.graph.reader().class_by_id(id))
                    .map(Value::Class)
                    .unwrap_or(Value::Null)),
                _ => Err(EvalError::new(format!(
                    "unknown class property '{name}'"
                ))),
            },
            Value::Str(s) => match name {
                "length" => Ok(Value::Int(s.chars().count() as i64)),
                _ => Err(EvalError::new(format!("unknown string property '{name}'"))),
            },
            Value::List(items) => match name {
                "length" => Ok(Value::Int(items.len() as i64)),
                _ => Err(EvalError::new(format!("unknown list property '{name}'"))),
            },
            Value::Null => Ok(Value::Null),
            other => Err(EvalError::new(format!(
                "no property '{name}' on {}",
                kind_name(other)
            ))),
        }
    }

    fn instance_property(&self, instance: &Instance, name: &str) -> Result<Value, EvalError> {
        match name {
            "id" => Ok(Value::Int(instance.id.0 as i64)),
            "size" => Ok(Value::Int(instance.size as i64)),
            "clazz" => Ok(self
                .graph
                .class_of(instance)
                .map(Value::Class)
                .unwrap_or(Value::Null)),
            "length" if instance.is_array => Ok(self
                .graph
                .array_length_of(instance)
                .map(|len| Value::Int(len as i64))
                .unwrap_or(Value::Null)),
            _ => match self.graph.field_named(instance, name) {
                Some(fv) => Ok(self.field_value(&fv)),
                None => Err(EvalError::new(format!(
                    "no field '{name}' on instance {}",
                    instance.id.0
                ))),
            },
        }
    }

    fn index(&self, base: &Value, index: &Value) -> Result<Value, EvalError> {
        let Value::Int(i) = index else {
            return Err(EvalError::new("index must be an integer"));
        };
        let i = usize::try_from(*i).map_err(|_| EvalError::new("index must be non-negative"))?;
        match base {
            Value::List(items) => Ok(items.get(i).cloned().unwrap_or(Value::Null)),
            Value::Instance(instance) if instance.is_array => {
                let elements = self.graph.array_elements_of(instance);
                Ok(elements
                    .get(i)
                    .copied()
                    .flatten()
                    .and_then(|id| self.graph.node_for(id))
                    .map(Value::from)
                    .unwrap_or(Value::Null))
            }
            other => Err(EvalError::new(format!(
                "cannot index {}",
                kind_name(other)
            ))),
        }
    }

    fn field_value(&self, fv: &FieldValue) -> Value {
        match &fv.data {
            FieldData::Primitive(p) => match p {
                PrimitiveValue::Boolean(b) => Value::Bool(*b),
                PrimitiveValue::Byte(n) => Value::Int(*n as i64),
                PrimitiveValue::Short(n) => Value::Int(*n as i64),
                PrimitiveValue::Char(c) => Value::Str(c.to_string()),
                PrimitiveValue::Int(n) => Value::Int(*n as i64),
                PrimitiveValue::Long(n) => Value::Int(*n),
                PrimitiveValue::Float(f) => Value::Float(*f as f64),
                PrimitiveValue::Double(f) => Value::Float(*f),
            },
            FieldData::Reference(None) => Value::Null,
            FieldData::Reference(Some(id)) => self
                .graph
                .node_for(*id)
                .map(Value::from)
                .unwrap_or(Value::Null),
        }
    }
}

impl ExpressionEvaluator for HeapExprEvaluator<'_> {
    fn evaluate(&self, expr: &str, env: &Bindings) -> Result<Value, EvalError> {
        let tokens = tokenize(expr)?;
        let mut parser = ExprParser {
            tokens: &tokens,
            pos: 0,
        };
        let ast = parser.parse_or()?;
        if parser.pos != tokens.len() {
            return Err(EvalError::new(format!(
                "unexpected trailing input at token {}",
                parser.pos
            )));
        }
        self.eval(&ast, env)
    }
}

// ───────────────────────────────────────────────────────────────────────
// Value operations
// ───────────────────────────────────────────────────────────────────────

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Int(_) | Value::Float(_) => "a number",
        Value::Str(_) => "a string",
        Value::List(_) => "a list",
        Value::Instance(_) => "an instance",
        Value::Class(_) => "a class",
    }
}

/// Equality with numeric cross-coercion; instances and classes compare by
/// identity.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn compare(
    left: &Value,
    right: &Value,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value, EvalError> {
    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        let ordering = l
            .partial_cmp(&r)
            .ok_or_else(|| EvalError::new("cannot order NaN"))?;
        return Ok(Value::Bool(accept(ordering)));
    }
    if let (Value::Str(l), Value::Str(r)) = (left, right) {
        return Ok(Value::Bool(accept(l.cmp(r))));
    }
    Err(EvalError::new(format!(
        "cannot compare {} with {}",
        kind_name(left),
        kind_name(right)
    )))
}

fn add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    if let (Value::Int(l), Value::Int(r)) = (left, right) {
        return Ok(Value::Int(l.wrapping_add(*r)));
    }
    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        return Ok(Value::Float(l + r));
    }
    // string concatenation with scalar coercion
    if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
        let l = scalar_text(left)?;
        let r = scalar_text(right)?;
        return Ok(Value::Str(format!("{l}{r}")));
    }
    Err(EvalError::new(format!(
        "cannot add {} and {}",
        kind_name(left),
        kind_name(right)
    )))
}

fn scalar_text(value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Int(n) => Ok(n.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Str(s) => Ok(s.clone()),
        other => Err(EvalError::new(format!(
            "cannot render {} as text",
            kind_name(other)
        ))),
    }
}

fn arithmetic(
    left: &Value,
    right: &Value,
    op: &str,
    float_op: impl Fn(f64, f64) -> f64,
    int_op: impl Fn(i64, i64) -> Option<i64>,
) -> Result<Value, EvalError> {
    if let (Value::Int(l), Value::Int(r)) = (left, right) {
        return int_op(*l, *r)
            .map(Value::Int)
            .ok_or_else(|| EvalError::new(format!("integer overflow in '{op}'")));
    }
    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        return Ok(Value::Float(float_op(l, r)));
    }
    Err(EvalError::new(format!(
        "cannot apply '{op}' to {} and {}",
        kind_name(left),
        kind_name(right)
    )))
}

fn divide(left: &Value, right: &Value) -> Result<Value, EvalError> {
    if matches!(right, Value::Int(0)) {
        return Err(EvalError::new("division by zero"));
    }
    arithmetic(left, right, "/", |a, b| a / b, i64::checked_div)
}

fn remainder(left: &Value, right: &Value) -> Result<Value, EvalError> {
    if matches!(right, Value::Int(0)) {
        return Err(EvalError::new("remainder by zero"));
    }
    arithmetic(left, right, "%", |a, b| a % b, i64::checked_rem)
}

// ───────────────────────────────────────────────────────────────────────
// Tokenizer
// ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
}

fn tokenize(text: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '0'..='9' => {
                let mut number = String::new();
                let mut is_float = false;
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        number.push(d);
                        chars.next();
                    } else if d == '.' && !is_float {
                        // lookahead: `1.foo` is a property access, not a float
                        let mut ahead = chars.clone();
                        ahead.next();
                        if ahead.peek().map(|n| n.is_ascii_digit()) == Some(true) {
                            is_float = true;
                            number.push(d);
                            chars.next();
                        } else {
                            break;
                        }
                    } else {
                        break;
                    }
                }
                if is_float {
                    let value = number
                        .parse()
                        .map_err(|_| EvalError::new(format!("bad number '{number}'")))?;
                    tokens.push(Token::Float(value));
                } else {
                    let value = number
                        .parse()
                        .map_err(|_| EvalError::new(format!("bad number '{number}'")))?;
                    tokens.push(Token::Int(value));
                }
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut literal = String::new();
                let mut closed = false;
                for d in chars.by_ref() {
                    if d == quote {
                        closed = true;
                        break;
                    }
                    literal.push(d);
                }
                if !closed {
                    return Err(EvalError::new("unterminated string literal"));
                }
                tokens.push(Token::Str(literal));
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' || d == '$' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::EqEq);
                } else {
                    return Err(EvalError::new("single '=' is not an operator"));
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '&' => {
                chars.next();
                if chars.peek() == Some(&'&') {
                    chars.next();
                    tokens.push(Token::AndAnd);
                } else {
                    return Err(EvalError::new("single '&' is not an operator"));
                }
            }
            '|' => {
                chars.next();
                if chars.peek() == Some(&'|') {
                    chars.next();
                    tokens.push(Token::OrOr);
                } else {
                    return Err(EvalError::new("single '|' is not an operator"));
                }
            }
            other => {
                return Err(EvalError::new(format!("unexpected character '{other}'")));
            }
        }
    }
    Ok(tokens)
}

// ───────────────────────────────────────────────────────────────────────
// Expression AST and parser
// ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Ident(String),
    Property(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    ListLiteral(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

struct ExprParser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), EvalError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(EvalError::new(format!("expected {what}")))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_cmp()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_cmp()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_cmp(&mut self) -> Result<Expr, EvalError> {
        let left = self.parse_sum()?;
        let op = match self.peek() {
            Some(Token::EqEq) => Some(BinaryOp::Eq),
            Some(Token::NotEq) => Some(BinaryOp::Ne),
            Some(Token::Lt) => Some(BinaryOp::Lt),
            Some(Token::Le) => Some(BinaryOp::Le),
            Some(Token::Gt) => Some(BinaryOp::Gt),
            Some(Token::Ge) => Some(BinaryOp::Ge),
            _ => None,
        };
        match op {
            Some(op) => {
                self.pos += 1;
                let right = self.parse_sum()?;
                Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
            }
            None => Ok(left),
        }
    }

    fn parse_sum(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&Token::Bang) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        if self.eat(&Token::Minus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&Token::Dot) {
                match self.advance() {
                    Some(Token::Ident(name)) => {
                        expr = Expr::Property(Box::new(expr), name.clone());
                    }
                    _ => return Err(EvalError::new("expected property name after '.'")),
                }
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_or()?;
                self.expect(Token::RBracket, "']' after index")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance().cloned() {
            Some(Token::Int(n)) => Ok(Expr::Literal(Value::Int(n))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Value::Float(f))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::Ident(name)) => match name.as_str() {
                "null" => Ok(Expr::Literal(Value::Null)),
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                _ => Ok(Expr::Ident(name)),
            },
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if self.eat(&Token::RBracket) {
                    return Ok(Expr::ListLiteral(items));
                }
                loop {
                    items.push(self.parse_or()?);
                    if self.eat(&Token::Comma) {
                        continue;
                    }
                    self.expect(Token::RBracket, "']' after list literal")?;
                    break;
                }
                Ok(Expr::ListLiteral(items))
            }
            Some(other) => Err(EvalError::new(format!("unexpected token {other:?}"))),
            None => Err(EvalError::new("empty expression")),
        }
    }
}
