//! Safe condition expressions for workflow actions.
//!
//! A deliberately tiny grammar: comparisons and boolean combinators over a
//! fixed whitelist of call fields. There is no function call syntax, no
//! indexing, no access to anything outside the five fields below, and
//! therefore no code execution surface at all.
//!
//! Grammar:
//! ```text
//! expr    := and (("or" | "||") and)*
//! and     := unary (("and" | "&&") unary)*
//! unary   := ("not" | "!") unary | cmp
//! cmp     := "(" expr ")" | operand (("==" | "!=" | ">=" | "<=" | ">" | "<") operand)?
//! operand := ident | number | string | bool
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("condition parse error: {0}")]
    Parse(String),
    #[error("condition evaluation error: {0}")]
    Eval(String),
}

/// The whitelisted variables a condition may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Intent,
    Confidence,
    ScamScore,
    IsEmergency,
    CallerName,
}

impl Field {
    fn from_ident(ident: &str) -> Option<Self> {
        match ident {
            "intent" => Some(Field::Intent),
            "confidence" => Some(Field::Confidence),
            "scam_score" => Some(Field::ScamScore),
            "is_emergency" => Some(Field::IsEmergency),
            "caller_name" => Some(Field::CallerName),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone)]
enum Operand {
    Var(Field),
    Str(String),
    Num(f64),
    Bool(bool),
}

#[derive(Debug, Clone)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Cmp(Operand, CmpOp, Operand),
    Value(Operand),
}

/// Values a field or literal can take during evaluation.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
    /// An absent optional field (caller_name with no caller-supplied name).
    Missing,
}

/// The restricted variable set a condition is evaluated against.
#[derive(Debug, Clone)]
pub struct ConditionScope<'a> {
    pub intent: &'a str,
    pub confidence: f64,
    pub scam_score: f64,
    pub is_emergency: bool,
    pub caller_name: Option<&'a str>,
}

/// A parsed, validated condition. Parsing happens once at workflow load;
/// evaluation is pure over a `ConditionScope`.
#[derive(Debug, Clone)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(ConditionError::Parse(format!(
                "unexpected trailing input in '{source}'"
            )));
        }
        Ok(Condition {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, scope: &ConditionScope<'_>) -> Result<bool, ConditionError> {
        eval_bool(&self.expr, scope)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Bool(bool),
    Op(CmpOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

fn tokenize(source: &str) -> Result<Vec<Token>, ConditionError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '\'' | '"' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    if i >= chars.len() {
                        return Err(ConditionError::Parse(format!(
                            "unterminated string literal in '{source}'"
                        )));
                    }
                    if chars[i] == quote {
                        i += 1;
                        break;
                    }
                    value.push(chars[i]);
                    i += 1;
                }
                tokens.push(Token::Str(value));
            }
            '=' => {
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    tokens.push(Token::Op(CmpOp::Eq));
                    i += 2;
                } else {
                    return Err(ConditionError::Parse(format!(
                        "single '=' is not an operator in '{source}'"
                    )));
                }
            }
            '!' => {
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    tokens.push(Token::Op(CmpOp::Ne));
                    i += 2;
                } else {
                    tokens.push(Token::Not);
                    i += 1;
                }
            }
            '>' => {
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    tokens.push(Token::Op(CmpOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CmpOp::Gt));
                    i += 1;
                }
            }
            '<' => {
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    tokens.push(Token::Op(CmpOp::Le));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CmpOp::Lt));
                    i += 1;
                }
            }
            '&' => {
                if i + 1 < chars.len() && chars[i + 1] == '&' {
                    tokens.push(Token::And);
                    i += 2;
                } else {
                    return Err(ConditionError::Parse(format!(
                        "single '&' is not an operator in '{source}'"
                    )));
                }
            }
            '|' => {
                if i + 1 < chars.len() && chars[i + 1] == '|' {
                    tokens.push(Token::Or);
                    i += 2;
                } else {
                    return Err(ConditionError::Parse(format!(
                        "single '|' is not an operator in '{source}'"
                    )));
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text.parse::<f64>().map_err(|_| {
                    ConditionError::Parse(format!("bad number '{text}' in '{source}'"))
                })?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.to_lowercase().as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "not" => tokens.push(Token::Not),
                    "true" => tokens.push(Token::Bool(true)),
                    "false" => tokens.push(Token::Bool(false)),
                    "none" | "null" => tokens.push(Token::Str(String::new())),
                    _ => tokens.push(Token::Ident(word)),
                }
            }
            other => {
                return Err(ConditionError::Parse(format!(
                    "unexpected character '{other}' in '{source}'"
                )));
            }
        }
    }

    if tokens.is_empty() {
        return Err(ConditionError::Parse("empty condition".to_string()));
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let mut left = self.parse_unary()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ConditionError> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Expr, ConditionError> {
        // Parenthesized sub-expressions are full expressions, not operands.
        if matches!(self.peek(), Some(Token::LParen)) {
            self.advance();
            let inner = self.parse_or()?;
            match self.advance() {
                Some(Token::RParen) => return Ok(inner),
                _ => return Err(ConditionError::Parse("missing ')'".to_string())),
            }
        }

        let left = self.parse_operand()?;
        if let Some(Token::Op(op)) = self.peek().cloned() {
            self.advance();
            let right = self.parse_operand()?;
            return Ok(Expr::Cmp(left, op, right));
        }
        Ok(Expr::Value(left))
    }

    fn parse_operand(&mut self) -> Result<Operand, ConditionError> {
        match self.advance() {
            Some(Token::Ident(name)) => Field::from_ident(&name)
                .map(Operand::Var)
                .ok_or_else(|| {
                    ConditionError::Parse(format!("unknown variable '{name}'"))
                }),
            Some(Token::Number(n)) => Ok(Operand::Num(n)),
            Some(Token::Str(s)) => Ok(Operand::Str(s)),
            Some(Token::Bool(b)) => Ok(Operand::Bool(b)),
            other => Err(ConditionError::Parse(format!(
                "expected a value, found {other:?}"
            ))),
        }
    }
}

fn eval_bool(expr: &Expr, scope: &ConditionScope<'_>) -> Result<bool, ConditionError> {
    match expr {
        Expr::Or(left, right) => Ok(eval_bool(left, scope)? || eval_bool(right, scope)?),
        Expr::And(left, right) => Ok(eval_bool(left, scope)? && eval_bool(right, scope)?),
        Expr::Not(inner) => Ok(!eval_bool(inner, scope)?),
        Expr::Cmp(left, op, right) => {
            let left = resolve(left, scope);
            let right = resolve(right, scope);
            compare(&left, *op, &right)
        }
        Expr::Value(operand) => match resolve(operand, scope) {
            Value::Bool(b) => Ok(b),
            other => Err(ConditionError::Eval(format!(
                "expected a boolean, found {other:?}"
            ))),
        },
    }
}

fn resolve(operand: &Operand, scope: &ConditionScope<'_>) -> Value {
    match operand {
        Operand::Var(Field::Intent) => Value::Str(scope.intent.to_string()),
        Operand::Var(Field::Confidence) => Value::Num(scope.confidence),
        Operand::Var(Field::ScamScore) => Value::Num(scope.scam_score),
        Operand::Var(Field::IsEmergency) => Value::Bool(scope.is_emergency),
        Operand::Var(Field::CallerName) => match scope.caller_name {
            Some(name) => Value::Str(name.to_string()),
            None => Value::Missing,
        },
        Operand::Str(s) => Value::Str(s.clone()),
        Operand::Num(n) => Value::Num(*n),
        Operand::Bool(b) => Value::Bool(*b),
    }
}

fn compare(left: &Value, op: CmpOp, right: &Value) -> Result<bool, ConditionError> {
    match (left, right) {
        (Value::Num(a), Value::Num(b)) => Ok(match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
        }),
        (Value::Str(a), Value::Str(b)) => match op {
            CmpOp::Eq => Ok(a == b),
            CmpOp::Ne => Ok(a != b),
            _ => Err(ConditionError::Eval(
                "strings only support == and !=".to_string(),
            )),
        },
        (Value::Bool(a), Value::Bool(b)) => match op {
            CmpOp::Eq => Ok(a == b),
            CmpOp::Ne => Ok(a != b),
            _ => Err(ConditionError::Eval(
                "booleans only support == and !=".to_string(),
            )),
        },
        // A missing optional equals nothing and differs from everything.
        (Value::Missing, _) | (_, Value::Missing) => match op {
            CmpOp::Eq => Ok(false),
            CmpOp::Ne => Ok(true),
            _ => Err(ConditionError::Eval(
                "missing value in ordered comparison".to_string(),
            )),
        },
        (a, b) => match op {
            CmpOp::Eq => Ok(false),
            CmpOp::Ne => Ok(true),
            _ => Err(ConditionError::Eval(format!(
                "type mismatch in comparison: {a:?} vs {b:?}"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ConditionScope<'static> {
        ConditionScope {
            intent: "sales",
            confidence: 0.82,
            scam_score: 0.3,
            is_emergency: false,
            caller_name: Some("John Smith"),
        }
    }

    #[test]
    fn comparisons_over_whitelisted_fields() {
        let scope = scope();
        for (source, expected) in [
            ("intent == 'sales'", true),
            ("intent != 'friend'", true),
            ("confidence >= 0.8", true),
            ("confidence > 0.9", false),
            ("scam_score < 0.5", true),
            ("is_emergency == false", true),
            ("caller_name == 'John Smith'", true),
        ] {
            let condition = Condition::parse(source).unwrap();
            assert_eq!(condition.evaluate(&scope).unwrap(), expected, "{source}");
        }
    }

    #[test]
    fn boolean_combinators_and_parentheses() {
        let scope = scope();
        let condition =
            Condition::parse("intent == 'sales' and (confidence >= 0.8 or is_emergency)")
                .unwrap();
        assert!(condition.evaluate(&scope).unwrap());

        let condition = Condition::parse("not (intent == 'sales') || scam_score > 0.9").unwrap();
        assert!(!condition.evaluate(&scope).unwrap());

        let condition = Condition::parse("intent == 'friend' && confidence >= 0.5").unwrap();
        assert!(!condition.evaluate(&scope).unwrap());
    }

    #[test]
    fn bare_emergency_flag_is_a_condition() {
        let mut s = scope();
        let condition = Condition::parse("is_emergency").unwrap();
        assert!(!condition.evaluate(&s).unwrap());
        s.is_emergency = true;
        assert!(condition.evaluate(&s).unwrap());
    }

    #[test]
    fn missing_caller_name_compares_safely() {
        let mut s = scope();
        s.caller_name = None;

        let eq = Condition::parse("caller_name == 'John Smith'").unwrap();
        assert!(!eq.evaluate(&s).unwrap());

        let ne = Condition::parse("caller_name != 'John Smith'").unwrap();
        assert!(ne.evaluate(&s).unwrap());
    }

    #[test]
    fn unknown_variables_are_rejected_at_parse_time() {
        assert!(Condition::parse("secret_field == 1").is_err());
        assert!(Condition::parse("__import__ == 'os'").is_err());
    }

    #[test]
    fn malformed_input_is_rejected_at_parse_time() {
        for source in [
            "",
            "intent ==",
            "confidence > > 0.5",
            "(intent == 'sales'",
            "intent = 'sales'",
            "intent == 'sales' extra",
            "exec('rm -rf /')",
        ] {
            assert!(Condition::parse(source).is_err(), "{source:?}");
        }
    }

    #[test]
    fn non_boolean_result_is_an_eval_error() {
        let s = scope();
        let condition = Condition::parse("confidence").unwrap();
        assert!(condition.evaluate(&s).is_err());

        let ordered_on_strings = Condition::parse("intent > 'a'").unwrap();
        assert!(ordered_on_strings.evaluate(&s).is_err());
    }
}
