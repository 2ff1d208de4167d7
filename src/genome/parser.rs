//! Reader for the textual assertion language
//!
//! Infix operators use the usual precedence (`||` binds loosest among the
//! connectives, then `&&`, equality, comparisons, additive, multiplicative
//! and `^`). Implication `=>` and equivalence `<=>` bind looser than every
//! other operator. Identifier-named functions use call syntax, e.g.
//! `NOT(a)` or `remove(s, -1)`.
//!
//! A `-` directly followed by a digit is part of a numeric literal when it
//! starts the expression or follows an operator, `(` or `,`; any other
//! prefix minus becomes `(0 - x)`.

use crate::error::TreeError;
use crate::genome::functions;
use crate::genome::tree::Tree;
use crate::state::{ValueType, VariableTypes};

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
}

/// Symbolic operators, longest first
const SYMBOLS: &[(&str, &str)] = &[
    ("<=>", "<=>"),
    ("=>", "=>"),
    ("<=", "<="),
    (">=", ">="),
    ("<>", "<>"),
    ("!=", "!="),
    ("==", "=="),
    ("&&", "&&"),
    ("||", "||"),
    ("=", "=="),
    ("<", "<"),
    (">", ">"),
    ("+", "+"),
    ("-", "-"),
    ("*", "*"),
    ("/", "/"),
    ("^", "^"),
];

fn precedence(op: &str) -> Option<(u8, bool)> {
    // (precedence, right associative)
    match op {
        "=>" | "<=>" => Some((1, false)),
        "||" => Some((2, false)),
        "&&" => Some((4, false)),
        "==" | "<>" | "!=" => Some((7, false)),
        "<" | ">" | "<=" | ">=" => Some((10, false)),
        "+" | "-" => Some((20, false)),
        "*" | "/" => Some((30, false)),
        "^" => Some((40, true)),
        _ => None,
    }
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, TreeError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens: Vec<(Token, usize)> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        let literal_allowed = matches!(
            tokens.last(),
            None | Some((Token::Op(_), _)) | Some((Token::LParen, _)) | Some((Token::Comma, _))
        );
        let negative_literal = c == '-'
            && literal_allowed
            && chars.get(i + 1).map(|n| n.is_ascii_digit() || *n == '.').unwrap_or(false);

        if c.is_ascii_digit() || c == '.' || negative_literal {
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // exponent
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text.parse::<f64>().map_err(|_| TreeError::Parse {
                position: start,
                message: format!("invalid number '{}'", text),
            })?;
            tokens.push((Token::Number(value), start));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                i += 1;
            }
            tokens.push((Token::Ident(chars[start..i].iter().collect()), start));
            continue;
        }
        match c {
            '(' => {
                tokens.push((Token::LParen, start));
                i += 1;
                continue;
            }
            ')' => {
                tokens.push((Token::RParen, start));
                i += 1;
                continue;
            }
            ',' => {
                tokens.push((Token::Comma, start));
                i += 1;
                continue;
            }
            _ => {}
        }
        let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
        match SYMBOLS.iter().find(|(surface, _)| rest.starts_with(surface)) {
            Some((surface, op)) => {
                tokens.push((Token::Op(*op), start));
                i += surface.chars().count();
            }
            None => {
                return Err(TreeError::UnexpectedToken {
                    token: c.to_string(),
                    position: start,
                })
            }
        }
    }
    Ok(tokens)
}

/// Parser of assertion text into typed trees
pub struct TreeReader<'a, V: VariableTypes + ?Sized> {
    variables: &'a V,
}

impl<'a, V: VariableTypes + ?Sized> TreeReader<'a, V> {
    /// Create a reader resolving variable types through `variables`
    pub fn new(variables: &'a V) -> Self {
        Self { variables }
    }

    /// Parse an assertion; `==` between booleans is read as `<=>`
    pub fn read(&self, text: &str) -> Result<Tree, TreeError> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(TreeError::EmptyExpression);
        }
        let depth = tokens.iter().try_fold(0i64, |depth, (token, _)| {
            let depth = match token {
                Token::LParen => depth + 1,
                Token::RParen => depth - 1,
                _ => depth,
            };
            if depth < 0 {
                None
            } else {
                Some(depth)
            }
        });
        if depth != Some(0) {
            return Err(TreeError::UnbalancedParentheses(text.to_string()));
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            variables: self.variables,
        };
        let mut tree = parser.expression(0)?;
        if let Some((token, position)) = parser.tokens.get(parser.pos) {
            return Err(TreeError::UnexpectedToken {
                token: format!("{:?}", token),
                position: *position,
            });
        }
        tree.fix_ambiguity();
        Ok(tree)
    }
}

struct Parser<'a, V: VariableTypes + ?Sized> {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    variables: &'a V,
}

impl<'a, V: VariableTypes + ?Sized> Parser<'a, V> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, p)| *p)
            .or_else(|| self.tokens.last().map(|(_, p)| *p + 1))
            .unwrap_or(0)
    }

    fn next(&mut self) -> Result<Token, TreeError> {
        let token = self
            .tokens
            .get(self.pos)
            .map(|(t, _)| t.clone())
            .ok_or(TreeError::Parse {
                position: self.position(),
                message: "unexpected end of expression".to_string(),
            })?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Token) -> Result<(), TreeError> {
        let position = self.position();
        let token = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(TreeError::UnexpectedToken {
                token: format!("{:?}", token),
                position,
            })
        }
    }

    fn expression(&mut self, min_precedence: u8) -> Result<Tree, TreeError> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            let (prec, right_assoc) = match precedence(op) {
                Some(p) => p,
                None => break,
            };
            if prec < min_precedence {
                break;
            }
            self.pos += 1;
            let next_min = if right_assoc { prec } else { prec + 1 };
            let rhs = self.expression(next_min)?;
            lhs = build(op, vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Tree, TreeError> {
        if let Some(Token::Op("-")) = self.peek() {
            self.pos += 1;
            let operand = self.unary()?;
            return Ok(Tree::binary("-", Tree::number(0.0), operand, ValueType::Number));
        }
        if let Some(Token::Op("+")) = self.peek() {
            self.pos += 1;
            return self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Tree, TreeError> {
        let position = self.position();
        match self.next()? {
            Token::Number(n) => Ok(Tree::number(n)),
            Token::LParen => {
                let inner = self.expression(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if name.eq_ignore_ascii_case("true") {
                    return Ok(Tree::boolean(true));
                }
                if name.eq_ignore_ascii_case("false") {
                    return Ok(Tree::boolean(false));
                }
                if self.peek() == Some(&Token::LParen) {
                    return self.call(&name, position);
                }
                let ty = self
                    .variables
                    .type_of(&name)
                    .ok_or_else(|| TreeError::UnknownVariable(name.clone()))?;
                Ok(Tree::variable(name, ty))
            }
            other => Err(TreeError::UnexpectedToken {
                token: format!("{:?}", other),
                position,
            }),
        }
    }

    fn call(&mut self, name: &str, position: usize) -> Result<Tree, TreeError> {
        let op = functions::lookup(name)
            .filter(|op| functions::is_identifier(op))
            .ok_or_else(|| TreeError::Parse {
                position,
                message: format!("unknown function '{}'", name),
            })?;
        self.expect(Token::LParen)?;
        let mut args = vec![self.expression(0)?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            args.push(self.expression(0)?);
        }
        self.expect(Token::RParen)?;
        let arity = if functions::is_unary(op) { 1 } else { 2 };
        if args.len() != arity {
            return Err(TreeError::Parse {
                position,
                message: format!("{} expects {} argument(s), got {}", op, arity, args.len()),
            });
        }
        Ok(build(op, args))
    }
}

/// Result type when the argument types fit no signature
fn fallback_type(op: &str) -> ValueType {
    if functions::MATH_RETURNS_BOOLEAN.contains(&op)
        || functions::MATH_RETURNS_BOOLEAN_EXTRA.contains(&op)
        || functions::BOOLEAN_RETURNS_BOOLEAN.contains(&op)
        || functions::UNARY_BOOLEAN_RETURNS_BOOLEAN.contains(&op)
    {
        ValueType::Boolean
    } else if functions::UNARY_MATH_RETURNS_SEQUENCE.contains(&op)
        || functions::UNARY_SEQUENCE_RETURNS_SEQUENCE.contains(&op)
        || functions::BINARY_SEQUENCE_MATH_RETURNS_SEQUENCE.contains(&op)
    {
        ValueType::Sequence
    } else {
        ValueType::Number
    }
}

fn build(op: &'static str, mut args: Vec<Tree>) -> Tree {
    let types: Vec<ValueType> = args.iter().map(|a| a.ty).collect();
    let ty = functions::result_type(op, &types).unwrap_or_else(|| fallback_type(op));
    if args.len() == 1 {
        let child = args.remove(0);
        Tree::unary(op, child, ty)
    } else {
        let right = args.remove(1);
        let left = args.remove(0);
        Tree::binary(op, left, right, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AnyNumber, Sequence, Variables, VariablesManager};

    fn schema() -> VariablesManager {
        VariablesManager::from_variables(
            &Variables::new()
                .with_input("x", 1.0)
                .with_input("y", 2.0)
                .with_input("b", true)
                .with_output("s", Sequence::numeric(vec![1.0])),
        )
    }

    fn read(text: &str) -> Result<Tree, TreeError> {
        let vm = schema();
        TreeReader::new(&vm).read(text)
    }

    #[test]
    fn test_read_conjunction() {
        let tree = read("(x > 5) && (y < 3)").unwrap();
        assert_eq!(tree.operator(), Some("&&"));
        assert_eq!(tree.ty, ValueType::Boolean);
        assert!(tree.is_well_typed());
        assert_eq!(tree.to_string(), "((x > 5) && (y < 3))");
    }

    #[test]
    fn test_precedence() {
        assert_eq!(read("x + y * 2 > 3").unwrap().to_string(), "((x + (y * 2)) > 3)");
        assert_eq!(
            read("x > 1 && y > 1 || b").unwrap().to_string(),
            "(((x > 1) && (y > 1)) || b)"
        );
        assert_eq!(read("b => x > 1 || b").unwrap().to_string(), "(b => ((x > 1) || b))");
        assert_eq!(read("x ^ y ^ 2 > 0").unwrap().to_string(), "((x ^ (y ^ 2)) > 0)");
    }

    #[test]
    fn test_negative_literals() {
        let tree = read("x > -3").unwrap();
        assert_eq!(tree.to_string(), "(x > -3)");
        let tree = read("(x - -2.5) == 0").unwrap();
        assert_eq!(tree.to_string(), "((x - -2.5) == 0)");
        let tree = read("-x < 0").unwrap();
        assert_eq!(tree.to_string(), "((0 - x) < 0)");
        assert_eq!(read("x-1 > 0").unwrap().to_string(), "((x - 1) > 0)");
    }

    #[test]
    fn test_functions() {
        let tree = read("NOT(b)").unwrap();
        assert_eq!(tree.to_string(), "NOT(b)");
        let tree = read("length(remove(s, -1)) >= ABS(x)").unwrap();
        assert_eq!(tree.to_string(), "(length(remove(s, -1)) >= ABS(x))");
        assert!(tree.is_well_typed());
        assert!(read("remove(s)").is_err());
        assert!(read("foo(x)").is_err());
    }

    #[test]
    fn test_boolean_equality_is_equivalence() {
        let tree = read("b == true").unwrap();
        assert_eq!(tree.operator(), Some("<=>"));
        let tree = read("x = 1").unwrap();
        assert_eq!(tree.operator(), Some("=="));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(read(""), Err(TreeError::EmptyExpression)));
        assert!(matches!(read("(x > 1"), Err(TreeError::UnbalancedParentheses(_))));
        assert!(matches!(read("x > 1)"), Err(TreeError::UnbalancedParentheses(_))));
        assert!(matches!(read("z > 1"), Err(TreeError::UnknownVariable(_))));
        assert!(matches!(read("x % 2"), Err(TreeError::UnexpectedToken { .. })));
        assert!(read("x >").is_err());
        assert!(read("x 1").is_err());
    }

    #[test]
    fn test_any_number_resolver() {
        let tree = TreeReader::new(&AnyNumber).read("(A) => (B)").unwrap();
        assert_eq!(tree.operator(), Some("=>"));
        assert_eq!(tree.to_string(), "(A => B)");
    }
}
