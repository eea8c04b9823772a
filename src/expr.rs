//! Minimal boolean-expression parser for condition text.
//!
//! Conditions are Python expressions, so `or`/`and` bind looser than
//! comparisons: `a or b == c` parses as `a or (b == c)`. The logic check
//! needs that tree shape; a flat token scan cannot see it. Everything the
//! checks do not care about (arithmetic, attribute access, calls) collapses
//! into opaque leaves.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CondExpr {
    Or(Vec<CondExpr>),
    And(Vec<CondExpr>),
    Not(Box<CondExpr>),
    Compare {
        op: String,
        lhs: Box<CondExpr>,
        rhs: Box<CondExpr>,
    },
    Ident(String),
    Literal(String),
    Opaque(String),
}

impl CondExpr {
    pub fn is_bare_ident(&self) -> bool {
        matches!(self, CondExpr::Ident(_))
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, CondExpr::Compare { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Literal(String),
    CmpOp(String),
    And,
    Or,
    Not,
    In,
    Is,
    LParen,
    RParen,
    Other(String),
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(match word.as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                "in" => Token::In,
                "is" => Token::Is,
                "True" | "False" | "None" => Token::Literal(word),
                _ => Token::Ident(word),
            });
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            tokens.push(Token::Literal(chars[start..i].iter().collect()));
        } else if c == '"' || c == '\'' {
            let quote = c;
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != quote {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(chars.len());
            tokens.push(Token::Literal(chars[start..i].iter().collect()));
        } else if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else {
            let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
            if matches!(two.as_str(), "==" | "!=" | "<=" | ">=") {
                tokens.push(Token::CmpOp(two));
                i += 2;
            } else if c == '<' || c == '>' {
                tokens.push(Token::CmpOp(c.to_string()));
                i += 1;
            } else {
                tokens.push(Token::Other(c.to_string()));
                i += 1;
            }
        }
    }

    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_or(&mut self) -> CondExpr {
        let mut operands = vec![self.parse_and()];
        while matches!(self.peek(), Some(Token::Or)) {
            self.next();
            operands.push(self.parse_and());
        }
        if operands.len() == 1 {
            operands.pop().unwrap()
        } else {
            CondExpr::Or(operands)
        }
    }

    fn parse_and(&mut self) -> CondExpr {
        let mut operands = vec![self.parse_not()];
        while matches!(self.peek(), Some(Token::And)) {
            self.next();
            operands.push(self.parse_not());
        }
        if operands.len() == 1 {
            operands.pop().unwrap()
        } else {
            CondExpr::And(operands)
        }
    }

    fn parse_not(&mut self) -> CondExpr {
        if matches!(self.peek(), Some(Token::Not)) {
            self.next();
            CondExpr::Not(Box::new(self.parse_not()))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> CondExpr {
        let lhs = self.parse_atom();
        let op = match self.peek() {
            Some(Token::CmpOp(op)) => {
                let op = op.clone();
                self.next();
                op
            }
            Some(Token::In) => {
                self.next();
                "in".to_string()
            }
            Some(Token::Is) => {
                self.next();
                if matches!(self.peek(), Some(Token::Not)) {
                    self.next();
                    "is not".to_string()
                } else {
                    "is".to_string()
                }
            }
            Some(Token::Not) => {
                // `a not in b`
                self.next();
                if matches!(self.peek(), Some(Token::In)) {
                    self.next();
                    "not in".to_string()
                } else {
                    return lhs;
                }
            }
            _ => return lhs,
        };
        let rhs = self.parse_atom();
        CondExpr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// One comparison operand. A lone identifier or literal stays typed;
    /// any longer run of tokens (attribute access, arithmetic, indexing,
    /// calls) is folded into an opaque leaf.
    fn parse_atom(&mut self) -> CondExpr {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.next();
            let inner = self.parse_or();
            if matches!(self.peek(), Some(Token::RParen)) {
                self.next();
            }
            // A call like f(x) tokenizes as Ident + LParen; that path is
            // handled below, so a leading paren is always a grouped subexpr.
            return inner;
        }

        let mut parts: Vec<String> = Vec::new();
        let mut single: Option<CondExpr> = None;

        loop {
            match self.peek() {
                Some(Token::Ident(name)) => {
                    let name = name.clone();
                    self.next();
                    if parts.is_empty() && single.is_none() {
                        single = Some(CondExpr::Ident(name.clone()));
                        parts.push(name);
                    } else {
                        single = None;
                        parts.push(name);
                    }
                }
                Some(Token::Literal(lit)) => {
                    let lit = lit.clone();
                    self.next();
                    if parts.is_empty() && single.is_none() {
                        single = Some(CondExpr::Literal(lit.clone()));
                        parts.push(lit);
                    } else {
                        single = None;
                        parts.push(lit);
                    }
                }
                Some(Token::Other(text)) => {
                    let text = text.clone();
                    self.next();
                    single = None;
                    parts.push(text);
                }
                Some(Token::LParen) => {
                    // Call or grouping glued to the operand: consume the
                    // balanced run and give up on structure.
                    let mut nest = 0usize;
                    single = None;
                    while let Some(tok) = self.peek() {
                        match tok {
                            Token::LParen => nest += 1,
                            Token::RParen => {
                                nest -= 1;
                                parts.push(")".to_string());
                                self.next();
                                if nest == 0 {
                                    break;
                                }
                                continue;
                            }
                            _ => {}
                        }
                        if let Some(t) = self.next() {
                            parts.push(token_text(&t));
                        }
                    }
                }
                _ => break,
            }
        }

        match single {
            Some(expr) => expr,
            None if parts.is_empty() => CondExpr::Opaque(String::new()),
            None => CondExpr::Opaque(parts.join("")),
        }
    }
}

fn token_text(t: &Token) -> String {
    match t {
        Token::Ident(s) | Token::Literal(s) | Token::CmpOp(s) | Token::Other(s) => s.clone(),
        Token::And => "and".to_string(),
        Token::Or => "or".to_string(),
        Token::Not => "not".to_string(),
        Token::In => "in".to_string(),
        Token::Is => "is".to_string(),
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
    }
}

/// Parse condition text into an expression tree. Never fails: garbage
/// degrades to opaque leaves.
pub fn parse(input: &str) -> CondExpr {
    let mut parser = Parser {
        tokens: tokenize(input),
        pos: 0,
    };
    parser.parse_or()
}
