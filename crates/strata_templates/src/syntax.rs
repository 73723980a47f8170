//! Template syntax: lexing and parsing.
//!
//! Sources are parsed into a [`Template`] tree before anything is
//! rendered; the same tree feeds both the renderer and static variable
//! extraction. The language covers output expressions (`{{ ... }}`),
//! conditionals and loops (`{% if %}` / `{% for %}`) and comments
//! (`{# ... #}`). Expressions support literals, dotted attribute access,
//! subscripts, function calls, filter pipes, equality comparison and the
//! `and`/`or`/`not` connectives.

use crate::error::{TemplateError, TemplateResult};

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Relative name the template was loaded under.
    pub name: String,
    pub nodes: Vec<Node>,
}

impl Template {
    /// Visit every statement-level expression in source order: output
    /// expressions, conditions and loop iterables. Extraction and other
    /// analyses are built on this capability instead of matching node
    /// internals.
    pub fn visit_exprs<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit_nodes(&self.nodes, visit);
    }
}

fn visit_nodes<'a>(nodes: &'a [Node], visit: &mut dyn FnMut(&'a Expr)) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Output(expr) => visit(expr),
            Node::If {
                cond,
                then_body,
                else_body,
            } => {
                visit(cond);
                visit_nodes(then_body, visit);
                visit_nodes(else_body, visit);
            }
            Node::For { iter, body, .. } => {
                visit(iter);
                visit_nodes(body, visit);
            }
        }
    }
}

/// One statement-level node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text passed through untouched.
    Text(String),
    /// `{{ expr }}`
    Output(Expr),
    /// `{% if cond %} ... {% else %} ... {% endif %}`
    If {
        cond: Expr,
        then_body: Vec<Node>,
        else_body: Vec<Node>,
    },
    /// `{% for var in iter %} ... {% endfor %}`
    For {
        var: String,
        iter: Expr,
        body: Vec<Node>,
    },
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// One expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    /// Bare identifier.
    Name(String),
    /// Literal attribute access `base.attr`.
    GetAttr { base: Box<Expr>, attr: String },
    /// Computed subscript `base[index]`.
    GetItem { base: Box<Expr>, index: Box<Expr> },
    /// Global function call `name(args...)`.
    Call { name: String, args: Vec<Expr> },
    /// Filter application `base | name(args...)`.
    Filter {
        base: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    Not(Box<Expr>),
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logic {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Str(s) => write!(f, "'{}'", s),
            Expr::Int(n) => write!(f, "{}", n),
            Expr::Float(x) => write!(f, "{}", x),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Null => write!(f, "null"),
            Expr::Name(name) => write!(f, "{}", name),
            Expr::GetAttr { base, attr } => write!(f, "{}.{}", base, attr),
            Expr::GetItem { base, index } => write!(f, "{}[{}]", base, index),
            Expr::Call { name, .. } => write!(f, "{}(...)", name),
            Expr::Filter { base, name, .. } => write!(f, "{} | {}", base, name),
            Expr::Not(inner) => write!(f, "not {}", inner),
            Expr::Compare { op, lhs, rhs } => {
                let symbol = match op {
                    CmpOp::Eq => "==",
                    CmpOp::Ne => "!=",
                };
                write!(f, "{} {} {}", lhs, symbol, rhs)
            }
            Expr::Logic { op, lhs, rhs } => {
                let word = match op {
                    LogicOp::And => "and",
                    LogicOp::Or => "or",
                };
                write!(f, "{} {} {}", lhs, word, rhs)
            }
        }
    }
}

fn parse_err(line: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::Parse {
        line,
        message: message.into(),
    }
}

/// Parse a template source into its tree.
pub fn parse(name: &str, source: &str) -> TemplateResult<Template> {
    let chunks = scan(source)?;
    let mut iter = chunks.into_iter();
    let (nodes, terminator) = parse_body(&mut iter, &[])?;
    debug_assert!(terminator.is_none());
    Ok(Template {
        name: name.to_string(),
        nodes,
    })
}

/// One raw segment of the source.
#[derive(Debug)]
enum Chunk<'a> {
    Text(&'a str),
    Output(&'a str, usize),
    Tag(&'a str, usize),
}

fn line_of(source: &str, pos: usize) -> usize {
    source[..pos].bytes().filter(|b| *b == b'\n').count() + 1
}

fn scan(source: &str) -> TemplateResult<Vec<Chunk<'_>>> {
    let mut chunks = Vec::new();
    let mut offset = 0;

    while offset < source.len() {
        let rest = &source[offset..];
        let next = ["{{", "{%", "{#"]
            .iter()
            .filter_map(|&open| rest.find(open).map(|i| (i, open)))
            .min_by_key(|(i, _)| *i);

        let (start, open) = match next {
            Some(found) => found,
            None => {
                chunks.push(Chunk::Text(rest));
                break;
            }
        };

        if start > 0 {
            chunks.push(Chunk::Text(&rest[..start]));
        }

        let close = match open {
            "{{" => "}}",
            "{%" => "%}",
            _ => "#}",
        };
        let line = line_of(source, offset + start);
        let inner_start = start + open.len();
        let inner_len = rest[inner_start..]
            .find(close)
            .ok_or_else(|| parse_err(line, format!("Unclosed '{}'", open)))?;
        let inner = rest[inner_start..inner_start + inner_len].trim();

        match open {
            "{{" => chunks.push(Chunk::Output(inner, line)),
            "{%" => chunks.push(Chunk::Tag(inner, line)),
            _ => {} // comment, dropped
        }

        offset += inner_start + inner_len + close.len();
    }

    Ok(chunks)
}

type Terminator = Option<(String, usize)>;

/// Parse nodes until end of input or one of the `until` tags is met.
/// Returns the terminating tag so `if`/`else` chains can dispatch on it.
fn parse_body(
    iter: &mut std::vec::IntoIter<Chunk<'_>>,
    until: &[&str],
) -> TemplateResult<(Vec<Node>, Terminator)> {
    let mut nodes = Vec::new();

    while let Some(chunk) = iter.next() {
        match chunk {
            Chunk::Text(text) => {
                if !text.is_empty() {
                    nodes.push(Node::Text(text.to_string()));
                }
            }
            Chunk::Output(inner, line) => {
                nodes.push(Node::Output(parse_expr(inner, line)?));
            }
            Chunk::Tag(inner, line) => {
                let (word, rest) = match inner.split_once(char::is_whitespace) {
                    Some((word, rest)) => (word, rest.trim()),
                    None => (inner, ""),
                };

                if until.contains(&word) {
                    if !rest.is_empty() {
                        return Err(parse_err(
                            line,
                            format!("Unexpected content after '{}'", word),
                        ));
                    }
                    return Ok((nodes, Some((word.to_string(), line))));
                }

                match word {
                    "if" => {
                        let cond = parse_expr(rest, line)?;
                        let (then_body, terminator) = parse_body(iter, &["else", "endif"])?;
                        let else_body = match terminator {
                            Some((tag, _)) if tag == "else" => {
                                let (body, terminator) = parse_body(iter, &["endif"])?;
                                if terminator.is_none() {
                                    return Err(parse_err(line, "Unterminated '{% if %}'"));
                                }
                                body
                            }
                            Some(_) => Vec::new(),
                            None => {
                                return Err(parse_err(line, "Unterminated '{% if %}'"));
                            }
                        };
                        nodes.push(Node::If {
                            cond,
                            then_body,
                            else_body,
                        });
                    }
                    "for" => {
                        let (var, iter_expr) = parse_for_head(rest, line)?;
                        let (body, terminator) = parse_body(iter, &["endfor"])?;
                        if terminator.is_none() {
                            return Err(parse_err(line, "Unterminated '{% for %}'"));
                        }
                        nodes.push(Node::For {
                            var,
                            iter: iter_expr,
                            body,
                        });
                    }
                    other => {
                        return Err(parse_err(line, format!("Unexpected tag '{}'", other)));
                    }
                }
            }
        }
    }

    Ok((nodes, None))
}

fn parse_for_head(input: &str, line: usize) -> TemplateResult<(String, Expr)> {
    let tokens = lex(input, line)?;
    let mut parser = ExprParser { tokens, pos: 0, line };

    let var = parser.ident("loop variable")?;
    if !parser.eat_keyword("in") {
        return Err(parse_err(line, "Expected 'in' in '{% for %}'"));
    }
    let iter = parser.expression()?;
    parser.finish()?;
    Ok((var, iter))
}

/// Parse one standalone expression.
pub fn parse_expr(input: &str, line: usize) -> TemplateResult<Expr> {
    let tokens = lex(input, line)?;
    let mut parser = ExprParser { tokens, pos: 0, line };
    let expr = parser.expression()?;
    parser.finish()?;
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    Pipe,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    EqEq,
    NotEq,
}

fn lex(input: &str, line: usize) -> TemplateResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
        } else if c == '\'' || c == '"' {
            let quote = c;
            i += 1;
            let start = i;
            while i < chars.len() && chars[i] != quote {
                i += 1;
            }
            if i >= chars.len() {
                return Err(parse_err(line, "Unterminated string literal"));
            }
            tokens.push(Token::Str(chars[start..i].iter().collect()));
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            let mut is_float = false;
            i += 1;
            while i < chars.len() {
                if chars[i].is_ascii_digit() {
                    i += 1;
                } else if chars[i] == '.'
                    && !is_float
                    && i + 1 < chars.len()
                    && chars[i + 1].is_ascii_digit()
                {
                    is_float = true;
                    i += 1;
                } else {
                    break;
                }
            }
            let text: String = chars[start..i].iter().collect();
            if is_float {
                let value = text
                    .parse::<f64>()
                    .map_err(|_| parse_err(line, format!("Invalid number '{}'", text)))?;
                tokens.push(Token::Float(value));
            } else {
                let value = text
                    .parse::<i64>()
                    .map_err(|_| parse_err(line, format!("Invalid number '{}'", text)))?;
                tokens.push(Token::Int(value));
            }
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            match c {
                '.' => tokens.push(Token::Dot),
                '|' => tokens.push(Token::Pipe),
                '(' => tokens.push(Token::LParen),
                ')' => tokens.push(Token::RParen),
                '[' => tokens.push(Token::LBracket),
                ']' => tokens.push(Token::RBracket),
                ',' => tokens.push(Token::Comma),
                '=' if i + 1 < chars.len() && chars[i + 1] == '=' => {
                    tokens.push(Token::EqEq);
                    i += 1;
                }
                '!' if i + 1 < chars.len() && chars[i + 1] == '=' => {
                    tokens.push(Token::NotEq);
                    i += 1;
                }
                other => {
                    return Err(parse_err(line, format!("Unexpected character '{}'", other)));
                }
            }
            i += 1;
        }
    }

    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
    line: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
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

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if let Some(Token::Ident(name)) = self.peek() {
            if name == keyword {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    fn expect(&mut self, token: Token, what: &str) -> TemplateResult<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(parse_err(self.line, format!("Expected {}", what)))
        }
    }

    fn ident(&mut self, what: &str) -> TemplateResult<String> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name),
            _ => Err(parse_err(self.line, format!("Expected {}", what))),
        }
    }

    fn finish(&mut self) -> TemplateResult<()> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(parse_err(self.line, "Trailing tokens in expression"))
        }
    }

    fn expression(&mut self) -> TemplateResult<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> TemplateResult<Expr> {
        let mut lhs = self.and_expr()?;
        while self.eat_keyword("or") {
            let rhs = self.and_expr()?;
            lhs = Expr::Logic {
                op: LogicOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> TemplateResult<Expr> {
        let mut lhs = self.not_expr()?;
        while self.eat_keyword("and") {
            let rhs = self.not_expr()?;
            lhs = Expr::Logic {
                op: LogicOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> TemplateResult<Expr> {
        if self.eat_keyword("not") {
            Ok(Expr::Not(Box::new(self.not_expr()?)))
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> TemplateResult<Expr> {
        let lhs = self.pipe_expr()?;
        let op = match self.peek() {
            Some(Token::EqEq) => Some(CmpOp::Eq),
            Some(Token::NotEq) => Some(CmpOp::Ne),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let rhs = self.pipe_expr()?;
            return Ok(Expr::Compare {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }
        Ok(lhs)
    }

    fn pipe_expr(&mut self) -> TemplateResult<Expr> {
        let mut base = self.postfix()?;
        while self.eat(&Token::Pipe) {
            let name = self.ident("filter name")?;
            let args = if self.eat(&Token::LParen) {
                self.call_args()?
            } else {
                Vec::new()
            };
            base = Expr::Filter {
                base: Box::new(base),
                name,
                args,
            };
        }
        Ok(base)
    }

    fn postfix(&mut self) -> TemplateResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let attr = self.ident("attribute name")?;
                expr = Expr::GetAttr {
                    base: Box::new(expr),
                    attr,
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(Token::RBracket, "']'")?;
                expr = Expr::GetItem {
                    base: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> TemplateResult<Expr> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Int(n)) => Ok(Expr::Int(n)),
            Some(Token::Float(x)) => Ok(Expr::Float(x)),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                "null" | "none" => Ok(Expr::Null),
                _ => {
                    if self.eat(&Token::LParen) {
                        let args = self.call_args()?;
                        Ok(Expr::Call { name, args })
                    } else {
                        Ok(Expr::Name(name))
                    }
                }
            },
            Some(Token::LParen) => {
                let expr = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(parse_err(self.line, "Expected expression")),
        }
    }

    fn call_args(&mut self) -> TemplateResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen, "')'")?;
            break;
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let template = parse("t", "hello world").unwrap();
        assert_eq!(template.nodes, vec![Node::Text("hello world".to_string())]);
    }

    #[test]
    fn output_with_attribute_chain() {
        let template = parse("t", "{{ values.app.name }}").unwrap();
        match &template.nodes[0] {
            Node::Output(expr) => assert_eq!(expr.to_string(), "values.app.name"),
            other => panic!("expected output node, got {:?}", other),
        }
    }

    #[test]
    fn comments_are_dropped() {
        let template = parse("t", "a{# note #}b").unwrap();
        assert_eq!(
            template.nodes,
            vec![
                Node::Text("a".to_string()),
                Node::Text("b".to_string())
            ]
        );
    }

    #[test]
    fn if_else_structure() {
        let template =
            parse("t", "{% if values.debug %}on{% else %}off{% endif %}").unwrap();
        match &template.nodes[0] {
            Node::If {
                then_body,
                else_body,
                ..
            } => {
                assert_eq!(then_body, &vec![Node::Text("on".to_string())]);
                assert_eq!(else_body, &vec![Node::Text("off".to_string())]);
            }
            other => panic!("expected if node, got {:?}", other),
        }
    }

    #[test]
    fn for_loop_structure() {
        let template = parse("t", "{% for host in values.hosts %}{{ host }},{% endfor %}")
            .unwrap();
        match &template.nodes[0] {
            Node::For { var, iter, body } => {
                assert_eq!(var, "host");
                assert_eq!(iter.to_string(), "values.hosts");
                assert_eq!(body.len(), 2);
            }
            other => panic!("expected for node, got {:?}", other),
        }
    }

    #[test]
    fn filters_and_calls_parse() {
        let expr = parse_expr("values.password | b64encode", 1).unwrap();
        assert_eq!(expr.to_string(), "values.password | b64encode");

        let expr = parse_expr("random_password(16)", 1).unwrap();
        match expr {
            Expr::Call { ref name, ref args } => {
                assert_eq!(name, "random_password");
                assert_eq!(args, &vec![Expr::Int(16)]);
            }
            other => panic!("expected call, got {:?}", other),
        }

        let expr = parse_expr("env('HOME', '/root')", 1).unwrap();
        match expr {
            Expr::Call { ref args, .. } => assert_eq!(args.len(), 2),
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn subscript_parses_as_get_item() {
        let expr = parse_expr("values.hosts[0]", 1).unwrap();
        assert!(matches!(expr, Expr::GetItem { .. }));
    }

    #[test]
    fn comparisons_and_logic() {
        let expr = parse_expr("values.env == 'prod' and not values.dry_run", 1).unwrap();
        assert!(matches!(
            expr,
            Expr::Logic {
                op: LogicOp::And,
                ..
            }
        ));
    }

    #[test]
    fn unclosed_block_is_a_parse_error() {
        let err = parse("t", "{{ values.a ").unwrap_err();
        assert!(matches!(err, TemplateError::Parse { line: 1, .. }));
    }

    #[test]
    fn unterminated_if_is_a_parse_error() {
        let err = parse("t", "{% if values.a %}x").unwrap_err();
        assert!(matches!(err, TemplateError::Parse { .. }));
    }

    #[test]
    fn unknown_tag_is_a_parse_error() {
        let err = parse("t", "{% include 'x' %}").unwrap_err();
        match err {
            TemplateError::Parse { message, .. } => {
                assert!(message.contains("include"), "message: {}", message);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn parse_errors_carry_line_numbers() {
        let err = parse("t", "line one\nline two\n{% bogus %}\n").unwrap_err();
        assert!(matches!(err, TemplateError::Parse { line: 3, .. }));
    }
}
