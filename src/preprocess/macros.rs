//! Macro definitions, the macro table, and argument substitution.

use crate::lexer::{Operator, Punct, RawLexer, Token, TokenKind};
use crate::source::{Interner, SourceLocation, Symbol};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct MacroDef {
    pub name: Symbol,
    /// `None` for object-like macros. A variadic macro's last parameter is
    /// `__VA_ARGS__`.
    pub params: Option<Vec<Symbol>>,
    pub variadic: bool,
    pub body: Vec<Token>,
    pub location: SourceLocation,
}

impl MacroDef {
    pub fn object(name: Symbol, body: Vec<Token>, location: SourceLocation) -> Self {
        Self {
            name,
            params: None,
            variadic: false,
            body,
            location,
        }
    }

    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }

    /// Number of named (non-variadic) parameters.
    pub fn named_params(&self) -> usize {
        let total = self.params.as_ref().map_or(0, Vec::len);
        total - usize::from(self.variadic)
    }

    fn param_index(&self, token: &Token) -> Option<usize> {
        if token.kind != TokenKind::Identifier {
            return None;
        }
        self.params.as_ref()?.iter().position(|&p| p == token.text)
    }

    /// Two definitions are the same if parameters and replacement tokens
    /// are spelled identically.
    pub fn same_definition(&self, other: &MacroDef) -> bool {
        self.params == other.params
            && self.variadic == other.variadic
            && self.body.len() == other.body.len()
            && self
                .body
                .iter()
                .zip(&other.body)
                .all(|(a, b)| a.kind == b.kind && a.text == b.text)
    }

    /// Produce the replacement list for one invocation. Body tokens take
    /// the invocation site's location; argument tokens keep their own.
    ///
    /// `expanded` holds the fully macro-expanded form of each argument. A
    /// parameter that is an operand of `#` or `##` uses the argument as
    /// written in `args` instead.
    pub fn substitute(
        &self,
        args: &[Vec<Token>],
        expanded: &[Vec<Token>],
        site: SourceLocation,
        interner: &mut Interner,
    ) -> Vec<Token> {
        let mut out: Vec<Token> = Vec::with_capacity(self.body.len());
        let mut paste_next = false;
        let mut last_piece_empty = false;
        let mut i = 0;

        while i < self.body.len() {
            let token = self.body[i];

            if token.is_op(Operator::Hash) && self.is_function_like() {
                if let Some(idx) = self.body.get(i + 1).and_then(|t| self.param_index(t)) {
                    let arg = args.get(idx).map_or(&[][..], Vec::as_slice);
                    let piece = vec![stringify(arg, site, interner)];
                    last_piece_empty = false;
                    push_piece(&mut out, piece, &mut paste_next, interner);
                    i += 2;
                    continue;
                }
            }

            if token.is_op(Operator::HashHash) && i + 1 < self.body.len() {
                paste_next = !last_piece_empty && !out.is_empty();
                i += 1;
                continue;
            }

            let piece: Vec<Token> = match self.param_index(&token) {
                Some(idx) => {
                    let pasted = (i > 0 && self.body[i - 1].is_op(Operator::HashHash))
                        || self.body.get(i + 1).is_some_and(|t| t.is_op(Operator::HashHash));
                    let source = if pasted { args } else { expanded };
                    source
                        .get(idx)
                        .map(|arg| arg.iter().map(|t| Token { bol_hash: false, ..*t }).collect())
                        .unwrap_or_default()
                }
                None => vec![Token {
                    location: site,
                    bol_hash: false,
                    ..token
                }],
            };
            last_piece_empty = piece.is_empty();
            push_piece(&mut out, piece, &mut paste_next, interner);
            i += 1;
        }
        out
    }
}

fn push_piece(out: &mut Vec<Token>, piece: Vec<Token>, paste_next: &mut bool, interner: &mut Interner) {
    if !std::mem::take(paste_next) {
        out.extend(piece);
        return;
    }
    let mut rest = piece.into_iter();
    match (out.pop(), rest.next()) {
        (Some(lhs), Some(rhs)) => out.extend(paste(lhs, rhs, interner)),
        (lhs, _) => out.extend(lhs),
    }
    out.extend(rest);
}

/// Concatenate two spellings and re-lex them. If the result is not a
/// single token the operands are kept as they were.
fn paste(lhs: Token, rhs: Token, interner: &mut Interner) -> Vec<Token> {
    let mut text = interner.resolve_bytes(lhs.text).to_vec();
    text.extend_from_slice(interner.resolve_bytes(rhs.text));
    let Ok(mut lexer) = RawLexer::new("<paste>", lhs.location.file, &text) else {
        return vec![lhs, rhs];
    };
    let tokens = lexer.tokenize(interner);
    match tokens.as_slice() {
        [single, eof] if eof.is_eof() && !matches!(single.kind, TokenKind::Error(_)) => {
            vec![Token {
                location: lhs.location,
                bol_hash: false,
                ..*single
            }]
        }
        _ => {
            tracing::debug!(text = %String::from_utf8_lossy(&text), "token paste did not produce a single token");
            vec![lhs, rhs]
        }
    }
}

fn stringify(arg: &[Token], site: SourceLocation, interner: &mut Interner) -> Token {
    let mut text = String::from("\"");
    let mut prev: Option<&Token> = None;
    for token in arg {
        let spelling = interner.resolve(token.text);
        if let Some(p) = prev {
            let p_len = interner.resolve_bytes(p.text).len() as u32;
            if p.location.line != token.location.line || p.location.column + p_len != token.location.column {
                text.push(' ');
            }
        }
        if matches!(token.kind, TokenKind::String | TokenKind::Char) {
            for c in spelling.chars() {
                if c == '"' || c == '\\' {
                    text.push('\\');
                }
                text.push(c);
            }
        } else {
            text.push_str(spelling);
        }
        prev = Some(token);
    }
    text.push('"');
    Token::new(TokenKind::String, interner.intern(&text), site)
}

/// Parse the operand tokens of a `#define` (everything after `define`).
pub fn parse_define(tokens: &[Token], interner: &mut Interner) -> Result<MacroDef, String> {
    let Some((name_tok, rest)) = tokens.split_first() else {
        return Err("macro name missing".to_string());
    };
    if !name_tok.is_name() {
        return Err("macro names must be identifiers".to_string());
    }
    let name = name_tok.text;
    let name_len = interner.resolve_bytes(name).len() as u32;

    let function_like = rest.first().is_some_and(|t| {
        t.is_punct(Punct::LParen)
            && t.location.line == name_tok.location.line
            && t.location.column == name_tok.location.column + name_len
    });
    if !function_like {
        let body = rest.iter().map(|t| Token { bol_hash: false, ..*t }).collect();
        return Ok(MacroDef::object(name, body, name_tok.location));
    }

    let mut params = Vec::new();
    let mut variadic = false;
    let mut pos = 1;
    loop {
        let Some(token) = rest.get(pos) else {
            return Err("missing ')' in macro parameter list".to_string());
        };
        pos += 1;
        match token.kind {
            TokenKind::Punct(Punct::RParen) if params.is_empty() || variadic => break,
            TokenKind::Identifier if !variadic => {
                if params.contains(&token.text) {
                    return Err(format!(
                        "duplicate macro parameter '{}'",
                        interner.resolve(token.text)
                    ));
                }
                params.push(token.text);
            }
            TokenKind::Operator(Operator::Ellipsis) if !variadic => {
                variadic = true;
                params.push(interner.intern("__VA_ARGS__"));
            }
            _ => return Err("expected parameter name, found ".to_string() + &token.describe(interner)),
        }
        if variadic {
            continue;
        }
        match rest.get(pos) {
            Some(t) if t.is_punct(Punct::Comma) => pos += 1,
            Some(t) if t.is_punct(Punct::RParen) => {
                pos += 1;
                break;
            }
            _ => return Err("expected ',' or ')' in macro parameter list".to_string()),
        }
    }

    let body = rest[pos..].iter().map(|t| Token { bol_hash: false, ..*t }).collect();
    Ok(MacroDef {
        name,
        params: Some(params),
        variadic,
        body,
        location: name_tok.location,
    })
}

/// Accumulates the arguments of a function-like invocation, one token at a
/// time, after the opening parenthesis.
pub struct ArgumentCollector {
    named: usize,
    variadic: bool,
    depth: u32,
    args: Vec<Vec<Token>>,
}

impl ArgumentCollector {
    pub fn new(def: &MacroDef) -> Self {
        Self {
            named: def.named_params(),
            variadic: def.variadic,
            depth: 0,
            args: vec![Vec::new()],
        }
    }

    /// Feed one token; returns `true` once the closing parenthesis is seen.
    pub fn feed(&mut self, token: Token) -> bool {
        match token.kind {
            TokenKind::Punct(Punct::RParen) if self.depth == 0 => return true,
            TokenKind::Punct(Punct::Comma)
                if self.depth == 0 && !(self.variadic && self.args.len() > self.named) =>
            {
                self.args.push(Vec::new());
                return false;
            }
            TokenKind::Punct(Punct::LParen) => self.depth += 1,
            TokenKind::Punct(Punct::RParen) => self.depth -= 1,
            _ => {}
        }
        if let Some(current) = self.args.last_mut() {
            current.push(token);
        }
        false
    }

    /// Check the argument count against the definition.
    pub fn finish(self) -> Result<Vec<Vec<Token>>, String> {
        let mut args = self.args;
        if self.named == 0 && args.len() == 1 && args[0].is_empty() && !self.variadic {
            args.clear();
        }
        if self.variadic && args.len() == self.named {
            args.push(Vec::new());
        }
        let expected = self.named + usize::from(self.variadic);
        if args.len() == expected {
            return Ok(args);
        }
        let given = args.len();
        Err(if self.variadic {
            format!("requires at least {} argument(s), but only {given} given", self.named)
        } else if given > expected {
            format!("passed {given} arguments, but takes just {expected}")
        } else {
            format!("requires {expected} arguments, but only {given} given")
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: FxHashMap<Symbol, MacroDef>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a definition, returning the previous one.
    pub fn define(&mut self, def: MacroDef) -> Option<MacroDef> {
        self.macros.insert(def.name, def)
    }

    pub fn undef(&mut self, name: Symbol) -> bool {
        self.macros.remove(&name).is_some()
    }

    pub fn get(&self, name: Symbol) -> Option<&MacroDef> {
        self.macros.get(&name)
    }

    pub fn contains(&self, name: Symbol) -> bool {
        self.macros.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Fully expand a closed token list, as needed for `#if` operands.
    /// Function-like macros only take arguments from within `tokens`.
    pub fn expand_all(&self, tokens: &[Token], interner: &mut Interner, max_depth: usize) -> Vec<Token> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut hidden = Vec::new();
        self.expand_into(tokens, interner, &mut hidden, max_depth, &mut out);
        out
    }

    /// Expand each argument of an invocation on its own before it is
    /// substituted. `hidden` names the macros already being expanded
    /// around the call site.
    pub fn expand_args(
        &self,
        args: &[Vec<Token>],
        interner: &mut Interner,
        hidden: &[Symbol],
        budget: usize,
    ) -> Vec<Vec<Token>> {
        let mut hidden = hidden.to_vec();
        args.iter()
            .map(|arg| {
                let mut out = Vec::with_capacity(arg.len());
                self.expand_into(arg, interner, &mut hidden, budget, &mut out);
                out
            })
            .collect()
    }

    fn expand_into(
        &self,
        tokens: &[Token],
        interner: &mut Interner,
        hidden: &mut Vec<Symbol>,
        budget: usize,
        out: &mut Vec<Token>,
    ) {
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            i += 1;
            let def = match self.get(token.text) {
                Some(def) if token.is_name() && budget > 0 && !hidden.contains(&token.text) => def,
                _ => {
                    out.push(token);
                    continue;
                }
            };

            let args = if def.is_function_like() {
                if !tokens.get(i).is_some_and(|t| t.is_punct(Punct::LParen)) {
                    out.push(token);
                    continue;
                }
                let mut collector = ArgumentCollector::new(def);
                let mut closed = false;
                let mut j = i + 1;
                while let Some(&t) = tokens.get(j) {
                    j += 1;
                    if collector.feed(t) {
                        closed = true;
                        break;
                    }
                }
                match closed.then(|| collector.finish()) {
                    Some(Ok(args)) => {
                        i = j;
                        args
                    }
                    _ => {
                        out.push(token);
                        continue;
                    }
                }
            } else {
                Vec::new()
            };

            let expanded = self.expand_args(&args, interner, hidden, budget - 1);
            let replacement = def.substitute(&args, &expanded, token.location, interner);
            hidden.push(def.name);
            self.expand_into(&replacement, interner, hidden, budget - 1, out);
            hidden.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FileId;

    fn line(src: &str, interner: &mut Interner) -> Vec<Token> {
        let mut lexer = RawLexer::new("t.c", FileId(0), src.as_bytes()).expect("lexer");
        let mut tokens = lexer.tokenize(interner);
        tokens.pop();
        tokens
    }

    fn spell(tokens: &[Token], interner: &Interner) -> String {
        tokens
            .iter()
            .map(|t| interner.resolve(t.text))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_object_like_define() {
        let mut interner = Interner::new();
        let tokens = line("SIZE (4 * 8)", &mut interner);
        let def = parse_define(&tokens, &mut interner).expect("define");
        assert!(!def.is_function_like());
        assert_eq!(spell(&def.body, &interner), "( 4 * 8 )");
    }

    #[test]
    fn test_space_before_paren_is_object_like() {
        let mut interner = Interner::new();
        let tokens = line("F (x) x", &mut interner);
        let def = parse_define(&tokens, &mut interner).expect("define");
        assert!(!def.is_function_like());
    }

    #[test]
    fn test_function_like_substitution() {
        let mut interner = Interner::new();
        let tokens = line("MAX(a, b) ((a) > (b) ? (a) : (b))", &mut interner);
        let def = parse_define(&tokens, &mut interner).expect("define");
        assert_eq!(def.named_params(), 2);

        let x = line("x", &mut interner);
        let y = line("y + 1", &mut interner);
        let args = [x, y];
        let out = def.substitute(&args, &args, SourceLocation::default(), &mut interner);
        assert_eq!(
            spell(&out, &interner),
            "( ( x ) > ( y + 1 ) ? ( x ) : ( y + 1 ) )"
        );
    }

    #[test]
    fn test_variadic_arguments_keep_commas() {
        let mut interner = Interner::new();
        let tokens = line("LOG(fmt, ...) printf(fmt, __VA_ARGS__)", &mut interner);
        let def = parse_define(&tokens, &mut interner).expect("define");
        assert!(def.variadic);

        let mut collector = ArgumentCollector::new(&def);
        let mut done = false;
        for t in line("\"%d %d\", a, (b, c))", &mut interner) {
            done = collector.feed(t);
        }
        assert!(done);
        let args = collector.finish().expect("arity");
        assert_eq!(args.len(), 2);
        assert_eq!(spell(&args[1], &interner), "a , ( b , c )");
    }

    #[test]
    fn test_arity_mismatch() {
        let mut interner = Interner::new();
        let tokens = line("ADD(a, b) a + b", &mut interner);
        let def = parse_define(&tokens, &mut interner).expect("define");
        let mut collector = ArgumentCollector::new(&def);
        for t in line("1)", &mut interner) {
            collector.feed(t);
        }
        let err = collector.finish().unwrap_err();
        assert_eq!(err, "requires 2 arguments, but only 1 given");
    }

    #[test]
    fn test_stringify_and_paste() {
        let mut interner = Interner::new();
        let tokens = line("GLUE(a, b) a ## b #a", &mut interner);
        let def = parse_define(&tokens, &mut interner).expect("define");
        let a = line("var", &mut interner);
        let b = line("1", &mut interner);
        let args = [a, b];
        let out = def.substitute(&args, &args, SourceLocation::default(), &mut interner);
        assert_eq!(spell(&out, &interner), "var1 \"var\"");
        assert_eq!(out[0].kind, TokenKind::Identifier);
        assert_eq!(out[1].kind, TokenKind::String);
    }

    #[test]
    fn test_expand_all_stops_on_self_reference() {
        let mut interner = Interner::new();
        let mut table = MacroTable::new();
        for def in ["A B + 1", "B A", "TWICE(x) x * 2"] {
            let tokens = line(def, &mut interner);
            table.define(parse_define(&tokens, &mut interner).expect("define"));
        }
        let input = line("A TWICE(3)", &mut interner);
        let out = table.expand_all(&input, &mut interner, 64);
        assert_eq!(spell(&out, &interner), "A + 1 3 * 2");
    }

    #[test]
    fn test_expand_all_nested_self_call() {
        let mut interner = Interner::new();
        let mut table = MacroTable::new();
        let tokens = line("MAX(a,b) ((a)>(b)?(a):(b))", &mut interner);
        table.define(parse_define(&tokens, &mut interner).expect("define"));
        let input = line("MAX(MAX(1,2),3)", &mut interner);
        let out = table.expand_all(&input, &mut interner, 64);
        let text = spell(&out, &interner);
        assert!(!text.contains("MAX"), "{text}");
        assert_eq!(
            text,
            "( ( ( ( 1 ) > ( 2 ) ? ( 1 ) : ( 2 ) ) ) > ( 3 ) ? ( ( ( 1 ) > ( 2 ) ? ( 1 ) : ( 2 ) ) ) : ( 3 ) )"
        );
    }

    #[test]
    fn test_pasted_operand_is_not_pre_expanded() {
        let mut interner = Interner::new();
        let mut table = MacroTable::new();
        for def in ["N 7", "CAT(a) a ## _x a"] {
            let tokens = line(def, &mut interner);
            table.define(parse_define(&tokens, &mut interner).expect("define"));
        }
        let input = line("CAT(N)", &mut interner);
        let out = table.expand_all(&input, &mut interner, 64);
        assert_eq!(spell(&out, &interner), "N_x 7");
    }

    #[test]
    fn test_keyword_named_macro_expands() {
        let mut interner = Interner::new();
        let mut table = MacroTable::new();
        let tokens = line("inline", &mut interner);
        let def = parse_define(&tokens, &mut interner).expect("define");
        assert!(def.body.is_empty());
        table.define(def);
        let input = line("inline int f", &mut interner);
        let out = table.expand_all(&input, &mut interner, 64);
        assert_eq!(spell(&out, &interner), "int f");
    }

    #[test]
    fn test_redefinition_comparison() {
        let mut interner = Interner::new();
        let a = parse_define(&line("N 1", &mut interner), &mut interner).expect("define");
        let b = parse_define(&line("N 1", &mut interner), &mut interner).expect("define");
        let c = parse_define(&line("N 2", &mut interner), &mut interner).expect("define");
        assert!(a.same_definition(&b));
        assert!(!a.same_definition(&c));
    }
}
