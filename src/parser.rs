//parser.rs - parses tokens into a list of statements
//one token of lookahead (tok), pulled from the lexer as we go
//errors never stop the parse: a broken statement records one diagnostic,
//we skip to the next statement boundary and keep going

use crate::error::Diagnostic;
use crate::lexer::{Lexer, SrcLocation, Token, TokenKind};
use crate::types::*;

type PResult<T> = Result<T, Diagnostic>;

pub const VEC_CONSTRUCTOR: &str = "@__cons_vec";

pub struct Parser {
    lexer: Lexer,
    tok: Token,
    depth: usize, //how many '{' we are inside, used for recovery
}

impl Parser {
    pub fn new(input: &str) -> Self {
        let mut lexer = Lexer::new(input);
        let tok = lexer.next_token();
        Self { lexer, tok, depth: 0 }
    }

    fn advance(&mut self) -> Token {
        match self.tok.kind {
            TokenKind::Char('{') => self.depth += 1,
            TokenKind::Char('}') => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.tok, next)
    }

    fn error<T>(&self, msg: impl Into<String>) -> PResult<T> {
        Err(Diagnostic::new(msg, self.tok.loc))
    }

    fn expect_char(&mut self, c: char, msg: &str) -> PResult<Token> {
        if self.tok.is_char(c) {
            Ok(self.advance())
        } else {
            Err(Diagnostic::new(format!("{}, found {}", msg, self.tok.kind), self.tok.loc))
        }
    }

    fn expect_identifier(&mut self, msg: &str) -> PResult<(String, SrcLocation)> {
        if let TokenKind::Identifier(name) = &self.tok.kind {
            let name = name.clone();
            let loc = self.advance().loc;
            Ok((name, loc))
        } else {
            Err(Diagnostic::new(format!("{}, found {}", msg, self.tok.kind), self.tok.loc))
        }
    }

    fn expect_separator(&mut self, msg: &str) -> PResult<()> {
        if self.tok.kind == TokenKind::Separator {
            self.advance();
            Ok(())
        } else {
            Err(Diagnostic::new(format!("{}, found {}", msg, self.tok.kind), self.tok.loc).with_fix("add ';'"))
        }
    }

    //the entry point - parses the whole input into statements
    pub fn parse(&mut self) -> Program {
        let mut program = Vec::new();
        while self.tok.kind != TokenKind::Eof {
            let start_depth = self.depth;
            let is_objtype = self.tok.kind == TokenKind::ObjType;
            match self.parse_statement() {
                Ok(stmt) => program.push(stmt),
                Err(diag) => {
                    self.lexer.error(diag);
                    self.synchronize(is_objtype, start_depth);
                }
            }
        }
        program
    }

    pub fn had_errors(&self) -> bool {
        self.lexer.had_errors()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.lexer.into_diagnostics()
    }

    //skip past the broken statement: its ';', or the '}' closing a broken objtype
    fn synchronize(&mut self, is_objtype: bool, start_depth: usize) {
        loop {
            match self.tok.kind {
                TokenKind::Eof => return,
                TokenKind::Separator if self.depth == start_depth => {
                    self.advance();
                    return;
                }
                TokenKind::Char('}') if is_objtype && self.depth == start_depth + 1 => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn parse_statement(&mut self) -> PResult<Exp> {
        if self.tok.kind == TokenKind::ObjType {
            return self.parse_objtype();
        }
        let exp = self.parse_exp()?;
        self.expect_separator("expected ';' at end of statement")?;
        Ok(exp)
    }

    fn parse_objtype(&mut self) -> PResult<Exp> {
        let loc = self.advance().loc;
        let (name, _) = self.expect_identifier("expected object type name after `objtype`")?;

        let mut controller = "default".to_string();
        if self.tok.kind == TokenKind::Control {
            self.advance();
            controller = self.expect_identifier("expected controller name after `control`")?.0;
        }

        self.expect_char('{', "expected '{' to open objtype block")?;
        let body_depth = self.depth;

        let mut forces = Vec::new();
        let mut renderers = Vec::new();
        while !self.tok.is_char('}') {
            if self.tok.kind == TokenKind::Eof {
                return Err(Diagnostic::new("unexpected end of input inside objtype block", self.tok.loc)
                    .with_fix("close the block with '}'"));
            }
            match self.parse_declaration() {
                Ok((true, call)) => forces.push(call),
                Ok((false, call)) => renderers.push(call),
                Err(diag) => {
                    //drop just this declaration and carry on with the block
                    self.lexer.error(diag);
                    self.skip_declaration(body_depth);
                }
            }
        }
        self.advance();

        Ok(Exp::ObjType(ObjTypeDef { name, controller, forces, renderers, loc }))
    }

    //force NAME(args); or renderer NAME(args); -> (is_force, synthetic call)
    fn parse_declaration(&mut self) -> PResult<(bool, Exp)> {
        let is_force = match self.tok.kind {
            TokenKind::Force => true,
            TokenKind::Renderer => false,
            _ => return self.error(format!("unexpected {}; expected 'force' or 'renderer' keyword", self.tok.kind)),
        };
        self.advance();

        let (kind, loc) = self.expect_identifier("expected component name")?;
        if !self.tok.is_char('(') {
            return Err(Diagnostic::new(format!("expected '(' after `{}`", kind), self.tok.loc)
                .with_fix(format!("{}()", kind)));
        }
        let args = self.parse_invoke_exp('(', ')')?;
        self.expect_separator("expected ';' after declaration")?;

        let prefix = if is_force { "force" } else { "renderer" };
        Ok((is_force, Exp::Call(format!("@__cons_{}_{}", prefix, kind), args, loc)))
    }

    fn skip_declaration(&mut self, body_depth: usize) {
        loop {
            match self.tok.kind {
                TokenKind::Eof => return,
                TokenKind::Separator if self.depth == body_depth => {
                    self.advance();
                    return;
                }
                TokenKind::Char('}') if self.depth == body_depth => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    pub fn parse_exp(&mut self) -> PResult<Exp> {
        let lhs = self.parse_primary()?;
        self.parse_binop_rhs(0, lhs)
    }

    fn current_op(&self) -> Option<BinOp> {
        match self.tok.kind {
            TokenKind::Operator(c) => BinOp::from_char(c),
            _ => None,
        }
    }

    //precedence climbing, see BinOp::precedence
    fn parse_binop_rhs(&mut self, min_prec: i32, mut lhs: Exp) -> PResult<Exp> {
        loop {
            let Some(op) = self.current_op() else { return Ok(lhs) };
            let prec = op.precedence();
            if prec < min_prec {
                return Ok(lhs);
            }
            let loc = self.advance().loc;

            let mut rhs = self.parse_primary()?;
            while let Some(next) = self.current_op() {
                let next_prec = next.precedence();
                if next_prec > prec {
                    rhs = self.parse_binop_rhs(prec + 1, rhs)?;
                } else if next_prec == prec && next.right_assoc() {
                    rhs = self.parse_binop_rhs(prec, rhs)?;
                } else {
                    break;
                }
            }

            lhs = Exp::BinaryOp(Box::new(lhs), op, Box::new(rhs), loc);
        }
    }

    fn parse_primary(&mut self) -> PResult<Exp> {
        let mut node = self.parse_simple()?;

        while self.tok.is_char('.') {
            let loc = self.advance().loc;
            if !matches!(self.tok.kind, TokenKind::Identifier(_)) {
                return self.error(format!("expected identifier after member access, found {}", self.tok.kind));
            }
            let rhs = self.parse_identifier()?;
            node = Exp::Member(Box::new(node), Box::new(rhs), loc);
        }
        Ok(node)
    }

    fn parse_simple(&mut self) -> PResult<Exp> {
        let loc = self.tok.loc;
        match &self.tok.kind {
            TokenKind::Number(n) => {
                let n = *n;
                self.advance();
                Ok(Exp::Number(n, loc))
            }
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance();
                Ok(Exp::Str(s, loc))
            }
            TokenKind::Color(c) => {
                let c = *c;
                self.advance();
                Ok(Exp::Color(c, loc))
            }
            TokenKind::Identifier(_) => self.parse_identifier(),
            TokenKind::Char('[') => {
                let args = self.parse_invoke_exp('[', ']')?;
                Ok(Exp::Call(VEC_CONSTRUCTOR.to_string(), args, loc))
            }
            TokenKind::Char('{') => self.parse_dict(),
            TokenKind::Char('(') => {
                self.advance();
                let exp = self.parse_exp()?;
                self.expect_char(')', "expected ')'")?;
                Ok(exp)
            }
            // negative operands: -x becomes (0 - x)
            TokenKind::Operator('-') => {
                self.advance();
                let rhs = self.parse_primary()?;
                Ok(Exp::BinaryOp(Box::new(Exp::Number(0.0, loc)), BinOp::Sub, Box::new(rhs), loc))
            }
            TokenKind::Char(c) => self.error(format!("invalid character '{}'", c)),
            other => self.error(format!("expected expression, found {}", other)),
        }
    }

    fn parse_identifier(&mut self) -> PResult<Exp> {
        let (name, loc) = self.expect_identifier("expected identifier")?;
        if self.tok.is_char('(') {
            let args = self.parse_invoke_exp('(', ')')?;
            Ok(Exp::Call(name, args, loc))
        } else {
            Ok(Exp::Var(name, loc))
        }
    }

    //comma separated expressions between start and end
    fn parse_invoke_exp(&mut self, start: char, end: char) -> PResult<Vec<Exp>> {
        self.expect_char(start, &format!("expected '{}'", start))?;
        let mut args = Vec::new();

        if !self.tok.is_char(end) {
            loop {
                args.push(self.parse_exp()?);
                if self.tok.is_char(end) {
                    break;
                }
                if !self.tok.is_char(',') {
                    return Err(Diagnostic::new(
                        format!("expected ',' or '{}' in argument list, found {}", end, self.tok.kind),
                        self.tok.loc,
                    ));
                }
                self.advance();
            }
        }
        self.advance();
        Ok(args)
    }

    fn parse_dict(&mut self) -> PResult<Exp> {
        let loc = self.advance().loc;
        let mut entries: Vec<(String, Exp)> = Vec::new();

        if !self.tok.is_char('}') {
            loop {
                let TokenKind::Identifier(key) = &self.tok.kind else {
                    return Err(Diagnostic::new(
                        format!("expected identifier in dictionary construction, found {}", self.tok.kind),
                        self.tok.loc,
                    )
                    .with_fix("remove trailing comma"));
                };
                let key = key.clone();
                let key_loc = self.advance().loc;
                if entries.iter().any(|(k, _)| *k == key) {
                    return Err(Diagnostic::new(format!("duplicate key `{}` in dictionary construction", key), key_loc));
                }

                self.expect_char(':', "expected ':' after identifier in dictionary construction")?;
                let value = self.parse_exp()?;
                entries.push((key, value));

                if self.tok.is_char('}') {
                    break;
                }
                self.expect_char(',', "expected ',' between dictionary entries")?;
            }
        }
        self.advance();
        Ok(Exp::Dict(entries, loc))
    }
}

//parse a whole source text, returning statements and every diagnostic
pub fn parse_program(input: &str) -> (Program, Vec<Diagnostic>) {
    let mut parser = Parser::new(input);
    let program = parser.parse();
    (program, parser.into_diagnostics())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> Program {
        let (program, diags) = parse_program(input);
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
        program
    }

    #[test]
    fn multiplication_binds_tighter() {
        let program = parse_ok("2 + 3 * 4;");
        let Exp::BinaryOp(lhs, BinOp::Add, rhs, _) = &program[0] else {
            panic!("expected addition at the root, got {:?}", program[0]);
        };
        assert!(matches!(**lhs, Exp::Number(n, _) if n == 2.0));
        assert!(matches!(**rhs, Exp::BinaryOp(_, BinOp::Mul, _, _)));
    }

    #[test]
    fn assignment_is_right_associative() {
        let program = parse_ok("a = b = 3;");
        let Exp::BinaryOp(lhs, BinOp::Assign, rhs, _) = &program[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(**lhs, Exp::Var(ref n, _) if n == "a"));
        assert!(matches!(**rhs, Exp::BinaryOp(_, BinOp::Assign, _, _)));
    }

    #[test]
    fn subtraction_is_left_associative() {
        let program = parse_ok("1 - 2 - 3;");
        let Exp::BinaryOp(lhs, BinOp::Sub, _, _) = &program[0] else {
            panic!("expected subtraction");
        };
        assert!(matches!(**lhs, Exp::BinaryOp(_, BinOp::Sub, _, _)));
    }

    #[test]
    fn member_chain_nests_left() {
        let program = parse_ok("make_object(\"p\", 1, {}).pos(1, 2).vel([0, 3]);");
        let Exp::Member(lhs, rhs, _) = &program[0] else {
            panic!("expected member access");
        };
        assert!(matches!(**rhs, Exp::Call(ref n, ref args, _) if n == "vel" && args.len() == 1));
        assert!(matches!(**lhs, Exp::Member(..)));
    }

    #[test]
    fn vector_literal_desugars_to_constructor_call() {
        let program = parse_ok("v = [600, 600];");
        let Exp::BinaryOp(_, _, rhs, _) = &program[0] else { panic!() };
        assert!(matches!(**rhs, Exp::Call(ref n, ref args, _) if n == VEC_CONSTRUCTOR && args.len() == 2));
    }

    #[test]
    fn objtype_declarations_become_synthetic_calls() {
        let program = parse_ok(
            "objtype planet control fixed {\n force gravity(100);\n renderer circle();\n renderer trail(2);\n}",
        );
        let Exp::ObjType(def) = &program[0] else { panic!() };
        assert_eq!(def.name, "planet");
        assert_eq!(def.controller, "fixed");
        assert_eq!(def.forces.len(), 1);
        assert_eq!(def.renderers.len(), 2);
        assert!(matches!(def.forces[0], Exp::Call(ref n, _, _) if n == "@__cons_force_gravity"));
        assert!(matches!(def.renderers[1], Exp::Call(ref n, _, _) if n == "@__cons_renderer_trail"));
    }

    #[test]
    fn dict_entries_keep_order() {
        let program = parse_ok("d = {color: #ffffff, radius: 4};");
        let Exp::BinaryOp(_, _, rhs, _) = &program[0] else { panic!() };
        let Exp::Dict(entries, _) = &**rhs else { panic!() };
        assert_eq!(entries[0].0, "color");
        assert_eq!(entries[1].0, "radius");
    }

    #[test]
    fn three_broken_statements_three_diagnostics() {
        let (program, diags) = parse_program("x = ;\ny = (1 + 2;\nmake_object(\"a\" 1);\nz = 4;");
        assert_eq!(diags.len(), 3, "{:?}", diags);
        assert_eq!(diags[0].loc.line, 1);
        assert_eq!(diags[1].loc.line, 2);
        assert_eq!(diags[2].loc.line, 3);
        //the good statement after them still parses
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn broken_declaration_keeps_rest_of_block() {
        let (program, diags) = parse_program(
            "objtype p {\n force gravity 1;\n renderer circle();\n}\nx = 1;",
        );
        assert_eq!(diags.len(), 1, "{:?}", diags);
        assert_eq!(program.len(), 2);
        let Exp::ObjType(def) = &program[0] else { panic!() };
        assert!(def.forces.is_empty());
        assert_eq!(def.renderers.len(), 1);
    }

    #[test]
    fn broken_objtype_header_skips_whole_block() {
        let (program, diags) = parse_program("objtype { force gravity(1); }\nx = 1;");
        assert_eq!(diags.len(), 1, "{:?}", diags);
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn missing_semicolon_has_fix() {
        let (_, diags) = parse_program("x = 1");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].fix.as_deref(), Some("add ';'"));
    }

    #[test]
    fn trailing_comma_in_dict_is_reported() {
        let (_, diags) = parse_program("d = {a: 1,};");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].fix.as_deref(), Some("remove trailing comma"));
    }

    #[test]
    fn unary_minus_on_identifier() {
        let program = parse_ok("y = -x;");
        let Exp::BinaryOp(_, BinOp::Assign, rhs, _) = &program[0] else { panic!() };
        assert!(matches!(**rhs, Exp::BinaryOp(_, BinOp::Sub, _, _)));
    }
}
