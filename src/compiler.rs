use std::rc::Rc;

use crate::{
    chunk::{Chunk, OpCode},
    constants::{MAX_ARITY, MAX_NESTING_DEPTH, U8_COUNT},
    error::CompileError,
    objects::{object::Object, object_function::ObjectFunction, object_string::ObjectString},
    scanner::{Scanner, Token, TokenType},
    table::Table,
    value::{make_string_value, Value},
};

/// Compiles `source` into the top-level script function.
///
/// Every diagnostic is collected; on failure none of the partially emitted code escapes.
pub fn compile(
    source: &str,
    intern_strings: &mut Table<Rc<ObjectString>>,
) -> Result<Rc<ObjectFunction>, Vec<CompileError>> {
    Parser::new(source, intern_strings).compile()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    Function,
    Initializer,
    Method,
    Script,
}

struct Local<'a> {
    name: Token<'a>,
    /// -1 while the initializer is being compiled.
    depth: i32,
    is_captured: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Upvalue {
    index: u8,
    is_local: bool,
}

/// Per-function state: one of these per function body being compiled.
struct Compiler<'a> {
    function: ObjectFunction,
    function_type: FunctionType,
    locals: Vec<Local<'a>>,
    upvalues: Vec<Upvalue>,
    scope_depth: i32,
}

impl<'a> Compiler<'a> {
    fn new(function_type: FunctionType, name: &str) -> Self {
        // Slot 0 holds the callee, or the receiver inside methods.
        let slot_zero = match function_type {
            FunctionType::Method | FunctionType::Initializer => "this",
            FunctionType::Function | FunctionType::Script => "",
        };
        Compiler {
            function: ObjectFunction::new(name),
            function_type,
            locals: vec![Local { name: Token::synthetic(slot_zero), depth: 0, is_captured: false }],
            upvalues: Vec::new(),
            scope_depth: 0,
        }
    }
}

struct ClassCompiler {
    has_superclass: bool,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl From<u8> for Precedence {
    fn from(value: u8) -> Self {
        match value {
            0 => Precedence::None,
            1 => Precedence::Assignment,
            2 => Precedence::Or,
            3 => Precedence::And,
            4 => Precedence::Equality,
            5 => Precedence::Comparison,
            6 => Precedence::Term,
            7 => Precedence::Factor,
            8 => Precedence::Unary,
            9 => Precedence::Call,
            _ => Precedence::Primary,
        }
    }
}

impl Precedence {
    fn next(self) -> Precedence {
        (self as u8 + 1).into()
    }
}

#[derive(Debug, Clone, Copy)]
enum ParseFn {
    Grouping,
    Call,
    Dot,
    Unary,
    Binary,
    Number,
    String,
    Literal,
    Variable,
    This,
    Super,
    And,
    Or,
}

#[derive(Debug, Clone, Copy)]
struct ParseRule {
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
}

impl ParseRule {
    const fn new(prefix: Option<ParseFn>, infix: Option<ParseFn>, precedence: Precedence) -> Self {
        ParseRule { prefix, infix, precedence }
    }
}

fn get_rule(token_type: TokenType) -> ParseRule {
    match token_type {
        TokenType::LeftParen => ParseRule::new(Some(ParseFn::Grouping), Some(ParseFn::Call), Precedence::Call),
        TokenType::Dot => ParseRule::new(None, Some(ParseFn::Dot), Precedence::Call),
        TokenType::Minus => ParseRule::new(Some(ParseFn::Unary), Some(ParseFn::Binary), Precedence::Term),
        TokenType::Plus => ParseRule::new(None, Some(ParseFn::Binary), Precedence::Term),
        TokenType::Slash | TokenType::Star => ParseRule::new(None, Some(ParseFn::Binary), Precedence::Factor),
        TokenType::Bang => ParseRule::new(Some(ParseFn::Unary), None, Precedence::None),
        TokenType::BangEqual | TokenType::EqualEqual => {
            ParseRule::new(None, Some(ParseFn::Binary), Precedence::Equality)
        }
        TokenType::Greater | TokenType::GreaterEqual | TokenType::Less | TokenType::LessEqual => {
            ParseRule::new(None, Some(ParseFn::Binary), Precedence::Comparison)
        }
        TokenType::Identifier => ParseRule::new(Some(ParseFn::Variable), None, Precedence::None),
        TokenType::String => ParseRule::new(Some(ParseFn::String), None, Precedence::None),
        TokenType::Number => ParseRule::new(Some(ParseFn::Number), None, Precedence::None),
        TokenType::And => ParseRule::new(None, Some(ParseFn::And), Precedence::And),
        TokenType::Or => ParseRule::new(None, Some(ParseFn::Or), Precedence::Or),
        TokenType::False | TokenType::True | TokenType::Nil => {
            ParseRule::new(Some(ParseFn::Literal), None, Precedence::None)
        }
        TokenType::Super => ParseRule::new(Some(ParseFn::Super), None, Precedence::None),
        TokenType::This => ParseRule::new(Some(ParseFn::This), None, Precedence::None),
        _ => ParseRule::new(None, None, Precedence::None),
    }
}

pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token<'a>,
    previous: Token<'a>,
    has_error: bool,
    panic_mode: bool,
    compilers: Vec<Compiler<'a>>,
    classes: Vec<ClassCompiler>,
    intern_strings: &'a mut Table<Rc<ObjectString>>,
    errors: Vec<CompileError>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, intern_strings: &'a mut Table<Rc<ObjectString>>) -> Parser<'a> {
        let eof = Token { token_type: TokenType::Eof, value: "", line: 0 };
        Parser {
            scanner: Scanner::new(source),
            current: eof,
            previous: eof,
            has_error: false,
            panic_mode: false,
            compilers: vec![Compiler::new(FunctionType::Script, "")],
            classes: Vec::new(),
            intern_strings,
            errors: Vec::new(),
            depth: 0,
        }
    }

    pub fn compile(mut self) -> Result<Rc<ObjectFunction>, Vec<CompileError>> {
        self.advance();

        while !self.match_token(TokenType::Eof) {
            self.declaration();
        }

        let (function, _) = self.end_compiler();
        if self.has_error {
            Err(self.errors)
        } else {
            Ok(Rc::new(function))
        }
    }

    fn current_compiler(&mut self) -> &mut Compiler<'a> {
        self.compilers.last_mut().expect("compiler stack is never empty while parsing")
    }

    fn current_chunk(&mut self) -> &mut Chunk {
        &mut self.current_compiler().function.chunk
    }

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.token_type != TokenType::Error {
                break;
            }

            self.error_at_current(self.current.value);
        }
    }

    fn match_token(&mut self, token_type: TokenType) -> bool {
        if !self.check(token_type) {
            return false;
        }

        self.advance();
        true
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.current.token_type == token_type
    }

    fn consume(&mut self, token_type: TokenType, message: &str) {
        if self.current.token_type == token_type {
            self.advance();
            return;
        }

        self.error_at_current(message);
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.current_chunk().write(byte, line);
    }

    fn emit_bytes(&mut self, byte1: u8, byte2: u8) {
        self.emit_byte(byte1);
        self.emit_byte(byte2);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op.to_byte());
    }

    fn emit_op_operand(&mut self, op: OpCode, operand: u8) {
        self.emit_bytes(op.to_byte(), operand);
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op_operand(OpCode::Constant, index);
    }

    fn emit_return(&mut self) {
        if self.current_compiler().function_type == FunctionType::Initializer {
            self.emit_op_operand(OpCode::GetLocal, 0);
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.emit_op(OpCode::Return);
    }

    /// Uses two bytes for the jump offset operand and returns the operand's offset.
    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.current_chunk().len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        // -2 to adjust for the bytecode for the jump offset itself.
        let jump = self.current_chunk().len() - offset - 2;
        if jump > u16::MAX as usize {
            self.error("Too much code to jump over.");
        }

        let chunk = self.current_chunk();
        chunk.code[offset] = ((jump >> 8) & 0xff) as u8;
        chunk.code[offset + 1] = (jump & 0xff) as u8;
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);

        // +2 to skip the operand of the 'Loop' instruction itself.
        let offset = self.current_chunk().len() - loop_start + 2;
        if offset > u16::MAX as usize {
            self.error("Loop body too large.");
        }

        self.emit_byte(((offset >> 8) & 0xff) as u8);
        self.emit_byte((offset & 0xff) as u8);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        if let Some(index) = self.current_chunk().find_constant(&value) {
            return index as u8;
        }

        let index = self.current_chunk().add_constant(value);
        if index > u8::MAX as usize {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        index as u8
    }

    fn end_compiler(&mut self) -> (ObjectFunction, Vec<Upvalue>) {
        self.emit_return();
        let compiler = self.compilers.pop().expect("compiler stack is never empty while parsing");

        debug_feature::disassemble_chunk(self, &compiler.function);

        (compiler.function, compiler.upvalues)
    }

    fn begin_scope(&mut self) {
        self.current_compiler().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.current_compiler().scope_depth -= 1;

        loop {
            let compiler = self.current_compiler();
            let captured = match compiler.locals.last() {
                Some(local) if local.depth > compiler.scope_depth => local.is_captured,
                _ => break,
            };
            compiler.locals.pop();

            if captured {
                self.emit_op(OpCode::CloseUpvalue);
            } else {
                self.emit_op(OpCode::Pop);
            }
        }
    }

    fn declaration(&mut self) {
        if self.match_token(TokenType::Class) {
            self.class_declaration();
        } else if self.match_token(TokenType::Fun) {
            self.function_declaration();
        } else if self.match_token(TokenType::Var) {
            self.variable_declaration();
        } else {
            self.statement();
        }

        if self.panic_mode {
            self.synchronize();
        }
    }

    fn class_declaration(&mut self) {
        self.consume(TokenType::Identifier, "Expect class name.");
        let class_name = self.previous;
        let name_constant = self.identifier_constant(class_name.value);
        self.declare_variable();

        self.emit_op_operand(OpCode::Class, name_constant);
        self.define_variable(name_constant);

        self.classes.push(ClassCompiler { has_superclass: false });

        if self.match_token(TokenType::Less) {
            self.consume(TokenType::Identifier, "Expect superclass name.");
            self.variable(false);

            if Self::identifier_equal(&class_name, &self.previous) {
                self.error("A class can't inherit from itself.");
            }

            // The superclass lives in a hidden local so methods can capture it as 'super'.
            self.begin_scope();
            self.add_local(Token::synthetic("super"));
            self.define_variable(0);

            self.named_variable(class_name, false);
            self.emit_op(OpCode::Inherit);
            if let Some(class) = self.classes.last_mut() {
                class.has_superclass = true;
            }
        }

        // Keep the class on the stack while its methods are bound.
        self.named_variable(class_name, false);
        self.consume(TokenType::LeftBrace, "Expect '{' before class body.");
        while !self.check(TokenType::RightBrace) && !self.check(TokenType::Eof) {
            self.method();
        }
        self.consume(TokenType::RightBrace, "Expect '}' after class body.");
        self.emit_op(OpCode::Pop);

        if self.classes.pop().is_some_and(|class| class.has_superclass) {
            self.end_scope();
        }
    }

    fn method(&mut self) {
        self.consume(TokenType::Identifier, "Expect method name.");
        let name = self.previous.value;
        let constant = self.identifier_constant(name);

        let function_type = if name == "init" { FunctionType::Initializer } else { FunctionType::Method };
        self.function(function_type);
        self.emit_op_operand(OpCode::Method, constant);
    }

    fn function_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        // A function may refer to itself, so it is initialized before its body compiles.
        self.mark_initialized();
        self.function(FunctionType::Function);
        self.define_variable(global);
    }

    fn function(&mut self, function_type: FunctionType) {
        let name = self.previous.value;
        self.compilers.push(Compiler::new(function_type, name));
        self.begin_scope();

        self.consume(TokenType::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenType::RightParen) {
            let mut arity = 0usize;
            loop {
                arity += 1;
                if arity > MAX_ARITY {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                self.current_compiler().function.arity = arity.min(MAX_ARITY) as u8;

                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.");
        self.consume(TokenType::LeftBrace, "Expect '{' before function body.");
        self.nested(Self::block);

        let (function, upvalues) = self.end_compiler();
        let constant = self.make_constant(Value::Object(Object::Function(Rc::new(function))));
        self.emit_op_operand(OpCode::Closure, constant);

        for upvalue in upvalues {
            self.emit_byte(upvalue.is_local as u8);
            self.emit_byte(upvalue.index);
        }
    }

    fn variable_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");

        if self.match_token(TokenType::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration.");

        self.define_variable(global);
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenType::Identifier, message);

        self.declare_variable();
        if self.current_compiler().scope_depth > 0 {
            return 0;
        }

        let name = self.previous.value;
        self.identifier_constant(name)
    }

    fn declare_variable(&mut self) {
        if self.current_compiler().scope_depth == 0 {
            // globals are late bound
            return;
        }

        let name = self.previous;
        let compiler = self.current_compiler();
        let duplicate = compiler
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth == -1 || local.depth >= compiler.scope_depth)
            .any(|local| Self::identifier_equal(&name, &local.name));
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }

        self.add_local(name);
    }

    fn add_local(&mut self, name: Token<'a>) {
        if self.current_compiler().locals.len() >= U8_COUNT {
            self.error("Too many local variables in function.");
            return;
        }

        self.current_compiler().locals.push(Local { name, depth: -1, is_captured: false });
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        let value = make_string_value(self.intern_strings, name);
        self.make_constant(value)
    }

    fn define_variable(&mut self, global: u8) {
        if self.current_compiler().scope_depth > 0 {
            self.mark_initialized();
            return;
        }

        self.emit_op_operand(OpCode::DefineGlobal, global);
    }

    fn mark_initialized(&mut self) {
        let compiler = self.current_compiler();
        if compiler.scope_depth == 0 {
            return;
        }
        let depth = compiler.scope_depth;
        if let Some(local) = compiler.locals.last_mut() {
            local.depth = depth;
        }
    }

    fn variable(&mut self, can_assign: bool) {
        self.named_variable(self.previous, can_assign)
    }

    fn named_variable(&mut self, name: Token<'a>, can_assign: bool) {
        let compiler_index = self.compilers.len() - 1;
        let (get_op, set_op, operand) = if let Some(slot) = self.resolve_local(compiler_index, &name) {
            (OpCode::GetLocal, OpCode::SetLocal, slot)
        } else if let Some(index) = self.resolve_upvalue(compiler_index, &name) {
            (OpCode::GetUpvalue, OpCode::SetUpvalue, index)
        } else {
            let constant = self.identifier_constant(name.value);
            (OpCode::GetGlobal, OpCode::SetGlobal, constant)
        };

        if can_assign && self.match_token(TokenType::Equal) {
            self.expression();
            self.emit_op_operand(set_op, operand);
        } else {
            self.emit_op_operand(get_op, operand);
        }
    }

    fn resolve_local(&mut self, compiler_index: usize, name: &Token) -> Option<u8> {
        let found = self.compilers[compiler_index]
            .locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| Self::identifier_equal(name, &local.name))
            .map(|(slot, local)| (slot, local.depth));

        match found {
            Some((slot, depth)) => {
                if depth == -1 {
                    self.error("Can't read local variable in its own initializer.");
                }
                Some(slot as u8)
            }
            None => None,
        }
    }

    fn resolve_upvalue(&mut self, compiler_index: usize, name: &Token) -> Option<u8> {
        if compiler_index == 0 {
            return None;
        }

        let enclosing = compiler_index - 1;
        if let Some(local) = self.resolve_local(enclosing, name) {
            self.compilers[enclosing].locals[local as usize].is_captured = true;
            return Some(self.add_upvalue(compiler_index, local, true));
        }

        if let Some(upvalue) = self.resolve_upvalue(enclosing, name) {
            return Some(self.add_upvalue(compiler_index, upvalue, false));
        }

        None
    }

    fn add_upvalue(&mut self, compiler_index: usize, index: u8, is_local: bool) -> u8 {
        let upvalue = Upvalue { index, is_local };
        let compiler = &mut self.compilers[compiler_index];
        if let Some(existing) = compiler.upvalues.iter().position(|candidate| *candidate == upvalue) {
            return existing as u8;
        }

        if compiler.upvalues.len() >= U8_COUNT {
            self.error("Too many closure variables in function.");
            return 0;
        }

        compiler.upvalues.push(upvalue);
        compiler.function.upvalue_count = compiler.upvalues.len();
        (compiler.upvalues.len() - 1) as u8
    }

    fn identifier_equal(left: &Token, right: &Token) -> bool {
        left.value == right.value
    }

    /// Runs `parse` one nesting level deeper. Past the limit the current token is reported and skipped.
    fn nested(&mut self, parse: impl FnOnce(&mut Self)) {
        if self.depth >= MAX_NESTING_DEPTH {
            self.error_at_current("Too much nesting.");
            self.advance();
            return;
        }

        self.depth += 1;
        parse(self);
        self.depth -= 1;
    }

    fn statement(&mut self) {
        self.nested(Self::statement_body);
    }

    fn statement_body(&mut self) {
        if self.match_token(TokenType::Print) {
            self.print_statement();
        } else if self.match_token(TokenType::If) {
            self.if_statement();
        } else if self.match_token(TokenType::Return) {
            self.return_statement();
        } else if self.match_token(TokenType::While) {
            self.while_statement();
        } else if self.match_token(TokenType::For) {
            self.for_statement();
        } else if self.match_token(TokenType::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn block(&mut self) {
        while !self.check(TokenType::RightBrace) && !self.check(TokenType::Eof) {
            self.declaration();
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block.");
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenType::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn return_statement(&mut self) {
        if self.current_compiler().function_type == FunctionType::Script {
            self.error("Can't return from top-level code.");
        }

        if self.match_token(TokenType::Semicolon) {
            self.emit_return();
        } else {
            if self.current_compiler().function_type == FunctionType::Initializer {
                self.error("Can't return a value from an initializer.");
            }

            self.expression();
            self.consume(TokenType::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::Return);
        }
    }

    fn if_statement(&mut self) {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop); // the condition
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.match_token(TokenType::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.current_chunk().len();

        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);

        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.");
        let mut loop_variable = None;
        if self.match_token(TokenType::Semicolon) {
            // no initializer
        } else if self.match_token(TokenType::Var) {
            self.variable_declaration();
            let compiler = self.current_compiler();
            loop_variable = compiler.locals.last().map(|local| (local.name, compiler.locals.len() - 1));
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.current_chunk().len();
        let mut exit_jump = None;
        if !self.match_token(TokenType::Semicolon) {
            self.expression();
            self.consume(TokenType::Semicolon, "Expect ';' after loop condition.");

            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.match_token(TokenType::RightParen) {
            // The increment runs after the body, so jump over it on the way in.
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.current_chunk().len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenType::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        match loop_variable {
            Some((name, slot)) => {
                // Each iteration gets a fresh copy of the loop variable for closures to capture.
                self.begin_scope();
                self.emit_op_operand(OpCode::GetLocal, slot as u8);
                self.add_local(name);
                self.mark_initialized();
                let inner = self.current_compiler().locals.len() - 1;

                self.statement();

                self.emit_op_operand(OpCode::GetLocal, inner as u8);
                self.emit_op_operand(OpCode::SetLocal, slot as u8);
                self.emit_op(OpCode::Pop);
                self.end_scope();
            }
            None => self.statement(),
        }
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::Pop);
        }
        self.end_scope();
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenType::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.nested(|parser| parser.parse_operators(precedence));
    }

    fn parse_operators(&mut self, precedence: Precedence) {
        self.advance();

        let can_assign = precedence <= Precedence::Assignment;
        match get_rule(self.previous.token_type).prefix {
            Some(prefix) => self.apply(prefix, can_assign),
            None => {
                self.error("Expect expression.");
                return;
            }
        }

        while precedence <= get_rule(self.current.token_type).precedence {
            self.advance();
            if let Some(infix) = get_rule(self.previous.token_type).infix {
                self.apply(infix, can_assign);
            }
        }

        if can_assign && self.match_token(TokenType::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn apply(&mut self, parse_fn: ParseFn, can_assign: bool) {
        match parse_fn {
            ParseFn::Grouping => self.grouping(),
            ParseFn::Call => self.call(),
            ParseFn::Dot => self.dot(can_assign),
            ParseFn::Unary => self.unary(),
            ParseFn::Binary => self.binary(),
            ParseFn::Number => self.number(),
            ParseFn::String => self.string(),
            ParseFn::Literal => self.literal(),
            ParseFn::Variable => self.variable(can_assign),
            ParseFn::This => self.this(),
            ParseFn::Super => self.super_(),
            ParseFn::And => self.and(),
            ParseFn::Or => self.or(),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after expression.");
    }

    fn number(&mut self) {
        let value = self.previous.value.parse::<f64>().unwrap_or(0.0);
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self) {
        let lexeme = self.previous.value;
        // trim the surrounding quotation marks
        let value = make_string_value(self.intern_strings, &lexeme[1..lexeme.len() - 1]);
        self.emit_constant(value);
    }

    fn literal(&mut self) {
        match self.previous.token_type {
            TokenType::False => self.emit_op(OpCode::False),
            TokenType::True => self.emit_op(OpCode::True),
            TokenType::Nil => self.emit_op(OpCode::Nil),
            operator => unreachable!("Unexpected literal: {}", operator),
        }
    }

    fn unary(&mut self) {
        let operator_type = self.previous.token_type;

        self.parse_precedence(Precedence::Unary);

        match operator_type {
            TokenType::Bang => self.emit_op(OpCode::Not),
            TokenType::Minus => self.emit_op(OpCode::Negate),
            operator => unreachable!("Unexpected unary operator: {}", operator),
        }
    }

    fn binary(&mut self) {
        let operator_type = self.previous.token_type;
        let rule = get_rule(operator_type);
        self.parse_precedence(rule.precedence.next());

        match operator_type {
            TokenType::BangEqual => self.emit_bytes(OpCode::Equal.to_byte(), OpCode::Not.to_byte()),
            TokenType::EqualEqual => self.emit_op(OpCode::Equal),
            TokenType::Greater => self.emit_op(OpCode::Greater),
            TokenType::GreaterEqual => self.emit_bytes(OpCode::Less.to_byte(), OpCode::Not.to_byte()),
            TokenType::Less => self.emit_op(OpCode::Less),
            TokenType::LessEqual => self.emit_bytes(OpCode::Greater.to_byte(), OpCode::Not.to_byte()),
            TokenType::Plus => self.emit_op(OpCode::Add),
            TokenType::Minus => self.emit_op(OpCode::Subtract),
            TokenType::Star => self.emit_op(OpCode::Multiply),
            TokenType::Slash => self.emit_op(OpCode::Divide),
            operator => unreachable!("Unexpected binary operator: {}", operator),
        }
    }

    fn and(&mut self) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or(&mut self) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);

        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);

        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self) {
        let argument_count = self.argument_list();
        self.emit_op_operand(OpCode::Call, argument_count);
    }

    fn argument_list(&mut self) -> u8 {
        let mut argument_count = 0usize;
        if !self.check(TokenType::RightParen) {
            loop {
                self.expression();
                if argument_count == MAX_ARITY {
                    self.error("Can't have more than 255 arguments.");
                }
                argument_count += 1;
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after arguments.");
        argument_count.min(MAX_ARITY) as u8
    }

    fn dot(&mut self, can_assign: bool) {
        self.consume(TokenType::Identifier, "Expect property name after '.'.");
        let name = self.previous.value;
        let name_constant = self.identifier_constant(name);

        if can_assign && self.match_token(TokenType::Equal) {
            self.expression();
            self.emit_op_operand(OpCode::SetProperty, name_constant);
        } else if self.match_token(TokenType::LeftParen) {
            let argument_count = self.argument_list();
            self.emit_op_operand(OpCode::Invoke, name_constant);
            self.emit_byte(argument_count);
        } else {
            self.emit_op_operand(OpCode::GetProperty, name_constant);
        }
    }

    fn this(&mut self) {
        if self.classes.is_empty() {
            self.error("Can't use 'this' outside of a class.");
            return;
        }

        self.variable(false);
    }

    fn super_(&mut self) {
        match self.classes.last().map(|class| class.has_superclass) {
            None => self.error("Can't use 'super' outside of a class."),
            Some(false) => self.error("Can't use 'super' in a class with no superclass."),
            Some(true) => {}
        }

        self.consume(TokenType::Dot, "Expect '.' after 'super'.");
        self.consume(TokenType::Identifier, "Expect superclass method name.");
        let name = self.previous.value;
        let name_constant = self.identifier_constant(name);

        self.named_variable(Token::synthetic("this"), false);
        if self.match_token(TokenType::LeftParen) {
            let argument_count = self.argument_list();
            self.named_variable(Token::synthetic("super"), false);
            self.emit_op_operand(OpCode::SuperInvoke, name_constant);
            self.emit_byte(argument_count);
        } else {
            self.named_variable(Token::synthetic("super"), false);
            self.emit_op_operand(OpCode::GetSuper, name_constant);
        }
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;

        while self.current.token_type != TokenType::Eof {
            if self.previous.token_type == TokenType::Semicolon {
                return;
            }

            match self.current.token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => (),
            }

            self.advance();
        }
    }

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    fn error_at(&mut self, token: Token, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;

        let location = match token.token_type {
            TokenType::Eof => " at end".to_string(),
            TokenType::Error => String::new(),
            _ => format!(" at '{}'", token.value),
        };

        self.errors.push(CompileError { line: token.line, location, message: message.to_string() });
        self.has_error = true;
    }
}

#[cfg(feature = "debug_print_code")]
mod debug_feature {
    use crate::{debug, objects::object_function::ObjectFunction};

    use super::Parser;

    pub fn disassemble_chunk(parser: &Parser, function: &ObjectFunction) {
        if !parser.has_error {
            log::debug!("\n{}", debug::disassemble_chunk(function.chunk(), &function.to_string()));
        }
    }
}

#[cfg(not(feature = "debug_print_code"))]
mod debug_feature {
    use crate::objects::object_function::ObjectFunction;

    use super::Parser;

    pub fn disassemble_chunk(_parser: &Parser, _function: &ObjectFunction) {}
}
