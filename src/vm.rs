use std::{
    cell::RefCell,
    io::{self, Write},
    rc::Rc,
};

use log::{debug, trace};

use crate::{
    call_frame::CallFrame,
    chunk::OpCode,
    compiler::compile,
    constants::{MAX_FRAMES_SIZE, MAX_STACK_SIZE},
    error::RuntimeError,
    objects::{
        object::{NativeObject, Object},
        object_bound_method::ObjectBoundMethod,
        object_class::ObjectClass,
        object_closure::ObjectClosure,
        object_instance::ObjectInstance,
        object_native_function::ObjectNativeFunction,
        object_string::{intern, ObjectString},
        object_upvalue::{ObjectUpvalue, UpvalueLocation},
    },
    std_mod::time::ClockTime,
    table::Table,
    value::{make_string_value, Value},
};

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum InterpretResult {
    InterpretOk,
    InterpretCompileError,
    InterpretRuntimeError,
}

pub struct VM {
    frames: Vec<CallFrame>,
    stack: Vec<Value>,
    globals: Table,
    intern_strings: Table<Rc<ObjectString>>,
    /// Every upvalue ever captured, addressed by index from closures.
    upvalues: Vec<ObjectUpvalue>,
    /// Indices of the still-open upvalues, sorted by the stack slot they point at.
    open_upvalues: Vec<usize>,
    init_string: Rc<ObjectString>,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Default for VM {
    fn default() -> Self {
        VM::new()
    }
}

impl VM {
    pub fn new() -> VM {
        VM::with_output(io::stdout(), io::stderr())
    }

    /// A VM whose `print` output goes to `out` and whose diagnostics go to `err`.
    pub fn with_output(out: impl Write + 'static, err: impl Write + 'static) -> VM {
        let mut intern_strings = Table::new();
        let init_string = intern(&mut intern_strings, "init");

        let mut vm = VM {
            frames: Vec::with_capacity(MAX_FRAMES_SIZE),
            stack: Vec::with_capacity(MAX_STACK_SIZE),
            globals: Table::new(),
            intern_strings,
            upvalues: Vec::new(),
            open_upvalues: Vec::new(),
            init_string,
            out: Box::new(out),
            err: Box::new(err),
        };
        vm.setup_standards();
        vm
    }

    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        let function = match compile(source, &mut self.intern_strings) {
            Ok(function) => function,
            Err(errors) => {
                for error in &errors {
                    let _ = writeln!(self.err, "{}", error);
                }
                let _ = self.err.flush();
                debug!("compilation failed with {} error(s)", errors.len());
                return InterpretResult::InterpretCompileError;
            }
        };

        let closure = Rc::new(ObjectClosure::new(function, Vec::new()));
        self.push(Value::Object(Object::Closure(closure.clone())));
        let result = self.call(closure, 0).and_then(|_| self.run());
        let _ = self.out.flush();

        match result {
            Ok(()) => {
                debug!("script finished, {} global(s) defined", self.globals.len());
                InterpretResult::InterpretOk
            }
            Err(error) => {
                debug!("script aborted: {}", error);
                self.report_runtime_error(&error);
                InterpretResult::InterpretRuntimeError
            }
        }
    }

    /// Registers a host function as a global.
    pub fn define_native(&mut self, name: &str, arity: u8, native_object: impl NativeObject + 'static) {
        let name = intern(&mut self.intern_strings, name);
        let native = ObjectNativeFunction::new(name.as_str(), arity, native_object);
        self.globals.insert(name.content.clone(), Value::Object(Object::NativeFunction(Rc::new(native))));
        trace!("registered native function {}/{}", name.as_str(), arity);
    }

    fn setup_standards(&mut self) {
        self.define_native("clock", 0, ClockTime::new());
    }

    fn current_frame(&mut self) -> &mut CallFrame {
        let current_frame_index = self.frames.len() - 1;
        &mut self.frames[current_frame_index]
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        match self.stack.pop() {
            Some(value) => value,
            None => unreachable!("Stack underflow"),
        }
    }

    fn peek(&self, distance: usize) -> &Value {
        &self.stack[self.stack.len() - 1 - distance]
    }

    /// Closes every open upvalue first so closures that escaped keep their values.
    fn reset_stack(&mut self) {
        self.close_upvalues(0);
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();
    }

    fn read_byte(&mut self) -> u8 {
        let frame = self.current_frame();
        let byte = frame.closure.function.chunk.code[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_short(&mut self) -> u16 {
        let high = self.read_byte() as u16;
        let low = self.read_byte() as u16;
        (high << 8) | low
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte() as usize;
        self.current_frame().chunk().constants[index].clone()
    }

    fn read_string(&mut self) -> Rc<ObjectString> {
        match self.read_constant() {
            Value::Object(Object::String(string)) => string,
            other => unreachable!("Expected a string constant, found {}", other),
        }
    }

    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            debug_feature::trace_instruction(self);

            let byte = self.read_byte();
            let instruction = match OpCode::from_byte(byte) {
                Some(instruction) => instruction,
                None => unreachable!("Unknown opcode {}", byte),
            };

            match instruction {
                OpCode::Constant => {
                    let constant = self.read_constant();
                    self.push(constant);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.current_frame().slots;
                    let value = self.stack[base + slot].clone();
                    self.push(value);
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.current_frame().slots;
                    let value = self.peek(0).clone();
                    self.stack[base + slot] = value;
                }
                OpCode::GetGlobal => {
                    let name = self.read_string();
                    match self.globals.find(name.as_str()) {
                        Some(value) => self.push(value),
                        None => return Err(RuntimeError::UndefinedVariable(name.as_str().to_string())),
                    }
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string();
                    let value = self.pop();
                    self.globals.insert(name.content.clone(), value);
                }
                OpCode::SetGlobal => {
                    let name = self.read_string();
                    // assignment never creates a global
                    if !self.globals.contains(name.as_str()) {
                        return Err(RuntimeError::UndefinedVariable(name.as_str().to_string()));
                    }
                    let value = self.peek(0).clone();
                    self.globals.insert(name.content.clone(), value);
                }
                OpCode::GetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let index = self.current_frame().closure.upvalues[slot];
                    let value = self.read_upvalue(index);
                    self.push(value);
                }
                OpCode::SetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let index = self.current_frame().closure.upvalues[slot];
                    let value = self.peek(0).clone();
                    self.write_upvalue(index, value);
                }
                OpCode::GetProperty => {
                    let instance = match self.peek(0) {
                        Value::Object(Object::Instance(instance)) => instance.clone(),
                        _ => return Err(RuntimeError::OnlyInstancesHaveProperties),
                    };
                    let name = self.read_string();

                    let field = instance.borrow().fields.find(name.as_str());
                    if let Some(value) = field {
                        self.pop();
                        self.push(value);
                        continue;
                    }

                    let class = instance.borrow().class.clone();
                    self.bind_method(&class, &name)?;
                }
                OpCode::SetProperty => {
                    let instance = match self.peek(1) {
                        Value::Object(Object::Instance(instance)) => instance.clone(),
                        _ => return Err(RuntimeError::OnlyInstancesHaveFields),
                    };
                    let name = self.read_string();

                    let value = self.pop();
                    instance.borrow_mut().fields.insert(name.content.clone(), value.clone());
                    self.pop();
                    self.push(value);
                }
                OpCode::GetSuper => {
                    let name = self.read_string();
                    let superclass = self.pop_class();
                    self.bind_method(&superclass, &name)?;
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                OpCode::Greater => self.binary_op(|a, b| Value::Bool(a > b))?,
                OpCode::Less => self.binary_op(|a, b| Value::Bool(a < b))?,
                OpCode::Add => self.add()?,
                OpCode::Subtract => self.binary_op(|a, b| Value::Number(a - b))?,
                OpCode::Multiply => self.binary_op(|a, b| Value::Number(a * b))?,
                OpCode::Divide => self.binary_op(|a, b| Value::Number(a / b))?,
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()));
                }
                OpCode::Negate => match self.peek(0).as_number() {
                    Some(number) => {
                        self.pop();
                        self.push(Value::Number(-number));
                    }
                    None => return Err(RuntimeError::OperandMustBeNumber),
                },
                OpCode::Print => {
                    let value = self.pop();
                    let _ = writeln!(self.out, "{}", value);
                }
                OpCode::Jump => {
                    let offset = self.read_short() as usize;
                    self.current_frame().ip += offset;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_short() as usize;
                    if self.peek(0).is_falsey() {
                        self.current_frame().ip += offset;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_short() as usize;
                    self.current_frame().ip -= offset;
                }
                OpCode::Call => {
                    let argument_count = self.read_byte();
                    let callee = self.peek(argument_count as usize).clone();
                    self.call_value(callee, argument_count)?;
                }
                OpCode::Invoke => {
                    let method = self.read_string();
                    let argument_count = self.read_byte();
                    self.invoke(&method, argument_count)?;
                }
                OpCode::SuperInvoke => {
                    let method = self.read_string();
                    let argument_count = self.read_byte();
                    let superclass = self.pop_class();
                    self.invoke_from_class(&superclass, &method, argument_count)?;
                }
                OpCode::Closure => {
                    let function = match self.read_constant() {
                        Value::Object(Object::Function(function)) => function,
                        other => unreachable!("Expected a function constant, found {}", other),
                    };

                    let mut upvalues = Vec::with_capacity(function.upvalue_count);
                    for _ in 0..function.upvalue_count {
                        let is_local = self.read_byte() == 1;
                        let index = self.read_byte() as usize;
                        if is_local {
                            let slot = self.current_frame().slots + index;
                            upvalues.push(self.capture_upvalue(slot));
                        } else {
                            upvalues.push(self.current_frame().closure.upvalues[index]);
                        }
                    }

                    let closure = ObjectClosure::new(function, upvalues);
                    self.push(Value::Object(Object::Closure(Rc::new(closure))));
                }
                OpCode::CloseUpvalue => {
                    self.close_upvalues(self.stack.len() - 1);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    let frame = match self.frames.pop() {
                        Some(frame) => frame,
                        None => unreachable!("Return without a call frame"),
                    };
                    self.close_upvalues(frame.slots);
                    self.stack.truncate(frame.slots);

                    if self.frames.is_empty() {
                        return Ok(());
                    }
                    self.push(result);
                }
                OpCode::Class => {
                    let name = self.read_string();
                    let class = ObjectClass::new(name.content.clone());
                    self.push(Value::Object(Object::Class(Rc::new(RefCell::new(class)))));
                }
                OpCode::Inherit => {
                    let superclass = match self.peek(1) {
                        Value::Object(Object::Class(superclass)) => superclass.clone(),
                        _ => return Err(RuntimeError::SuperclassMustBeClass),
                    };
                    let subclass = self.pop_class();
                    let methods = superclass.borrow().methods.clone();
                    subclass.borrow_mut().methods.add_all(&methods);
                }
                OpCode::Method => {
                    let name = self.read_string();
                    self.define_method(&name);
                }
            }
        }
    }

    fn pop_class(&mut self) -> Rc<RefCell<ObjectClass>> {
        match self.pop() {
            Value::Object(Object::Class(class)) => class,
            other => unreachable!("Expected a class on the stack, found {}", other),
        }
    }

    fn binary_op(&mut self, op: impl Fn(f64, f64) -> Value) -> Result<(), RuntimeError> {
        match (self.peek(1).as_number(), self.peek(0).as_number()) {
            (Some(a), Some(b)) => {
                self.pop();
                self.pop();
                self.push(op(a, b));
                Ok(())
            }
            _ => Err(RuntimeError::OperandsMustBeNumbers),
        }
    }

    fn add(&mut self) -> Result<(), RuntimeError> {
        match (self.peek(1), self.peek(0)) {
            (Value::Number(_), Value::Number(_)) => self.binary_op(|a, b| Value::Number(a + b)),
            (Value::Object(Object::String(a)), Value::Object(Object::String(b))) => {
                let concatenated = format!("{}{}", a.as_str(), b.as_str());
                let value = make_string_value(&mut self.intern_strings, &concatenated);
                self.pop();
                self.pop();
                self.push(value);
                Ok(())
            }
            _ => Err(RuntimeError::OperandsMustBeNumbersOrStrings),
        }
    }

    fn call_value(&mut self, callee: Value, argument_count: u8) -> Result<(), RuntimeError> {
        let callee_slot = self.stack.len() - argument_count as usize - 1;
        match callee {
            Value::Object(Object::BoundMethod(bound)) => {
                self.stack[callee_slot] = bound.receiver.clone();
                self.call(bound.method.clone(), argument_count)
            }
            Value::Object(Object::Class(class)) => {
                let instance = ObjectInstance::new(class.clone());
                self.stack[callee_slot] = Value::Object(Object::Instance(Rc::new(RefCell::new(instance))));

                let initializer = class.borrow().find_method(self.init_string.as_str());
                match initializer {
                    Some(initializer) => self.call(initializer, argument_count),
                    None if argument_count != 0 => {
                        Err(RuntimeError::ArityMismatch { expected: 0, got: argument_count })
                    }
                    None => Ok(()),
                }
            }
            Value::Object(Object::Closure(closure)) => self.call(closure, argument_count),
            Value::Object(Object::NativeFunction(native)) => self.call_native(&native, argument_count),
            _ => Err(RuntimeError::NotCallable),
        }
    }

    fn call(&mut self, closure: Rc<ObjectClosure>, argument_count: u8) -> Result<(), RuntimeError> {
        let arity = closure.function.arity;
        if arity != argument_count {
            return Err(RuntimeError::ArityMismatch { expected: arity, got: argument_count });
        }

        if self.frames.len() >= MAX_FRAMES_SIZE {
            return Err(RuntimeError::StackOverflow);
        }

        let slots = self.stack.len() - argument_count as usize - 1;
        self.frames.push(CallFrame::new(closure, slots));
        Ok(())
    }

    fn call_native(&mut self, native: &ObjectNativeFunction, argument_count: u8) -> Result<(), RuntimeError> {
        if native.arity != argument_count {
            return Err(RuntimeError::ArityMismatch { expected: native.arity, got: argument_count });
        }

        let arguments_start = self.stack.len() - argument_count as usize;
        let result = native
            .invoke(&self.stack[arguments_start..])
            .map_err(|message| RuntimeError::Native { name: native.name.clone(), message })?;

        // drop the arguments and the callee itself
        self.stack.truncate(arguments_start - 1);
        self.push(result);
        Ok(())
    }

    fn invoke(&mut self, name: &ObjectString, argument_count: u8) -> Result<(), RuntimeError> {
        let instance = match self.peek(argument_count as usize) {
            Value::Object(Object::Instance(instance)) => instance.clone(),
            _ => return Err(RuntimeError::OnlyInstancesHaveMethods),
        };

        // a field holding a callable shadows a method of the same name
        let field = instance.borrow().fields.find(name.as_str());
        if let Some(value) = field {
            let callee_slot = self.stack.len() - argument_count as usize - 1;
            self.stack[callee_slot] = value.clone();
            return self.call_value(value, argument_count);
        }

        let class = instance.borrow().class.clone();
        self.invoke_from_class(&class, name, argument_count)
    }

    fn invoke_from_class(
        &mut self,
        class: &Rc<RefCell<ObjectClass>>,
        name: &ObjectString,
        argument_count: u8,
    ) -> Result<(), RuntimeError> {
        let method = class
            .borrow()
            .find_method(name.as_str())
            .ok_or_else(|| RuntimeError::UndefinedProperty(name.as_str().to_string()))?;
        self.call(method, argument_count)
    }

    /// Replaces the receiver on top of the stack with `name` bound to it.
    fn bind_method(&mut self, class: &Rc<RefCell<ObjectClass>>, name: &ObjectString) -> Result<(), RuntimeError> {
        let method = class
            .borrow()
            .find_method(name.as_str())
            .ok_or_else(|| RuntimeError::UndefinedProperty(name.as_str().to_string()))?;

        let receiver = self.pop();
        let bound = ObjectBoundMethod::new(receiver, method);
        self.push(Value::Object(Object::BoundMethod(Rc::new(bound))));
        Ok(())
    }

    fn define_method(&mut self, name: &ObjectString) {
        let method = match self.pop() {
            Value::Object(Object::Closure(closure)) => closure,
            other => unreachable!("Expected a method closure, found {}", other),
        };
        match self.peek(0) {
            Value::Object(Object::Class(class)) => {
                class.borrow_mut().methods.insert(name.content.clone(), method);
            }
            other => unreachable!("Expected a class below the method, found {}", other),
        }
    }

    fn read_upvalue(&self, index: usize) -> Value {
        match &self.upvalues[index].location {
            UpvalueLocation::Open(slot) => self.stack[*slot].clone(),
            UpvalueLocation::Closed(value) => value.clone(),
        }
    }

    fn write_upvalue(&mut self, index: usize, value: Value) {
        match &mut self.upvalues[index].location {
            UpvalueLocation::Open(slot) => self.stack[*slot] = value,
            UpvalueLocation::Closed(closed) => *closed = value,
        }
    }

    /// Returns the open upvalue for `slot`, creating it if no closure captured that slot yet.
    fn capture_upvalue(&mut self, slot: usize) -> usize {
        let mut insert_at = self.open_upvalues.len();
        for (position, &index) in self.open_upvalues.iter().enumerate().rev() {
            match self.upvalues[index].open_slot() {
                Some(open_slot) if open_slot == slot => return index,
                Some(open_slot) if open_slot < slot => break,
                _ => insert_at = position,
            }
        }

        let index = self.upvalues.len();
        self.upvalues.push(ObjectUpvalue::new(slot));
        self.open_upvalues.insert(insert_at, index);
        index
    }

    /// Closes every open upvalue pointing at `last` or above.
    fn close_upvalues(&mut self, last: usize) {
        while let Some(&index) = self.open_upvalues.last() {
            let slot = match self.upvalues[index].open_slot() {
                Some(slot) if slot >= last => slot,
                _ => break,
            };

            let value = self.stack[slot].clone();
            self.upvalues[index].close(value);
            self.open_upvalues.pop();
        }
    }

    fn report_runtime_error(&mut self, error: &RuntimeError) {
        let _ = writeln!(self.err, "{}", error);

        for frame in self.frames.iter().rev() {
            let function = &frame.closure.function;
            let _ = if function.name.is_empty() {
                writeln!(self.err, "[line {}] in script", frame.line())
            } else {
                writeln!(self.err, "[line {}] in {}()", frame.line(), function.name)
            };
        }
        let _ = self.err.flush();

        self.reset_stack();
    }
}

#[cfg(feature = "debug_trace_execution")]
mod debug_feature {
    use super::*;
    use crate::debug;

    pub fn trace_instruction(vm: &VM) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }

        let stack: String = vm.stack.iter().map(|slot| format!("[ {} ]", slot)).collect();
        if let Some(frame) = vm.frames.last() {
            let (instruction, _) = debug::disassemble_instruction(frame.chunk(), frame.ip);
            trace!("          {}\n{}", stack, instruction);
        }
    }
}

#[cfg(not(feature = "debug_trace_execution"))]
mod debug_feature {
    pub fn trace_instruction(_vm: &super::VM) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    fn captured_vm() -> (VM, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        (VM::with_output(out.clone(), err.clone()), out, err)
    }

    fn run(source: &str) -> (InterpretResult, String, String) {
        let (mut vm, out, err) = captured_vm();
        let result = vm.interpret(source);
        (result, out.contents(), err.contents())
    }

    #[test]
    fn test_comparison_expression() {
        let (mut vm, _, _) = captured_vm();
        assert!(vm.interpret(r"!(5 - 4 > 3 * 2 == !nil);") == InterpretResult::InterpretOk);
    }

    #[test]
    fn test_string_concatenate() {
        let (result, out, _) = run(r#"print "st" + "ri" + "ng";"#);
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "string\n");
    }

    #[test]
    fn test_print_statement() {
        let (result, out, _) = run("print 1 + 2; print 3 * 4; print 1 / 4; print nil; print !true;");
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "3\n12\n0.25\nnil\nfalse\n");
    }

    #[test]
    fn test_print_global_var() {
        let (result, out, _) = run(
            r#"var beverage = "cafe au lait";
               var breakfast = "beignets with " + beverage;
               print breakfast;"#,
        );
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "beignets with cafe au lait\n");
    }

    #[test]
    fn test_print_local_var() {
        let (result, out, _) = run(r#"{ var a = "hello world!"; a = "111"; print a; }"#);
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "111\n");
    }

    #[test]
    fn test_if_else_statement() {
        let (result, out, _) = run(
            r#"var a = 0;
               if (a) { print "zero is truthy"; } else { print "unreachable"; }
               if (nil) print "unreachable"; else print "nil is falsey";"#,
        );
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "zero is truthy\nnil is falsey\n");
    }

    #[test]
    fn test_logical_operators() {
        let (result, out, _) = run(
            r#"print nil or "default";
               print 1 and 2;
               print false and undefined;
               print "left" or undefined;"#,
        );
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "default\n2\nfalse\nleft\n");
    }

    #[test]
    fn test_while_and_for_statement() {
        let (result, out, _) = run(
            r#"var i = 0;
               while (i < 3) { print i; i = i + 1; }
               for (var j = 10; j > 7; j = j - 1) print j;"#,
        );
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "0\n1\n2\n10\n9\n8\n");
    }

    #[test]
    fn test_function_call() {
        let (result, out, _) = run(
            r#"fun sum(a, b, c) { return a + b + c; }
               print sum(5, 6, 7);
               print sum;"#,
        );
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "18\n<fn sum>\n");
    }

    #[test]
    fn test_native_function_call() {
        let (result, out, _) = run("var t = clock(); print t > 0; print clock;");
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "true\n<native fn>\n");
    }

    #[test]
    fn test_native_arity_is_checked() {
        let (result, _, err) = run("clock(1);");
        assert!(result == InterpretResult::InterpretRuntimeError);
        assert!(err.starts_with("Expected 0 arguments but got 1."));
    }

    #[test]
    fn test_fib_function() {
        let (result, out, _) = run(
            r#"fun fib(n) {
                 if (n < 2) return n;
                 return fib(n - 2) + fib(n - 1);
               }
               print fib(20);"#,
        );
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "6765\n");
    }

    #[test]
    fn test_closure() {
        let (result, out, _) = run(
            r#"fun outer() {
                 var x = "outside";
                 fun inner() { print x; }
                 return inner;
               }
               var closure = outer();
               closure();"#,
        );
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "outside\n");
    }

    #[test]
    fn test_closures_share_captured_variable() {
        let (result, out, _) = run(
            r#"var get;
               var set;
               fun make() {
                 var value = 1;
                 fun g() { return value; }
                 fun s(v) { value = v; }
                 get = g;
                 set = s;
               }
               make();
               set(42);
               print get();"#,
        );
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "42\n");
    }

    #[test]
    fn test_open_upvalue_sees_later_writes() {
        let (result, out, _) = run(
            r#"{
                 var a = 1;
                 fun f() { return a; }
                 a = 2;
                 print f();
               }"#,
        );
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "2\n");
    }

    #[test]
    fn test_class_init_and_methods() {
        let (result, out, _) = run(
            r#"class Point {
                 init(x, y) { this.x = x; this.y = y; }
                 sum() { return this.x + this.y; }
               }
               var p = Point(1, 2);
               print p.sum();
               print p;
               print Point;
               var m = p.sum;
               p.x = 10;
               print m();"#,
        );
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "3\nPoint instance\nPoint\n12\n");
    }

    #[test]
    fn test_field_shadows_method_on_invoke() {
        let (result, out, _) = run(
            r#"class A { f() { return "method"; } }
               fun g() { return "field"; }
               var a = A();
               a.f = g;
               print a.f();"#,
        );
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "field\n");
    }

    #[test]
    fn test_inheritance_and_super() {
        let (result, out, _) = run(
            r#"class A {
                 method() { return "A method"; }
                 name() { return "A"; }
               }
               class B < A {
                 method() { return "B " + super.method(); }
                 bound() { var m = super.name; return m(); }
               }
               var b = B();
               print b.method();
               print b.name();
               print b.bound();"#,
        );
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "B A method\nA\nA\n");
    }

    #[test]
    fn test_initializer_returns_instance() {
        let (result, out, _) = run(
            r#"class A {
                 init() { this.v = 1; return; this.v = 2; }
               }
               var a = A();
               print a.v;
               print a.init();"#,
        );
        assert!(result == InterpretResult::InterpretOk);
        assert_eq!(out, "1\nA instance\n");
    }

    #[test]
    fn test_runtime_error_trace() {
        let (result, _, err) = run("fun a() { b(); }\nfun b() {\n  nil + 1;\n}\na();");
        assert!(result == InterpretResult::InterpretRuntimeError);
        assert_eq!(
            err,
            "Operands must be two numbers or two strings.\n[line 3] in b()\n[line 1] in a()\n[line 5] in script\n"
        );
    }

    #[test]
    fn test_runtime_error_resets_state() {
        let (mut vm, out, _) = captured_vm();
        assert!(vm.interpret("var x = 1; fun f() { return -\"a\"; } f();") == InterpretResult::InterpretRuntimeError);
        assert!(vm.stack.is_empty());
        assert!(vm.frames.is_empty());
        assert!(vm.open_upvalues.is_empty());

        // globals survive for the next line
        assert!(vm.interpret("print x;") == InterpretResult::InterpretOk);
        assert_eq!(out.contents(), "1\n");
    }

    #[test]
    fn test_runtime_error_closes_escaped_upvalues() {
        let (mut vm, out, _) = captured_vm();
        let source = "var g; fun f() { var x = 1; fun h() { return x; } g = h; nil + 1; } f();";
        assert!(vm.interpret(source) == InterpretResult::InterpretRuntimeError);
        assert!(vm.upvalues.iter().all(|upvalue| upvalue.open_slot().is_none()));

        assert!(vm.interpret("print g();") == InterpretResult::InterpretOk);
        assert!(vm.interpret("{ var a = \"unrelated\"; var b = \"other\"; print g(); }") == InterpretResult::InterpretOk);
        assert_eq!(out.contents(), "1\n1\n");
    }

    #[test]
    fn test_stack_overflow() {
        let (result, _, err) = run("fun f() { f(); } f();");
        assert!(result == InterpretResult::InterpretRuntimeError);
        assert!(err.starts_with("Stack overflow.\n"));
    }

    #[test]
    fn test_superclass_must_be_class() {
        let (result, _, err) = run("var A = 1; class B < A {}");
        assert!(result == InterpretResult::InterpretRuntimeError);
        assert!(err.starts_with("Superclass must be a class."));
    }

    #[test]
    fn test_property_errors() {
        let (_, _, err) = run("var x = 1; print x.y;");
        assert!(err.starts_with("Only instances have properties."));
        let (_, _, err) = run("var x = 1; x.y = 2;");
        assert!(err.starts_with("Only instances have fields."));
        let (_, _, err) = run("\"str\".len();");
        assert!(err.starts_with("Only instances have methods."));
        let (_, _, err) = run("class A {} A().missing();");
        assert!(err.starts_with("Undefined property 'missing'."));
    }

    #[test]
    fn test_compile_error_reported() {
        let (result, out, err) = run("print 1 +;");
        assert!(result == InterpretResult::InterpretCompileError);
        assert!(out.is_empty());
        assert_eq!(err, "[line 1] Error at ';': Expect expression.\n");
    }

    #[test]
    fn test_concatenated_strings_are_interned() {
        let (mut vm, _, _) = captured_vm();
        assert!(vm.interpret(r#"var a = "ab"; var b = "a" + "b";"#) == InterpretResult::InterpretOk);
        match (vm.globals.find("a"), vm.globals.find("b")) {
            (Some(Value::Object(Object::String(a))), Some(Value::Object(Object::String(b)))) => {
                assert!(Rc::ptr_eq(&a, &b));
            }
            other => panic!("expected two strings, got {:?}", other),
        }
    }

    #[test]
    fn test_upvalue_arena_reuses_open_slot() {
        let (mut vm, out, _) = captured_vm();
        let source = r#"
            fun outer() {
              var x = 0;
              fun a() { x = x + 1; return x; }
              fun b() { x = x + 10; return x; }
              a();
              return b;
            }
            print outer()();"#;
        assert!(vm.interpret(source) == InterpretResult::InterpretOk);
        assert_eq!(out.contents(), "11\n");
        assert_eq!(vm.upvalues.len(), 1);
        assert!(vm.open_upvalues.is_empty());
    }
}
