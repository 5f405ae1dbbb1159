use std::{fmt, rc::Rc};

use crate::{
    objects::{object::Object, object_string::{intern, ObjectString}},
    table::Table,
};

#[derive(Debug, Clone, Default)]
pub enum Value {
    Bool(bool),
    #[default]
    Nil,
    Number(f64),
    Object(Object),
}

impl Value {
    /// `nil` and `false` are falsey; every other value is truthy.
    #[inline(always)]
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    #[inline(always)]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

pub fn make_string_value(intern_strings: &mut Table<Rc<ObjectString>>, str_value: &str) -> Value {
    Value::Object(Object::String(intern(intern_strings, str_value)))
}

fn format_number(number: f64) -> String {
    if number.is_nan() {
        "nan".to_string()
    } else if number.is_infinite() {
        if number > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else if number != 0.0 && !(1e-7..1e21).contains(&number.abs()) {
        format!("{:e}", number)
    } else {
        // f64's Display prints integral values without a fractional part
        // and everything else with the shortest round-tripping digits.
        format!("{}", number)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(number) => write!(f, "{}", format_number(*number)),
            Value::Bool(boolean) => write!(f, "{}", boolean),
            Value::Nil => write!(f, "nil"),
            Value::Object(object) => write!(f, "{}", object),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{object_function::ObjectFunction, object_string::ObjectString};

    #[test]
    fn test_display_primitives() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-0.5).to_string(), "-0.5");
        assert_eq!(Value::Number(2.25).to_string(), "2.25");
        assert_eq!(Value::Number(1e20).to_string(), "100000000000000000000");
        assert_eq!(Value::Number(1e21).to_string(), "1e21");
        assert_eq!(Value::Number(-1.5e300).to_string(), "-1.5e300");
        assert_eq!(Value::Number(2.5e-8).to_string(), "2.5e-8");
        assert_eq!(Value::Number(0.0).to_string(), "0");
        assert_eq!(Value::Number(f64::NAN).to_string(), "nan");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Nil.to_string(), "nil");
    }

    #[test]
    fn test_display_functions() {
        let script = Value::Object(Object::Function(Rc::new(ObjectFunction::new(""))));
        let named = Value::Object(Object::Function(Rc::new(ObjectFunction::new("add"))));
        assert_eq!(script.to_string(), "<script>");
        assert_eq!(named.to_string(), "<fn add>");
    }

    #[test]
    fn test_falsey() {
        assert!(Value::Nil.is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(!Value::Bool(true).is_falsey());
        assert!(!Value::Number(0.0).is_falsey());
        assert!(!Value::Object(Object::String(Rc::new(ObjectString::new("")))).is_falsey());
    }

    #[test]
    fn test_equality() {
        let a = Value::Object(Object::String(Rc::new(ObjectString::new("abc"))));
        let b = Value::Object(Object::String(Rc::new(ObjectString::new("abc"))));
        assert_eq!(a, b);
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));

        let f = Rc::new(ObjectFunction::new("f"));
        let g = Rc::new(ObjectFunction::new("f"));
        assert_eq!(Value::Object(Object::Function(f.clone())), Value::Object(Object::Function(f.clone())));
        assert_ne!(Value::Object(Object::Function(f)), Value::Object(Object::Function(g)));
    }
}
