use std::{fmt, str::FromStr};

use crate::error::TranslateError;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Segment {
    Constant,
    Local,
    Static,
    Argument,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn name(&self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

impl FromStr for Segment {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "constant" => Segment::Constant,
            "local" => Segment::Local,
            "static" => Segment::Static,
            "argument" => Segment::Argument,
            "this" => Segment::This,
            "that" => Segment::That,
            "pointer" => Segment::Pointer,
            "temp" => Segment::Temp,
            _ => return Err(TranslateError::InvalidSegment(s.to_string())),
        })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stack arithmetic understood by the generator.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl FromStr for ArithmeticOp {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "add" => ArithmeticOp::Add,
            "sub" => ArithmeticOp::Sub,
            "neg" => ArithmeticOp::Neg,
            "eq" => ArithmeticOp::Eq,
            "gt" => ArithmeticOp::Gt,
            "lt" => ArithmeticOp::Lt,
            "and" => ArithmeticOp::And,
            "or" => ArithmeticOp::Or,
            "not" => ArithmeticOp::Not,
            _ => return Err(TranslateError::UnsupportedOperation(s.to_string())),
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Command {
    // Stack Basics
    /// Raw mnemonic; resolved to an [`ArithmeticOp`] when translated.
    Arithmetic(String),
    Push(Segment, u16),
    Pop(Segment, u16),

    // Control
    Label(String),
    Goto(String),
    IfGoto(String),

    // Functions
    Function(String, u16),
    Call(String, u16),
    Return,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Arithmetic(op) => write!(f, "{}", op),
            Command::Push(seg, arg) => write!(f, "push {} {}", seg, arg),
            Command::Pop(seg, arg) => write!(f, "pop {} {}", seg, arg),
            Command::Label(label) => write!(f, "label {}", label),
            Command::Goto(label) => write!(f, "goto {}", label),
            Command::IfGoto(label) => write!(f, "if-goto {}", label),
            Command::Function(name, locals) => write!(f, "function {} {}", name, locals),
            Command::Call(name, args) => write!(f, "call {} {}", name, args),
            Command::Return => f.write_str("return"),
        }
    }
}

/// Where a VM label lives once it is turned into an assembly symbol.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum LabelScope {
    /// Inside `function <name>`; labels become `name$label`.
    Function(String),
    /// Top-level code of a module; labels become `module:label`.
    Module(String),
}

impl LabelScope {
    pub fn resolve(&self, label: &str) -> String {
        match self {
            LabelScope::Function(function) => format!("{}${}", function, label),
            LabelScope::Module(module) => format!("{}:{}", module, label),
        }
    }
}

#[test]
fn test_label_scope() {
    let in_fn = LabelScope::Function("Main.loop".to_string());
    let top = LabelScope::Module("Main".to_string());
    assert_eq!(in_fn.resolve("LOOP"), "Main.loop$LOOP");
    assert_eq!(top.resolve("LOOP"), "Main:LOOP");
}

#[test]
fn test_command_display() {
    assert_eq!(Command::Push(Segment::Local, 2).to_string(), "push local 2");
    assert_eq!(
        Command::Call("Math.multiply".to_string(), 2).to_string(),
        "call Math.multiply 2"
    );
    assert_eq!(Command::Arithmetic("add".to_string()).to_string(), "add");
}
