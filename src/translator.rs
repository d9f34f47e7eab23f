use std::io::Write;

use tracing::{debug, trace};

use crate::ast::{Command::*, Segment::*, *};
use crate::error::{Result, TranslateError};
use crate::parser::is_symbol;

macro_rules! svec {
    ($($x:expr),* $(,)?) => (vec![$($x.to_string()),*]);
}

/// First RAM cell of the stack.
pub const STACK_BASE: u16 = 256;
/// Largest value an A-instruction can load.
pub const MAX_CONSTANT: u16 = 0x7fff;
/// Entry point called by the bootstrap code.
pub const ENTRY_FUNCTION: &str = "Sys.init";

const TEMP_BASE: u16 = 5;
const TEMP_SIZE: u16 = 8;
const HALT_LABEL: &str = "VM$HALT";
const END_LABEL: &str = "VM$END";
const BOOTSTRAP_MODULE: &str = "bootstrap";

fn at_c(arg: &u16) -> String {
    format!("@{arg}", arg = arg)
}

fn at_s(arg: &str) -> String {
    format!("@{arg}", arg = arg)
}

fn check_range(segment: Segment, arg: u16, max: u16) -> Result<()> {
    if arg > max {
        return Err(TranslateError::IndexOutOfRange {
            segment: segment.name(),
            index: arg,
            max,
        });
    }
    Ok(())
}

fn pointer_arg(arg: &u16) -> Result<&'static str> {
    check_range(Pointer, *arg, 1)?;
    Ok(if *arg == 0 { "THIS" } else { "THAT" })
}

/// Pushes the value in D
fn push_d() -> Vec<String> {
    svec!["@SP", "M=M+1", "A=M-1", "M=D"]
}

/// Pops into D
fn pop_d() -> Vec<String> {
    svec!["@SP", "AM=M-1", "D=M"]
}

/// Push microcode for the four base segments
fn seg_push(segment: Segment, seg: &str, arg: &u16) -> Result<Vec<String>> {
    check_range(segment, *arg, MAX_CONSTANT)?;
    let mut code = svec![
        at_s(seg),
        "D=M",
        at_c(arg),
        "A=D+A", // A = SEG+arg
        "D=M"    // D = value to push
    ];
    code.extend(push_d());
    Ok(code)
}

fn seg_push_direct(label: &str) -> Vec<String> {
    let mut code = svec![at_s(label), "D=M"];
    code.extend(push_d());
    code
}

fn seg_pop(segment: Segment, seg: &str, arg: &u16) -> Result<Vec<String>> {
    check_range(segment, *arg, MAX_CONSTANT)?;
    Ok(svec![
        at_s(seg),
        "D=M",
        at_c(arg),
        "D=D+A", // D = SEG+arg
        "@R13",
        "M=D",    // Store target addr in R13
        "@SP",
        "AM=M-1", // SP--, A <- new SP (val to be popped)
        "D=M",
        "@R13",
        "A=M", // At the target address...
        "M=D"  // ... store the popped val
    ])
}

fn seg_pop_direct(label: &str) -> Vec<String> {
    let mut code = pop_d();
    code.extend(svec![at_s(label), "M=D"]);
    code
}

fn simple_un_op(comp: &str) -> Vec<String> {
    svec!["@SP", "A=M-1", format!("M={}", comp)]
}

// i.e. no conditions or jumps, just pop and run
fn simple_bin_op(comp: &str) -> Vec<String> {
    svec![
        "@SP",
        "AM=M-1", // SP--, looking at top of stack now
        "D=M",    // Right arg in D
        "A=A-1",  // Looking at second arg of stack, will overwrite
        format!("M={}", comp)
    ]
}

fn halt_loop(label: &str) -> Vec<String> {
    svec![format!("({})", label), at_s(label), "0;JMP"]
}

/// Code generator for one translation run.
///
/// Owns the output sink until [`Translator::finish`] hands it back. Label and
/// call-site counters keep increasing across modules so every generated symbol
/// is unique in the emitted program.
pub struct Translator<W: Write> {
    out: W,
    module: String,
    scope: LabelScope,
    gen_sym: usize,
    call_sym: usize,
    started: bool,
}

impl<W: Write> Translator<W> {
    pub fn new(out: W) -> Self {
        Translator {
            out,
            module: BOOTSTRAP_MODULE.to_string(),
            scope: LabelScope::Module(BOOTSTRAP_MODULE.to_string()),
            gen_sym: 0,
            call_sym: 0,
            started: false,
        }
    }

    /// Starts a new module; statics and top-level labels are namespaced by it,
    /// so the name must itself be a valid symbol.
    pub fn set_module(&mut self, module: &str) -> Result<()> {
        if !is_symbol(module) {
            return Err(TranslateError::InvalidModuleName(module.to_string()));
        }
        debug!(%module, "entering module");
        self.module = module.to_string();
        self.scope = LabelScope::Module(module.to_string());
        Ok(())
    }

    fn next_gen_sym(&mut self) -> usize {
        let tmp = self.gen_sym;
        self.gen_sym += 1;
        tmp
    }

    fn next_call_sym(&mut self) -> usize {
        let tmp = self.call_sym;
        self.call_sym += 1;
        tmp
    }

    fn static_sym(&self, arg: &u16) -> String {
        format!("{}.{}", self.module, arg)
    }

    fn push(&self, segment: &Segment, arg: &u16) -> Result<Vec<String>> {
        Ok(match segment {
            Constant => {
                check_range(Constant, *arg, MAX_CONSTANT)?;
                let mut code = svec![at_c(arg), "D=A"];
                code.extend(push_d());
                code
            }
            Local => seg_push(Local, "LCL", arg)?,
            Argument => seg_push(Argument, "ARG", arg)?,
            This => seg_push(This, "THIS", arg)?,
            That => seg_push(That, "THAT", arg)?,
            Static => seg_push_direct(&self.static_sym(arg)),
            Temp => {
                check_range(Temp, *arg, TEMP_SIZE - 1)?;
                seg_push_direct(&format!("R{}", arg + TEMP_BASE))
            }
            Pointer => seg_push_direct(pointer_arg(arg)?),
        })
    }

    fn pop(&self, segment: &Segment, arg: &u16) -> Result<Vec<String>> {
        Ok(match segment {
            Constant => return Err(TranslateError::InvalidSegment(Constant.to_string())),
            Local => seg_pop(Local, "LCL", arg)?,
            Argument => seg_pop(Argument, "ARG", arg)?,
            This => seg_pop(This, "THIS", arg)?,
            That => seg_pop(That, "THAT", arg)?,
            Static => seg_pop_direct(&self.static_sym(arg)),
            Temp => {
                check_range(Temp, *arg, TEMP_SIZE - 1)?;
                seg_pop_direct(&format!("R{}", arg + TEMP_BASE))
            }
            Pointer => seg_pop_direct(pointer_arg(arg)?),
        })
    }

    fn compare(&mut self, jump: &str) -> Vec<String> {
        let sym = self.next_gen_sym();
        let true_sym = format!("TRUE_{}", sym);
        let end_sym = format!("END_{}", sym);
        svec![
            "@SP",
            "AM=M-1", // SP--, looking at top of stack now
            "D=M",    // Right arg in D
            "A=A-1",  // Second arg, becomes the result slot
            "D=M-D",
            at_s(&true_sym),
            format!("D;J{}", jump),
            "@SP",
            "A=M-1",
            "M=0",
            at_s(&end_sym),
            "0;JMP",
            format!("({})", true_sym),
            "@SP",
            "A=M-1",
            "M=-1",
            format!("({})", end_sym)
        ]
    }

    fn arithmetic(&mut self, mnemonic: &str) -> Result<Vec<String>> {
        Ok(match mnemonic.parse::<ArithmeticOp>()? {
            ArithmeticOp::Not => simple_un_op("!M"),
            ArithmeticOp::Neg => simple_un_op("-M"),
            ArithmeticOp::Add => simple_bin_op("D+M"),
            ArithmeticOp::Sub => simple_bin_op("M-D"),
            ArithmeticOp::And => simple_bin_op("D&M"),
            ArithmeticOp::Or => simple_bin_op("D|M"),
            ArithmeticOp::Eq => self.compare("EQ"),
            ArithmeticOp::Gt => self.compare("GT"),
            ArithmeticOp::Lt => self.compare("LT"),
        })
    }

    fn label(&self, label: &str) -> Vec<String> {
        svec![format!("({})", self.scope.resolve(label))]
    }

    fn goto(&self, label: &str) -> Vec<String> {
        svec![
            at_s(&self.scope.resolve(label)),
            "0;JMP" // Unconditional jump
        ]
    }

    fn if_goto(&self, label: &str) -> Vec<String> {
        let mut code = pop_d();
        code.extend(svec![
            at_s(&self.scope.resolve(label)),
            "D;JNE" // False is 0
        ]);
        code
    }

    fn function(&mut self, name: &str, locals: &u16) -> Vec<String> {
        self.scope = LabelScope::Function(name.to_string());
        let mut code = svec![format!("({})", name)];
        for _ in 0..*locals {
            code.extend(svec!["@SP", "M=M+1", "A=M-1", "M=0"]);
        }
        code
    }

    fn call(&mut self, name: &str, args: &u16) -> Result<Vec<String>> {
        check_range(Argument, *args, MAX_CONSTANT - 5)?;
        let n = self.next_call_sym();
        let ret_sym = format!("{}$ret.{}", self.module, n);
        let mut code = svec![at_s(&ret_sym), "D=A"];
        code.extend(push_d());
        for base in ["LCL", "ARG", "THIS", "THAT"] {
            code.extend(svec![at_s(base), "D=M"]);
            code.extend(push_d());
        }
        code.extend(svec![
            "@SP",
            "D=M",
            at_c(&(args + 5)), // return address + four saved bases
            "D=D-A",
            "@ARG",
            "M=D",
            "@SP",
            "D=M",
            "@LCL",
            "M=D",
            at_s(name),
            "0;JMP",
            format!("({})", ret_sym)
        ]);
        Ok(code)
    }

    fn restore(base: &str) -> Vec<String> {
        svec!["@R13", "AM=M-1", "D=M", at_s(base), "M=D"]
    }

    fn ret(&self) -> Vec<String> {
        let mut code = svec![
            "@LCL",
            "D=M",
            "@R13",
            "M=D", // FRAME in R13
            "@5",
            "A=D-A",
            "D=M",
            "@R14",
            "M=D" // Return address in R14, read before *ARG is overwritten
        ];
        code.extend(pop_d());
        code.extend(svec![
            "@ARG",
            "A=M",
            "M=D", // Return value into the caller's result slot
            "@ARG",
            "D=M+1",
            "@SP",
            "M=D"
        ]);
        // R13 walks down from FRAME, so THAT..LCL each read an untouched slot
        for base in ["THAT", "THIS", "ARG", "LCL"] {
            code.extend(Self::restore(base));
        }
        code.extend(svec!["@R14", "A=M", "0;JMP"]);
        code
    }

    fn emit(&mut self, header: &str, code: &[String]) -> Result<()> {
        self.started = true;
        writeln!(self.out, "// {}", header)?;
        for instruction in code {
            writeln!(self.out, "{}", instruction)?;
        }
        Ok(())
    }

    /// Sets up the stack and calls the entry function.
    ///
    /// Only valid as the first output of a run; once anything has been
    /// written this fails with [`TranslateError::LateBootstrap`].
    pub fn bootstrap(&mut self) -> Result<()> {
        if self.started {
            return Err(TranslateError::LateBootstrap);
        }
        debug!(entry = ENTRY_FUNCTION, "writing bootstrap");
        let init = svec![at_c(&STACK_BASE), "D=A", "@SP", "M=D"];
        self.emit("bootstrap", &init)?;
        let mut code = self.call(ENTRY_FUNCTION, &0)?;
        code.extend(halt_loop(HALT_LABEL));
        self.emit(&format!("call {} 0", ENTRY_FUNCTION), &code)
    }

    pub fn translate(&mut self, command: &Command) -> Result<()> {
        trace!(module = %self.module, %command, "translating");
        let translated = match command {
            Arithmetic(op) => self.arithmetic(op)?,
            Push(seg, arg) => self.push(seg, arg)?,
            Pop(seg, arg) => self.pop(seg, arg)?,
            Label(sym) => self.label(sym),
            Goto(sym) => self.goto(sym),
            IfGoto(sym) => self.if_goto(sym),
            Function(name, locals) => self.function(name, locals),
            Call(name, args) => self.call(name, args)?,
            Return => self.ret(),
        };
        self.emit(&command.to_string(), &translated)
    }

    pub fn translate_all(&mut self, commands: &[Command]) -> Result<()> {
        for command in commands {
            self.translate(command)?;
        }
        Ok(())
    }

    /// Appends the terminating loop, flushes, and hands back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.emit("end", &halt_loop(END_LABEL))?;
        self.out.flush()?;
        Ok(self.out)
    }
}
