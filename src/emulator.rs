//! Small Hack CPU used by the tests to run generated assembly.

use std::collections::HashMap;

const RAM_SIZE: usize = 1 << 16;
const FIRST_VARIABLE: i16 = 16;

enum Instruction {
    Address(i16),
    Compute {
        dest: String,
        comp: String,
        jump: String,
    },
}

fn predefined() -> HashMap<String, i16> {
    let mut symbols: HashMap<String, i16> = [
        ("SP", 0),
        ("LCL", 1),
        ("ARG", 2),
        ("THIS", 3),
        ("THAT", 4),
        ("SCREEN", 16384),
        ("KBD", 24576),
    ]
    .into_iter()
    .map(|(name, addr)| (name.to_string(), addr))
    .collect();
    for r in 0..16 {
        symbols.insert(format!("R{}", r), r);
    }
    symbols
}

fn compute(line: &str) -> Instruction {
    let (lhs, jump) = line.split_once(';').unwrap_or((line, ""));
    let (dest, comp) = lhs.split_once('=').unwrap_or(("", lhs));
    Instruction::Compute {
        dest: dest.to_string(),
        comp: comp.to_string(),
        jump: jump.to_string(),
    }
}

pub struct Cpu {
    pub ram: Vec<i16>,
    pub pc: usize,
    a: i16,
    d: i16,
    rom: Vec<Instruction>,
    symbols: HashMap<String, i16>,
}

impl Cpu {
    /// Assembles `asm` (labels, variables, comments) and resets the machine.
    pub fn load(asm: &str) -> Cpu {
        let lines: Vec<&str> = asm
            .lines()
            .map(|l| l.split_once("//").map(|(s, _)| s).unwrap_or(l).trim())
            .filter(|l| !l.is_empty())
            .collect();

        let mut symbols = predefined();
        let mut addr = 0;
        for line in &lines {
            match line.strip_prefix('(').and_then(|l| l.strip_suffix(')')) {
                Some(label) => {
                    symbols.insert(label.to_string(), addr);
                }
                None => addr += 1,
            }
        }

        let mut next_variable = FIRST_VARIABLE;
        let mut rom = vec![];
        for line in lines {
            if line.starts_with('(') {
                continue;
            }
            let instruction = match line.strip_prefix('@') {
                Some(value) => Instruction::Address(match value.parse() {
                    Ok(n) => n,
                    Err(_) => *symbols.entry(value.to_string()).or_insert_with(|| {
                        next_variable += 1;
                        next_variable - 1
                    }),
                }),
                None => compute(line),
            };
            rom.push(instruction);
        }

        Cpu {
            ram: vec![0; RAM_SIZE],
            pc: 0,
            a: 0,
            d: 0,
            rom,
            symbols,
        }
    }

    pub fn symbol(&self, name: &str) -> i16 {
        *self
            .symbols
            .get(name)
            .unwrap_or_else(|| panic!("undefined symbol {}", name))
    }

    fn alu(&self, comp: &str, m: i16) -> i16 {
        let (a, d) = (self.a, self.d);
        match comp {
            "0" => 0,
            "1" => 1,
            "-1" => -1,
            "D" => d,
            "A" => a,
            "M" => m,
            "!D" => !d,
            "!A" => !a,
            "!M" => !m,
            "-D" => d.wrapping_neg(),
            "-A" => a.wrapping_neg(),
            "-M" => m.wrapping_neg(),
            "D+1" => d.wrapping_add(1),
            "A+1" => a.wrapping_add(1),
            "M+1" => m.wrapping_add(1),
            "D-1" => d.wrapping_sub(1),
            "A-1" => a.wrapping_sub(1),
            "M-1" => m.wrapping_sub(1),
            "D+A" => d.wrapping_add(a),
            "D+M" => d.wrapping_add(m),
            "D-A" => d.wrapping_sub(a),
            "D-M" => d.wrapping_sub(m),
            "A-D" => a.wrapping_sub(d),
            "M-D" => m.wrapping_sub(d),
            "D&A" => d & a,
            "D&M" => d & m,
            "D|A" => d | a,
            "D|M" => d | m,
            other => panic!("not a Hack computation: {}", other),
        }
    }

    pub fn step(&mut self) {
        let addr = self.a as u16 as usize;
        match &self.rom[self.pc] {
            Instruction::Address(value) => {
                self.a = *value;
                self.pc += 1;
            }
            Instruction::Compute { dest, comp, jump } => {
                let out = self.alu(comp, self.ram[addr]);
                if dest.contains('M') {
                    self.ram[addr] = out;
                }
                if dest.contains('A') {
                    self.a = out;
                }
                if dest.contains('D') {
                    self.d = out;
                }
                let taken = match jump.as_str() {
                    "" => false,
                    "JGT" => out > 0,
                    "JEQ" => out == 0,
                    "JGE" => out >= 0,
                    "JLT" => out < 0,
                    "JNE" => out != 0,
                    "JLE" => out <= 0,
                    "JMP" => true,
                    other => panic!("not a Hack jump: {}", other),
                };
                self.pc = if taken { addr } else { self.pc + 1 };
            }
        }
    }

    /// True when sitting on an `(L) @L 0;JMP` loop.
    pub fn halted(&self) -> bool {
        let at_self = matches!(
            self.rom.get(self.pc),
            Some(Instruction::Address(v)) if *v as usize == self.pc
        );
        let jumps = matches!(
            self.rom.get(self.pc + 1),
            Some(Instruction::Compute { comp, jump, .. }) if comp == "0" && jump == "JMP"
        );
        at_self && jumps
    }

    pub fn run(&mut self, max_steps: usize) {
        for _ in 0..max_steps {
            if self.halted() || self.pc >= self.rom.len() {
                return;
            }
            self.step();
        }
    }
}

#[test]
fn test_countdown() {
    let mut cpu = Cpu::load(
        "@3\nD=A\n@counter\nM=D\n(LOOP)\n@counter\nMD=M-1\n@LOOP\nD;JGT\n(END)\n@END\n0;JMP\n",
    );
    cpu.run(100);
    assert!(cpu.halted());
    assert_eq!(cpu.ram[16], 0);
    assert_eq!(cpu.pc, cpu.symbol("END") as usize);
}
