use std::str::Lines;

use nom::{
    bytes::complete::{is_a, is_not},
    character::{
        complete::{digit1, space1},
        is_digit,
    },
    combinator::{all_consuming, map, map_res, verify},
    multi::separated_list1,
    IResult,
};

use crate::ast::{Command::*, *};
use crate::error::{Result, TranslateError};

fn integer(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |c: &str| c.parse())(input)
}

#[test]
fn test_integer() {
    assert_eq!(integer("32 rest"), Ok((" rest", 32)));
    assert!(integer("65536").is_err());
    assert!(integer("-1").is_err());
}

fn symbol(input: &str) -> IResult<&str, String> {
    map(
        verify(
            is_a("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_.$:0123456789"),
            |c: &str| !is_digit(c.as_bytes()[0]),
        ),
        |sym: &str| sym.to_string(),
    )(input)
}

#[test]
fn test_symbol() {
    assert_eq!(symbol("Main.fib$LOOP_1"), Ok(("", "Main.fib$LOOP_1".to_string())));
    assert!(symbol("1abc").is_err());
}

/// Whether all of `text` is a valid label, function or module name.
pub fn is_symbol(text: &str) -> bool {
    all_consuming(symbol)(text).is_ok()
}

#[test]
fn test_is_symbol() {
    assert!(is_symbol("Sys"));
    assert!(!is_symbol("my prog"));
    assert!(!is_symbol("2nd"));
    assert!(!is_symbol(""));
}

fn token(input: &str) -> IResult<&str, &str> {
    is_not(" \t")(input)
}

fn tokens(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(space1, token)(input)
}

#[test]
fn test_tokens() {
    assert_eq!(
        tokens("push \t pointer  1"),
        Ok(("", vec!["push", "pointer", "1"]))
    );
}

fn strip_comment(line: &str) -> &str {
    line.split_once("//").map(|(s, _)| s).unwrap_or(line)
}

/// Number of arguments a mnemonic takes; anything unknown is arithmetic.
fn arity(mnemonic: &str) -> usize {
    match mnemonic {
        "push" | "pop" | "function" | "call" => 2,
        "label" | "goto" | "if-goto" => 1,
        _ => 0,
    }
}

fn command(line: usize, text: &str) -> Result<Command> {
    let malformed = |reason: String| TranslateError::MalformedCommand {
        line,
        text: text.to_string(),
        reason,
    };

    let (_, parts) =
        all_consuming(tokens)(text).map_err(|_| malformed("cannot split into words".into()))?;
    let Some((&head, args)) = parts.split_first() else {
        return Err(malformed("empty command".into()));
    };

    let expected = arity(head);
    if args.len() < expected {
        return Err(malformed(format!(
            "`{}` takes {} argument(s), found {}",
            head,
            expected,
            args.len()
        )));
    }
    if args.len() > expected {
        return Err(malformed(format!(
            "unexpected trailing `{}`",
            args[expected..].join(" ")
        )));
    }

    let index = |arg: &str| {
        all_consuming(integer)(arg)
            .map(|(_, n)| n)
            .map_err(|_| malformed(format!("`{}` is not a valid non-negative integer", arg)))
    };
    let name = |arg: &str| {
        all_consuming(symbol)(arg)
            .map(|(_, s)| s)
            .map_err(|_| malformed(format!("`{}` is not a valid symbol", arg)))
    };

    Ok(match head {
        "push" => Push(args[0].parse()?, index(args[1])?),
        "pop" => Pop(args[0].parse()?, index(args[1])?),
        "label" => Label(name(args[0])?),
        "goto" => Goto(name(args[0])?),
        "if-goto" => IfGoto(name(args[0])?),
        "function" => Function(name(args[0])?, index(args[1])?),
        "call" => Call(name(args[0])?, index(args[1])?),
        "return" => Return,
        op => Arithmetic(op.to_string()),
    })
}

#[test]
fn test_push() {
    assert_eq!(command(1, "push  pointer  1").unwrap(), Push(Segment::Pointer, 1));
}

#[test]
fn test_functions() {
    assert_eq!(
        command(1, "function Main.fib 2").unwrap(),
        Function("Main.fib".to_string(), 2)
    );
    assert_eq!(
        command(1, "call Math.multiply 2").unwrap(),
        Call("Math.multiply".to_string(), 2)
    );
    assert_eq!(command(1, "return").unwrap(), Return);
}

#[test]
fn test_unknown_mnemonic_is_arithmetic() {
    assert_eq!(command(1, "mul").unwrap(), Arithmetic("mul".to_string()));
}

#[test]
fn test_missing_arguments() {
    match command(7, "push local") {
        Err(TranslateError::MalformedCommand { line, text, .. }) => {
            assert_eq!(line, 7);
            assert_eq!(text, "push local");
        }
        other => panic!("expected malformed command, got {:?}", other),
    }
    assert!(matches!(
        command(1, "if-goto"),
        Err(TranslateError::MalformedCommand { .. })
    ));
}

#[test]
fn test_bad_arguments() {
    assert!(matches!(
        command(1, "push constant -3"),
        Err(TranslateError::MalformedCommand { .. })
    ));
    assert!(matches!(
        command(1, "function Main.main x"),
        Err(TranslateError::MalformedCommand { .. })
    ));
    assert!(matches!(
        command(1, "add 1"),
        Err(TranslateError::MalformedCommand { .. })
    ));
    assert!(matches!(
        command(1, "push heap 0"),
        Err(TranslateError::InvalidSegment(seg)) if seg == "heap"
    ));
}

/// Reads one module's commands lazily, in source order.
pub struct Parser<'a> {
    lines: Lines<'a>,
    line: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            lines: input.lines(),
            line: 0,
        }
    }

    /// 1-based source line of the last command returned.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<'a> Iterator for Parser<'a> {
    type Item = Result<Command>;

    fn next(&mut self) -> Option<Self::Item> {
        for raw in self.lines.by_ref() {
            self.line += 1;
            let text = strip_comment(raw).trim();
            if text.is_empty() {
                continue;
            }
            return Some(command(self.line, text));
        }
        None
    }
}

pub fn parse(input: &str) -> Result<Vec<Command>> {
    Parser::new(input).collect()
}

#[test]
fn test_parse_skips_comments_and_blanks() {
    let source = "// header\n\npush constant 7 // seven\n   \nadd\n";
    assert_eq!(
        parse(source).unwrap(),
        vec![Push(Segment::Constant, 7), Arithmetic("add".to_string())]
    );
}

#[test]
fn test_parser_tracks_lines() {
    let mut parser = Parser::new("// one\n\nlabel LOOP\r\ngoto LOOP\n");
    assert_eq!(parser.next().unwrap().unwrap(), Label("LOOP".to_string()));
    assert_eq!(parser.line(), 3);
    assert_eq!(parser.next().unwrap().unwrap(), Goto("LOOP".to_string()));
    assert_eq!(parser.line(), 4);
    assert!(parser.next().is_none());
}
