//! Turns a `.vm` file or a directory of them into one `.asm` file.

use std::{
    ffi::OsStr,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::parser::Parser;
use crate::translator::Translator;

const SOURCE_EXTENSION: &str = "vm";
const OUTPUT_EXTENSION: &str = "asm";

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub input: PathBuf,
    /// Defaults to `<stem>.asm` beside a file, `<dir>/<dir>.asm` for a directory.
    pub output: Option<PathBuf>,
    /// Defaults to on for directories and off for single files.
    pub bootstrap: Option<bool>,
}

/// What a run will read and write, resolved from [`Options`].
#[derive(Debug, PartialEq, Eq)]
pub struct Job {
    pub modules: Vec<PathBuf>,
    pub output: PathBuf,
    pub bootstrap: bool,
}

fn is_source(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(SOURCE_EXTENSION))
}

pub fn module_name(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(OsStr::to_str)
        .with_context(|| format!("{} has no usable module name", path.display()))
}

pub fn plan(options: &Options) -> Result<Job> {
    let input = &options.input;
    let (modules, default_output, default_bootstrap) = if input.is_dir() {
        let dir = input
            .canonicalize()
            .with_context(|| format!("cannot resolve {}", input.display()))?;
        let mut modules = vec![];
        for entry in
            fs::read_dir(&dir).with_context(|| format!("cannot list {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && is_source(&path) {
                modules.push(path);
            }
        }
        if modules.is_empty() {
            bail!("no .{} files in {}", SOURCE_EXTENSION, dir.display());
        }
        modules.sort();
        let name = dir
            .file_name()
            .and_then(OsStr::to_str)
            .with_context(|| format!("{} has no usable name", dir.display()))?;
        let output = dir.join(format!("{}.{}", name, OUTPUT_EXTENSION));
        (modules, output, true)
    } else if input.is_file() && is_source(input) {
        (
            vec![input.clone()],
            input.with_extension(OUTPUT_EXTENSION),
            false,
        )
    } else {
        bail!(
            "{} is neither a .{} file nor a directory",
            input.display(),
            SOURCE_EXTENSION
        );
    };

    Ok(Job {
        modules,
        output: options.output.clone().unwrap_or(default_output),
        bootstrap: options.bootstrap.unwrap_or(default_bootstrap),
    })
}

/// Feeds one module's commands through `translator`.
pub fn translate_module<W: Write>(
    translator: &mut Translator<W>,
    module: &str,
    source: &str,
) -> Result<()> {
    translator
        .set_module(module)
        .with_context(|| format!("cannot use {}.{} as a module", module, SOURCE_EXTENSION))?;
    let mut parser = Parser::new(source);
    while let Some(command) = parser.next() {
        let line = parser.line();
        command
            .and_then(|command| translator.translate(&command))
            .with_context(|| format!("{}.{}:{}", module, SOURCE_EXTENSION, line))?;
    }
    Ok(())
}

/// Translates every module of `job` into `sink`, in order.
pub fn write_program<W: Write>(job: &Job, sink: W) -> Result<W> {
    let mut translator = Translator::new(sink);
    if job.bootstrap {
        translator.bootstrap()?;
    }
    for path in &job.modules {
        let source = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        translate_module(&mut translator, module_name(path)?, &source)?;
    }
    Ok(translator.finish()?)
}

/// Runs a whole translation and returns the path written.
///
/// A failed run leaves no output file behind.
pub fn run(options: &Options) -> Result<PathBuf> {
    let job = plan(options)?;
    info!(
        output = %job.output.display(),
        modules = job.modules.len(),
        bootstrap = job.bootstrap,
        "translating"
    );

    let file = File::create(&job.output)
        .with_context(|| format!("cannot create {}", job.output.display()))?;
    let result = write_program(&job, BufWriter::new(file)).and_then(|sink| {
        sink.into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("cannot flush {}", job.output.display()))
    });

    match result {
        Ok(_) => Ok(job.output),
        Err(err) => {
            if let Err(rm) = fs::remove_file(&job.output) {
                warn!(output = %job.output.display(), error = %rm, "could not remove partial output");
            }
            Err(err)
        }
    }
}
