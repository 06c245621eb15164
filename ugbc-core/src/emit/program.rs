use std::fs;
use std::path::{Path, PathBuf};

use pest::Parser;
use ugbc_target::Target;

use super::stmt::lower_line;
use crate::env::{Environment, DEFAULT_ORG};
use crate::error::{CompileError, Diagnostic};
use crate::parser::{BasicParser, Rule};
use crate::sink::Sink;
use crate::symbols::BankKind;

/// Result of a successful compilation: the diagnostics collected along the
/// way (warnings only — any E0NN aborts compilation by returning `Err`
/// before this type is ever constructed).
pub struct CompileOutcome {
    pub diagnostics: Vec<Diagnostic>,
    pub asm_path: PathBuf,
    pub config_path: Option<PathBuf>,
}

/// Parses `source_path` and emits assembly to `asm_path` (and, if
/// `config_path` is given, a linker configuration file) targeting `target`.
/// Single-pass: each parsed line is lowered to assembly immediately, there
/// is no retained syntax tree once this function returns.
pub fn compile(
    source_path: &Path,
    asm_path: &Path,
    config_path: Option<&Path>,
    target: &dyn Target,
    warnings_enabled: bool,
) -> Result<CompileOutcome, CompileError> {
    let source = fs::read_to_string(source_path).map_err(|e| CompileError::Io {
        source: e,
        path: source_path.to_owned(),
    })?;

    let mut program = BasicParser::parse(Rule::program, &source).map_err(|e| {
        CompileError::Critical(Diagnostic::new(
            crate::error::Code::E000,
            format!("parse error: {}", e),
            0,
        ))
    })?;

    let sink = Sink::create(asm_path, config_path).map_err(|e| CompileError::Io {
        source: e,
        path: asm_path.to_owned(),
    })?;

    let mut env = Environment::new(source_path.to_owned(), warnings_enabled, target, sink);
    emit_prologue(&mut env);

    let program_pair = program.next().unwrap();
    for pair in program_pair.into_inner() {
        match pair.as_rule() {
            Rule::line => {
                env.current_line += 1;
                lower_line(&mut env, pair).map_err(CompileError::Critical)?;
            }
            Rule::EOI => {}
            other => panic!("unexpected top-level rule {:?}", other),
        }
    }

    if !env.control.all_closed() {
        return Err(CompileError::Critical(Diagnostic::new(
            crate::error::Code::E031,
            "unclosed IF/DO/WHILE/REPEAT/FOR block at end of source",
            env.current_line,
        )));
    }

    emit_epilogue(&mut env);

    let diagnostics = std::mem::take(&mut env.diagnostics);
    let asm_path = env.sink.asm_path().to_owned();
    let config_path = env.sink.config_path().map(|p| p.to_owned());
    env.sink.flush().map_err(|e| CompileError::Io { source: e, path: asm_path.clone() })?;

    Ok(CompileOutcome { diagnostics, asm_path, config_path })
}

fn emit_prologue(env: &mut Environment) {
    if env.sink.has_linker_config() {
        env.sink.emit_config_line("# linker configuration generated for this program");
        env.sink.emit_raw("\t.segment \"CODE\"");
    } else {
        env.sink.emit_raw(&format!("\torg {}", DEFAULT_ORG));
    }
}

/// Reserves storage for every bank and variable, emits the interned string
/// literal table, installs the tick-interrupt dispatcher for any registered
/// `EVERY` handlers, and (when a linker configuration was requested) writes
/// its per-bank segment/link-map lines.
fn emit_epilogue(env: &mut Environment) {
    if env.has_game_loop {
        env.diagnostics.push(Diagnostic::new(
            crate::error::Code::W003,
            "BEGIN GAMELOOP opened but never closed with END GAMELOOP",
            env.current_line,
        ));
    }

    env.sink.emit_lines(&env.target.ret());

    if !env.every.is_empty() {
        env.sink.emit_label("_every_dispatch");
        for handler in env.every.handlers() {
            env.sink.emit_raw(&format!("\t; every {} ticks -> {}", handler.ticks, handler.label));
            if handler.enabled {
                env.sink.emit_lines(&env.target.call(&handler.label));
            }
        }
        env.sink.emit_lines(&env.target.ret());
    }

    let banks: Vec<_> = env.all_banks().cloned().collect();
    for bank in &banks {
        env.sink.emit_raw(&format!("; bank {} ({:?}) at {:#06x}", bank.name, bank.kind, bank.start_address));
    }

    let mut seen_real_names = std::collections::HashSet::new();
    let reservations: Vec<(String, usize)> = env
        .variables()
        .iter()
        .filter(|v| v.real_name.starts_with("_tmp") || v.bank.is_some())
        .filter(|v| seen_real_names.insert(v.real_name.clone()))
        .map(|v| (v.real_name.clone(), reservation_size(v)))
        .filter(|(_, size)| *size > 0)
        .collect();
    for (real_name, size) in reservations {
        env.sink.emit_raw(&format!("{}: .res {}", real_name, size));
    }

    for (id, value) in env.strings.entries().collect::<Vec<_>>() {
        env.sink.emit_label(&crate::symbols::StringPool::label_for(id));
        env.sink.emit_raw(&format!("\t.byte {}, \"{}\"", value.len(), value));
    }

    if env.sink.has_linker_config() {
        for bank in &banks {
            env.sink.emit_config_line(&format!(
                "segment \"{}\" load {:#06x} type {} flag {}",
                bank.name,
                bank.start_address,
                bank_segment_type(bank.kind),
                bank_kind_label(bank.kind),
            ));
            env.sink.emit_config_line(&format!(
                "segment \"MA{:04x}\" load {:#06x} type ro",
                bank.start_address, bank.start_address
            ));
        }
    }
}

/// Byte size `.res` should reserve for a variable at bank cleanup time:
/// arrays use their declared shape, buffers their declared byte count
/// (`v.size`, set only by a `BUFFER(n)` declaration), everything else the
/// fixed width of its scalar data type.
fn reservation_size(v: &crate::symbols::Variable) -> usize {
    if let Some(shape) = &v.shape {
        shape.element_count() as usize * shape.element_type.storage_size().max(1)
    } else if v.size > 0 {
        v.size
    } else {
        v.data_type.storage_size()
    }
}

fn bank_kind_label(kind: BankKind) -> &'static str {
    match kind {
        BankKind::Code => "code",
        BankKind::Variables => "variables",
        BankKind::Temporary => "temporary",
        BankKind::Data => "data",
        BankKind::Strings => "strings",
    }
}

/// `ro` for banks that hold code/initialized data never rewritten after
/// load, `overwrite` for banks the running program mutates.
fn bank_segment_type(kind: BankKind) -> &'static str {
    match kind {
        BankKind::Code | BankKind::Data => "ro",
        BankKind::Variables | BankKind::Temporary | BankKind::Strings => "overwrite",
    }
}
