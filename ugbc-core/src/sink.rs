use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Buffered output sink for the assembly file and, optionally, the linker
/// configuration file.
///
/// All emission from every other component in the core funnels through
/// this type's three primitives: an instruction line (tab-indented), a
/// label line (unindented, colon-terminated), and a raw line (directives,
/// comments).
pub struct Sink {
    asm: BufWriter<File>,
    asm_path: PathBuf,
    config: Option<BufWriter<File>>,
    config_path: Option<PathBuf>,
}

impl Sink {
    pub fn create(asm_path: &Path, config_path: Option<&Path>) -> io::Result<Sink> {
        let asm = BufWriter::new(File::create(asm_path)?);
        let config = match config_path {
            Some(p) => Some(BufWriter::new(File::create(p)?)),
            None => None,
        };
        Ok(Sink {
            asm,
            asm_path: asm_path.to_owned(),
            config,
            config_path: config_path.map(|p| p.to_owned()),
        })
    }

    pub fn asm_path(&self) -> &Path {
        &self.asm_path
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn has_linker_config(&self) -> bool {
        self.config.is_some()
    }

    /// Emits an instruction/directive line, tab-indented.
    ///
    /// Panics on a write failure: a broken output stream mid-compilation
    /// leaves no well-formed partial file to recover, so there is nothing
    /// useful a caller could do with the error other than abort anyway.
    pub fn emit_line(&mut self, line: &str) {
        writeln!(self.asm, "\t{}", line).expect("write to assembly output failed");
    }

    pub fn emit_lines<'a, I: IntoIterator<Item = &'a String>>(&mut self, lines: I) {
        for line in lines {
            self.emit_line(line);
        }
    }

    /// Emits a label line, unindented and colon-terminated.
    pub fn emit_label(&mut self, name: &str) {
        writeln!(self.asm, "{}:", name).expect("write to assembly output failed");
    }

    /// Emits a line verbatim (directives, comments) with no indentation or
    /// trailing colon added.
    pub fn emit_raw(&mut self, line: &str) {
        writeln!(self.asm, "{}", line).expect("write to assembly output failed");
    }

    pub fn emit_config_line(&mut self, line: &str) {
        if let Some(w) = &mut self.config {
            writeln!(w, "{}", line).expect("write to linker configuration failed");
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.asm.flush()?;
        if let Some(w) = &mut self.config {
            w.flush()?;
        }
        Ok(())
    }
}
