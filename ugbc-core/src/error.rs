use std::fmt;

/// Stable error/warning codes. Carried as an enum rather than bare strings
/// so call sites can't typo a code, while `Code::text()` still prints the
/// exact `E0NN`/`W0NN` prefix: a source that triggers E010 always produces
/// diagnostic text beginning with "E010".
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Code {
    E000,
    E001,
    E002,
    E003,
    E004,
    E005,
    E006,
    E007,
    E008,
    E009,
    E010,
    E011,
    E012,
    E013,
    E014,
    E015,
    E016,
    E017,
    E018,
    E019,
    E020,
    E021,
    E022,
    E023,
    E024,
    E025,
    E026,
    E027,
    E028,
    E029,
    E030,
    E031,
    E032,
    E033,
    E034,
    E035,
    E036,
    E037,
    E038,
    E039,
    E040,
    E041,
    E042,
    W001,
    W002,
    W003,
}

impl Code {
    pub fn as_str(self) -> &'static str {
        match self {
            Code::E000 => "E000",
            Code::E001 => "E001",
            Code::E002 => "E002",
            Code::E003 => "E003",
            Code::E004 => "E004",
            Code::E005 => "E005",
            Code::E006 => "E006",
            Code::E007 => "E007",
            Code::E008 => "E008",
            Code::E009 => "E009",
            Code::E010 => "E010",
            Code::E011 => "E011",
            Code::E012 => "E012",
            Code::E013 => "E013",
            Code::E014 => "E014",
            Code::E015 => "E015",
            Code::E016 => "E016",
            Code::E017 => "E017",
            Code::E018 => "E018",
            Code::E019 => "E019",
            Code::E020 => "E020",
            Code::E021 => "E021",
            Code::E022 => "E022",
            Code::E023 => "E023",
            Code::E024 => "E024",
            Code::E025 => "E025",
            Code::E026 => "E026",
            Code::E027 => "E027",
            Code::E028 => "E028",
            Code::E029 => "E029",
            Code::E030 => "E030",
            Code::E031 => "E031",
            Code::E032 => "E032",
            Code::E033 => "E033",
            Code::E034 => "E034",
            Code::E035 => "E035",
            Code::E036 => "E036",
            Code::E037 => "E037",
            Code::E038 => "E038",
            Code::E039 => "E039",
            Code::E040 => "E040",
            Code::E041 => "E041",
            Code::E042 => "E042",
            Code::W001 => "W001",
            Code::W002 => "W002",
            Code::W003 => "W003",
        }
    }

    pub fn is_warning(self) -> bool {
        matches!(self, Code::W001 | Code::W002 | Code::W003)
    }
}

/// A single diagnostic: code, human text, and the source line it applies
/// to.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub code: Code,
    pub message: String,
    pub line: u32,
}

impl Diagnostic {
    pub fn new(code: Code, message: impl Into<String>, line: u32) -> Diagnostic {
        Diagnostic {
            code,
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {} at {}", self.code.as_str(), self.message, self.line)
    }
}

/// Top-level error type returned by the driver: a parse/semantic error or
/// an I/O error, mirroring `vasm/src/main.rs`'s `Error` enum split. The
/// semantic side is our own `Diagnostic` rather than a `pest::error::Error`,
/// since a critical diagnostic can originate from a semantic action as
/// easily as from the grammar itself.
#[derive(Debug)]
pub enum CompileError {
    Critical(Diagnostic),
    Io {
        source: std::io::Error,
        path: std::path::PathBuf,
    },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompileError::Critical(diag) => write!(f, "{}", diag),
            CompileError::Io { source, path } => {
                write!(f, "I/O error on \"{}\": {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for CompileError {}

pub type Result<T> = std::result::Result<T, Diagnostic>;
