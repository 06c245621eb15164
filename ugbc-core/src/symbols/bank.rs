/// One of the five storage roles a bank can serve.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BankKind {
    Code,
    Variables,
    Temporary,
    Data,
    Strings,
}

/// A named, fixed-address region of emitted memory.
///
/// Banks are never destroyed before shutdown; the environment keeps one
/// `Vec<Bank>` per kind, since nothing here needs to hand out a stable
/// pointer into the list — banks are looked up by name and mutated through
/// the owning `Environment`.
#[derive(Clone, Debug, PartialEq)]
pub struct Bank {
    pub name: String,
    pub kind: BankKind,
    pub start_address: u32,
    pub filename: Option<String>,
}

impl Bank {
    pub fn new(name: impl Into<String>, kind: BankKind, start_address: u32) -> Bank {
        Bank {
            name: name.into(),
            kind,
            start_address,
            filename: None,
        }
    }

    pub fn with_file(mut self, filename: impl Into<String>) -> Bank {
        self.filename = Some(filename.into());
        self
    }
}
