use std::collections::HashMap;
use std::path::PathBuf;

use ugbc_target::{DataType, Deployable, Target};

use crate::control::ControlStacks;
use crate::every::EveryState;
use crate::sink::Sink;
use crate::symbols::{Bank, BankKind, Procedure, StringPool, Variable};

/// Default load addresses for the three banks every program gets at
/// startup.
pub const DEFAULT_VARIABLES_ADDRESS: u32 = 0x2000;
pub const DEFAULT_TEMPORARY_ADDRESS: u32 = 0x3000;
pub const DEFAULT_STRINGS_ADDRESS: u32 = 0x4000;
pub const DEFAULT_ORG: u32 = 32768;

/// Buffers for a definition still being parsed a few tokens at a time —
/// array dimensions, array indices, procedure parameters.
#[derive(Default)]
pub struct PendingBuffers {
    pub array_dimensions: Vec<u32>,
    pub array_indexes: Vec<String>,
    pub procedure_parameters: Vec<crate::symbols::Parameter>,
}

/// The process-wide compilation environment. Every semantic action in
/// `emit/` takes `&mut Environment` explicitly rather than reaching for
/// ambient global tables.
pub struct Environment<'t> {
    // Input parameters
    pub source_path: PathBuf,
    pub warnings_enabled: bool,
    pub target: &'t dyn Target,

    // Parser state
    pub current_line: u32,
    next_unique_id: u64,

    // Symbol storage
    banks: HashMap<BankKind, Vec<Bank>>,
    variables: Vec<Variable>,
    procedures: Vec<Procedure>,
    current_procedure: Option<String>,
    pub strings: StringPool,

    // Control-flow stacks
    pub control: ControlStacks,

    // Flags
    pub has_game_loop: bool,
    pub bitmask_needed: bool,
    deployables_resident: HashMap<Deployable, bool>,

    /// (real_name of the shared byte currently being packed, next free bit).
    /// `BIT` variables are handed out a bit position by `alloc_bit` and
    /// share one reserved byte per group of up to eight.
    bit_pack_cursor: Option<(String, u8)>,

    // Every-handler state
    pub every: EveryState,

    // Temp buffers for in-progress definitions
    pub pending: PendingBuffers,

    pub sink: Sink,
    pub diagnostics: Vec<crate::error::Diagnostic>,
}

impl<'t> Environment<'t> {
    pub fn new(source_path: PathBuf, warnings_enabled: bool, target: &'t dyn Target, sink: Sink) -> Environment<'t> {
        let mut env = Environment {
            source_path,
            warnings_enabled,
            target,
            current_line: 0,
            next_unique_id: 0,
            banks: HashMap::new(),
            variables: Vec::new(),
            procedures: Vec::new(),
            current_procedure: None,
            strings: StringPool::new(),
            control: ControlStacks::new(),
            has_game_loop: false,
            bitmask_needed: false,
            deployables_resident: HashMap::new(),
            bit_pack_cursor: None,
            every: EveryState::new(),
            pending: PendingBuffers::default(),
            sink,
            diagnostics: Vec::new(),
        };
        env.install_default_banks();
        env
    }

    fn install_default_banks(&mut self) {
        self.declare_bank(Bank::new("_variables", BankKind::Variables, DEFAULT_VARIABLES_ADDRESS));
        self.declare_bank(Bank::new("_temporary", BankKind::Temporary, DEFAULT_TEMPORARY_ADDRESS));
        self.declare_bank(Bank::new("_strings", BankKind::Strings, DEFAULT_STRINGS_ADDRESS));
        let mut strings_address = Variable::new("strings_address", "strings_address", DataType::Address);
        strings_address.bank = Some("_variables".to_owned());
        self.variables.push(strings_address);
    }

    pub fn unique_id(&mut self) -> u64 {
        let id = self.next_unique_id;
        self.next_unique_id += 1;
        id
    }

    // ---- Banks ----------------------------------------------------------

    pub fn declare_bank(&mut self, bank: Bank) {
        self.banks.entry(bank.kind).or_insert_with(Vec::new).push(bank);
    }

    pub fn find_bank(&self, name: &str) -> Option<&Bank> {
        self.banks.values().flatten().find(|b| b.name == name)
    }

    pub fn banks_of_kind(&self, kind: BankKind) -> &[Bank] {
        self.banks.get(&kind).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn all_banks(&self) -> impl Iterator<Item = &Bank> {
        self.banks.values().flatten()
    }

    fn default_bank_for(&self, kind: BankKind) -> &'static str {
        match kind {
            BankKind::Variables => "_variables",
            BankKind::Temporary => "_temporary",
            BankKind::Strings => "_strings",
            BankKind::Code => "_code",
            BankKind::Data => "_data",
        }
    }

    // ---- Variables --------------------------------------------------------

    /// Looks up a program-visible variable by name, searching procedure
    /// locals before globals (innermost scope wins, though this grammar
    /// has at most one level of procedure nesting since nesting itself is
    /// forbidden).
    pub fn lookup_variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().rev().find(|v| v.name == name)
    }

    pub fn lookup_variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.iter_mut().rev().find(|v| v.name == name)
    }

    pub fn define_variable(&mut self, mut variable: Variable) -> &Variable {
        if variable.bank.is_none() {
            variable.bank = Some(self.default_bank_for(BankKind::Variables).to_owned());
        }
        self.variables.push(variable);
        self.variables.last().unwrap()
    }

    /// Allocates a temporary of `data_type`, reusing one that is neither
    /// in-use nor locked when available.
    pub fn alloc_temporary(&mut self, data_type: DataType) -> String {
        if let Some(existing) = self
            .variables
            .iter_mut()
            .find(|v| v.data_type == data_type && v.real_name.starts_with("_tmp") && v.is_reusable())
        {
            existing.in_use = true;
            return existing.real_name.clone();
        }

        let id = self.unique_id();
        let mut temp = Variable::temporary(id, data_type);
        temp.bank = Some(self.default_bank_for(BankKind::Temporary).to_owned());
        self.variables.push(temp);
        self.variables.last().unwrap().real_name.clone()
    }

    pub fn release_temporary(&mut self, real_name: &str) {
        if let Some(v) = self.variables.iter_mut().find(|v| v.real_name == real_name) {
            if !v.locked {
                v.in_use = false;
            }
        }
    }

    pub fn lock_temporary(&mut self, real_name: &str) {
        if let Some(v) = self.variables.iter_mut().find(|v| v.real_name == real_name) {
            v.locked = true;
        }
    }

    pub fn unlock_temporary(&mut self, real_name: &str) {
        if let Some(v) = self.variables.iter_mut().find(|v| v.real_name == real_name) {
            v.locked = false;
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Hands out the next free bit position for a packed `BIT` variable,
    /// starting a new shared byte every eighth allocation.
    pub fn alloc_bit(&mut self) -> (String, u8) {
        if let Some((real_name, bit)) = self.bit_pack_cursor.clone() {
            if bit < 8 {
                self.bit_pack_cursor = Some((real_name.clone(), bit + 1));
                return (real_name, bit);
            }
        }
        let id = self.unique_id();
        let real_name = format!("_bitpack{}", id);
        self.bit_pack_cursor = Some((real_name.clone(), 1));
        (real_name, 0)
    }

    // ---- Procedures ---------------------------------------------------

    pub fn find_procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.name == name)
    }

    pub fn current_procedure(&self) -> Option<&str> {
        self.current_procedure.as_deref()
    }

    pub fn begin_procedure(&mut self, name: String) -> Result<(), crate::error::Diagnostic> {
        if self.current_procedure.is_some() {
            return Err(crate::error::Diagnostic::new(
                crate::error::Code::E037,
                format!("nested procedure \"{}\"", name),
                self.current_line,
            ));
        }
        self.current_procedure = Some(name);
        Ok(())
    }

    pub fn end_procedure(&mut self) -> Result<Procedure, crate::error::Diagnostic> {
        let name = self.current_procedure.take().ok_or_else(|| {
            crate::error::Diagnostic::new(
                crate::error::Code::E038,
                "END PROC outside a procedure",
                self.current_line,
            )
        })?;
        let params = std::mem::take(&mut self.pending.procedure_parameters);
        let proc = Procedure::new(name, params);
        self.procedures.push(proc.clone());
        Ok(proc)
    }

    // ---- Deployables ----------------------------------------------------

    /// Returns `true` the first time this snippet is requested (the caller
    /// must then emit the guarded block); `false` on every later request.
    pub fn request_deployable(&mut self, d: Deployable) -> bool {
        let already = self.deployables_resident.get(&d).copied().unwrap_or(false);
        self.deployables_resident.insert(d, true);
        !already
    }

    pub fn is_deployable_resident(&self, d: Deployable) -> bool {
        self.deployables_resident.get(&d).copied().unwrap_or(false)
    }

    /// Requests `d`; on first use, emits the jump-over guard, an `.include`
    /// of its pre-authored snippet file, and the landing label. Later calls
    /// emit nothing, since the snippet body is already resident wherever it
    /// was first placed and can be reached with a plain `call`.
    pub fn deploy(&mut self, d: Deployable) {
        if self.request_deployable(d) {
            let after = format!("_dep_{}_after", d.name());
            self.sink.emit_lines(&self.target.jump(&after));
            self.sink.emit_raw(&format!("\t.include \"snippets/{}.asm\"", d.name()));
            self.sink.emit_lines(&self.target.label(&after));
        }
    }
}
