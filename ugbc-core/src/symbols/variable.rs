use ugbc_target::DataType;

/// Either an integer or string constant, whichever an initializer supplied.
#[derive(Clone, Debug, PartialEq)]
pub enum InitialValue {
    None,
    Integer(i64),
    Str(String),
}

/// The shape of an array variable.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayShape {
    pub dimensions: Vec<u32>,
    pub element_type: DataType,
}

impl ArrayShape {
    pub const MAX_DIMENSIONS: usize = 256;

    pub fn element_count(&self) -> u64 {
        self.dimensions.iter().map(|&d| d as u64).product()
    }
}

/// A named variable or compiler-synthesized temporary.
///
/// The owning `Environment` keeps variables in a flat `Vec<Variable>`
/// rather than an intrusive linked list; nothing outside the environment
/// ever holds a pointer into the collection, only `env.rs` ever indexes it.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    /// Program-visible name, e.g. `X` or `X$`.
    pub name: String,
    /// Mangled name used in emitted labels, deterministic from a unique id
    /// for temporaries (`_tmp<id>`), otherwise derived from `name`.
    pub real_name: String,
    pub data_type: DataType,
    pub in_use: bool,
    pub locked: bool,
    pub imported: bool,
    pub initial: InitialValue,
    pub size: usize,
    pub bank: Option<String>,
    pub shape: Option<ArrayShape>,
    /// Bit position (0-7) within `real_name`'s byte for a packed `BIT`
    /// variable. `None` for every other data type.
    pub bit_offset: Option<u8>,
}

impl Variable {
    pub fn new(name: impl Into<String>, real_name: impl Into<String>, data_type: DataType) -> Variable {
        Variable {
            name: name.into(),
            real_name: real_name.into(),
            data_type,
            in_use: false,
            locked: false,
            imported: false,
            initial: InitialValue::None,
            size: data_type.storage_size(),
            bank: None,
            shape: None,
            bit_offset: None,
        }
    }

    pub fn temporary(unique_id: u64, data_type: DataType) -> Variable {
        let real_name = format!("_tmp{}", unique_id);
        let mut v = Variable::new(real_name.clone(), real_name, data_type);
        v.in_use = true;
        v
    }

    pub fn is_reusable(&self) -> bool {
        !self.in_use && !self.locked
    }
}
