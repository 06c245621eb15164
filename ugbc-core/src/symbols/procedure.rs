use ugbc_target::DataType;

/// One formal parameter of a `PROC` definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub data_type: DataType,
}

/// A `PROC ... END PROC` definition.
///
/// Defined once, callable many times; nested `PROC` definitions are
/// rejected at the inner `PROC` token (E037) by
/// `Environment::begin_procedure`, which is the only place that consults
/// `Environment::current_procedure`.
#[derive(Clone, Debug, PartialEq)]
pub struct Procedure {
    pub name: String,
    pub parameters: Vec<Parameter>,
}

impl Procedure {
    pub const MAX_PARAMETERS: usize = 256;

    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>) -> Procedure {
        Procedure {
            name: name.into(),
            parameters,
        }
    }
}
