use pest_derive::Parser;

/// The pest-generated parser for the `grammar.pest` file. `Rule` is the
/// type every other module in this crate matches on while walking pairs.
#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct BasicParser;
