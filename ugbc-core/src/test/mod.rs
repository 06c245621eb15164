mod pest_helpers;
mod program;

pub(crate) use pest_helpers::parse_rule;
