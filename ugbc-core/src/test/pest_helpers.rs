use pest::Parser;

use crate::parser::{BasicParser, Rule};

/// Parses `input` as `rule`, panicking with the pest error on failure.
/// Used by grammar-focused unit tests that only care whether a fragment
/// parses, not what it emits.
pub(crate) fn parse_rule(rule: Rule, input: &str) -> pest::iterators::Pairs<'_, Rule> {
    BasicParser::parse(rule, input).unwrap_or_else(|e| panic!("failed to parse {:?}: {}", rule, e))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_hex_binary_and_0x_integers_as_int() {
        for literal in ["$FF", "%11111111", "0xFF"] {
            let mut pairs = parse_rule(Rule::int, literal);
            let pair = pairs.next().unwrap();
            assert_eq!(literal, pair.as_str());
        }
    }

    #[test]
    fn parses_a_full_if_else_endif_block() {
        parse_rule(Rule::program, "IF A = 1 THEN\nB = 2\nELSE\nB = 3\nENDIF\nDONE\n");
    }

    #[test]
    fn parses_named_and_numeric_labels() {
        parse_rule(Rule::program, "10 DONE\n");
        parse_rule(Rule::program, "TICK:\nDONE\n");
    }
}
