use pest::iterators::Pair;

use ugbc_target::{AluOp, CompareOp, DataType, Deployable, Width};

use crate::env::Environment;
use crate::error::{Code, Diagnostic, Result};
use crate::parser::Rule;

/// An already-emitted value: the real name of the temporary or variable that
/// holds it, and the type it was computed at.
#[derive(Clone, Debug, PartialEq)]
pub struct Typed {
    pub name: String,
    pub data_type: DataType,
}

impl Typed {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Typed {
        Typed { name: name.into(), data_type }
    }
}

fn err(env: &Environment, code: Code, message: impl Into<String>) -> Diagnostic {
    Diagnostic::new(code, message, env.current_line)
}

/// Width a verb should move/compare/promote operands at. String-family
/// values are always passed around by (word-sized) reference.
fn operand_width(data_type: DataType) -> Width {
    match data_type.width_bits() {
        Some(8) => Width::Byte,
        Some(32) => Width::DWord,
        Some(16) => Width::Word,
        _ => Width::Word,
    }
}

/// Lowers an `expression` (or any of its precedence-level sub-rules) pair
/// into a typed temporary, emitting assembly as it goes. One call per
/// node: there is no retained tree, each reduction commits its own output
/// before returning.
pub fn lower_expression(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    match pair.as_rule() {
        Rule::expression => lower_expression(env, pair.into_inner().next().unwrap()),
        Rule::or_expr => lower_logical_chain(env, pair, AluOp::Or),
        Rule::and_expr => lower_logical_chain(env, pair, AluOp::And),
        Rule::not_expr => lower_not(env, pair),
        Rule::compare_expr => lower_compare(env, pair),
        Rule::add_expr | Rule::mul_expr => lower_arith_chain(env, pair),
        Rule::unary_expr => lower_unary(env, pair),
        Rule::primary => lower_primary(env, pair),
        other => panic!("lower_expression called on unexpected rule {:?}", other),
    }
}

/// Shared helper for `or_expr`/`and_expr`: a left operand followed by zero
/// or more same-precedence operands, left-associative, combined with `alu`.
fn lower_logical_chain(env: &mut Environment, pair: Pair<Rule>, op: AluOp) -> Result<Typed> {
    let mut inner = pair.into_inner();
    let mut acc = lower_expression(env, inner.next().unwrap())?;
    for next in inner {
        let rhs = lower_expression(env, next)?;
        if !acc.data_type.is_numeric() || !rhs.data_type.is_numeric() {
            return Err(err(env, Code::E018, "AND/OR operand is not a supported type"));
        }
        let result = env.alloc_temporary(DataType::Byte);
        let lines = env.target.alu(op, &result, &acc.name, &rhs.name, Width::Byte);
        env.sink.emit_lines(&lines);
        acc = Typed::new(result, DataType::Byte);
    }
    Ok(acc)
}

fn lower_not(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    let mut inner = pair.into_inner();
    let first = inner.next().unwrap();
    if first.as_rule() == Rule::not_expr {
        let operand = lower_not(env, first)?;
        if !operand.data_type.is_numeric() {
            return Err(err(env, Code::E018, "NOT operand is not a supported type"));
        }
        let result = env.alloc_temporary(DataType::Byte);
        let lines = env.target.not(&result, &operand.name, Width::Byte);
        env.sink.emit_lines(&lines);
        Ok(Typed::new(result, DataType::Byte))
    } else {
        lower_expression(env, first)
    }
}

/// Materializes `lhs op rhs` as a `0`/`1` byte: set 1, branch over a `set 0`
/// when the comparison holds.
fn lower_compare(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    let mut inner = pair.into_inner();
    let lhs = lower_expression(env, inner.next().unwrap())?;
    let (op_pair, rhs_pair) = match (inner.next(), inner.next()) {
        (Some(op), Some(rhs)) => (op, rhs),
        _ => return Ok(lhs),
    };
    let rhs = lower_expression(env, rhs_pair)?;
    if !lhs.data_type.is_numeric() || !rhs.data_type.is_numeric() {
        return Err(err(env, Code::E015, format!("cannot compare {:?} and {:?}", lhs.data_type, rhs.data_type)));
    }
    let op = match op_pair.as_str() {
        "=" => CompareOp::Eq,
        "<>" => CompareOp::Ne,
        "<" => CompareOp::Lt,
        "<=" => CompareOp::Le,
        ">" => CompareOp::Gt,
        ">=" => CompareOp::Ge,
        other => unreachable!("unexpected compare_op {:?}", other),
    };
    let width = operand_width(DataType::promote(lhs.data_type, rhs.data_type).unwrap_or(lhs.data_type));
    let result = env.alloc_temporary(DataType::Byte);
    let holds_label = format!("_cmp{}_true", env.unique_id());
    env.sink.emit_lines(&env.target.mov_immediate(&result, 1, Width::Byte));
    env.sink.emit_lines(&env.target.compare_and_branch(op, &lhs.name, &rhs.name, &holds_label, width));
    env.sink.emit_lines(&env.target.mov_immediate(&result, 0, Width::Byte));
    env.sink.emit_lines(&env.target.label(&holds_label));
    Ok(Typed::new(result, DataType::Byte))
}

/// Shared helper for `add_expr`/`mul_expr`: a left operand followed by zero
/// or more `(+|-|*) operand` pairs.
fn lower_arith_chain(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    let mut inner = pair.into_inner();
    let mut acc = lower_expression(env, inner.next().unwrap())?;
    while let (Some(op_pair), Some(rhs_pair)) = (inner.next(), inner.next()) {
        let rhs = lower_expression(env, rhs_pair)?;
        let (op, code) = match op_pair.as_str() {
            "+" => (AluOp::Add, Code::E010),
            "-" => (AluOp::Sub, Code::E011),
            "*" => (AluOp::Mul, Code::E013),
            other => unreachable!("unexpected add/mul operator {:?}", other),
        };
        acc = apply_arith(env, op, code, acc, rhs)?;
    }
    Ok(acc)
}

fn apply_arith(env: &mut Environment, op: AluOp, unsupported: Code, lhs: Typed, rhs: Typed) -> Result<Typed> {
    let promoted = DataType::promote(lhs.data_type, rhs.data_type).ok_or_else(|| {
        err(
            env,
            unsupported,
            format!("{:?} unsupported for {:?} and {:?}", op, lhs.data_type, rhs.data_type),
        )
    })?;
    let width = operand_width(promoted);
    if op == AluOp::Mul {
        env.diagnostics.push(Diagnostic::new(
            Code::W001,
            "multiplication could lose precision",
            env.current_line,
        ));
    }
    let result = env.alloc_temporary(promoted);
    let lines = env.target.alu(op, &result, &lhs.name, &rhs.name, width);
    env.sink.emit_lines(&lines);
    Ok(Typed::new(result, promoted))
}

fn lower_unary(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    let mut inner = pair.into_inner();
    let first = inner.next().unwrap();
    if first.as_rule() == Rule::unary_expr {
        let operand = lower_unary(env, first)?;
        if !operand.data_type.is_numeric() {
            return Err(err(env, Code::E012, "unary minus operand is not a supported type"));
        }
        let width = operand_width(operand.data_type);
        let zero = env.alloc_temporary(operand.data_type);
        env.sink.emit_lines(&env.target.mov_immediate(&zero, 0, width));
        let result = env.alloc_temporary(operand.data_type);
        env.sink.emit_lines(&env.target.alu(AluOp::Sub, &result, &zero, &operand.name, width));
        Ok(Typed::new(result, operand.data_type))
    } else {
        lower_expression(env, first)
    }
}

fn lower_primary(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    let inner = match pair.clone().into_inner().next() {
        Some(inner) => inner,
        // bare `TRUE`/`FALSE` keyword literals produce no inner pair
        None => {
            let value = if pair.as_str().eq_ignore_ascii_case("TRUE") { 1 } else { 0 };
            let result = env.alloc_temporary(DataType::Byte);
            env.sink.emit_lines(&env.target.mov_immediate(&result, value, Width::Byte));
            return Ok(Typed::new(result, DataType::Byte));
        }
    };
    match inner.as_rule() {
        Rule::direct_integer => lower_int_literal(env, inner.into_inner().next().unwrap()),
        Rule::random_definition => lower_random(env, inner),
        Rule::function_call => lower_function_call(env, inner),
        Rule::subscript => lower_subscript(env, inner),
        Rule::color_enumeration => lower_color_enumeration(env, inner),
        Rule::int => lower_int_literal(env, inner),
        Rule::string_literal => lower_string_literal(env, inner),
        Rule::identifier => lower_identifier(env, inner),
        Rule::expression => lower_expression(env, inner),
        other => panic!("unexpected primary kind {:?}", other),
    }
}

fn parse_int_text(text: &str) -> i64 {
    if let Some(rest) = text.strip_prefix('$') {
        i64::from_str_radix(rest, 16).unwrap_or(0)
    } else if let Some(rest) = text.strip_prefix("&H").or_else(|| text.strip_prefix("&h")) {
        i64::from_str_radix(rest, 16).unwrap_or(0)
    } else if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(rest, 16).unwrap_or(0)
    } else if let Some(rest) = text.strip_prefix('%') {
        i64::from_str_radix(rest, 2).unwrap_or(0)
    } else {
        text.parse().unwrap_or(0)
    }
}

fn lower_int_literal(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    let value = parse_int_text(pair.as_str());
    let data_type = if !(0..=i64::from(u16::MAX)).contains(&value) {
        DataType::DWord
    } else if !(0..=i64::from(u8::MAX)).contains(&value) {
        DataType::Word
    } else {
        DataType::Byte
    };
    let width = operand_width(data_type);
    let result = env.alloc_temporary(data_type);
    env.sink.emit_lines(&env.target.mov_immediate(&result, value, width));
    Ok(Typed::new(result, data_type))
}

fn lower_string_literal(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    let raw = pair.as_str();
    let content = &raw[1..raw.len() - 1];
    let unescaped = content.replace("\\\"", "\"");
    let id = env.strings.intern(&unescaped);
    let label = crate::symbols::StringPool::label_for(id);
    let result = env.alloc_temporary(DataType::StaticString);
    env.sink.emit_lines(&env.target.address_of(&result, &label));
    Ok(Typed::new(result, DataType::StaticString))
}

fn lower_identifier(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    let name = pair.as_str().to_owned();
    match env.lookup_variable(&name).cloned() {
        Some(v) if v.data_type == DataType::Bit => Ok(lower_bit_read(env, &v.real_name, v.bit_offset.unwrap_or(0))),
        Some(v) => Ok(Typed::new(v.real_name.clone(), v.data_type)),
        None => Err(err(env, Code::E002, format!("use of undefined variable \"{}\"", name))),
    }
}

/// Reads the single bit at `bit` within the packed byte `pack_name`,
/// materializing it as a `0`/`1` byte the same way `lower_compare` does.
pub(crate) fn lower_bit_read(env: &mut Environment, pack_name: &str, bit: u8) -> Typed {
    let mask_tmp = env.alloc_temporary(DataType::Byte);
    env.sink.emit_lines(&env.target.mov_immediate(&mask_tmp, 1i64 << bit, Width::Byte));
    let masked = env.alloc_temporary(DataType::Byte);
    env.sink.emit_lines(&env.target.alu(AluOp::And, &masked, pack_name, &mask_tmp, Width::Byte));
    let zero_tmp = env.alloc_temporary(DataType::Byte);
    env.sink.emit_lines(&env.target.mov_immediate(&zero_tmp, 0, Width::Byte));
    let result = env.alloc_temporary(DataType::Bit);
    let holds_label = format!("_bit{}_set", env.unique_id());
    env.sink.emit_lines(&env.target.mov_immediate(&result, 1, Width::Byte));
    env.sink.emit_lines(&env.target.compare_and_branch(CompareOp::Ne, &masked, &zero_tmp, &holds_label, Width::Byte));
    env.sink.emit_lines(&env.target.mov_immediate(&result, 0, Width::Byte));
    env.sink.emit_lines(&env.target.label(&holds_label));
    Typed::new(result, DataType::Bit)
}

/// Array element read. Flattens the index list to a byte offset with
/// Horner's method (row-major: `((i0 * d1) + i1) * d2 + i2 ...`) against a
/// word-sized accumulator, then scales by the element's storage size before
/// the indexed load.
fn lower_subscript(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_owned();
    let index_pairs: Vec<Pair<Rule>> = inner.collect();

    let variable = env
        .lookup_variable(&name)
        .cloned()
        .ok_or_else(|| err(env, Code::E002, format!("use of undefined variable \"{}\"", name)))?;
    let shape = variable
        .shape
        .clone()
        .ok_or_else(|| err(env, Code::E036, format!("\"{}\" is not an array", name)))?;
    if index_pairs.len() != shape.dimensions.len() {
        return Err(err(
            env,
            Code::E035,
            format!(
                "\"{}\" has {} dimension(s), {} index/indices given",
                name,
                shape.dimensions.len(),
                index_pairs.len()
            ),
        ));
    }

    let indices: Vec<Typed> = index_pairs
        .into_iter()
        .map(|p| lower_expression(env, p))
        .collect::<Result<_>>()?;

    let offset = env.alloc_temporary(DataType::Word);
    env.sink.emit_lines(&env.target.mov(&offset, &indices[0].name, Width::Word));
    for (dim, idx) in indices.iter().enumerate().skip(1) {
        let dim_size = env.alloc_temporary(DataType::Word);
        env.sink.emit_lines(&env.target.mov_immediate(&dim_size, i64::from(shape.dimensions[dim]), Width::Word));
        env.sink.emit_lines(&env.target.alu(AluOp::Mul, &offset, &offset, &dim_size, Width::Word));
        env.sink.emit_lines(&env.target.alu(AluOp::Add, &offset, &offset, &idx.name, Width::Word));
    }

    let element_stride = shape.element_type.storage_size().max(1);
    if element_stride != 1 {
        let stride_tmp = env.alloc_temporary(DataType::Word);
        env.sink.emit_lines(&env.target.mov_immediate(&stride_tmp, element_stride as i64, Width::Word));
        env.sink.emit_lines(&env.target.alu(AluOp::Mul, &offset, &offset, &stride_tmp, Width::Word));
    }

    let result = env.alloc_temporary(shape.element_type);
    let width = operand_width(shape.element_type);
    env.sink.emit_lines(&env.target.mov_indexed(&result, &variable.real_name, &offset, width));
    Ok(Typed::new(result, shape.element_type))
}

fn lower_color_enumeration(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    let name = pair.as_str().to_ascii_uppercase();
    let result = env.alloc_temporary(DataType::Color);
    let lines = env.target.color_constant(&result, &name);
    env.sink.emit_lines(&lines);
    Ok(Typed::new(result, DataType::Color))
}

fn lower_random(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    let kind = pair.into_inner().next().unwrap().as_str().to_ascii_uppercase();
    let data_type = match kind.as_str() {
        "BYTE" => DataType::Byte,
        "WORD" | "WIDTH" | "HEIGHT" => DataType::Word,
        "DWORD" => DataType::DWord,
        "POSITION" => DataType::Position,
        "COLOR" => DataType::Color,
        other => unreachable!("unexpected random_type {:?}", other),
    };
    let result = env.alloc_temporary(data_type);
    env.sink.emit_lines(&env.target.random(&result, operand_width(data_type)));
    Ok(Typed::new(result, data_type))
}

fn lower_function_call(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    let text = pair.as_str();
    let name_end = text.find('(').unwrap_or(text.len());
    let name = text[..name_end].trim().to_ascii_uppercase();
    let mut args = pair.into_inner();

    match name.as_str() {
        "PEEK" => {
            let addr = lower_expression(env, args.next().unwrap())?;
            let result = env.alloc_temporary(DataType::Byte);
            env.sink.emit_lines(&env.target.peek(&result, &addr.name));
            Ok(Typed::new(result, DataType::Byte))
        }
        "XPEN" => {
            let result = env.alloc_temporary(DataType::Position);
            env.sink.emit_lines(&env.target.xpen(&result));
            Ok(Typed::new(result, DataType::Position))
        }
        "YPEN" => {
            let result = env.alloc_temporary(DataType::Position);
            env.sink.emit_lines(&env.target.ypen(&result));
            Ok(Typed::new(result, DataType::Position))
        }
        "COLLISION" => {
            let a = lower_expression(env, args.next().unwrap())?;
            let b = lower_expression(env, args.next().unwrap())?;
            let result = env.alloc_temporary(DataType::Byte);
            env.sink.emit_lines(&env.target.collision(&result, &a.name, &b.name));
            Ok(Typed::new(result, DataType::Byte))
        }
        "HIT" => {
            let sprite = lower_expression(env, args.next().unwrap())?;
            let result = env.alloc_temporary(DataType::Byte);
            env.sink.emit_lines(&env.target.hit(&result, &sprite.name));
            Ok(Typed::new(result, DataType::Byte))
        }
        "LEFT" | "RIGHT" | "MID" | "INSTR" | "LEN" | "CHR" | "ASC" | "STR" | "VAL" | "UPPER"
        | "LOWER" | "FLIP" => lower_string_function(env, &name, args),
        "SPACE" => {
            let count = lower_expression(env, args.next().unwrap())?;
            if !count.data_type.is_numeric() {
                return Err(err(env, Code::E009, "SPACE argument must be numeric"));
            }
            Ok(call_string_builtin(env, "_str_space", &[&count], DataType::DynamicString))
        }
        "STRING" => {
            let count = lower_expression(env, args.next().unwrap())?;
            let fill = lower_expression(env, args.next().unwrap())?;
            if !count.data_type.is_numeric() {
                return Err(err(env, Code::E009, "STRING count argument must be numeric"));
            }
            Ok(call_string_builtin(env, "_str_repeat", &[&count, &fill], DataType::DynamicString))
        }
        other => unreachable!("unexpected function_call name {:?}", other),
    }
}

/// Calls a string-runtime subroutine from the `dstring` deployable.
/// Arguments are moved into fixed argument slots and the result is read
/// back from a fixed result slot, by the calling convention the snippet
/// library and the core agree on.
fn call_string_builtin(env: &mut Environment, label: &str, args: &[&Typed], result_type: DataType) -> Typed {
    env.deploy(Deployable::Dstring);
    for (i, arg) in args.iter().enumerate() {
        let slot = format!("_str_arg{}", i);
        let lines = env.target.mov(&slot, &arg.name, operand_width(arg.data_type));
        env.sink.emit_lines(&lines);
    }
    env.sink.emit_lines(&env.target.call(label));
    let result = env.alloc_temporary(result_type);
    env.sink.emit_lines(&env.target.mov(&result, "_str_result", operand_width(result_type)));
    result
}

fn string_fn_code(name: &str) -> Code {
    match name {
        "LEFT" => Code::E019,
        "RIGHT" => Code::E020,
        "MID" => Code::E021,
        "INSTR" => Code::E022,
        "LEN" => Code::E023,
        "CHR" => Code::E024,
        "ASC" => Code::E025,
        "STR" => Code::E026,
        "VAL" => Code::E027,
        "UPPER" => Code::E028,
        "LOWER" => Code::E029,
        "FLIP" => Code::E030,
        other => unreachable!("unexpected string function {:?}", other),
    }
}

fn lower_string_function(env: &mut Environment, name: &str, mut args: pest::iterators::Pairs<Rule>) -> Result<Typed> {
    let code = string_fn_code(name);
    let first = lower_expression(env, args.next().unwrap())?;
    let needs_string_first = matches!(name, "LEFT" | "RIGHT" | "MID" | "INSTR" | "LEN" | "UPPER" | "LOWER" | "FLIP" | "ASC" | "VAL");
    if needs_string_first && !first.data_type.is_string() {
        return Err(err(env, code, format!("{} requires a string operand, got {:?}", name, first.data_type)));
    }
    if matches!(name, "CHR" | "STR") && !first.data_type.is_numeric() {
        return Err(err(env, code, format!("{} argument must be numeric", name)));
    }

    match name {
        "LEFT" => {
            let count = lower_expression(env, args.next().unwrap())?;
            Ok(call_string_builtin(env, "_str_left", &[&first, &count], DataType::DynamicString))
        }
        "RIGHT" => {
            let count = lower_expression(env, args.next().unwrap())?;
            Ok(call_string_builtin(env, "_str_right", &[&first, &count], DataType::DynamicString))
        }
        "MID" => {
            let pos = lower_expression(env, args.next().unwrap())?;
            match args.next() {
                Some(len_pair) => {
                    let len = lower_expression(env, len_pair)?;
                    Ok(call_string_builtin(env, "_str_mid", &[&first, &pos, &len], DataType::DynamicString))
                }
                None => Ok(call_string_builtin(env, "_str_mid", &[&first, &pos], DataType::DynamicString)),
            }
        }
        "INSTR" => {
            let needle = lower_expression(env, args.next().unwrap())?;
            if !needle.data_type.is_string() {
                return Err(err(env, code, "INSTR needle must be a string"));
            }
            Ok(call_string_builtin(env, "_str_instr", &[&first, &needle], DataType::Word))
        }
        "LEN" => Ok(call_string_builtin(env, "_str_len", &[&first], DataType::Word)),
        "CHR" => Ok(call_string_builtin(env, "_str_chr", &[&first], DataType::DynamicString)),
        "ASC" => Ok(call_string_builtin(env, "_str_asc", &[&first], DataType::Byte)),
        "STR" => Ok(call_string_builtin(env, "_str_from_number", &[&first], DataType::DynamicString)),
        "VAL" => Ok(call_string_builtin(env, "_str_to_number", &[&first], DataType::Word)),
        "UPPER" => Ok(call_string_builtin(env, "_str_upper", &[&first], DataType::DynamicString)),
        "LOWER" => Ok(call_string_builtin(env, "_str_lower", &[&first], DataType::DynamicString)),
        "FLIP" => Ok(call_string_builtin(env, "_str_flip", &[&first], DataType::DynamicString)),
        other => unreachable!("unexpected string function {:?}", other),
    }
}

/// Collapses a `value`/`expression`/... chain down to a bare integer
/// literal without emitting anything, for the handful of statement
/// operands (`BANK` address, `EVERY n TICKS`, `EXIT ..., n`) that need a
/// compile-time constant rather than a runtime value. Returns `None` as
/// soon as the chain contains an operator or a non-literal operand.
pub fn literal_value(pair: Pair<Rule>) -> Option<i64> {
    match pair.as_rule() {
        Rule::value => {
            let inner = pair.into_inner().next()?;
            match inner.as_rule() {
                Rule::direct_integer => Some(parse_int_text(inner.into_inner().next()?.as_str())),
                Rule::expression => literal_value(inner),
                _ => None,
            }
        }
        Rule::expression | Rule::or_expr | Rule::and_expr | Rule::compare_expr | Rule::add_expr
        | Rule::mul_expr => {
            let mut inner = pair.into_inner();
            let only = inner.next()?;
            if inner.next().is_some() {
                return None;
            }
            literal_value(only)
        }
        Rule::not_expr | Rule::unary_expr => None,
        Rule::primary => {
            let inner = pair.into_inner().next()?;
            literal_value(inner)
        }
        Rule::direct_integer => Some(parse_int_text(pair.into_inner().next()?.as_str())),
        Rule::int => Some(parse_int_text(pair.as_str())),
        _ => None,
    }
}

/// Lowers a `value` node (`direct_integer | expression`), the form used by
/// statement operands that accept either a raw numeric literal or a full
/// expression.
pub fn lower_value(env: &mut Environment, pair: Pair<Rule>) -> Result<Typed> {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::direct_integer => lower_int_literal(env, inner.into_inner().next().unwrap()),
        Rule::expression => lower_expression(env, inner),
        other => panic!("unexpected value kind {:?}", other),
    }
}

/// Evaluates an expression and, if needed, casts it to `target_type`,
/// warning (W002) on any narrowing.
pub fn lower_and_cast(env: &mut Environment, pair: Pair<Rule>, target_type: DataType) -> Result<Typed> {
    let value = lower_expression(env, pair)?;
    if value.data_type == target_type {
        return Ok(value);
    }
    if let (Some(from_bits), Some(to_bits)) = (value.data_type.width_bits(), target_type.width_bits()) {
        if to_bits < from_bits {
            env.diagnostics.push(Diagnostic::new(
                Code::W002,
                format!("implicit narrowing assignment from {:?} to {:?}", value.data_type, target_type),
                env.current_line,
            ));
        }
    } else if value.data_type.is_numeric() != target_type.is_numeric() {
        return Err(err(env, Code::E004, format!("cannot cast {:?} to {:?}", value.data_type, target_type)));
    }
    let casted = env.alloc_temporary(target_type);
    let lines = env.target.mov(&casted, &value.name, operand_width(target_type));
    env.sink.emit_lines(&lines);
    Ok(Typed::new(casted, target_type))
}
