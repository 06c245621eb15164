use pest::iterators::Pair;

use ugbc_target::{screen::resolve_mode, DataType, Width};

use super::expr::{self, Typed};
use crate::control::{Conditional, Loop, LoopKind, StepValue};
use crate::env::Environment;
use crate::error::{Code, Diagnostic, Result};
use crate::parser::Rule;
use crate::symbols::{Bank, BankKind, Parameter, Variable};

fn err(env: &Environment, code: Code, message: impl Into<String>) -> Diagnostic {
    Diagnostic::new(code, message, env.current_line)
}

fn width_of(data_type: DataType) -> Width {
    match data_type.width_bits() {
        Some(8) => Width::Byte,
        Some(32) => Width::DWord,
        _ => Width::Word,
    }
}

/// Lowers one `line` pair: an optional label followed by an optional
/// `statement_list`. Labels land on the emitted assembly as a plain label
/// so `GOTO`/`GOSUB` can reference them directly by name.
pub fn lower_line(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::line_label => env.sink.emit_label(&format!("_line{}", part.as_str())),
            Rule::named_label => {
                let name = part.into_inner().next().unwrap().as_str();
                env.sink.emit_label(name);
            }
            Rule::statement_list => {
                for stmt in part.into_inner() {
                    lower_statement(env, stmt)?;
                }
            }
            other => panic!("unexpected line member {:?}", other),
        }
    }
    Ok(())
}

fn lower_statement(env: &mut Environment, stmt: Pair<Rule>) -> Result<()> {
    let inner = stmt.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::statement_remark => Ok(()),
        Rule::statement_done => {
            env.sink.emit_lines(&env.target.ret());
            Ok(())
        }
        Rule::statement_bank => lower_bank(env, inner),
        Rule::statement_var => lower_var(env, inner),
        Rule::statement_raster => lower_raster(env, inner),
        Rule::statement_color => lower_color(env, inner),
        Rule::statement_wait => lower_wait(env, inner),
        Rule::statement_sprite => lower_sprite(env, inner),
        Rule::statement_bitmap => lower_chipset_surface(env, inner, Surface::Bitmap),
        Rule::statement_textmap => lower_chipset_surface(env, inner, Surface::Textmap),
        Rule::statement_colormap => lower_chipset_surface(env, inner, Surface::Colormap),
        Rule::statement_tiles => lower_chipset_surface(env, inner, Surface::Tiles),
        Rule::statement_screen => lower_screen(env, inner),
        Rule::statement_point => lower_point(env, inner),
        Rule::statement_randomize => {
            env.sink.emit_lines(&env.target.sys_call("randomize", "0"));
            Ok(())
        }
        Rule::statement_debug => lower_debug(env, inner),
        Rule::statement_on_goto => lower_on_jump(env, inner, true),
        Rule::statement_on_gosub => lower_on_jump(env, inner, false),
        Rule::statement_every => lower_every(env, inner),
        Rule::statement_if => lower_if(env, inner),
        Rule::statement_elseif => lower_elseif(env, inner),
        Rule::statement_else => lower_else(env),
        Rule::statement_endif => lower_endif(env),
        Rule::statement_do => lower_do(env),
        Rule::statement_loop => lower_loop_close(env),
        Rule::statement_while => lower_while(env, inner),
        Rule::statement_wend => lower_wend(env),
        Rule::statement_repeat => lower_repeat(env),
        Rule::statement_until => lower_until(env, inner),
        Rule::statement_for => lower_for(env, inner),
        Rule::statement_next => lower_next(env, inner),
        Rule::statement_exit => lower_exit(env, inner),
        Rule::statement_begin_gameloop => lower_begin_gameloop(env),
        Rule::statement_end_gameloop => lower_end_gameloop(env),
        Rule::statement_proc => lower_proc(env, inner),
        Rule::statement_endproc => lower_endproc(env),
        Rule::statement_call => lower_call(env, inner),
        Rule::statement_shared => lower_shared(env, inner),
        Rule::statement_global => lower_global(env, inner),
        Rule::statement_print => lower_print(env, inner),
        Rule::statement_goto => lower_goto(env, inner),
        Rule::statement_gosub => lower_gosub(env, inner),
        Rule::statement_return => {
            env.sink.emit_lines(&env.target.ret());
            Ok(())
        }
        Rule::statement_pop => {
            env.sink.emit_lines(&env.target.drop_frame());
            Ok(())
        }
        Rule::statement_assign => lower_assign(env, inner),
        other => panic!("unexpected statement kind {:?}", other),
    }
}

// ---- Declarations -------------------------------------------------------

fn lower_bank(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_owned();
    let kind_text = inner.next().unwrap().as_str().to_ascii_uppercase();
    let kind = match kind_text.as_str() {
        "VARIABLES" => BankKind::Variables,
        "TEMPORARY" => BankKind::Temporary,
        "STRINGS" => BankKind::Strings,
        "CODE" => BankKind::Code,
        "DATA" => BankKind::Data,
        other => unreachable!("unexpected bank_kind {:?}", other),
    };
    let address_pair = inner.next().unwrap();
    let start_address = expr::literal_value(address_pair)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| err(env, Code::E009, "bank address must be a constant"))?;
    let mut bank = Bank::new(name, kind, start_address);
    if let Some(file_pair) = inner.next() {
        let raw = file_pair.as_str();
        bank = bank.with_file(raw[1..raw.len() - 1].to_owned());
    }
    env.declare_bank(bank);
    Ok(())
}

fn lower_var(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_owned();
    let mut bank_name = None;
    let mut data_type = DataType::Word;
    let mut initializer = None;
    let mut shape = None;
    let mut buffer_size = None;

    for part in inner {
        match part.as_rule() {
            Rule::identifier => bank_name = Some(part.as_str().to_owned()),
            Rule::type_name => data_type = parse_type_name(part.as_str()),
            Rule::array_type => {
                data_type = DataType::Array;
                shape = Some(parse_array_type(part));
            }
            Rule::sized_type => {
                data_type = DataType::Buffer;
                buffer_size = Some(parse_sized_type(part));
            }
            Rule::expression => initializer = Some(part),
            other => panic!("unexpected statement_var member {:?}", other),
        }
    }

    let mut variable = if data_type == DataType::Bit {
        env.bitmask_needed = true;
        let (pack_name, bit) = env.alloc_bit();
        let mut v = Variable::new(name.clone(), pack_name, DataType::Bit);
        v.bit_offset = Some(bit);
        v
    } else {
        Variable::new(name.clone(), name.clone(), data_type)
    };
    variable.bank = bank_name;
    if let Some(shape) = shape {
        variable.shape = Some(shape);
    }
    if let Some(size) = buffer_size {
        variable.size = size;
    }
    let real_name = variable.real_name.clone();
    let bit_offset = variable.bit_offset;
    env.define_variable(variable);

    if let Some(init_pair) = initializer {
        if data_type == DataType::Bit {
            lower_bit_write(env, &real_name, bit_offset.unwrap_or(0), init_pair)?;
        } else {
            let value = expr::lower_and_cast(env, init_pair, data_type)?;
            env.sink.emit_lines(&env.target.mov(&real_name, &value.name, width_of(data_type)));
        }
    }
    Ok(())
}

fn parse_array_type(pair: Pair<Rule>) -> crate::symbols::ArrayShape {
    let mut dimensions = Vec::new();
    let mut element_type = DataType::Byte;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::int => dimensions.push(expr::literal_value(part).unwrap_or(0) as u32),
            Rule::type_name => element_type = parse_type_name(part.as_str()),
            other => panic!("unexpected array_type member {:?}", other),
        }
    }
    crate::symbols::ArrayShape { dimensions, element_type }
}

fn parse_sized_type(pair: Pair<Rule>) -> usize {
    let int_pair = pair.into_inner().next().unwrap();
    expr::literal_value(int_pair).unwrap_or(0).max(0) as usize
}

/// Writes `value_pair` into bit `bit` of the shared packed byte
/// `pack_name`, leaving every other bit in that byte untouched: preset the
/// mask, OR it in when the value is non-zero, otherwise AND in its
/// complement.
fn lower_bit_write(env: &mut Environment, pack_name: &str, bit: u8, value_pair: Pair<Rule>) -> Result<()> {
    let value = expr::lower_and_cast(env, value_pair, DataType::Byte)?;
    let mask = 1u8 << bit;
    let mask_tmp = env.alloc_temporary(DataType::Byte);
    env.sink.emit_lines(&env.target.mov_immediate(&mask_tmp, i64::from(mask), Width::Byte));

    let clear_label = format!("_bit{}_clear", env.unique_id());
    let done_label = format!("_bit{}_done", env.unique_id());
    env.sink.emit_lines(&env.target.bveq(&value.name, &clear_label));
    env.sink.emit_lines(&env.target.alu(ugbc_target::AluOp::Or, pack_name, pack_name, &mask_tmp, Width::Byte));
    env.sink.emit_lines(&env.target.jump(&done_label));
    env.sink.emit_label(&clear_label);
    let inverted = env.alloc_temporary(DataType::Byte);
    env.sink.emit_lines(&env.target.not(&inverted, &mask_tmp, Width::Byte));
    env.sink.emit_lines(&env.target.alu(ugbc_target::AluOp::And, pack_name, pack_name, &inverted, Width::Byte));
    env.sink.emit_label(&done_label);
    Ok(())
}

fn parse_type_name(text: &str) -> DataType {
    match text.to_ascii_uppercase().as_str() {
        "SBYTE" => DataType::SignedByte,
        "BYTE" => DataType::Byte,
        "SWORD" => DataType::SignedWord,
        "WORD" => DataType::Word,
        "SDWORD" => DataType::SignedDWord,
        "DWORD" => DataType::DWord,
        "ADDRESS" => DataType::Address,
        "POSITION" => DataType::Position,
        "COLOR" => DataType::Color,
        "STRING" => DataType::DynamicString,
        "BUFFER" => DataType::Buffer,
        "ARRAY" => DataType::Array,
        "BIT" => DataType::Bit,
        other => unreachable!("unexpected type_name {:?}", other),
    }
}

// ---- Hardware statements -------------------------------------------------

fn lower_raster(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let mut inner = pair.into_inner();
    let line = expr::lower_value(env, inner.next().unwrap())?;
    let handler = inner.next().unwrap().as_str();
    env.sink.emit_lines(&env.target.raster_at(&line.name, handler));
    Ok(())
}

fn color_value_name(env: &mut Environment, pair: Pair<Rule>) -> Result<String> {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::color_enumeration => {
            let result = env.alloc_temporary(DataType::Color);
            let name = inner.as_str().to_ascii_uppercase();
            env.sink.emit_lines(&env.target.color_constant(&result, &name));
            Ok(result)
        }
        Rule::expression => Ok(expr::lower_expression(env, inner)?.name),
        other => panic!("unexpected color_value member {:?}", other),
    }
}

fn lower_color(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let text = pair.as_str().to_ascii_uppercase();
    let mut inner = pair.into_inner();
    if text.contains("BORDER") {
        let color = color_value_name(env, inner.next().unwrap())?;
        env.sink.emit_lines(&env.target.color_border(&color));
    } else if text.contains("BACKGROUND") {
        let index = expr::lower_value(env, inner.next().unwrap())?;
        let color = color_value_name(env, inner.next().unwrap())?;
        env.sink.emit_lines(&env.target.color_background(&index.name, &color));
    } else {
        let index = expr::lower_value(env, inner.next().unwrap())?;
        let color = color_value_name(env, inner.next().unwrap())?;
        env.sink.emit_lines(&env.target.color_sprite(&index.name, &color));
    }
    Ok(())
}

fn lower_wait(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let mut inner = pair.into_inner();
    let amount = expr::lower_value(env, inner.next().unwrap())?;
    let unit = inner.next().unwrap().as_str().to_ascii_uppercase();
    let lines = match unit.as_str() {
        "CYCLES" => env.target.wait_cycles(&amount.name),
        "TICKS" => env.target.wait_ticks(&amount.name),
        "MILLISECONDS" | "MILLISECOND" | "MS" => env.target.wait_ms(&amount.name),
        other => unreachable!("unexpected wait_unit {:?}", other),
    };
    env.sink.emit_lines(&lines);
    Ok(())
}

fn lower_sprite(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let text = pair.as_str().to_ascii_uppercase();
    let mut inner = pair.into_inner();
    let index = expr::lower_value(env, inner.next().unwrap())?;

    if text.contains("LOAD") {
        let label = inner.next().unwrap().as_str();
        env.sink.emit_lines(&env.target.sprite_load(&index.name, label));
    } else if text.contains("MULTICOLOR") {
        let on = inner.next().unwrap().as_str().eq_ignore_ascii_case("ON");
        env.sink.emit_lines(&env.target.sprite_set_multicolor(&index.name, on));
    } else if text.contains("MONOCOLOR") {
        env.sink.emit_lines(&env.target.sprite_set_multicolor(&index.name, false));
    } else if text.contains("COLOR") {
        let color = color_value_name(env, inner.next().unwrap())?;
        env.sink.emit_lines(&env.target.sprite_set_color(&index.name, &color));
    } else if text.contains("AT") {
        let x = expr::lower_value(env, inner.next().unwrap())?;
        let y = expr::lower_value(env, inner.next().unwrap())?;
        env.sink.emit_lines(&env.target.sprite_set_position(&index.name, &x.name, &y.name));
    } else if text.contains("ENABLE") {
        env.sink.emit_lines(&env.target.sprite_enable(&index.name, true));
    } else if text.contains("DISABLE") {
        env.sink.emit_lines(&env.target.sprite_enable(&index.name, false));
    } else if text.contains("EXPAND") {
        let horizontal = inner.next().unwrap().as_str().eq_ignore_ascii_case("HORIZONTAL");
        env.sink.emit_lines(&env.target.sprite_expand(&index.name, horizontal, true));
    } else if text.contains("COMPRESS") {
        let horizontal = inner.next().unwrap().as_str().eq_ignore_ascii_case("HORIZONTAL");
        env.sink.emit_lines(&env.target.sprite_expand(&index.name, horizontal, false));
    }
    Ok(())
}

enum Surface {
    Bitmap,
    Textmap,
    Colormap,
    Tiles,
}

fn lower_chipset_surface(env: &mut Environment, pair: Pair<Rule>, surface: Surface) -> Result<()> {
    let body = pair.into_inner().next().unwrap();
    let text = body.as_str().to_ascii_uppercase();
    let mut inner = body.into_inner();

    if text.starts_with("DISABLE") {
        // Only BITMAP has a dedicated disable verb; the other surfaces fall
        // back to clearing the screen buffer they share with text mode.
        let lines = match surface {
            Surface::Bitmap => env.target.bitmap_disable(),
            _ => env.target.screen_clear(None),
        };
        env.sink.emit_lines(&lines);
        return Ok(());
    }
    if text.starts_with("CLEAR") {
        let value = match inner.next() {
            Some(p) => Some(expr::lower_value(env, p)?),
            None => None,
        };
        env.sink.emit_lines(&env.target.screen_clear(value.as_ref().map(|t| t.name.as_str())));
        return Ok(());
    }

    let mut address = None;
    for part in inner {
        let value = expr::lower_value(env, part)?;
        address = Some(value);
    }
    let address_name = address.as_ref().map(|t| t.name.clone());

    let lines = match surface {
        Surface::Bitmap => {
            let mode = resolve_mode(env.target.screen_modes(), 0, 0, 0, true)
                .ok_or_else(|| err(env, Code::E008, "no bitmap screen mode available on this target"))?;
            env.target.bitmap_enable(mode, address_name.as_deref())
        }
        Surface::Textmap => env.target.textmap_enable(address_name.as_deref()),
        Surface::Colormap => env.target.colormap_enable(address_name.as_deref()),
        Surface::Tiles => env.target.tiles_enable(address_name.as_deref()),
    };
    env.sink.emit_lines(&lines);
    Ok(())
}

fn lower_screen(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let text = pair.as_str().to_ascii_uppercase();
    let mut inner = pair.into_inner();
    if text.ends_with("ON") {
        env.sink.emit_lines(&env.target.screen_on());
    } else if text.ends_with("OFF") {
        env.sink.emit_lines(&env.target.screen_off());
    } else if text.contains("ROWS") {
        let rows = expr::lower_value(env, inner.next().unwrap())?;
        env.sink.emit_lines(&env.target.screen_rows(&rows.name));
    } else if text.contains("VERTICAL") {
        let amount = expr::lower_value(env, inner.next().unwrap())?;
        env.sink.emit_lines(&env.target.screen_scroll(false, &amount.name));
    } else if text.contains("HORIZONTAL") {
        let amount = expr::lower_value(env, inner.next().unwrap())?;
        env.sink.emit_lines(&env.target.screen_scroll(true, &amount.name));
    }
    Ok(())
}

fn lower_point(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let mut inner = pair.into_inner();
    let x = expr::lower_value(env, inner.next().unwrap())?;
    let y = expr::lower_value(env, inner.next().unwrap())?;
    env.sink.emit_lines(&env.target.point_at(&x.name, &y.name));
    Ok(())
}

fn lower_debug(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    for arg in pair.into_inner() {
        let value = expr::lower_expression(env, arg)?;
        let lines = if value.data_type.is_string() {
            env.target.print_string(&value.name)
        } else {
            env.target.print_number(&value.name)
        };
        env.sink.emit_lines(&lines);
    }
    Ok(())
}

fn lower_on_jump(env: &mut Environment, pair: Pair<Rule>, is_goto: bool) -> Result<()> {
    let mut inner = pair.into_inner();
    let selector = expr::lower_expression(env, inner.next().unwrap())?;
    let targets: Vec<String> = inner.map(|p| p.as_str().to_owned()).collect();

    let mut next_check = env.unique_id();
    for (i, target) in targets.iter().enumerate() {
        let n = i as i64 + 1;
        let literal = env.alloc_temporary(selector.data_type);
        env.sink.emit_lines(&env.target.mov_immediate(&literal, n, width_of(selector.data_type)));
        let skip_label = format!("_on{}_skip", next_check);
        next_check += 1;
        env.sink.emit_lines(&env.target.compare_and_branch(
            ugbc_target::CompareOp::Ne,
            &selector.name,
            &literal,
            &skip_label,
            width_of(selector.data_type),
        ));
        if is_goto {
            env.sink.emit_lines(&env.target.jump(target));
        } else {
            env.sink.emit_lines(&env.target.call(target));
        }
        env.sink.emit_lines(&env.target.label(&skip_label));
    }
    Ok(())
}

fn lower_every(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let text = pair.as_str().to_ascii_uppercase();
    if text.ends_with("ON") {
        env.every.set_enabled(true);
        return Ok(());
    }
    if text.ends_with("OFF") {
        env.every.set_enabled(false);
        return Ok(());
    }
    let mut inner = pair.into_inner();
    let ticks_pair = inner.next().unwrap();
    let ticks = expr::literal_value(ticks_pair)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| err(env, Code::E009, "EVERY tick count must be a constant"))?;
    let label = inner.next().unwrap().as_str().to_owned();
    env.every.register(ticks, label);
    Ok(())
}

// ---- Conditionals and loops ----------------------------------------------

fn lower_if(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let cond_pair = pair.into_inner().next().unwrap();
    let cond = expr::lower_expression(env, cond_pair)?;
    let id = env.unique_id();
    let else_label = format!("_if{}_else", id);
    env.sink.emit_lines(&env.target.bveq(&cond.name, &else_label));
    env.control.push_conditional(Conditional { else_label, endif_label: None });
    Ok(())
}

fn lower_elseif(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let current = env
        .control
        .pop_conditional()
        .ok_or_else(|| err(env, Code::E032, "ELSE IF without a matching IF"))?;
    let id = env.unique_id();
    let endif_label = current.endif_label.unwrap_or_else(|| format!("_if{}_endif", id));
    env.sink.emit_lines(&env.target.jump(&endif_label));
    env.sink.emit_label(&current.else_label);

    let cond_pair = pair.into_inner().next().unwrap();
    let cond = expr::lower_expression(env, cond_pair)?;
    let next_else = format!("_if{}_else", id);
    env.sink.emit_lines(&env.target.bveq(&cond.name, &next_else));
    env.control.push_conditional(Conditional { else_label: next_else, endif_label: Some(endif_label) });
    Ok(())
}

fn lower_else(env: &mut Environment) -> Result<()> {
    let current = env
        .control
        .pop_conditional()
        .ok_or_else(|| err(env, Code::E032, "ELSE without a matching IF"))?;
    let id = env.unique_id();
    let endif_label = current.endif_label.unwrap_or_else(|| format!("_if{}_endif", id));
    env.sink.emit_lines(&env.target.jump(&endif_label));
    env.sink.emit_label(&current.else_label);
    env.control.push_conditional(Conditional { else_label: endif_label.clone(), endif_label: Some(endif_label) });
    Ok(())
}

fn lower_endif(env: &mut Environment) -> Result<()> {
    let current = env
        .control
        .pop_conditional()
        .ok_or_else(|| err(env, Code::E032, "ENDIF without a matching IF"))?;
    env.sink.emit_label(&current.else_label);
    if let Some(endif) = current.endif_label {
        if endif != current.else_label {
            env.sink.emit_label(&endif);
        }
    }
    Ok(())
}

fn lower_do(env: &mut Environment) -> Result<()> {
    let id = env.unique_id();
    let begin_label = format!("_do{}", id);
    let exit_label = format!("_do{}_exit", id);
    env.sink.emit_label(&begin_label);
    env.control.push_loop(Loop { kind: LoopKind::Do, begin_label, exit_label });
    Ok(())
}

fn lower_loop_close(env: &mut Environment) -> Result<()> {
    let l = env.control.pop_loop().ok_or_else(|| err(env, Code::E033, "LOOP without a matching DO"))?;
    env.sink.emit_lines(&env.target.jump(&l.begin_label));
    env.sink.emit_label(&l.exit_label);
    Ok(())
}

fn lower_while(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let id = env.unique_id();
    let begin_label = format!("_while{}", id);
    let exit_label = format!("_while{}_exit", id);
    env.sink.emit_label(&begin_label);
    let cond_pair = pair.into_inner().next().unwrap();
    let cond = expr::lower_expression(env, cond_pair)?;
    env.sink.emit_lines(&env.target.bveq(&cond.name, &exit_label));
    env.control.push_loop(Loop { kind: LoopKind::While, begin_label, exit_label });
    Ok(())
}

fn lower_wend(env: &mut Environment) -> Result<()> {
    let l = env.control.pop_loop().ok_or_else(|| err(env, Code::E033, "WEND without a matching WHILE"))?;
    env.sink.emit_lines(&env.target.jump(&l.begin_label));
    env.sink.emit_label(&l.exit_label);
    Ok(())
}

fn lower_repeat(env: &mut Environment) -> Result<()> {
    let id = env.unique_id();
    let begin_label = format!("_repeat{}", id);
    let exit_label = format!("_repeat{}_exit", id);
    env.sink.emit_label(&begin_label);
    env.control.push_loop(Loop { kind: LoopKind::Repeat, begin_label, exit_label });
    Ok(())
}

fn lower_until(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let l = env.control.pop_loop().ok_or_else(|| err(env, Code::E033, "UNTIL without a matching REPEAT"))?;
    let cond_pair = pair.into_inner().next().unwrap();
    let cond = expr::lower_expression(env, cond_pair)?;
    env.sink.emit_lines(&env.target.bveq(&cond.name, &l.begin_label));
    env.sink.emit_label(&l.exit_label);
    Ok(())
}

fn lower_for(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let mut inner = pair.into_inner();
    let index_name = inner.next().unwrap().as_str().to_owned();
    let start = expr::lower_expression(env, inner.next().unwrap())?;
    let limit = expr::lower_expression(env, inner.next().unwrap())?;
    let step_pair = inner.next();

    let index_var = match env.lookup_variable(&index_name) {
        Some(v) => v.real_name.clone(),
        None => {
            env.define_variable(Variable::new(index_name.clone(), index_name.clone(), start.data_type));
            index_name.clone()
        }
    };
    env.sink.emit_lines(&env.target.mov(&index_var, &start.name, width_of(start.data_type)));

    let limit_var = env.alloc_temporary(limit.data_type);
    env.sink.emit_lines(&env.target.mov(&limit_var, &limit.name, width_of(limit.data_type)));

    let step = match step_pair {
        Some(p) => {
            let value = expr::lower_expression(env, p)?;
            StepValue::Runtime(value.name)
        }
        None => StepValue::Constant(1),
    };

    let id = env.unique_id();
    let begin_label = format!("_for{}", id);
    let exit_label = format!("_for{}_exit", id);
    env.sink.emit_label(&begin_label);

    let cmp_op = match &step {
        StepValue::Constant(n) if *n < 0 => ugbc_target::CompareOp::Lt,
        _ => ugbc_target::CompareOp::Gt,
    };
    env.sink.emit_lines(&env.target.compare_and_branch(
        cmp_op,
        &index_var,
        &limit_var,
        &exit_label,
        width_of(start.data_type),
    ));

    env.control.push_loop(Loop {
        kind: LoopKind::For { index_var, limit_var, step: Some(step) },
        begin_label,
        exit_label,
    });
    Ok(())
}

fn lower_next(env: &mut Environment, _pair: Pair<Rule>) -> Result<()> {
    let l = env.control.pop_loop().ok_or_else(|| err(env, Code::E033, "NEXT without a matching FOR"))?;
    if let LoopKind::For { index_var, step, .. } = &l.kind {
        let width = Width::Word;
        match step {
            Some(StepValue::Constant(n)) => {
                let delta = env.alloc_temporary(DataType::Word);
                env.sink.emit_lines(&env.target.mov_immediate(&delta, *n, width));
                env.sink.emit_lines(&env.target.alu(ugbc_target::AluOp::Add, index_var, index_var, &delta, width));
            }
            Some(StepValue::Runtime(step_var)) => {
                env.sink.emit_lines(&env.target.alu(ugbc_target::AluOp::Add, index_var, index_var, step_var, width));
            }
            None => {}
        }
    }
    env.sink.emit_lines(&env.target.jump(&l.begin_label));
    env.sink.emit_label(&l.exit_label);
    Ok(())
}

fn lower_exit(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let mut inner = pair.into_inner();
    let mut cond = None;
    let mut depth_pair = None;
    for part in inner.by_ref() {
        match part.as_rule() {
            Rule::expression => cond = Some(part),
            Rule::value => depth_pair = Some(part),
            other => panic!("unexpected statement_exit member {:?}", other),
        }
    }
    let depth = match depth_pair {
        Some(p) => expr::literal_value(p).and_then(|v| u32::try_from(v).ok()).unwrap_or(1),
        None => 1,
    };
    let target_exit = env
        .control
        .nth_enclosing_loop(depth)
        .map(|l| l.exit_label.clone())
        .ok_or_else(|| err(env, Code::E034, "EXIT outside a loop"))?;

    match cond {
        Some(cond_pair) => {
            let value = expr::lower_expression(env, cond_pair)?;
            let continue_label = format!("_exit{}_skip", env.unique_id());
            env.sink.emit_lines(&env.target.bveq(&value.name, &continue_label));
            env.sink.emit_lines(&env.target.jump(&target_exit));
            env.sink.emit_label(&continue_label);
        }
        None => env.sink.emit_lines(&env.target.jump(&target_exit)),
    }
    Ok(())
}

fn lower_begin_gameloop(env: &mut Environment) -> Result<()> {
    env.has_game_loop = true;
    env.sink.emit_label("_gameloop");
    Ok(())
}

fn lower_end_gameloop(env: &mut Environment) -> Result<()> {
    env.has_game_loop = false;
    env.sink.emit_lines(&env.target.jump("_gameloop"));
    Ok(())
}

// ---- Procedures -----------------------------------------------------------

fn lower_proc(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_owned();
    env.begin_procedure(name.clone())?;
    env.sink.emit_label(&name);

    for param_pair in inner {
        let mut p = param_pair.into_inner();
        let param_name = p.next().unwrap().as_str().to_owned();
        let data_type = parse_type_name(p.next().unwrap().as_str());
        env.pending.procedure_parameters.push(Parameter { name: param_name.clone(), data_type });
        env.define_variable(Variable::new(param_name.clone(), param_name, data_type));
    }
    Ok(())
}

fn lower_endproc(env: &mut Environment) -> Result<()> {
    env.end_procedure()?;
    env.sink.emit_lines(&env.target.ret());
    Ok(())
}

fn lower_call(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_owned();
    let proc = env
        .find_procedure(&name)
        .cloned()
        .ok_or_else(|| err(env, Code::E039, format!("call to undefined procedure \"{}\"", name)))?;
    let args: Vec<Pair<Rule>> = inner.collect();
    if args.len() != proc.parameters.len() {
        return Err(err(
            env,
            Code::E040,
            format!("\"{}\" expects {} argument(s), got {}", name, proc.parameters.len(), args.len()),
        ));
    }
    for (arg_pair, param) in args.into_iter().zip(proc.parameters.iter()) {
        let value = expr::lower_and_cast(env, arg_pair, param.data_type)?;
        env.sink.emit_lines(&env.target.mov(&param.name, &value.name, width_of(param.data_type)));
    }
    env.sink.emit_lines(&env.target.call(&name));
    Ok(())
}

fn lower_shared(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    if env.current_procedure().is_none() {
        return Err(err(env, Code::E041, "SHARED outside a PROC body"));
    }
    let name = pair.into_inner().next().unwrap().as_str();
    if let Some(v) = env.lookup_variable_mut(name) {
        v.imported = true;
    }
    Ok(())
}

fn lower_global(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    if env.current_procedure().is_some() {
        return Err(err(env, Code::E042, "GLOBAL inside a PROC body"));
    }
    let name = pair.into_inner().next().unwrap().as_str();
    if let Some(v) = env.lookup_variable_mut(name) {
        v.imported = false;
    }
    Ok(())
}

// ---- Print, jumps, assignment ---------------------------------------------

fn lower_print(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    for arg in pair.into_inner() {
        let value = expr::lower_expression(env, arg)?;
        let lines = if value.data_type.is_string() {
            env.target.print_string(&value.name)
        } else {
            env.target.print_number(&value.name)
        };
        env.sink.emit_lines(&lines);
    }
    Ok(())
}

fn lower_goto(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let label = pair.into_inner().next().unwrap().as_str();
    env.sink.emit_lines(&env.target.jump(label));
    Ok(())
}

fn lower_gosub(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let label = pair.into_inner().next().unwrap().as_str();
    env.sink.emit_lines(&env.target.call(label));
    Ok(())
}

fn lower_assign(env: &mut Environment, pair: Pair<Rule>) -> Result<()> {
    let mut inner = pair.into_inner();
    let target = inner.next().unwrap();
    let value_pair = inner.next().unwrap();

    match target.as_rule() {
        Rule::splice_target => lower_splice_assign(env, target, value_pair),
        Rule::identifier => {
            let name = target.as_str().to_owned();
            let forced_string = name.ends_with('$');
            match env.lookup_variable(&name).cloned() {
                Some(existing) if existing.data_type == DataType::Bit => {
                    lower_bit_write(env, &existing.real_name, existing.bit_offset.unwrap_or(0), value_pair)?;
                }
                Some(existing) => {
                    let value = expr::lower_and_cast(env, value_pair, existing.data_type)?;
                    env.sink.emit_lines(&env.target.mov(&existing.real_name, &value.name, width_of(existing.data_type)));
                }
                // first assignment to a name with no prior VAR declares it.
                // A `$`-suffixed name always declares as a string, even when
                // the right-hand side is numeric (which then must be cast
                // through a string conversion, not a raw move); anything
                // else takes the type the right-hand side evaluated to.
                None if forced_string => {
                    let value = expr::lower_and_cast(env, value_pair, DataType::DynamicString)?;
                    env.define_variable(Variable::new(name.clone(), name.clone(), DataType::DynamicString));
                    env.sink.emit_lines(&env.target.mov(&name, &value.name, width_of(DataType::DynamicString)));
                }
                None => {
                    let value = expr::lower_expression(env, value_pair)?;
                    let data_type = value.data_type;
                    env.define_variable(Variable::new(name.clone(), name.clone(), data_type));
                    env.sink.emit_lines(&env.target.mov(&name, &value.name, width_of(data_type)));
                }
            }
            Ok(())
        }
        other => panic!("unexpected statement_assign target {:?}", other),
    }
}

/// `LEFT$(a$, n) = expr` / `RIGHT$(a$, n) = expr` / `MID$(a$, p[, n]) = expr`
/// all route through the string runtime the same way a string function
/// call does, just with one more argument (the replacement) and no result
/// read back into a fresh temporary.
fn lower_splice_assign(env: &mut Environment, target: Pair<Rule>, value_pair: Pair<Rule>) -> Result<()> {
    let text = target.as_str().to_ascii_uppercase();
    let mut inner = target.into_inner();
    let subject_name = inner.next().unwrap().as_str().to_owned();
    let subject = env
        .lookup_variable(&subject_name)
        .cloned()
        .ok_or_else(|| err(env, Code::E002, format!("splice of undefined variable \"{}\"", subject_name)))?;

    let label = if text.starts_with("LEFT") {
        "_str_splice_left"
    } else if text.starts_with("RIGHT") {
        "_str_splice_right"
    } else {
        "_str_splice_mid"
    };

    let mut args = vec![Typed::new(subject.real_name.clone(), subject.data_type)];
    for part in inner {
        args.push(expr::lower_expression(env, part)?);
    }
    let replacement = expr::lower_expression(env, value_pair)?;
    args.push(replacement);

    env.deploy(ugbc_target::Deployable::Dstring);
    for (i, arg) in args.iter().enumerate() {
        let slot = format!("_str_arg{}", i);
        let width = width_of(arg.data_type);
        env.sink.emit_lines(&env.target.mov(&slot, &arg.name, width));
    }
    env.sink.emit_lines(&env.target.call(label));
    Ok(())
}
