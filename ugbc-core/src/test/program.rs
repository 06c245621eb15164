use std::fs;
use std::path::PathBuf;

use ugbc_target::reference::ReferenceTarget;

use crate::emit::program::compile;

fn scratch_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("ugbc_test_{}_{}.asm", name, std::process::id()));
    p
}

fn compile_source(name: &str, source: &str) -> String {
    let source_path = scratch_path(&format!("{}_src", name));
    let asm_path = scratch_path(name);
    fs::write(&source_path, source).unwrap();
    let target = ReferenceTarget::c64();
    let outcome = compile(&source_path, &asm_path, None, &target, true).unwrap_or_else(|e| {
        panic!("compilation of {} failed: {}", name, e);
    });
    let text = fs::read_to_string(&outcome.asm_path).unwrap();
    let _ = fs::remove_file(&source_path);
    let _ = fs::remove_file(&outcome.asm_path);
    text
}

#[test]
fn remark_and_done_emits_the_default_org() {
    let asm = compile_source("scenario1", "REM hello\nDONE\n");
    assert!(asm.contains("org 32768"));
}

#[test]
fn byte_variable_is_defined_once_and_assigned_once() {
    let asm = compile_source("scenario2", "VAR X AS BYTE\nX = 3\nDONE\n");
    assert_eq!(1, asm.matches("X: .res 1").count());
    assert!(asm.lines().any(|l| l.contains("MOVB") && l.contains("#3")));
    assert!(asm.lines().any(|l| l.trim_start().starts_with("MOVB X,")));
}

#[test]
fn for_loop_has_one_begin_and_one_end_label() {
    let asm = compile_source("scenario3", "FOR I = 1 TO 3\nPRINT I\nNEXT\nDONE\n");
    let begin_labels = asm.lines().filter(|l| l.starts_with("_for") && l.ends_with(":") && !l.contains("_exit")).count();
    let exit_labels = asm.lines().filter(|l| l.starts_with("_for") && l.contains("_exit:")).count();
    assert_eq!(1, begin_labels);
    assert_eq!(1, exit_labels);
}

#[test]
fn if_else_endif_converges_at_a_single_label() {
    let asm = compile_source(
        "scenario4",
        "VAR A AS BYTE\nIF A = 1 THEN\nB = 2\nELSE\nB = 3\nENDIF\nDONE\n",
    );
    let endif_labels = asm.lines().filter(|l| l.contains("_endif:")).count();
    assert_eq!(1, endif_labels);
}

#[test]
fn randomize_then_random_byte_assigns_a_typed_temporary() {
    let asm = compile_source("scenario5", "RANDOMIZE\nVAR X AS BYTE\nX = RANDOM BYTE\nDONE\n");
    assert!(asm.to_ascii_uppercase().contains("RND"));
}

#[test]
fn every_ticks_gosub_registers_a_handler_with_its_tick_count() {
    let asm = compile_source(
        "scenario6",
        "TICK:\nRETURN\nEVERY 50 TICKS GOSUB TICK\nEVERY ON\nDONE\n",
    );
    assert!(asm.contains("every 50 ticks -> TICK"));
}
