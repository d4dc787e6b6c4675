//! Tests for error propagation, traces and result codes

use super::helpers::{eval_err, eval_ok, session};
use crate::interpreter::executor::types::ResultCode;

#[test]
fn test_trace_through_a_procedure() {
    let (mut interp, _) = session();
    eval_ok(&mut interp, "proc fail {} { error boom }");
    assert_eq!(eval_err(&mut interp, "fail"), "boom");
    assert_eq!(
        interp.error_info().as_deref(),
        Some(
            "boom\n    while executing\n\"error boom\"\n    (procedure \"fail\" line 1)\n    invoked from within\n\"fail\""
        )
    );
    assert_eq!(interp.error_code(), Some("NONE"));
}

#[test]
fn test_trace_reports_the_failing_line() {
    let (mut interp, _) = session();
    eval_ok(&mut interp, "proc f {} {\n    set a 1\n    nosuch $a\n}");
    eval_err(&mut interp, "f");
    let info = interp.error_info().unwrap_or_default();
    assert!(info.contains("(procedure \"f\" line 3)"), "{}", info);
    assert_eq!(interp.error().and_then(|e| e.line), Some(1));
}

#[test]
fn test_error_variables_are_set() {
    let (mut interp, _) = session();
    eval_err(&mut interp, "error msg {custom info} {APP FAILED}");
    assert_eq!(eval_ok(&mut interp, "set ::errorCode"), "APP FAILED");
    assert!(eval_ok(&mut interp, "set errorInfo").starts_with("custom info"));
}

#[test]
fn test_catch_collects_options() {
    let (mut interp, _) = session();
    assert_eq!(eval_ok(&mut interp, "catch {error a {} {X Y}} r opts"), "1");
    assert_eq!(eval_ok(&mut interp, "set r"), "a");
    assert_eq!(eval_ok(&mut interp, "lindex $opts 1"), "1");
    assert_eq!(eval_ok(&mut interp, "lindex $opts 7"), "X Y");
    assert_eq!(eval_ok(&mut interp, "catch {set ok 1} r opts; set opts"), "-code 0 -level 0");
    // The session itself saw no error
    assert_eq!(interp.code(), ResultCode::Ok);
}

#[test]
fn test_errors_unwind_loops_and_procedures() {
    let (mut interp, _) = session();
    eval_ok(&mut interp, "proc inner {} { foreach x {1 2 3} { if {$x == 2} { error \"stop at $x\" } } }");
    eval_ok(&mut interp, "proc outer {} { while 1 { inner } }");
    assert_eq!(eval_err(&mut interp, "outer"), "stop at 2");
    let info = interp.error_info().unwrap_or_default();
    assert!(info.contains("(procedure \"inner\" line 1)"));
    assert!(info.contains("(procedure \"outer\" line 1)"));
    assert!(interp.calls.is_empty());
}

#[test]
fn test_top_level_control_codes() {
    let (mut interp, _) = session();
    assert_eq!(eval_ok(&mut interp, "return 5"), "5");
    assert_eq!(eval_ok(&mut interp, "set a 1; return; set a 2"), "");
    assert_eq!(eval_ok(&mut interp, "set a"), "1");
    assert_eq!(eval_err(&mut interp, "break"), "invoked \"break\" outside of a loop");
    assert_eq!(eval_err(&mut interp, "continue"), "invoked \"continue\" outside of a loop");
}

#[test]
fn test_break_cannot_leave_a_procedure() {
    let (mut interp, _) = session();
    eval_ok(&mut interp, "proc leaky {} { break }");
    assert_eq!(
        eval_err(&mut interp, "while 1 { leaky }"),
        "invoked \"break\" outside of a loop"
    );
}

#[test]
fn test_return_code_options() {
    let (mut interp, _) = session();
    eval_ok(&mut interp, "proc raise {} { return -code error -errorcode {MY CODE} failed }");
    assert_eq!(eval_err(&mut interp, "raise"), "failed");
    assert_eq!(interp.error_code(), Some("MY CODE"));

    assert_eq!(eval_ok(&mut interp, "catch {return -code break}"), "3");
    assert_eq!(eval_ok(&mut interp, "catch {return -code continue}"), "4");
}

#[test]
fn test_parse_errors_become_results() {
    let (mut interp, _) = session();
    let code = interp.eval("set x \"unterminated");
    assert_eq!(code, ResultCode::Error);
    assert_eq!(interp.error_code(), Some("TCL PARSE"));
    assert_eq!(eval_err(&mut interp, "eval {set y [list a}"), "missing close-bracket");
}
