//! Tests for evaluation limits

use super::helpers::{eval_err, eval_ok};
use crate::config::Limits;
use crate::interpreter::host::MemoryHost;
use crate::interpreter::session::Interp;

const TOO_DEEP: &str = "too many nested evaluations (infinite loop?)";

fn limited(limits: Limits) -> Interp {
    Interp::with_host_and_limits(Box::new(MemoryHost::new()), limits)
}

#[test]
fn test_call_depth_limit() {
    let mut interp = limited(Limits {
        max_call_depth: 50,
        ..Limits::default()
    });
    eval_ok(&mut interp, "proc down {n} { if {$n == 0} { return ok }; down [expr {$n - 1}] }");
    assert_eq!(eval_ok(&mut interp, "down 40"), "ok");
    assert_eq!(eval_err(&mut interp, "down 60"), TOO_DEEP);
    assert_eq!(interp.error_code(), Some("TCL LIMIT"));
    // The session recovers
    assert_eq!(eval_ok(&mut interp, "down 3"), "ok");
}

#[test]
fn test_frame_limit() {
    let mut interp = limited(Limits {
        max_frames: 40,
        ..Limits::default()
    });
    eval_ok(&mut interp, "proc forever {} { forever }");
    assert_eq!(eval_err(&mut interp, "forever"), TOO_DEEP);
    assert!(interp.calls.is_empty());
}

#[test]
fn test_nesting_limit() {
    let mut interp = limited(Limits {
        max_nesting: 10,
        ..Limits::default()
    });
    eval_ok(&mut interp, "proc nest {} { expr {[nest] + 1} }");
    assert_eq!(eval_err(&mut interp, "nest"), TOO_DEEP);
    assert_eq!(interp.nesting, 0);
}

#[test]
fn test_node_limit() {
    let mut interp = limited(Limits {
        max_nodes: 8,
        ..Limits::default()
    });
    let message = eval_err(&mut interp, "set a 1; set b 2; set c 3; set d 4");
    assert!(message.starts_with("script too large"), "{}", message);
    assert_eq!(interp.error_code(), Some("TCL PARSE"));
}
