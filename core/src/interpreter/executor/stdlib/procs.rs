//! Procedure commands: proc, apply, return, error

use super::{arity, list_error, parse_int, wrong_args};
use crate::interpreter::executor::binding::ParamSpec;
use crate::interpreter::executor::dispatch::invoke_procedure;
use crate::interpreter::executor::errors::{ErrorInfo, BAD_VALUE, USER};
use crate::interpreter::executor::types::{Completion, Exception, Value};
use crate::interpreter::host::ProcDef;
use crate::interpreter::session::Interp;

/// `proc name args body`
pub fn proc_(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 3, 3, "name args body")?;
    // Reject malformed parameter lists at definition time
    ParamSpec::parse(interp.host.as_ref(), &args[2])?;
    let name = args[1].as_bytes();
    let name = name.strip_prefix(b"::").unwrap_or(name);
    interp.host.proc_define(
        name,
        ProcDef {
            params: args[2].clone(),
            body: args[3].clone(),
        },
    );
    Ok(Value::empty().into())
}

/// `apply {args body ?namespace?} ?arg ...?`
pub fn apply(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 1, usize::MAX, "lambdaExpr ?arg ...?")?;
    let lambda = interp.host.list_elements(&args[1]).map_err(list_error)?;
    let (params, body) = match lambda.as_slice() {
        [params, body] | [params, body, _] => (params.clone(), body.clone()),
        _ => {
            return Err(ErrorInfo::new(
                BAD_VALUE,
                format!("can't interpret \"{}\" as a lambda expression", args[1]),
            )
            .into())
        }
    };
    let def = ProcDef { params, body };
    invoke_procedure(interp, &args[0], &def, &args[2..]).map(Completion::Call)
}

/// `return ?-code code? ?-errorinfo info? ?-errorcode code? ?-level n? ?result?`
pub fn return_(_interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    let mut rest = &args[1..];
    let mut code = 0;
    let mut info = None;
    let mut error_code = None;

    while rest.len() >= 2 && rest[0].as_bytes().starts_with(b"-") {
        let (option, value) = (&rest[0], &rest[1]);
        match option.as_bytes() {
            b"-code" => code = completion_code(value)?,
            b"-errorinfo" => info = Some(value.to_string()),
            b"-errorcode" => error_code = Some(value.to_string()),
            b"-level" | b"-options" => {}
            _ => {
                return Err(ErrorInfo::new(
                    BAD_VALUE,
                    format!("bad option \"{}\": must be -code, -errorcode, -errorinfo, or -level", option),
                )
                .into())
            }
        }
        rest = &rest[2..];
    }
    let value = match rest {
        [] => Value::empty(),
        [value] => value.clone(),
        _ => return Err(wrong_args(args, "?-option value ...? ?result?").into()),
    };

    match code {
        1 => {
            let mut err = ErrorInfo::new(error_code.unwrap_or_else(|| USER.to_string()), value);
            err.info = info;
            Err(err.into())
        }
        3 => Err(Exception::Break),
        4 => Err(Exception::Continue),
        _ => Err(Exception::Return(value)),
    }
}

fn completion_code(value: &Value) -> Result<i64, ErrorInfo> {
    let code = match value.as_bytes() {
        b"ok" => Some(0),
        b"error" => Some(1),
        b"return" => Some(2),
        b"break" => Some(3),
        b"continue" => Some(4),
        other => parse_int(other).filter(|n| (0..=4).contains(n)),
    };
    code.ok_or_else(|| {
        ErrorInfo::new(
            BAD_VALUE,
            format!(
                "bad completion code \"{}\": must be ok, error, return, break, continue, or an integer",
                value
            ),
        )
    })
}

/// `error message ?info? ?code?`
pub fn error(_interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 1, 3, "message ?errorInfo? ?errorCode?")?;
    let code = args
        .get(3)
        .map(|c| c.to_string())
        .unwrap_or_else(|| USER.to_string());
    let mut err = ErrorInfo::new(code, args[1].clone());
    err.info = args
        .get(2)
        .filter(|info| !info.is_empty())
        .map(|info| info.to_string());
    Err(err.into())
}

#[cfg(test)]
mod tests {
    use crate::interpreter::executor::types::ResultCode;
    use crate::interpreter::session::Interp;

    fn eval_ok(interp: &mut Interp, script: &str) -> String {
        let code = interp.eval(script);
        assert_eq!(code, ResultCode::Ok, "{}: {}", script, interp.result());
        interp.result().to_string()
    }

    #[test]
    fn test_proc_defines_and_validates() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, "proc add {a {b 1}} { expr {$a + $b} }");
        assert_eq!(eval_ok(&mut interp, "add 2"), "3");
        assert_eq!(eval_ok(&mut interp, "add 2 5"), "7");

        assert_eq!(interp.eval("proc bad {{a b c}} {}"), ResultCode::Error);
        assert_eq!(
            interp.result().to_string(),
            "too many fields in argument specifier \"a b c\""
        );
    }

    #[test]
    fn test_return_leaves_the_procedure_early() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, "proc f {x} { if {$x} { return early }; return late }");
        assert_eq!(eval_ok(&mut interp, "f 1"), "early");
        assert_eq!(eval_ok(&mut interp, "f 0"), "late");
    }

    #[test]
    fn test_return_code_error() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, "proc f {} { return -code error -errorcode {MY CODE} failed }");
        assert_eq!(interp.eval("f"), ResultCode::Error);
        assert_eq!(interp.result().to_string(), "failed");
        assert_eq!(interp.error_code(), Some("MY CODE"));
    }

    #[test]
    fn test_error_with_info_and_code() {
        let mut interp = Interp::new();
        assert_eq!(interp.eval("error oops {custom trace} {APP FAIL}"), ResultCode::Error);
        assert_eq!(interp.result().to_string(), "oops");
        assert_eq!(interp.error_code(), Some("APP FAIL"));
        let info = interp.error_info().expect("error info");
        assert!(info.starts_with("custom trace\n    invoked from within\n\"error oops"));
    }

    #[test]
    fn test_apply_binds_like_a_procedure() {
        let mut interp = Interp::new();
        assert_eq!(eval_ok(&mut interp, "apply {{x {y 2}} { expr {$x * $y} }} 21"), "42");
        assert_eq!(
            eval_ok(&mut interp, "apply {args { llength $args }} a b c"),
            "3"
        );
        assert_eq!(interp.eval("apply {x} 1"), ResultCode::Error);
        assert_eq!(
            interp.result().to_string(),
            "can't interpret \"x\" as a lambda expression"
        );
    }
}
