//! `info` subcommands

use super::{expect_int, glob_match, names, wrong_args};
use crate::interpreter::executor::binding::ParamSpec;
use crate::interpreter::executor::errors::{ErrorInfo, BAD_VALUE};
use crate::interpreter::executor::types::{Completion, Exception, Value};
use crate::interpreter::host::ProcDef;
use crate::interpreter::session::Interp;

/// `info subcommand ?arg ...?`
pub fn info(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    let Some(sub) = args.get(1) else {
        return Err(wrong_args(args, "subcommand ?arg ...?").into());
    };
    let rest = &args[2..];
    let value = match sub.as_bytes() {
        b"exists" => {
            one_arg(args, rest, "varName")?;
            flag(interp.read_var(rest[0].as_bytes()).is_ok())
        }
        b"level" => level(interp, args, rest)?,
        b"commands" => {
            let mut all: Vec<Value> = names().map(Value::from).collect();
            all.extend(interp.host.commands());
            all.extend(interp.coroutines.keys().cloned());
            filtered(interp, args, rest, all)?
        }
        b"procs" => {
            let procs = interp.host.procs();
            filtered(interp, args, rest, procs)?
        }
        b"body" => {
            one_arg(args, rest, "procname")?;
            proc_def(interp, &rest[0])?.body
        }
        b"args" => {
            one_arg(args, rest, "procname")?;
            let def = proc_def(interp, &rest[0])?;
            let spec = ParamSpec::parse(interp.host.as_ref(), &def.params)?;
            interp.host.list_new(&spec.names())
        }
        b"coroutine" => {
            one_arg(args, rest, "")?;
            interp
                .coroutine
                .as_ref()
                .map(|active| active.name.clone())
                .unwrap_or_default()
        }
        _ => {
            return Err(ErrorInfo::new(
                BAD_VALUE,
                format!(
                    "unknown or ambiguous subcommand \"{}\": must be args, body, commands, coroutine, exists, level, or procs",
                    sub
                ),
            )
            .into())
        }
    };
    Ok(value.into())
}

/// Exactly one argument after the subcommand, or none when `usage` is empty
fn one_arg(args: &[Value], rest: &[Value], usage: &str) -> Result<(), ErrorInfo> {
    let expected = usize::from(!usage.is_empty());
    if rest.len() != expected {
        let usage = format!("{} {}", args[1], usage);
        return Err(wrong_args(&args[..1], usage.trim_end()));
    }
    Ok(())
}

fn flag(b: bool) -> Value {
    Value::from(if b { "1" } else { "0" })
}

/// `info level ?number?`
fn level(interp: &mut Interp, args: &[Value], rest: &[Value]) -> Result<Value, ErrorInfo> {
    if rest.len() > 1 {
        return Err(wrong_args(&args[..1], "level ?number?"));
    }
    let current = interp.current().level;
    let Some(number) = rest.first() else {
        return Ok(Value::from(current));
    };
    let n = expect_int(number)?;
    let absolute = if n > 0 { Some(n) } else { (current as i64).checked_add(n) };
    let frame = absolute
        .filter(|&l| l > 0)
        .and_then(|l| interp.frame_at(l as usize));
    match frame {
        Some(frame) => {
            let mut words = vec![frame.command.clone()];
            words.extend(frame.args.iter().cloned());
            Ok(interp.host.list_new(&words))
        }
        None => Err(ErrorInfo::new(
            BAD_VALUE,
            format!("bad level \"{}\"", number),
        )),
    }
}

/// Sort `names` and keep those matching the optional pattern
fn filtered(
    interp: &mut Interp,
    args: &[Value],
    rest: &[Value],
    mut names: Vec<Value>,
) -> Result<Value, ErrorInfo> {
    if rest.len() > 1 {
        return Err(wrong_args(&args[..1], &format!("{} ?pattern?", args[1])));
    }
    if let Some(pattern) = rest.first() {
        names.retain(|n| glob_match(pattern.as_bytes(), n.as_bytes()));
    }
    names.sort();
    names.dedup();
    Ok(interp.host.list_new(&names))
}

fn proc_def(interp: &Interp, name: &Value) -> Result<ProcDef, ErrorInfo> {
    interp
        .host
        .proc_lookup(name.as_bytes())
        .ok_or_else(|| ErrorInfo::new(BAD_VALUE, format!("\"{}\" isn't a procedure", name)))
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
    fn test_exists() {
        let mut interp = Interp::new();
        assert_eq!(eval_ok(&mut interp, "info exists a"), "0");
        assert_eq!(eval_ok(&mut interp, "set a 1; info exists a"), "1");
    }

    #[test]
    fn test_level_inside_procedures() {
        let mut interp = Interp::new();
        assert_eq!(eval_ok(&mut interp, "info level"), "0");
        eval_ok(&mut interp, "proc inner {x} { info level 1 }; proc outer {} { inner 5 }");
        assert_eq!(eval_ok(&mut interp, "proc depth {} { info level }; depth"), "1");
        assert_eq!(eval_ok(&mut interp, "outer"), "outer");
        eval_ok(&mut interp, "proc self {a b} { info level 0 }");
        assert_eq!(eval_ok(&mut interp, "self 1 {2 3}"), "self 1 {2 3}");
    }

    #[test]
    fn test_commands_and_procs() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, "proc helper {} {}; proc other {} {}");
        assert_eq!(eval_ok(&mut interp, "info procs"), "helper other");
        assert_eq!(eval_ok(&mut interp, "info procs h*"), "helper");
        assert_eq!(eval_ok(&mut interp, "info commands se*"), "set");
        let all = eval_ok(&mut interp, "info commands");
        assert!(all.split(' ').any(|c| c == "helper"));
        assert!(all.split(' ').any(|c| c == "foreach"));
    }

    #[test]
    fn test_body_and_args() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, "proc p {a {b 2} args} {return $a}");
        assert_eq!(eval_ok(&mut interp, "info body p"), "return $a");
        assert_eq!(eval_ok(&mut interp, "info args p"), "a b args");
        assert_eq!(interp.eval("info body set"), ResultCode::Error);
        assert_eq!(interp.result().to_string(), "\"set\" isn't a procedure");
    }

    #[test]
    fn test_coroutine_is_empty_outside_coroutines() {
        let mut interp = Interp::new();
        assert_eq!(eval_ok(&mut interp, "info coroutine"), "");
    }
}
