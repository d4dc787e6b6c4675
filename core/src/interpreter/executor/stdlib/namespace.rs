//! `namespace` subcommands
//!
//! Namespaces are named records kept by the host. Commands and variables
//! are not resolved through them; scripts only create, probe and delete
//! them and record export patterns.

use super::wrong_args;
use crate::interpreter::executor::errors::{ErrorInfo, BAD_VALUE};
use crate::interpreter::executor::types::{Completion, Exception, Value};
use crate::interpreter::session::Interp;

const GLOBAL: &str = "::";

/// Fully qualified form of a namespace name
fn qualify(name: &Value) -> Value {
    if name.as_bytes().starts_with(b"::") {
        name.clone()
    } else {
        Value::from(format!("::{}", name))
    }
}

/// `namespace subcommand ?arg ...?`
pub fn namespace(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    let Some(sub) = args.get(1) else {
        return Err(wrong_args(args, "subcommand ?arg ...?").into());
    };
    let rest = &args[2..];
    let usage = |text: &str| {
        let text = format!("{} {}", sub, text);
        wrong_args(&args[..1], text.trim_end())
    };

    let value = match sub.as_bytes() {
        b"create" => {
            let [name] = rest else {
                return Err(usage("name").into());
            };
            let name = qualify(name);
            interp.host.ns_create(name.as_bytes());
            name
        }
        b"delete" => {
            for name in rest {
                if !interp.host.ns_delete(qualify(name).as_bytes()) {
                    return Err(ErrorInfo::new(
                        BAD_VALUE,
                        format!("unknown namespace \"{}\" in namespace delete command", name),
                    )
                    .into());
                }
            }
            Value::empty()
        }
        b"exists" => {
            let [name] = rest else {
                return Err(usage("name").into());
            };
            let exists = interp.host.ns_exists(qualify(name).as_bytes());
            Value::from(if exists { "1" } else { "0" })
        }
        b"export" => {
            if rest.is_empty() {
                let exports = interp.host.ns_exports(GLOBAL.as_bytes());
                interp.host.list_new(&exports)
            } else {
                interp.host.ns_export(GLOBAL.as_bytes(), rest);
                Value::empty()
            }
        }
        b"current" => {
            if !rest.is_empty() {
                return Err(usage("").into());
            }
            Value::from(GLOBAL)
        }
        _ => {
            return Err(ErrorInfo::new(
                BAD_VALUE,
                format!(
                    "unknown or ambiguous subcommand \"{}\": must be create, current, delete, exists, or export",
                    sub
                ),
            )
            .into())
        }
    };
    Ok(value.into())
}
