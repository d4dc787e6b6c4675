//! `puts`

use super::wrong_args;
use crate::interpreter::executor::errors::{ErrorInfo, BAD_VALUE};
use crate::interpreter::executor::types::{Completion, Exception, Value};
use crate::interpreter::host::Channel;
use crate::interpreter::session::Interp;

/// `puts ?-nonewline? ?channelId? string`
pub fn puts(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    let mut rest = &args[1..];
    let newline = !rest.first().is_some_and(|a| a.is("-nonewline"));
    if !newline {
        rest = &rest[1..];
    }

    let (channel, text) = match rest {
        [text] => (Channel::Stdout, text),
        [channel, text] => (channel_named(channel)?, text),
        _ => return Err(wrong_args(args, "?-nonewline? ?channelId? string").into()),
    };

    let mut bytes = text.as_bytes().to_vec();
    if newline {
        bytes.push(b'\n');
    }
    interp.host.output(channel, &bytes);
    Ok(Value::empty().into())
}

fn channel_named(name: &Value) -> Result<Channel, ErrorInfo> {
    match name.as_bytes() {
        b"stdout" => Ok(Channel::Stdout),
        b"stderr" => Ok(Channel::Stderr),
        _ => Err(ErrorInfo::new(
            BAD_VALUE,
            format!("can not find channel named \"{}\"", name),
        )),
    }
}
