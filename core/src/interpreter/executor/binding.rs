//! Procedure argument binding
//!
//! A parameter is required unless it is a `{name default}` pair. A final
//! parameter named `args` collects whatever actual arguments are left over
//! as a list and does not count towards either bound.

use super::errors::{ErrorInfo, BAD_VALUE};
use super::types::Value;
use crate::interpreter::host::{Host, ScopeId};

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Value,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub params: Vec<Param>,
    pub variadic: bool,
}

impl ParamSpec {
    /// Validate and split a raw parameter list
    pub fn parse(host: &dyn Host, raw: &Value) -> Result<Self, ErrorInfo> {
        let items = host
            .list_elements(raw)
            .map_err(|msg| ErrorInfo::new(BAD_VALUE, msg))?;

        let mut params = Vec::with_capacity(items.len());
        for item in &items {
            let fields = host
                .list_elements(item)
                .map_err(|msg| ErrorInfo::new(BAD_VALUE, msg))?;
            let param = match fields.as_slice() {
                [name] => Param {
                    name: name.clone(),
                    default: None,
                },
                [name, default] => Param {
                    name: name.clone(),
                    default: Some(default.clone()),
                },
                [] => return Err(ErrorInfo::new(BAD_VALUE, "argument with no name")),
                _ => {
                    return Err(ErrorInfo::new(
                        BAD_VALUE,
                        format!("too many fields in argument specifier \"{}\"", item),
                    ))
                }
            };
            params.push(param);
        }

        let variadic = matches!(params.last(), Some(p) if p.name.is("args") && p.default.is_none());
        if variadic {
            params.pop();
        }
        Ok(ParamSpec { params, variadic })
    }

    /// Parameters that must be supplied
    pub fn required(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }

    /// `name a ?b? ?arg ...?`
    pub fn usage(&self, name: &Value) -> String {
        let mut usage = name.to_string();
        for param in &self.params {
            usage.push(' ');
            match param.default {
                Some(_) => usage.push_str(&format!("?{}?", param.name)),
                None => usage.push_str(&param.name.to_str_lossy()),
            }
        }
        if self.variadic {
            usage.push_str(" ?arg ...?");
        }
        usage
    }

    /// Names of all parameters, `args` included, for introspection
    pub fn names(&self) -> Vec<Value> {
        let mut names: Vec<Value> = self.params.iter().map(|p| p.name.clone()).collect();
        if self.variadic {
            names.push(Value::from("args"));
        }
        names
    }
}

/// Bind `actual` to the parameters in `scope`
pub fn bind(
    host: &mut dyn Host,
    scope: ScopeId,
    spec: &ParamSpec,
    name: &Value,
    actual: &[Value],
) -> Result<(), ErrorInfo> {
    let wrong_args = || ErrorInfo::wrong_args(spec.usage(name));

    if actual.len() < spec.required() {
        return Err(wrong_args());
    }
    if !spec.variadic && actual.len() > spec.params.len() {
        return Err(wrong_args());
    }

    for (i, param) in spec.params.iter().enumerate() {
        let value = match (actual.get(i), &param.default) {
            (Some(value), _) => value.clone(),
            (None, Some(default)) => default.clone(),
            // A required parameter after an optional one went unfilled
            (None, None) => return Err(wrong_args()),
        };
        host.var_set(scope, param.name.as_bytes(), value);
    }

    if spec.variadic {
        let rest = actual.get(spec.params.len()..).unwrap_or(&[]);
        let list = host.list_new(rest);
        host.var_set(scope, b"args", list);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::host::MemoryHost;

    fn spec(host: &MemoryHost, raw: &str) -> ParamSpec {
        ParamSpec::parse(host, &Value::from(raw)).expect("valid parameter list")
    }

    fn values(items: &[&str]) -> Vec<Value> {
        items.iter().map(|s| Value::from(*s)).collect()
    }

    #[test]
    fn test_defaults_and_args() {
        let mut host = MemoryHost::new();
        let scope = host.frame_alloc();
        let spec = spec(&host, "a {b 10} args");
        assert!(spec.variadic);
        assert_eq!(spec.required(), 1);

        bind(&mut host, scope, &spec, &Value::from("f"), &values(&["5"])).expect("binds");
        assert_eq!(host.var_get(scope, b"a"), Some(Value::from("5")));
        assert_eq!(host.var_get(scope, b"b"), Some(Value::from("10")));
        assert_eq!(host.var_get(scope, b"args"), Some(Value::empty()));
    }

    #[test]
    fn test_args_collects_the_rest_as_a_list() {
        let mut host = MemoryHost::new();
        let scope = host.frame_alloc();
        let spec = spec(&host, "a {b 10} args");

        bind(&mut host, scope, &spec, &Value::from("f"), &values(&["1", "2", "x y", "4"]))
            .expect("binds");
        assert_eq!(host.var_get(scope, b"b"), Some(Value::from("2")));
        assert_eq!(host.var_get(scope, b"args"), Some(Value::from("{x y} 4")));
    }

    #[test]
    fn test_wrong_number_of_arguments() {
        let mut host = MemoryHost::new();
        let scope = host.frame_alloc();
        let spec = spec(&host, "a {b 10}");

        let err = bind(&mut host, scope, &spec, &Value::from("f"), &[]).expect_err("too few");
        assert_eq!(
            err.message.to_string(),
            "wrong # args: should be \"f a ?b?\""
        );

        let err = bind(&mut host, scope, &spec, &Value::from("f"), &values(&["1", "2", "3"]))
            .expect_err("too many");
        assert_eq!(err.code, super::super::errors::WRONG_ARGS);
    }

    #[test]
    fn test_args_only_special_when_last() {
        let host = MemoryHost::new();
        let spec = spec(&host, "args x");
        assert!(!spec.variadic);
        assert_eq!(spec.required(), 2);
    }

    #[test]
    fn test_required_after_optional_must_be_supplied() {
        let mut host = MemoryHost::new();
        let scope = host.frame_alloc();
        let spec = spec(&host, "{a 1} b");
        assert!(bind(&mut host, scope, &spec, &Value::from("f"), &values(&["x"])).is_err());
        assert!(bind(&mut host, scope, &spec, &Value::from("f"), &values(&["x", "y"])).is_ok());
    }

    #[test]
    fn test_malformed_specifier() {
        let host = MemoryHost::new();
        let err = ParamSpec::parse(&host, &Value::from("{a b c}")).expect_err("three fields");
        assert_eq!(
            err.message.to_string(),
            "too many fields in argument specifier \"a b c\""
        );
    }
}
