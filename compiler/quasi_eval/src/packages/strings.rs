//! The bundled `strings` package.

use super::{signature, string_arg, Package};
use crate::errors::{arity_mismatch, invalid_operation};
use crate::types::Type;
use crate::value::Value;
use smallvec::smallvec;

pub(super) fn package() -> Package {
    let s = || vec![Type::String];
    let ss = || vec![Type::String, Type::String];
    Package::new("strings", "strings")
        .with_native("ToUpper", signature(s(), s(), false), |_, args| {
            let text = string_arg("ToUpper", &args, 0)?;
            Ok(smallvec![Value::Str(text.to_uppercase().into())])
        })
        .with_native("ToLower", signature(s(), s(), false), |_, args| {
            let text = string_arg("ToLower", &args, 0)?;
            Ok(smallvec![Value::Str(text.to_lowercase().into())])
        })
        .with_native("TrimSpace", signature(s(), s(), false), |_, args| {
            let text = string_arg("TrimSpace", &args, 0)?;
            Ok(smallvec![Value::string(text.trim())])
        })
        .with_native(
            "Repeat",
            signature(vec![Type::String, Type::INT], s(), false),
            |_, args| {
                let text = string_arg("Repeat", &args, 0)?;
                let count = args
                    .get(1)
                    .ok_or_else(|| arity_mismatch("Repeat", 2, args.len()))?
                    .as_int()
                    .ok_or_else(|| invalid_operation("strings.Repeat: count must be an integer"))?;
                let count = usize::try_from(count)
                    .map_err(|_| invalid_operation("strings: negative Repeat count"))?;
                Ok(smallvec![Value::Str(text.repeat(count).into())])
            },
        )
        .with_native("Contains", signature(ss(), vec![Type::Bool], false), |_, args| {
            let (text, sub) = (string_arg("Contains", &args, 0)?, string_arg("Contains", &args, 1)?);
            Ok(smallvec![Value::Bool(text.contains(&*sub))])
        })
        .with_native("HasPrefix", signature(ss(), vec![Type::Bool], false), |_, args| {
            let (text, prefix) = (string_arg("HasPrefix", &args, 0)?, string_arg("HasPrefix", &args, 1)?);
            Ok(smallvec![Value::Bool(text.starts_with(&*prefix))])
        })
        .with_native("HasSuffix", signature(ss(), vec![Type::Bool], false), |_, args| {
            let (text, suffix) = (string_arg("HasSuffix", &args, 0)?, string_arg("HasSuffix", &args, 1)?);
            Ok(smallvec![Value::Bool(text.ends_with(&*suffix))])
        })
        .with_native("Index", signature(ss(), vec![Type::INT], false), |_, args| {
            let (text, sub) = (string_arg("Index", &args, 0)?, string_arg("Index", &args, 1)?);
            let index = text.find(&*sub).map_or(-1, |i| i as i64);
            Ok(smallvec![Value::int(index)])
        })
}
