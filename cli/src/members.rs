//! Parsing of `--property` / `--method` arguments.
//!
//! Accepted forms, with an optional leading visibility glyph (`+` public,
//! `-` private, `#` protected):
//!
//! - property: `name:type`, e.g. `-health:int`
//! - method: `name(params):returnType`, e.g. `+fire(power: float):void`

use canvas::doc::{Access, Method, Property};

#[cfg(test)]
#[path = "members_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MemberError {
    #[error("expected `name:type`, got `{0}`")]
    Property(String),
    #[error("expected `name(params):returnType`, got `{0}`")]
    Method(String),
}

fn split_access(raw: &str, default: Access) -> (Access, &str) {
    let raw = raw.trim();
    match raw.chars().next() {
        Some('+') => (Access::Public, &raw[1..]),
        Some('-') => (Access::Private, &raw[1..]),
        Some('#') => (Access::Protected, &raw[1..]),
        _ => (default, raw),
    }
}

pub fn parse_property(raw: &str) -> Result<Property, MemberError> {
    let (access, rest) = split_access(raw, Access::Private);
    let (name, ty) = rest.split_once(':').ok_or_else(|| MemberError::Property(raw.to_string()))?;
    let (name, ty) = (name.trim(), ty.trim());
    if name.is_empty() || ty.is_empty() {
        return Err(MemberError::Property(raw.to_string()));
    }
    Ok(Property { name: name.to_string(), ty: ty.to_string(), access })
}

pub fn parse_method(raw: &str) -> Result<Method, MemberError> {
    let err = || MemberError::Method(raw.to_string());
    let (access, rest) = split_access(raw, Access::Public);
    let (name, rest) = rest.split_once('(').ok_or_else(err)?;
    let (params, rest) = rest.rsplit_once(')').ok_or_else(err)?;
    let return_type = match rest.trim() {
        "" => "void",
        ret => ret.strip_prefix(':').map(str::trim).ok_or_else(err)?,
    };
    let name = name.trim();
    if name.is_empty() || return_type.is_empty() {
        return Err(err());
    }
    Ok(Method { name: name.to_string(), params: params.trim().to_string(), return_type: return_type.to_string(), access })
}
