//! Backend value representation
//!
//! This module defines the [`Value`] enum, the tagged form in which every
//! backend hands variables to the debugger. Classification happens once, when
//! a value crosses the backend boundary, instead of by re-parsing its text.
//!
//! # Value Types
//!
//! - [`Value::Int`]: 64-bit signed integer
//! - [`Value::Bool`]: boolean flag (`HALT`, `BREAK`, `STEP`, ...)
//! - [`Value::Text`]: string
//! - [`Value::List`]: ordered sequence (`ROM`, `STACK`)
//! - [`Value::Map`]: integer-keyed mapping (`RAM`)
//! - [`Value::Object`]: record with named fields (ROM instructions)
//! - [`Value::Routine`]: callable entry point (`Execute`)
//! - [`Value::None`]: explicit absence of a value
//!
//! # Registers
//!
//! Only `Int` and `Bool` values are shown as registers; see
//! [`Value::is_register`].

use rustc_hash::FxHashMap;
use std::fmt;

/// Runtime values exchanged with a backend
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Text(String),
    List(Vec<Value>),
    Map(FxHashMap<i64, Value>), // Address -> value
    Object(FxHashMap<String, Value>),
    Routine(String),
    #[default]
    None,
}

impl Value {
    /// Get the integer value, returns None if not an Int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the boolean value, returns None if not a Bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the list elements, returns None if not a List
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the address map, returns None if not a Map
    pub fn as_map(&self) -> Option<&FxHashMap<i64, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a named field of an Object
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.get(name),
            _ => None,
        }
    }

    /// True for the values the register pane displays (integers and booleans)
    pub fn is_register(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Bool(_))
    }

    /// Truthiness used by the machine's loop conditions
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Bool(b) => *b,
            Value::Text(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Object(_) | Value::Routine(_) => true,
            Value::None => false,
        }
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Text(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Routine(_) => "routine",
            Value::None => "none",
        }
    }

    /// Canonical text rendering shown by the panes
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                let mut keys: Vec<_> = map.keys().copied().collect();
                keys.sort_unstable();
                write!(f, "{{")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, map[key])?;
                }
                write!(f, "}}")
            }
            Value::Object(fields) => match fields.get("Source") {
                Some(source) => write!(f, "<object {}>", source),
                None => write!(f, "<object>"),
            },
            Value::Routine(name) => write!(f, "<routine {}>", name),
            Value::None => write!(f, "<null>"),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_renders_in_address_order() {
        let mut map = FxHashMap::default();
        map.insert(5, Value::Int(3));
        map.insert(-1, Value::Int(7));
        assert_eq!(Value::Map(map).render(), "{-1: 7, 5: 3}");
    }

    #[test]
    fn test_only_ints_and_bools_are_registers() {
        assert!(Value::Int(0).is_register());
        assert!(Value::Bool(false).is_register());
        assert!(!Value::Text("1".into()).is_register());
        assert!(!Value::List(vec![]).is_register());
    }
}
