//! Operator, conversion and member semantics on bare values. Nothing here
//! knows about frames or source positions; failures come back as a
//! [`Fault`] the thread turns into a located [`RuntimeError`].

use std::cmp::Ordering;

use super::{MapKey, Object, RuntimeError, Variant};
use crate::analyzer::builtins::{Member, Property};
use crate::analyzer::types::Type;
use crate::ast::{BinaryOp, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Fault {
    /// The operation has no meaning for these operands.
    Unsupported,
    Mismatch {
        left: &'static str,
        right: &'static str,
    },
    BadOperand(&'static str),
    DivisionByZero,
    IndexOutOfRange {
        index: i64,
        len: usize,
    },
    MissingKey(String),
    Conversion {
        value: String,
        to: &'static str,
    },
}

impl Fault {
    pub(crate) fn at(self, op: &str, at: String) -> RuntimeError {
        match self {
            Fault::Unsupported => RuntimeError::BadOperand {
                op: op.to_string(),
                operand: "this value".into(),
                at,
            },
            Fault::Mismatch { left, right } => RuntimeError::TypeMismatch {
                op: op.to_string(),
                left: left.into(),
                right: right.into(),
                at,
            },
            Fault::BadOperand(operand) => RuntimeError::BadOperand {
                op: op.to_string(),
                operand: operand.into(),
                at,
            },
            Fault::DivisionByZero => RuntimeError::DivisionByZero { at },
            Fault::IndexOutOfRange { index, len } => RuntimeError::IndexOutOfRange { index, len, at },
            Fault::MissingKey(key) => RuntimeError::MissingKey { key, at },
            Fault::Conversion { value, to } => RuntimeError::ConversionFailed {
                value,
                to: to.into(),
                at,
            },
        }
    }
}

// --- binary operators ---

/// `lhs = lhs op rhs`, switching on the runtime kinds of both operands.
pub(crate) fn apply_binary(op: BinaryOp, lhs: &mut Variant, rhs: Variant) -> Result<(), Fault> {
    if op == BinaryOp::Add {
        match (&mut *lhs, &rhs) {
            (Variant::Object(Object::Str(a)), Variant::Object(Object::Str(b))) => {
                a.push_str(b);
                return Ok(());
            }
            (Variant::Object(Object::List(a)), Variant::Object(Object::List(b))) => {
                a.extend(b.iter().cloned());
                return Ok(());
            }
            _ => {}
        }
    }

    let result = match (&*lhs, &rhs) {
        (Variant::Int(a), Variant::Int(b)) => int_op(op, *a, *b),
        (Variant::Float(a), Variant::Float(b)) => float_op(op, *a, *b),
        (Variant::Int(a), Variant::Float(b)) => float_op(op, *a as f64, *b),
        (Variant::Float(a), Variant::Int(b)) => float_op(op, *a, *b as f64),
        (Variant::Bool(a), Variant::Bool(b)) => bool_op(op, *a, *b),
        (Variant::Object(Object::Str(a)), Variant::Object(Object::Str(b))) => ordered(op, a.cmp(b)),
        (a, b) => equality(op, a == b),
    };
    match result {
        Ok(value) => {
            *lhs = value;
            Ok(())
        }
        Err(Fault::Unsupported) => Err(Fault::Mismatch {
            left: lhs.type_name(),
            right: rhs.type_name(),
        }),
        Err(fault) => Err(fault),
    }
}

fn int_op(op: BinaryOp, a: i64, b: i64) -> Result<Variant, Fault> {
    let shift = u32::try_from(b).ok();
    let value = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div | BinaryOp::Mod if b == 0 => return Err(Fault::DivisionByZero),
        BinaryOp::Div => a.wrapping_div(b),
        BinaryOp::Mod => a.wrapping_rem(b),
        BinaryOp::Pow => int_pow(a, b)?,
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::Shl => shift.and_then(|s| a.checked_shl(s)).unwrap_or(0),
        BinaryOp::Shr => shift
            .and_then(|s| a.checked_shr(s))
            .unwrap_or(if a < 0 { -1 } else { 0 }),
        BinaryOp::UShr => shift.and_then(|s| (a as u64).checked_shr(s)).unwrap_or(0) as i64,
        _ => return ordered(op, a.cmp(&b)),
    };
    Ok(Variant::Int(value))
}

fn int_pow(base: i64, exp: i64) -> Result<i64, Fault> {
    if exp >= 0 {
        return Ok(base.wrapping_pow(u32::try_from(exp).unwrap_or(u32::MAX)));
    }
    match base {
        0 => Err(Fault::DivisionByZero),
        1 => Ok(1),
        -1 if exp % 2 == 0 => Ok(1),
        -1 => Ok(-1),
        _ => Ok(0),
    }
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> Result<Variant, Fault> {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        BinaryOp::Pow => a.powf(b),
        _ => {
            return match a.partial_cmp(&b) {
                Some(order) => ordered(op, order),
                // NaN compares unequal to everything
                None => equality(op, false),
            };
        }
    };
    Ok(Variant::Float(value))
}

fn bool_op(op: BinaryOp, a: bool, b: bool) -> Result<Variant, Fault> {
    let value = match op {
        BinaryOp::And | BinaryOp::BitAnd => a && b,
        BinaryOp::Or | BinaryOp::BitOr => a || b,
        BinaryOp::BitXor => a ^ b,
        _ => return equality(op, a == b),
    };
    Ok(Variant::Bool(value))
}

fn ordered(op: BinaryOp, order: Ordering) -> Result<Variant, Fault> {
    let value = match op {
        BinaryOp::Eq => order == Ordering::Equal,
        BinaryOp::Ne => order != Ordering::Equal,
        BinaryOp::Lt => order == Ordering::Less,
        BinaryOp::Le => order != Ordering::Greater,
        BinaryOp::Gt => order == Ordering::Greater,
        BinaryOp::Ge => order != Ordering::Less,
        _ => return Err(Fault::Unsupported),
    };
    Ok(Variant::Bool(value))
}

fn equality(op: BinaryOp, equal: bool) -> Result<Variant, Fault> {
    match op {
        BinaryOp::Eq => Ok(Variant::Bool(equal)),
        BinaryOp::Ne => Ok(Variant::Bool(!equal)),
        _ => Err(Fault::Unsupported),
    }
}

// --- unary operators ---

pub(crate) fn apply_unary(op: UnaryOp, value: &mut Variant) -> Result<(), Fault> {
    let result = match (op, &*value) {
        (UnaryOp::Neg, Variant::Int(n)) => Variant::Int(n.wrapping_neg()),
        (UnaryOp::Neg, Variant::Float(x)) => Variant::Float(-x),
        (UnaryOp::Plus, Variant::Int(_) | Variant::Float(_)) => return Ok(()),
        (UnaryOp::Not, Variant::Bool(b)) => Variant::Bool(!b),
        (UnaryOp::BitNot, Variant::Int(n)) => Variant::Int(!n),
        (UnaryOp::PreInc | UnaryOp::PostInc, _) => return step(value, 1),
        (UnaryOp::PreDec | UnaryOp::PostDec, _) => return step(value, -1),
        (_, other) => return Err(Fault::BadOperand(other.type_name())),
    };
    *value = result;
    Ok(())
}

fn step(value: &mut Variant, delta: i64) -> Result<(), Fault> {
    match value {
        Variant::Int(n) => *n = n.wrapping_add(delta),
        Variant::Float(x) => *x += delta as f64,
        other => return Err(Fault::BadOperand(other.type_name())),
    }
    Ok(())
}

// --- conversions ---

pub(crate) fn convert(value: Variant, to: Type) -> Result<Variant, Fault> {
    let failed = |value: &Variant| Fault::Conversion {
        value: value.to_string(),
        to: to.builtin_name(),
    };
    let converted = match (to, &value) {
        (Type::Int, Variant::Int(_))
        | (Type::Float, Variant::Float(_))
        | (Type::Bool, Variant::Bool(_))
        | (Type::String, Variant::Object(Object::Str(_)))
        | (Type::List, Variant::Object(Object::List(_)))
        | (Type::Map, Variant::Object(Object::Map(_)))
        | (Type::Formula, Variant::Object(Object::Formula(_)))
        | (Type::Any, _) => return Ok(value),

        (Type::Int, Variant::Float(x)) if x.is_finite() => Variant::Int(*x as i64),
        (Type::Int, Variant::Bool(b)) => Variant::Int(i64::from(*b)),
        (Type::Int, Variant::Object(Object::Str(s))) => {
            Variant::Int(s.trim().parse().map_err(|_| failed(&value))?)
        }

        (Type::Float, Variant::Int(n)) => Variant::Float(*n as f64),
        (Type::Float, Variant::Bool(b)) => Variant::Float(if *b { 1.0 } else { 0.0 }),
        (Type::Float, Variant::Object(Object::Str(s))) => {
            Variant::Float(s.trim().parse().map_err(|_| failed(&value))?)
        }

        (Type::Bool, Variant::Int(n)) => Variant::Bool(*n != 0),
        (Type::Bool, Variant::Float(x)) => Variant::Bool(*x != 0.0),
        (Type::Bool, Variant::Object(Object::Str(s))) => match s.trim() {
            "true" => Variant::Bool(true),
            "false" => Variant::Bool(false),
            _ => return Err(failed(&value)),
        },

        (Type::String, Variant::Undefined) => return Err(failed(&value)),
        (Type::String, other) => Variant::str(other.to_string()),

        _ => return Err(failed(&value)),
    };
    Ok(converted)
}

// --- containers ---

/// Element of `container` at `key`, by reference. With `insert`, a missing
/// map key is created holding `Undefined`.
pub(crate) fn element_mut<'v>(
    container: &'v mut Variant,
    key: &Variant,
    insert: bool,
) -> Result<&'v mut Variant, Fault> {
    let kind = container.type_name();
    match container {
        Variant::Object(Object::List(items)) => {
            let index = key.as_int().ok_or(Fault::Mismatch {
                left: kind,
                right: key.type_name(),
            })?;
            let len = items.len();
            usize::try_from(index)
                .ok()
                .and_then(|i| items.get_mut(i))
                .ok_or(Fault::IndexOutOfRange { index, len })
        }
        Variant::Object(Object::Map(map)) => {
            let key = MapKey::from_variant(key).ok_or(Fault::Mismatch {
                left: kind,
                right: key.type_name(),
            })?;
            if insert {
                return Ok(map.entry(key).or_default());
            }
            let missing = key.to_string();
            map.get_mut(&key).ok_or(Fault::MissingKey(missing))
        }
        _ => Err(Fault::Mismatch {
            left: kind,
            right: key.type_name(),
        }),
    }
}

/// Copy of the element of `container` at `key`; strings index to
/// one-character strings.
pub(crate) fn index_value(container: &Variant, key: &Variant) -> Result<Variant, Fault> {
    let mismatch = Fault::Mismatch {
        left: container.type_name(),
        right: key.type_name(),
    };
    match container {
        Variant::Object(Object::List(items)) => {
            let index = key.as_int().ok_or(mismatch)?;
            usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or(Fault::IndexOutOfRange {
                    index,
                    len: items.len(),
                })
        }
        Variant::Object(Object::Str(s)) => {
            let index = key.as_int().ok_or(mismatch)?;
            usize::try_from(index)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Variant::str(c.to_string()))
                .ok_or(Fault::IndexOutOfRange {
                    index,
                    len: s.chars().count(),
                })
        }
        Variant::Object(Object::Map(map)) => {
            let key = MapKey::from_variant(key).ok_or(mismatch)?;
            map.get(&key)
                .cloned()
                .ok_or_else(|| Fault::MissingKey(key.to_string()))
        }
        _ => Err(mismatch),
    }
}

pub(crate) fn property(property: Property, value: &Variant) -> Result<Variant, Fault> {
    let size = value.size().ok_or(Fault::BadOperand(value.type_name()))?;
    Ok(match property {
        Property::Size => Variant::Int(size as i64),
        Property::Empty => Variant::Bool(size == 0),
    })
}

/// Runs a built-in member on `recv`, which is changed in place by the
/// mutating members.
pub(crate) fn call_member(member: Member, recv: &mut Variant, mut args: Vec<Variant>) -> Result<Variant, Fault> {
    let kind = recv.type_name();
    match (member, recv) {
        (Member::Size, recv) => property(Property::Size, recv),
        (Member::Push, Variant::Object(Object::List(items))) => {
            items.extend(args.drain(..));
            Ok(Variant::Undefined)
        }
        (Member::Pop, Variant::Object(Object::List(items))) => {
            items.pop().ok_or(Fault::IndexOutOfRange { index: 0, len: 0 })
        }
        (Member::Has | Member::Remove, Variant::Object(Object::Map(map))) => {
            let arg = args.pop().unwrap_or_default();
            let key = MapKey::from_variant(&arg).ok_or(Fault::Mismatch {
                left: kind,
                right: arg.type_name(),
            })?;
            if member == Member::Has {
                return Ok(Variant::Bool(map.contains_key(&key)));
            }
            let missing = key.to_string();
            map.remove(&key).ok_or(Fault::MissingKey(missing))
        }
        _ => Err(Fault::BadOperand(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(op: BinaryOp, a: Variant, b: Variant) -> Result<Variant, Fault> {
        let mut lhs = a;
        apply_binary(op, &mut lhs, b)?;
        Ok(lhs)
    }

    #[test]
    fn integer_arithmetic_wraps_and_traps_division() {
        assert_eq!(binary(BinaryOp::Add, Variant::Int(i64::MAX), Variant::Int(1)), Ok(Variant::Int(i64::MIN)));
        assert_eq!(binary(BinaryOp::Div, Variant::Int(7), Variant::Int(2)), Ok(Variant::Int(3)));
        assert_eq!(binary(BinaryOp::Mod, Variant::Int(7), Variant::Int(0)), Err(Fault::DivisionByZero));
        assert_eq!(binary(BinaryOp::Pow, Variant::Int(2), Variant::Int(10)), Ok(Variant::Int(1024)));
        assert_eq!(binary(BinaryOp::Pow, Variant::Int(2), Variant::Int(-1)), Ok(Variant::Int(0)));
    }

    #[test]
    fn shifts() {
        assert_eq!(binary(BinaryOp::Shl, Variant::Int(1), Variant::Int(4)), Ok(Variant::Int(16)));
        assert_eq!(binary(BinaryOp::Shr, Variant::Int(-16), Variant::Int(2)), Ok(Variant::Int(-4)));
        assert_eq!(
            binary(BinaryOp::UShr, Variant::Int(-1), Variant::Int(60)),
            Ok(Variant::Int(15))
        );
        assert_eq!(binary(BinaryOp::Shl, Variant::Int(1), Variant::Int(64)), Ok(Variant::Int(0)));
    }

    #[test]
    fn bitwise_on_float_is_a_mismatch() {
        assert_eq!(
            binary(BinaryOp::BitAnd, Variant::Float(1.5), Variant::Float(2.5)),
            Err(Fault::Mismatch {
                left: "Float",
                right: "Float"
            })
        );
    }

    #[test]
    fn strings_concatenate_and_compare() {
        assert_eq!(binary(BinaryOp::Add, Variant::from("ab"), Variant::from("cd")), Ok(Variant::from("abcd")));
        assert_eq!(binary(BinaryOp::Lt, Variant::from("ab"), Variant::from("b")), Ok(Variant::Bool(true)));
        assert_eq!(binary(BinaryOp::Eq, Variant::Undefined, Variant::Int(1)), Ok(Variant::Bool(false)));
    }

    #[test]
    fn conversions() {
        assert_eq!(convert(Variant::from("42"), Type::Int), Ok(Variant::Int(42)));
        assert_eq!(convert(Variant::Float(3.9), Type::Int), Ok(Variant::Int(3)));
        assert_eq!(convert(Variant::Int(0), Type::Bool), Ok(Variant::Bool(false)));
        assert_eq!(convert(Variant::Int(7), Type::String), Ok(Variant::from("7")));
        assert!(matches!(convert(Variant::from("x1"), Type::Int), Err(Fault::Conversion { .. })));
    }

    #[test]
    fn map_elements_insert_only_on_request() {
        let mut map = Variant::Object(Object::Map(Default::default()));
        let key = Variant::from("k");
        assert_eq!(element_mut(&mut map, &key, false), Err(Fault::MissingKey(r#""k""#.to_string())));
        *element_mut(&mut map, &key, true).unwrap() = Variant::Int(1);
        assert_eq!(index_value(&map, &key), Ok(Variant::Int(1)));
    }

    #[test]
    fn list_members() {
        let mut list = Variant::list(vec![]);
        call_member(Member::Push, &mut list, vec![Variant::Int(3)]).unwrap();
        assert_eq!(call_member(Member::Size, &mut list, vec![]), Ok(Variant::Int(1)));
        assert_eq!(call_member(Member::Pop, &mut list, vec![]), Ok(Variant::Int(3)));
        assert!(call_member(Member::Pop, &mut list, vec![]).is_err());
    }
}
