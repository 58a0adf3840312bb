//! Permission set checks for account permission updates

use serde_json::Value;
use sun_core::{Address, PermissionSet, PermissionType};

use crate::validator::as_integer;

/// True if `set` is absent or a well-formed permission set of `expected` type.
///
/// A well-formed set has a matching type tag, a non-empty name, an integer
/// threshold of at least one, and keys with valid addresses and integer
/// weights in `1..=threshold`. Active sets must carry an operations bitmap.
pub fn check_permissions(set: Option<&PermissionSet>, expected: PermissionType) -> bool {
    let Some(set) = set else {
        return true;
    };

    if as_integer(&set.permission_type) != Some(i128::from(expected.as_i64())) {
        return false;
    }
    if !set
        .permission_name
        .as_str()
        .map_or(false, |name| !name.is_empty())
    {
        return false;
    }
    let Some(threshold) = as_integer(&set.threshold).filter(|t| *t >= 1) else {
        return false;
    };
    if set.keys.is_empty() {
        return false;
    }
    if expected == PermissionType::Active && set.operations.is_none() {
        return false;
    }

    set.keys.iter().all(|key| {
        Address::is_valid(&key.address)
            && as_integer(&key.weight).map_or(false, |w| w >= 1 && w <= threshold)
    })
}

/// Copy of `set` with key addresses in canonical hex, ready for the wire
pub(crate) fn canonical_set(set: &PermissionSet) -> Value {
    let mut set = set.clone();
    for key in set.keys.iter_mut() {
        if let Ok(address) = Address::parse(&key.address) {
            key.address = address.to_hex();
        }
    }
    serde_json::to_value(set).unwrap_or(Value::Null)
}
