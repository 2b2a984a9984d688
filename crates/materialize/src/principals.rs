// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Name <-> numeric id resolution for file owners and groups, mirroring the
//! original materializer's `LookupUserById`/`LookupGroupById` behavior: a
//! name is used when the system knows one, otherwise the decimal id.

use crate::spec::Principal;

pub fn owner_name_for_uid(uid: u32) -> String {
    users::get_user_by_uid(uid)
        .and_then(|u| u.name().to_str().map(str::to_owned))
        .unwrap_or_else(|| uid.to_string())
}

pub fn group_name_for_gid(gid: u32) -> String {
    users::get_group_by_gid(gid)
        .and_then(|g| g.name().to_str().map(str::to_owned))
        .unwrap_or_else(|| gid.to_string())
}

/// Resolves a desired owner to the uid that should be passed to `chown`.
pub fn resolve_uid(owner: &Principal) -> Result<u32, String> {
    match owner {
        Principal::Id(id) => Ok(*id),
        Principal::Name(name) => users::get_user_by_name(name)
            .map(|u| u.uid())
            .ok_or_else(|| format!("no such user: {name}")),
    }
}

/// Resolves a desired group to the gid that should be passed to `chown`.
pub fn resolve_gid(group: &Principal) -> Result<u32, String> {
    match group {
        Principal::Id(id) => Ok(*id),
        Principal::Name(name) => users::get_group_by_name(name)
            .map(|g| g.gid())
            .ok_or_else(|| format!("no such group: {name}")),
    }
}

/// Compares a desired owner against what Find observed, resolving a
/// numeric desired id through the same name-or-decimal rule Find itself
/// uses so that `owner: 1000` and `owner: ubuntu` compare equal when uid
/// 1000 is named ubuntu.
pub fn owner_matches(desired: &Principal, observed_name: &str) -> bool {
    match desired {
        Principal::Name(name) => name == observed_name,
        Principal::Id(id) => owner_name_for_uid(*id) == observed_name,
    }
}

/// The group equivalent of [`owner_matches`].
pub fn group_matches(desired: &Principal, observed_name: &str) -> bool {
    match desired {
        Principal::Name(name) => name == observed_name,
        Principal::Id(id) => group_name_for_gid(*id) == observed_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_uid_falls_back_to_decimal_string() {
        assert_eq!(owner_name_for_uid(u32::MAX), u32::MAX.to_string());
    }

    #[test]
    fn unknown_gid_falls_back_to_decimal_string() {
        assert_eq!(group_name_for_gid(u32::MAX), u32::MAX.to_string());
    }

    #[test]
    fn unresolvable_id_matches_its_own_decimal_string() {
        assert!(owner_matches(&Principal::id(u32::MAX), &u32::MAX.to_string()));
    }

    #[test]
    fn name_matches_only_the_same_name() {
        assert!(owner_matches(&Principal::name("root"), "root"));
        assert!(!owner_matches(&Principal::name("root"), "nobody"));
    }
}
