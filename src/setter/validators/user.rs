//! user: must name a real host user, optionally constrained to one or more
//! groups.

use super::invalid;
use crate::error::ShellError;
use crate::userdb::UserDb;

pub fn validate_user(input: &str, userdb: &dyn UserDb, groups: &[String]) -> Result<String, ShellError> {
    if !userdb.user_exists(input) {
        return Err(invalid(input, "no such user"));
    }
    if !groups.is_empty() && !groups.iter().any(|g| userdb.user_in_group(input, g)) {
        return Err(invalid(input, format!("user is not a member of any of: {}", groups.join(", "))));
    }
    Ok(input.to_string())
}

/// Completion candidates: usernames (filtered to `groups` membership, if
/// any) matched exact-else-prefix against `input` (spec §4.5).
pub fn complete_user(input: &str, userdb: &dyn UserDb, groups: &[String]) -> Vec<String> {
    let eligible: Vec<String> = userdb
        .list_usernames()
        .into_iter()
        .filter(|name| groups.is_empty() || groups.iter().any(|g| userdb.user_in_group(name, g)))
        .collect();
    if eligible.iter().any(|u| u == input) {
        return vec![input.to_string()];
    }
    eligible.into_iter().filter(|u| u.starts_with(input)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::userdb::FakeUserDb;

    #[test]
    fn rejects_unknown_user() {
        let db = FakeUserDb::new();
        assert!(validate_user("ghost", &db, &[]).is_err());
    }

    #[test]
    fn enforces_group_membership_when_configured() {
        let db = FakeUserDb::new().with_user("alice").with_membership("alice", "wheel");
        assert!(validate_user("alice", &db, &["admin".to_string()]).is_err());
        assert!(validate_user("alice", &db, &["wheel".to_string()]).is_ok());
    }

    #[test]
    fn completion_filters_by_group_membership() {
        let db = FakeUserDb::new().with_user("alice").with_user("bob").with_membership("alice", "wheel");
        let mut names = complete_user("", &db, &["wheel".to_string()]);
        names.sort();
        assert_eq!(names, vec!["alice"]);
    }

    #[test]
    fn completion_prefix_matches_across_all_users_when_no_group_constraint() {
        let db = FakeUserDb::new().with_user("alice").with_user("alan");
        let mut names = complete_user("al", &db, &[]);
        names.sort();
        assert_eq!(names, vec!["alan", "alice"]);
    }
}
