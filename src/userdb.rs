//! The host's user/group database, abstracted so the `user` validator is
//! testable without a real `/etc/passwd`. The real implementation wraps
//! `libc::getpwnam_r`/`getgrnam_r` directly, the same FFI surface the
//! teacher already depends on `libc` for elsewhere in its process layer.

use std::ffi::CString;

pub trait UserDb: Send + Sync {
    /// True if `name` is a real user on the host.
    fn user_exists(&self, name: &str) -> bool;
    /// True if `name` is a member of `group` (primary or supplementary).
    fn user_in_group(&self, name: &str, group: &str) -> bool;
    /// All usernames known to the host, for completion (spec §4.5).
    fn list_usernames(&self) -> Vec<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemUserDb;

impl SystemUserDb {
    pub fn new() -> Self {
        SystemUserDb
    }
}

impl UserDb for SystemUserDb {
    fn user_exists(&self, name: &str) -> bool {
        let Ok(cname) = CString::new(name) else { return false };
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut buf = vec![0i8; 16384];
        let mut result: *mut libc::passwd = std::ptr::null_mut();
        let rc = unsafe {
            libc::getpwnam_r(cname.as_ptr(), &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
        };
        rc == 0 && !result.is_null()
    }

    fn user_in_group(&self, name: &str, group: &str) -> bool {
        let Ok(cname) = CString::new(name) else { return false };
        let Ok(cgroup) = CString::new(group) else { return false };

        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut pwbuf = vec![0i8; 16384];
        let mut pwresult: *mut libc::passwd = std::ptr::null_mut();
        let pwrc = unsafe {
            libc::getpwnam_r(cname.as_ptr(), &mut pwd, pwbuf.as_mut_ptr(), pwbuf.len(), &mut pwresult)
        };

        let mut grp: libc::group = unsafe { std::mem::zeroed() };
        let mut grbuf = vec![0i8; 16384];
        let mut grresult: *mut libc::group = std::ptr::null_mut();
        let grrc = unsafe {
            libc::getgrnam_r(cgroup.as_ptr(), &mut grp, grbuf.as_mut_ptr(), grbuf.len(), &mut grresult)
        };
        if grrc != 0 || grresult.is_null() {
            return false;
        }

        if pwrc == 0 && !pwresult.is_null() && pwd.pw_gid == grp.gr_gid {
            return true;
        }

        let mut i = 0;
        loop {
            let member_ptr = unsafe { *grp.gr_mem.offset(i) };
            if member_ptr.is_null() {
                break;
            }
            let member = unsafe { std::ffi::CStr::from_ptr(member_ptr) }.to_string_lossy();
            if member == name {
                return true;
            }
            i += 1;
        }
        false
    }

    fn list_usernames(&self) -> Vec<String> {
        let mut names = Vec::new();
        unsafe { libc::setpwent() };
        loop {
            let entry = unsafe { libc::getpwent() };
            if entry.is_null() {
                break;
            }
            let name = unsafe { std::ffi::CStr::from_ptr((*entry).pw_name) }.to_string_lossy().into_owned();
            names.push(name);
        }
        unsafe { libc::endpwent() };
        names
    }
}

/// Fake user directory for tests: a fixed membership table.
#[derive(Debug, Default, Clone)]
pub struct FakeUserDb {
    pub users: Vec<String>,
    pub memberships: Vec<(String, String)>,
}

impl FakeUserDb {
    pub fn new() -> Self {
        FakeUserDb::default()
    }

    pub fn with_user(mut self, name: impl Into<String>) -> Self {
        self.users.push(name.into());
        self
    }

    pub fn with_membership(mut self, user: impl Into<String>, group: impl Into<String>) -> Self {
        self.memberships.push((user.into(), group.into()));
        self
    }
}

impl UserDb for FakeUserDb {
    fn user_exists(&self, name: &str) -> bool {
        self.users.iter().any(|u| u == name)
    }

    fn user_in_group(&self, name: &str, group: &str) -> bool {
        self.memberships.iter().any(|(u, g)| u == name && g == group)
    }

    fn list_usernames(&self) -> Vec<String> {
        self.users.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_user_db_tracks_membership() {
        let db = FakeUserDb::new().with_user("alice").with_membership("alice", "wheel");
        assert!(db.user_exists("alice"));
        assert!(!db.user_exists("bob"));
        assert!(db.user_in_group("alice", "wheel"));
        assert!(!db.user_in_group("alice", "admin"));
    }
}
