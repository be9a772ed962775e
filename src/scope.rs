//! Protection scope and the platform flag values derived from it
//!
//! Callers never build flag words themselves. The only flag values that
//! reach the platform are the ones produced here, and every one of them
//! forbids interactive prompts.

/// `CRYPTPROTECT_UI_FORBIDDEN`
pub(crate) const UI_FORBIDDEN: u32 = 0x1;

/// `CRYPTPROTECT_LOCAL_MACHINE`
pub(crate) const LOCAL_MACHINE: u32 = 0x4;

/// Flags passed to every unprotect call.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) const UNPROTECT_FLAGS: u32 = UI_FORBIDDEN;

/// Who may later unprotect a blob.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Only the user account that protected the data.
    #[default]
    CurrentUser,
    /// Any account on the local machine.
    LocalMachine,
}

impl Scope {
    /// Flag word passed to the protect primitive for this scope.
    #[cfg_attr(not(any(windows, test)), allow(dead_code))]
    pub(crate) fn protect_flags(self) -> u32 {
        match self {
            Scope::CurrentUser => UI_FORBIDDEN,
            Scope::LocalMachine => UI_FORBIDDEN | LOCAL_MACHINE,
        }
    }
}
