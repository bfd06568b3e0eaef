//! Platform-specific helpers.
//! Hides OS differences (Unix/Windows) behind a uniform API: secure config and
//! log file creation, and the permission/owner strings recorded on candidates.

mod temp;
#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

pub use temp::tmp_sibling_name;

#[cfg(unix)]
pub use unix::{
    group_of, open_log_file_secure_append, owner_of, permission_bits, set_dir_mode_0700, set_file_mode_0600,
    write_config_secure_new_0600,
};

#[cfg(not(unix))]
pub use windows::{
    group_of, open_log_file_secure_append, owner_of, permission_bits, set_dir_mode_0700, set_file_mode_0600,
    write_config_secure_new_0600,
};
