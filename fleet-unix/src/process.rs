/// Start a new session so the calling process stops receiving the
/// terminal's job-control signals. Meant for `pre_exec` hooks: it only
/// calls `setsid(2)`, which is async-signal-safe.
pub fn detach_session() -> std::io::Result<()> {
    let ret = unsafe { libc::setsid() };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Real UID of the calling process.
pub fn current_uid() -> u32 {
    nix::unistd::getuid().as_raw()
}
