use karai_consensus_core::config::constants::currency::CRYPTONOTE_NAME;

pub const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    CARGO_PKG_VERSION
}

/// Banner printed by `--version` and at startup
pub fn program_header() -> String {
    format!(
        "{} v{} ({})\nThis software is distributed under the {} license. Use at your own risk.\n",
        CRYPTONOTE_NAME,
        version(),
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_LICENSE")
    )
}

/// Operating system description printed by `--os-version`
pub fn os_version_string() -> String {
    sysinfo::System::long_os_version().unwrap_or_else(|| String::from("unknown"))
}
