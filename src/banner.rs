pub fn print_startup_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("──────────────────────────────────────────────────────────────────────────");
    println!(" 📸  autocheckpoint v{version}  -  automatic git checkpoint commits  📸 ");
    println!("──────────────────────────────────────────────────────────────────────────");
    println!(" 🔁 Periodic snapshots | 🌿 Session branches | 🦀 Powered by Rust");
    println!();
    println!(" ✨ What it does:");
    println!("    - Commits all uncommitted changes on a timer as numbered checkpoints.");
    println!("    - Runs on its own session branch so your work stays untouched.");
    println!("    - One instance per repository, guarded by an advisory lock.");
    println!("    - Continue a previous session and keep numbering where it left off.");
    println!();
    println!("{}", build_info_line());
    println!("──────────────────────────────────────────────────────────────────────────");
    println!();
}

/// Build metadata baked in by the build script.
pub(crate) fn build_info_line() -> String {
    format!(
        "    - Build: {} ({} / {}, {})",
        env!("AUTOCHECKPOINT_BUILD_DATE"),
        env!("AUTOCHECKPOINT_BUILD_TARGET"),
        env!("AUTOCHECKPOINT_BUILD_PROFILE"),
        env!("AUTOCHECKPOINT_BUILD_RUSTC"),
    )
}
