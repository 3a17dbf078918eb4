use std::sync::LazyLock;

/// Defines the application version.
///
/// Falls back to `unknown` for the commit when the crate is built outside of
/// a git checkout.
pub static VERSION: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{}-{}{}",
        env!("IMAGE_VERSION"),
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        if matches!(option_env!("VERGEN_GIT_DIRTY"), Some("true")) {
            "-dirty"
        } else {
            ""
        }
    )
});
