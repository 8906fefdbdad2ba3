/// Write an `info` level `&str` to the console.
///
/// Detailed log messages are reserved for `--verbose`, so anything else the
/// user should see goes through here, to `stderr`.
pub fn output_info(msg: &str) {
    eprintln!("{msg}");
}

/// The console print macro for non-verbose output.
///
/// Takes a `format!` style argument list.
///
/// # Examples
///
/// ```ignore
/// console_info!("Pulled {} into {:?}", project_id, path);
/// ```
macro_rules! console_info {
    () => ($crate::utils::console::output_info(""));
    ($($a:tt)*) => {{
        $crate::utils::console::output_info(&format!($($a)*));
    }};
}

pub(crate) use console_info;
