//! Build tool argument vector.
//!
//! The order is fixed and flags whose condition does not hold are left out:
//!
//! 1. `--directory=<dir>`
//! 2. `<toolchain_root_var>=<toolchain_root>` if the root is set
//! 3. `-j<processor_count>` if more than one processor
//! 4. `-s` if silent
//! 5. `CC=<cc>` if set
//! 6. `CXX=<cxx>` if set
//! 7. `PLATFORM_VARIANT=<variant>` if set
//! 8. `MAKEFILE_DEBUG=1` if debug tracing is on
//! 9. `<target>`

use std::path::Path;

use crate::build::config::BuildConfig;

/// Computes the full argument vector for building `target` in `dir`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sketch_tasks::{build_arguments, BuildConfig};
///
/// let config = BuildConfig::default()
///     .with_processor_count(4)
///     .with_silent(true)
///     .with_cxx("g++");
///
/// assert_eq!(
///     build_arguments(&config, Path::new("/proj"), "Release"),
///     vec!["--directory=/proj", "-j4", "-s", "CXX=g++", "Release"]
/// );
/// ```
pub fn build_arguments(config: &BuildConfig, dir: &Path, target: &str) -> Vec<String> {
    let mut args = vec![format!("--directory={}", normalize_directory(dir))];

    if !config.toolchain_root.is_empty() {
        args.push(format!(
            "{}={}",
            config.toolchain_root_var, config.toolchain_root
        ));
    }

    if config.processor_count > 1 {
        args.push(format!("-j{}", config.processor_count));
    }

    if config.silent {
        args.push("-s".to_string());
    }

    if !config.cc.is_empty() {
        args.push(format!("CC={}", config.cc));
    }

    if !config.cxx.is_empty() {
        args.push(format!("CXX={}", config.cxx));
    }

    if !config.platform_variant.is_empty() {
        args.push(format!("PLATFORM_VARIANT={}", config.platform_variant));
    }

    if config.debug {
        args.push("MAKEFILE_DEBUG=1".to_string());
    }

    args.push(target.to_string());
    args
}

/// Converts `dir` to the forward-slash form make expects on this host.
///
/// On Windows the drive prefix is also removed, since `:` is special to make.
pub fn normalize_directory(dir: &Path) -> String {
    normalize_path_for_make(&dir.to_string_lossy(), cfg!(windows))
}

/// Rewrites backslashes as forward slashes and, when `strip_drive` is set,
/// removes a verbatim `\\?\` prefix and a leading `X:` drive designator.
///
/// # Examples
///
/// ```
/// use sketch_tasks::build::args::normalize_path_for_make;
///
/// assert_eq!(normalize_path_for_make(r"C:\sketches\Hello", true), "/sketches/Hello");
/// assert_eq!(normalize_path_for_make(r"C:\sketches\Hello", false), "C:/sketches/Hello");
/// assert_eq!(normalize_path_for_make("/home/me/Hello", true), "/home/me/Hello");
/// ```
pub fn normalize_path_for_make(raw: &str, strip_drive: bool) -> String {
    let mut path = raw.replace('\\', "/");

    if strip_drive {
        if let Some(rest) = path.strip_prefix("//?/") {
            path = rest.to_string();
        }

        let bytes = path.as_bytes();
        if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
            path.replace_range(..2, "");
        }
    }

    path
}
