//! Build script that reports missing system libraries with installation hints.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");

    if !pkg_config_available() {
        println!("cargo:warning=pkg-config not found. It is needed to locate OpenCV.");
        println!("cargo:warning=On Ubuntu: sudo apt-get install pkg-config");
        return;
    }

    check_opencv();

    // Scroll injection talks to the X server over the wire protocol, so only the
    // XTEST extension matters at runtime; this is a hint, not a link requirement.
    if env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "linux") && !pkg_config_has("xtst") {
        println!("cargo:warning=XTEST development files not found. Scrolling needs an X server with XTEST.");
        println!("cargo:warning=On Ubuntu: sudo apt-get install libxtst-dev");
    }
}

fn pkg_config_available() -> bool {
    Command::new("pkg-config")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

fn pkg_config_has(package: &str) -> bool {
    Command::new("pkg-config")
        .args(["--exists", package])
        .output()
        .is_ok_and(|output| output.status.success())
}

fn check_opencv() {
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");

    for package in ["opencv4", "opencv"] {
        if let Ok(output) = Command::new("pkg-config").args(["--modversion", package]).output() {
            if output.status.success() {
                let version = String::from_utf8_lossy(&output.stdout);
                println!("cargo:warning=Found OpenCV version: {}", version.trim());
                return;
            }
        }
    }

    println!("cargo:warning=OpenCV not found via pkg-config. Make sure OpenCV is installed.");
    println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev clang libclang-dev");
    println!("cargo:warning=On macOS: brew install opencv");
}
