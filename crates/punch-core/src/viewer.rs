//! Open images with the desktop's default viewer.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

/// Open `path` in the platform image viewer without waiting for it.
pub fn open_image(path: &Path) -> io::Result<()> {
    let mut command = viewer_command(path)?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    debug!(path = %path.display(), "opened image viewer");
    Ok(())
}

#[cfg(target_os = "windows")]
fn viewer_command(path: &Path) -> io::Result<Command> {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", ""]).arg(path);
    Ok(command)
}

#[cfg(target_os = "macos")]
fn viewer_command(path: &Path) -> io::Result<Command> {
    let mut command = Command::new("open");
    command.arg(path);
    Ok(command)
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn viewer_command(path: &Path) -> io::Result<Command> {
    let opener = which::which("xdg-open")
        .or_else(|_| which::which("gio"))
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "no xdg-open or gio in PATH"))?;

    let mut command = Command::new(&opener);
    if opener.file_name().is_some_and(|name| name == "gio") {
        command.arg("open");
    }
    command.arg(path);
    Ok(command)
}
