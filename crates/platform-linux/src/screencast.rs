//! GNOME Shell screencast service over D-Bus.
//!
//! The service owns the recording: it prepends its own video source and
//! appends a file sink around the pipeline description it is given.

use std::collections::HashMap;

use castmate_common::error::{CastmateError, CastmateResult};
use zbus::zvariant::Value;

#[zbus::proxy(
    interface = "org.gnome.Shell.Screencast",
    default_service = "org.gnome.Shell.Screencast",
    default_path = "/org/gnome/Shell/Screencast",
    gen_blocking = false
)]
pub trait ShellScreencast {
    /// Record the whole screen. Returns `(success, filename_used)`.
    fn screencast(
        &self,
        file_template: &str,
        options: HashMap<&str, Value<'_>>,
    ) -> zbus::Result<(bool, String)>;

    /// Record a rectangular area. Returns `(success, filename_used)`.
    fn screencast_area(
        &self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        file_template: &str,
        options: HashMap<&str, Value<'_>>,
    ) -> zbus::Result<(bool, String)>;
}

/// Connect to the screencast service on the session bus.
pub async fn connect_screencast() -> CastmateResult<ShellScreencastProxy<'static>> {
    tracing::info!("Connecting to org.gnome.Shell.Screencast");

    let connection = zbus::Connection::session()
        .await
        .map_err(|e| CastmateError::dbus(format!("Failed to connect to session bus: {e}")))?;

    ShellScreencastProxy::new(&connection)
        .await
        .map_err(|e| CastmateError::dbus(format!("Failed to create screencast proxy: {e}")))
}
