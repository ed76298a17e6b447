//! [`CaptureService`] backed by the GNOME Shell screencast D-Bus service.

use std::collections::HashMap;

use async_trait::async_trait;
use castmate_common::error::{CastmateError, CastmateResult};
use castmate_platform_linux::screencast::{connect_screencast, ShellScreencastProxy};
use zbus::zvariant::Value;

use crate::request::{CaptureOptions, OptionValue};
use crate::service::CaptureService;

pub struct ShellScreencastService {
    proxy: ShellScreencastProxy<'static>,
}

impl ShellScreencastService {
    /// Connect to the service on the session bus.
    pub async fn connect() -> CastmateResult<Self> {
        Ok(Self::new(connect_screencast().await?))
    }

    pub fn new(proxy: ShellScreencastProxy<'static>) -> Self {
        Self { proxy }
    }
}

#[async_trait]
impl CaptureService for ShellScreencastService {
    async fn screencast(
        &self,
        filename_stem: &str,
        options: &CaptureOptions,
    ) -> CastmateResult<(bool, String)> {
        self.proxy
            .screencast(filename_stem, dbus_options(options))
            .await
            .map_err(|e| CastmateError::capture(format!("Screencast call failed: {e}")))
    }

    async fn screencast_area(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        filename_stem: &str,
        options: &CaptureOptions,
    ) -> CastmateResult<(bool, String)> {
        let width = i32::try_from(width)
            .map_err(|_| CastmateError::capture(format!("Capture width too large: {width}")))?;
        let height = i32::try_from(height)
            .map_err(|_| CastmateError::capture(format!("Capture height too large: {height}")))?;

        self.proxy
            .screencast_area(x, y, width, height, filename_stem, dbus_options(options))
            .await
            .map_err(|e| CastmateError::capture(format!("ScreencastArea call failed: {e}")))
    }
}

/// Convert options to the service's `a{sv}` dictionary.
fn dbus_options(options: &CaptureOptions) -> HashMap<&str, Value<'_>> {
    options
        .iter()
        .map(|(key, value)| {
            let value = match value {
                OptionValue::Bool(flag) => Value::from(*flag),
                OptionValue::I32(number) => Value::from(*number),
                OptionValue::Str(text) => Value::from(text.as_str()),
            };
            (key, value)
        })
        .collect()
}
