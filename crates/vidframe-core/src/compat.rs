//! Names kept only for consumers built against older releases.

/// Empty placeholder for the retired GStreamer video panel.
///
/// An externally versioned plugin still refers to
/// `vidframe_core::compat::GstVideoPanel` by path when it sets up logging.
/// Remove this only together with the release that drops that plugin's
/// support for versions which expect the name.
#[deprecated(note = "has no behavior; exists so older plugins still resolve this path")]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GstVideoPanel;

#[allow(deprecated)]
impl GstVideoPanel {
    pub fn new() -> Self {
        Self
    }
}
