use image::RgbImage;

/// A still captured from a video, paired with where in the video it came from.
///
/// Both fields are fixed at construction.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    image: RgbImage,
    time_millis: u64,
}

impl VideoFrame {
    pub fn new(image: RgbImage, time_millis: u64) -> Self {
        Self { image, time_millis }
    }

    /// The decoded image data.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Offset of this frame from the start of the source video, in milliseconds.
    pub fn time_millis(&self) -> u64 {
        self.time_millis
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

/// Format a millisecond offset as `HH:MM:SS.mmm`.
pub fn format_timestamp(time_millis: u64) -> String {
    let millis = time_millis % 1000;
    let total_seconds = time_millis / 1000;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}
