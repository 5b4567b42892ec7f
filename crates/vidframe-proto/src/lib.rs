//! Protobuf messages describing the output of a capture run.

pub mod proto {
    /// Everything a capture run produced for one source video.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CaptureManifest {
        #[prost(string, tag = "1")]
        pub source_path: String,
        /// Probed duration of the source, 0 when unknown.
        #[prost(uint64, tag = "2")]
        pub duration_millis: u64,
        #[prost(uint32, tag = "3")]
        pub width: u32,
        #[prost(uint32, tag = "4")]
        pub height: u32,
        #[prost(message, repeated, tag = "5")]
        pub frames: Vec<CapturedFrame>,
        /// Path of the rendered contact sheet, empty if none was written.
        #[prost(string, tag = "6")]
        pub sheet_path: String,
    }

    /// A single captured still and where it was written.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CapturedFrame {
        #[prost(uint32, tag = "1")]
        pub index: u32,
        #[prost(uint64, tag = "2")]
        pub time_millis: u64,
        #[prost(string, tag = "3")]
        pub image_path: String,
    }
}
