pub mod models;
pub mod traits;
pub mod ytdlp;

pub use models::VideoDetails;
pub use traits::Extractor;
pub use ytdlp::{parse_video_details, YtDlpExtractor};
