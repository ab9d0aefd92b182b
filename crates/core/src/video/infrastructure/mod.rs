pub mod ffmpeg_video_source;
pub mod image_file_writer;
