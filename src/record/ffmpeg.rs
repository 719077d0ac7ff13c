//! Video encoder backed by FFmpeg (feature: record-ffmpeg).
//!
//! MPEG-4 Part 2 in whatever container the output path implies (the default
//! `output.avi` gives an AVI), encoding at the configured rate. Frames arrive
//! as RGB24 and are converted to YUV420P through a software scaler.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;

use super::RecorderConfig;

pub(crate) struct FfmpegRecorder {
    octx: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::Video,
    scaler: ffmpeg::software::scaling::context::Context,
    stream_index: usize,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
    width: u32,
    height: u32,
    next_pts: i64,
}

impl FfmpegRecorder {
    pub(crate) fn create(config: &RecorderConfig) -> Result<Self> {
        // YUV420P halves the chroma planes; odd dimensions cannot be encoded.
        if config.width % 2 != 0 || config.height % 2 != 0 {
            return Err(anyhow!(
                "recording size {}x{} must be even in both dimensions",
                config.width,
                config.height
            ));
        }

        ffmpeg::init().context("initialize ffmpeg")?;
        let mut octx = ffmpeg::format::output(&config.path)
            .with_context(|| format!("open recording output {}", config.path))?;

        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4)
            .ok_or_else(|| anyhow!("ffmpeg build has no MPEG4 encoder"))?
            .video()
            .context("MPEG4 codec is not a video codec")?;
        let mut stream = octx
            .add_stream(codec)
            .context("add video stream to recording")?;
        let stream_index = stream.index();

        // time_base = 1/fps: one tick of the clock per frame.
        let frame_rate = ffmpeg::Rational::new((config.fps * 1000.0).round() as i32, 1000);
        let encoder_time_base = frame_rate.invert();

        let mut encoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .context("load encoder parameters")?
            .encoder()
            .video()
            .context("create video encoder")?;
        encoder.set_width(config.width);
        encoder.set_height(config.height);
        encoder.set_format(ffmpeg::util::format::pixel::Pixel::YUV420P);
        encoder.set_time_base(encoder_time_base);
        encoder.set_frame_rate(Some(frame_rate));

        let encoder = encoder.open_as(codec).context("open MPEG4 encoder")?;
        stream.set_parameters(&encoder);

        let scaler = ffmpeg::software::scaling::context::Context::get(
            ffmpeg::util::format::pixel::Pixel::RGB24,
            config.width,
            config.height,
            ffmpeg::util::format::pixel::Pixel::YUV420P,
            config.width,
            config.height,
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create RGB to YUV scaler")?;

        octx.write_header().context("write recording header")?;
        // The muxer may rewrite the stream time base during write_header;
        // packets are rescaled into whatever it settled on.
        let stream_time_base = octx
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .unwrap_or(encoder_time_base);

        Ok(Self {
            octx,
            encoder,
            scaler,
            stream_index,
            encoder_time_base,
            stream_time_base,
            width: config.width,
            height: config.height,
            next_pts: 0,
        })
    }

    pub(crate) fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let mut rgb = ffmpeg::frame::Video::new(
            ffmpeg::util::format::pixel::Pixel::RGB24,
            self.width,
            self.height,
        );

        // The encoder frame's plane may be row-padded; copy row by row.
        let row_bytes = (self.width as usize) * 3;
        let stride = rgb.stride(0);
        let data = rgb.data_mut(0);
        for (row, chunk) in frame.as_raw().chunks_exact(row_bytes).enumerate() {
            let start = row * stride;
            data[start..start + row_bytes].copy_from_slice(chunk);
        }

        let mut yuv = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&rgb, &mut yuv)
            .context("convert frame to YUV")?;
        yuv.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder
            .send_frame(&yuv)
            .context("send frame to encoder")?;
        self.drain_packets()
    }

    pub(crate) fn finish(mut self) -> Result<()> {
        self.encoder.send_eof().context("flush encoder")?;
        self.drain_packets()?;
        self.octx.write_trailer().context("write recording trailer")?;
        Ok(())
    }

    fn drain_packets(&mut self) -> Result<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.octx)
                .context("write packet to recording")?;
        }
        Ok(())
    }
}
