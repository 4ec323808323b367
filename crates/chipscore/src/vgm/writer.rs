//! Builder for minimal VGM 1.50 logs.
//!
//! `VgmWriter` appends YM2612/SN76489 writes and waits to an in-memory
//! command stream and lays out header, data, end marker and Gd3 block in
//! [`VgmWriter::finalize`]. Total samples, the loop point and all relative
//! header offsets are computed there.
use crate::binutil::ParseError;
use crate::meta::Gd3;
use crate::vgm::frame::{FmWrite, Frame, PsgWrite};
use crate::vgm::header::{VGM_HEADER_SIZE, VgmHeader};
use crate::vgm::parser::{WAIT_NTSC_FRAME, WAIT_PAL_FRAME};

#[derive(Debug, Clone, Default)]
pub struct VgmWriter {
    header: VgmHeader,
    data: Vec<u8>,
    time: u64,
    /// (data position, sample time) of the loop point.
    loop_mark: Option<(usize, u64)>,
    gd3: Option<Gd3>,
}

impl VgmWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a header template. Offsets and sample counts in it are
    /// overwritten when finalizing; clocks and SN76489 parameters are kept.
    pub fn with_header(header: VgmHeader) -> Self {
        Self {
            header,
            ..Default::default()
        }
    }

    /// Current sample time.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn fm_write(&mut self, port: u8, register: u8, value: u8) -> &mut Self {
        self.data
            .extend_from_slice(&[0x52 | (port & 1), register, value]);
        self
    }

    pub fn psg_write(&mut self, data: u8) -> &mut Self {
        self.data.extend_from_slice(&[0x50, data]);
        self
    }

    pub fn psg_stereo(&mut self, mask: u8) -> &mut Self {
        self.data.extend_from_slice(&[0x4F, mask]);
        self
    }

    /// Advance time, choosing the shortest encoding for each chunk.
    pub fn wait(&mut self, samples: u64) -> &mut Self {
        let mut left = samples;
        while left > 0 {
            let step = match left {
                WAIT_NTSC_FRAME => {
                    self.data.push(0x62);
                    WAIT_NTSC_FRAME
                }
                WAIT_PAL_FRAME => {
                    self.data.push(0x63);
                    WAIT_PAL_FRAME
                }
                1..=16 => {
                    self.data.push(0x70 | (left as u8 - 1));
                    left
                }
                _ => {
                    let n = left.min(u64::from(u16::MAX));
                    self.data.push(0x61);
                    self.data.extend_from_slice(&(n as u16).to_le_bytes());
                    n
                }
            };
            left -= step;
        }
        self.time += samples;
        self
    }

    /// Append every write of `frame`, waiting first until its time.
    pub fn write_frame(&mut self, frame: &Frame) -> &mut Self {
        if frame.time > self.time {
            self.wait(frame.time - self.time);
        }
        for &FmWrite {
            port,
            register,
            value,
        } in &frame.fm
        {
            self.fm_write(port, register, value);
        }
        for write in &frame.psg {
            match *write {
                PsgWrite::Data(d) => self.psg_write(d),
                PsgWrite::Stereo(m) => self.psg_stereo(m),
            };
        }
        self
    }

    /// Mark the current position as the loop point.
    pub fn mark_loop(&mut self) -> &mut Self {
        self.loop_mark = Some((self.data.len(), self.time));
        self
    }

    pub fn set_gd3(&mut self, gd3: Gd3) -> &mut Self {
        self.gd3 = Some(gd3);
        self
    }

    /// Lay out the file and return its bytes.
    pub fn finalize(&self) -> Result<Vec<u8>, ParseError> {
        let data_start = VGM_HEADER_SIZE;
        let end_marker = data_start + self.data.len();
        let gd3_bytes = self.gd3.as_ref().map(Gd3::to_bytes);
        let gd3_offset = gd3_bytes.as_ref().map(|_| end_marker + 1);
        let eof = end_marker + 1 + gd3_bytes.as_ref().map_or(0, Vec::len);

        let header = VgmHeader {
            eof_offset: eof,
            gd3_offset,
            total_samples: self.time,
            loop_offset: self.loop_mark.map(|(pos, _)| data_start + pos),
            loop_samples: self.loop_mark.map_or(0, |(_, t)| self.time - t),
            data_offset: data_start,
            ..self.header.clone()
        };

        let mut out = Vec::with_capacity(eof);
        out.extend_from_slice(&header.to_bytes()?);
        out.extend_from_slice(&self.data);
        out.push(0x66);
        if let Some(gd3) = gd3_bytes {
            out.extend_from_slice(&gd3);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vgm::parser::parse_vgm;

    #[test]
    fn test_wait_encoding() {
        let mut w = VgmWriter::new();
        w.wait(735).wait(882).wait(5).wait(70_000);
        let bytes = w.finalize().unwrap();
        let data = &bytes[VGM_HEADER_SIZE..];
        assert_eq!(&data[..3], &[0x62, 0x63, 0x74]);
        // 70000 = 65535 + 4465
        assert_eq!(&data[3..6], &[0x61, 0xFF, 0xFF]);
        assert_eq!(&data[6..9], &[0x61, 0x71, 0x11]);
        assert_eq!(data[9], 0x66);
        assert_eq!(w.time(), 735 + 882 + 5 + 70_000);
    }

    #[test]
    fn test_loop_and_gd3_layout() {
        let mut w = VgmWriter::new();
        w.fm_write(0, 0x22, 0x00)
            .wait(100)
            .mark_loop()
            .psg_write(0x9F)
            .wait(200)
            .set_gd3(Gd3 {
                track: "t".into(),
                ..Default::default()
            });
        let bytes = w.finalize().unwrap();
        let vgm = parse_vgm(&bytes).unwrap();
        assert_eq!(vgm.header.total_samples, 300);
        assert_eq!(vgm.header.loop_samples, 200);
        assert_eq!(vgm.header.loop_offset, Some(VGM_HEADER_SIZE + 6));
        assert_eq!(vgm.loop_time(), Some(100));
        assert_eq!(vgm.gd3.unwrap().track, "t");
        assert_eq!(vgm.header.eof_offset, bytes.len());
    }
}
