// PSID / RSID header parser (v1–v4) with payload extraction.

use crate::c64::SidPort;
use crate::mos6510::Cpu;

/// Smallest valid header (v1).
const MIN_HEADER_LEN: usize = 0x76;

/// Parsed SID file header.
#[derive(Debug, Clone)]
pub struct SidHeader {
    pub magic: String,
    pub version: u16,
    pub data_offset: u16,
    pub load_address: u16,
    pub init_address: u16,
    pub play_address: u16,
    pub songs: u16,
    /// One-based, as stored in the file.
    pub start_song: u16,
    pub speed: u32,
    pub name: String,
    pub author: String,
    pub released: String,
    pub is_pal: bool,
    pub is_rsid: bool,
}

impl SidHeader {
    /// Frame duration in microseconds.
    pub fn frame_us(&self) -> u64 {
        if self.is_pal {
            20_000
        } else {
            16_667
        }
    }
}

/// A fully loaded SID file: header + extracted payload + its load address.
#[derive(Debug, Clone)]
pub struct SidFile {
    pub header: SidHeader,
    pub load_address: u16,
    pub payload: Vec<u8>,
    /// Full raw file bytes (needed for MD5 computation for Songlength).
    pub raw: Vec<u8>,
}

impl SidFile {
    pub fn init_address(&self) -> u16 {
        self.header.init_address
    }

    /// Zero means the tune installs its own IRQ handler during init.
    pub fn play_address(&self) -> u16 {
        self.header.play_address
    }

    /// Highest subsong index (song count minus one).
    pub fn subsongs(&self) -> u8 {
        (self.header.songs as u8).wrapping_sub(1)
    }

    /// Zero-based default song, suitable as the init routine's A register.
    /// A header start song of 0 means song 1.
    pub fn start_song(&self) -> u8 {
        let song = self.header.start_song.max(1) - 1;
        song.min(self.subsongs() as u16) as u8
    }

    /// Low byte of the speed word: bit n set = song n+1 is CIA-timed.
    pub fn speed(&self) -> u8 {
        self.header.speed as u8
    }

    /// Copy the payload into C64 memory at its load address.
    pub fn install<S: SidPort>(&self, cpu: &mut Cpu<S>) -> Result<(), String> {
        let end = self.load_address as usize + self.payload.len();
        if end >= 0x10000 {
            return Err(format!(
                "Payload of {} bytes at ${:04X} runs past end of memory",
                self.payload.len(),
                self.load_address,
            ));
        }
        cpu.bulk_copy(self.load_address, &self.payload);
        log::debug!(
            "Installed ${:04X}-${:04X} ({} bytes)",
            self.load_address,
            end - 1,
            self.payload.len(),
        );
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn read_be_u16(d: &[u8], o: usize) -> u16 {
    ((d[o] as u16) << 8) | d[o + 1] as u16
}

fn read_be_u32(d: &[u8], o: usize) -> u32 {
    ((d[o] as u32) << 24) | ((d[o + 1] as u32) << 16) | ((d[o + 2] as u32) << 8) | d[o + 3] as u32
}

fn read_string(d: &[u8], o: usize, len: usize) -> String {
    let s = &d[o..o + len];
    let end = s.iter().position(|&b| b == 0).unwrap_or(len);
    String::from_utf8_lossy(&s[..end]).to_string()
}

// ── Public API ───────────────────────────────────────────────────────────

/// Parse a SID file from raw bytes.
pub fn load_sid(data: &[u8]) -> Result<SidFile, String> {
    let header = parse_header(data)?;
    let ds = header.data_offset as usize;

    if ds >= data.len() {
        return Err("data_offset past end of file".into());
    }

    let (load_address, payload_start) = if header.load_address == 0 {
        if ds + 2 > data.len() {
            return Err("File too small for embedded load address".into());
        }
        let lo = data[ds] as u16;
        let hi = data[ds + 1] as u16;
        ((hi << 8) | lo, ds + 2)
    } else {
        (header.load_address, ds)
    };

    let payload = data[payload_start..].to_vec();

    Ok(SidFile {
        header,
        load_address,
        payload,
        raw: data.to_vec(),
    })
}

/// Parse just the header (no payload extraction).
pub fn parse_header(data: &[u8]) -> Result<SidHeader, String> {
    if data.len() < MIN_HEADER_LEN {
        return Err(format!(
            "File too small for a SID header ({} bytes)",
            data.len()
        ));
    }

    let magic = String::from_utf8_lossy(&data[0..4]).to_string();
    if magic != "PSID" && magic != "RSID" {
        return Err(format!("Not a SID file (magic={magic:?})"));
    }

    let is_rsid = magic == "RSID";
    let version = read_be_u16(data, 0x04);
    let mut is_pal = true;

    if version >= 2 && data.len() >= 0x78 {
        let flags = read_be_u16(data, 0x76);
        is_pal = ((flags >> 2) & 0x03) != 2;
    }

    Ok(SidHeader {
        magic,
        version,
        data_offset: read_be_u16(data, 0x06),
        load_address: read_be_u16(data, 0x08),
        init_address: read_be_u16(data, 0x0A),
        play_address: read_be_u16(data, 0x0C),
        songs: read_be_u16(data, 0x0E),
        start_song: read_be_u16(data, 0x10),
        speed: read_be_u32(data, 0x12),
        name: read_string(data, 0x16, 32),
        author: read_string(data, 0x36, 32),
        released: read_string(data, 0x56, 32),
        is_pal,
        is_rsid,
    })
}

/// Compute the MD5 hash used by the HVSC Songlength database.
///
/// https://hvsc.c64.org/download/C64Music/DOCUMENTS/Songlengths.faq
pub fn compute_hvsc_md5(sid: &SidFile) -> String {
    format!("{:x}", md5::compute(&sid.raw))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::c64::NullSid;

    /// Minimal v2 PSID image.
    pub(crate) fn psid(load: u16, init: u16, play: u16, body: &[u8]) -> Vec<u8> {
        let mut d = vec![0u8; 0x7C];
        d[0..4].copy_from_slice(b"PSID");
        d[0x04..0x06].copy_from_slice(&2u16.to_be_bytes());
        d[0x06..0x08].copy_from_slice(&0x7Cu16.to_be_bytes());
        d[0x08..0x0A].copy_from_slice(&load.to_be_bytes());
        d[0x0A..0x0C].copy_from_slice(&init.to_be_bytes());
        d[0x0C..0x0E].copy_from_slice(&play.to_be_bytes());
        d[0x0E..0x10].copy_from_slice(&3u16.to_be_bytes());
        d[0x10..0x12].copy_from_slice(&2u16.to_be_bytes());
        d[0x12..0x16].copy_from_slice(&0x0000_0101u32.to_be_bytes());
        d[0x16..0x16 + 9].copy_from_slice(b"Test Tune");
        d[0x36..0x36 + 6].copy_from_slice(b"Nobody");
        d[0x56..0x56 + 4].copy_from_slice(b"2024");
        d.extend_from_slice(body);
        d
    }

    #[test]
    fn test_parse_header_fields() {
        let data = psid(0x1000, 0x1000, 0x1003, &[0x60]);
        let h = parse_header(&data).unwrap();
        assert_eq!(h.magic, "PSID");
        assert_eq!(h.version, 2);
        assert_eq!(h.data_offset, 0x7C);
        assert_eq!((h.load_address, h.init_address, h.play_address), (0x1000, 0x1000, 0x1003));
        assert_eq!((h.songs, h.start_song), (3, 2));
        assert_eq!(h.name, "Test Tune");
        assert_eq!(h.author, "Nobody");
        assert_eq!(h.released, "2024");
        assert!(h.is_pal);
        assert!(!h.is_rsid);
        assert_eq!(h.frame_us(), 20_000);
    }

    #[test]
    fn test_ntsc_flag() {
        let mut data = psid(0x1000, 0x1000, 0x1003, &[0x60]);
        data[0x77] = 0x08; // clock = NTSC
        assert!(!parse_header(&data).unwrap().is_pal);
    }

    #[test]
    fn test_rejects_short_and_bad_magic() {
        assert!(parse_header(&[0u8; 0x75]).is_err());
        let mut data = psid(0x1000, 0x1000, 0x1003, &[]);
        data[0..4].copy_from_slice(b"MUS\0");
        assert!(parse_header(&data).unwrap_err().contains("Not a SID file"));
    }

    #[test]
    fn test_load_uses_header_address() {
        let sid = load_sid(&psid(0x2000, 0x2000, 0x2003, &[1, 2, 3])).unwrap();
        assert_eq!(sid.load_address, 0x2000);
        assert_eq!(sid.payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_load_uses_embedded_address() {
        let sid = load_sid(&psid(0, 0x1000, 0x1003, &[0x00, 0x10, 0xEA, 0x60])).unwrap();
        assert_eq!(sid.load_address, 0x1000);
        assert_eq!(sid.payload, vec![0xEA, 0x60]);

        assert!(load_sid(&psid(0, 0x1000, 0x1003, &[0x00])).is_err());
    }

    #[test]
    fn test_load_rejects_missing_payload() {
        assert!(load_sid(&psid(0x1000, 0x1000, 0x1003, &[])).is_err());
    }

    #[test]
    fn test_load_image_accessors() {
        let sid = load_sid(&psid(0x1000, 0x1000, 0x1003, &[0x60])).unwrap();
        assert_eq!(sid.subsongs(), 2);
        assert_eq!(sid.start_song(), 1);
        assert_eq!(sid.speed(), 0x01);
        assert_eq!(sid.init_address(), 0x1000);
        assert_eq!(sid.play_address(), 0x1003);
    }

    #[test]
    fn test_start_song_zero_means_first_song() {
        let mut data = psid(0x1000, 0x1000, 0x1003, &[0x60]);
        data[0x10] = 0;
        data[0x11] = 0;
        assert_eq!(load_sid(&data).unwrap().start_song(), 0);

        // Past the song count: clamp to the last song.
        data[0x11] = 9;
        assert_eq!(load_sid(&data).unwrap().start_song(), 2);
    }

    #[test]
    fn test_install_copies_payload() {
        let sid = load_sid(&psid(0x1000, 0x1000, 0x1003, &[0xA9, 0x0F, 0x60])).unwrap();
        let mut cpu = Cpu::new(NullSid);
        sid.install(&mut cpu).unwrap();
        assert_eq!(&cpu.memory.ram()[0x1000..0x1003], &[0xA9, 0x0F, 0x60]);
    }

    #[test]
    fn test_install_rejects_overflow() {
        let sid = load_sid(&psid(0xFFF0, 0xFFF0, 0, &[0xEA; 0x10])).unwrap();
        let mut cpu = Cpu::new(NullSid);
        assert!(sid.install(&mut cpu).is_err());
        assert!(cpu.memory.ram().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_md5_is_hex_digest_of_raw_file() {
        let sid = load_sid(&psid(0x1000, 0x1000, 0x1003, &[0x60])).unwrap();
        let digest = compute_hvsc_md5(&sid);
        assert_eq!(digest.len(), 32);
        assert_eq!(digest, format!("{:x}", md5::compute(&sid.raw)));
    }
}
