//! Byte-level builders for synthetic NTFS images, used by the integration
//! tests to drive the decoder against literal on-disk layouts instead of a
//! real captured volume.

pub const SECTOR: usize = 512;
pub const RECORD_MAGIC: u32 = 0x454C_4946;
pub const ATTR_END_MARKER: u32 = 0xFFFF_FFFF;
pub const IN_USE_FLAG: u16 = 0x0001;

pub fn boot_sector(
    bytes_per_sector: u16,
    sectors_per_cluster: u8,
    mft_cluster: u64,
    clusters_per_record: i8,
    serial: u64,
) -> Vec<u8> {
    let mut s = vec![0u8; SECTOR];
    s[0x0B..0x0D].copy_from_slice(&bytes_per_sector.to_le_bytes());
    s[0x0D] = sectors_per_cluster;
    s[0x30..0x38].copy_from_slice(&mft_cluster.to_le_bytes());
    s[0x40] = clusters_per_record as u8;
    s[0x48..0x50].copy_from_slice(&serial.to_le_bytes());
    s[510] = 0x55;
    s[511] = 0xAA;
    s
}

pub fn mbr(partition_lba: u32) -> Vec<u8> {
    let mut s = vec![0u8; SECTOR];
    let entry = 0x1BE;
    s[entry + 0x04] = 0x07;
    s[entry + 0x08..entry + 0x0C].copy_from_slice(&partition_lba.to_le_bytes());
    s[510] = 0x55;
    s[511] = 0xAA;
    s
}

fn align8(x: usize) -> usize {
    (x + 7) & !7
}

/// Builds a resident attribute: a fixed 0x18-byte header followed by `data`.
pub fn resident_attr(attr_type: u32, id: u16, data: &[u8]) -> Vec<u8> {
    const HEADER_LEN: usize = 0x18;
    let total = align8(HEADER_LEN + data.len());
    let mut buf = vec![0u8; total];
    buf[0x00..0x04].copy_from_slice(&attr_type.to_le_bytes());
    buf[0x04..0x08].copy_from_slice(&(total as u32).to_le_bytes());
    buf[0x08] = 0;
    buf[0x09] = 0;
    buf[0x0E..0x10].copy_from_slice(&id.to_le_bytes());
    buf[0x10..0x14].copy_from_slice(&(data.len() as u32).to_le_bytes());
    buf[0x14..0x16].copy_from_slice(&(HEADER_LEN as u16).to_le_bytes());
    buf[HEADER_LEN..HEADER_LEN + data.len()].copy_from_slice(data);
    buf
}

/// Builds a non-resident attribute: a fixed 0x40-byte header (run list
/// starts right after it) followed by the packed run-list bytes.
pub fn non_resident_attr(
    attr_type: u32,
    id: u16,
    real_size: u64,
    allocated_size: u64,
    run_list: &[u8],
) -> Vec<u8> {
    const HEADER_LEN: usize = 0x40;
    let total = align8(HEADER_LEN + run_list.len());
    let mut buf = vec![0u8; total];
    buf[0x00..0x04].copy_from_slice(&attr_type.to_le_bytes());
    buf[0x04..0x08].copy_from_slice(&(total as u32).to_le_bytes());
    buf[0x08] = 1;
    buf[0x09] = 0;
    buf[0x0E..0x10].copy_from_slice(&id.to_le_bytes());
    buf[0x20..0x22].copy_from_slice(&(HEADER_LEN as u16).to_le_bytes());
    buf[0x28..0x30].copy_from_slice(&allocated_size.to_le_bytes());
    buf[0x30..0x38].copy_from_slice(&real_size.to_le_bytes());
    buf[HEADER_LEN..HEADER_LEN + run_list.len()].copy_from_slice(run_list);
    buf
}

/// Packs one data-run header (`LenSize=8, OffSize=8`) encoding `delta`, the
/// signed change to the running logical cluster number — enough precision
/// for test fixtures that don't need the compact variable-width encoding.
/// Concatenate the output of several calls to build a multi-run list; end
/// the sequence with a single `0x00` byte.
pub fn pack_run(delta: i64, count: u64) -> Vec<u8> {
    let mut out = vec![0x88u8];
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&delta.to_le_bytes());
    out
}

pub fn standard_information(creation: u64, modified: u64, changed: u64, read: u64, flags: u32) -> Vec<u8> {
    let mut data = vec![0u8; 0x30];
    data[0x00..0x08].copy_from_slice(&creation.to_le_bytes());
    data[0x08..0x10].copy_from_slice(&modified.to_le_bytes());
    data[0x10..0x18].copy_from_slice(&changed.to_le_bytes());
    data[0x18..0x20].copy_from_slice(&read.to_le_bytes());
    data[0x20..0x24].copy_from_slice(&flags.to_le_bytes());
    data
}

pub fn file_name(parent_index: u64, name: &str) -> Vec<u8> {
    let name_units: Vec<u16> = name.encode_utf16().collect();
    let mut data = vec![0u8; 0x42 + name_units.len() * 2];
    data[0x00..0x08].copy_from_slice(&parent_index.to_le_bytes());
    data[0x40] = name_units.len() as u8;
    data[0x41] = 1; // POSIX namespace
    for (i, unit) in name_units.iter().enumerate() {
        data[0x42 + i * 2..0x42 + i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    data
}

pub fn volume_information(major: u8, minor: u8) -> Vec<u8> {
    let mut data = vec![0u8; 12];
    data[0x08] = major;
    data[0x09] = minor;
    data
}

pub fn volume_name(name: &str) -> Vec<u8> {
    name.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

/// Builds one MFT record, `record_size` bytes, holding `attrs` back to back
/// starting at a fixed attributes offset.
pub fn mft_record(index: u32, flags: u16, record_size: usize, attrs: &[Vec<u8>]) -> Vec<u8> {
    const ATTRS_OFFSET: usize = 0x38;
    let mut buf = vec![0u8; record_size];
    buf[0x00..0x04].copy_from_slice(&RECORD_MAGIC.to_le_bytes());
    buf[0x14..0x16].copy_from_slice(&(ATTRS_OFFSET as u16).to_le_bytes());
    buf[0x16..0x18].copy_from_slice(&flags.to_le_bytes());

    let mut pos = ATTRS_OFFSET;
    for attr in attrs {
        buf[pos..pos + attr.len()].copy_from_slice(attr);
        pos += attr.len();
    }
    buf[pos..pos + 4].copy_from_slice(&ATTR_END_MARKER.to_le_bytes());
    pos += 4;

    buf[0x18..0x1C].copy_from_slice(&(pos as u32).to_le_bytes());
    buf[0x1C..0x20].copy_from_slice(&(record_size as u32).to_le_bytes());
    buf[0x2C..0x30].copy_from_slice(&index.to_le_bytes());
    buf
}

/// A growable byte canvas images are assembled into, addressed by absolute
/// offset so callers can place sectors/clusters wherever their scenario
/// needs them.
pub struct ImageBuilder {
    bytes: Vec<u8>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn put(&mut self, offset: u64, data: &[u8]) {
        let end = offset as usize + data.len();
        if self.bytes.len() < end {
            self.bytes.resize(end, 0);
        }
        self.bytes[offset as usize..end].copy_from_slice(data);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
