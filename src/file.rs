//! High-level file view stitching `$STANDARD_INFORMATION`, `$FILE_NAME` and
//! the unnamed `$DATA` attribute together, and the data-run-driven reader
//! built on top of it.

use byteorder::{ByteOrder, LittleEndian};

use crate::arena::Arena;
use crate::attr::{Attr, AttrBody, AttrType};
use crate::error::NtfsError;
use crate::record::MftRecord;
use crate::volume::Volume;

bitflags::bitflags! {
    /// DOS-style file attribute word from `$STANDARD_INFORMATION` + 0x20.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileFlags: u32 {
        const READ_ONLY            = 0x0001;
        const HIDDEN                = 0x0002;
        const SYSTEM                = 0x0004;
        const ARCHIVE               = 0x0020;
        const DEVICE                = 0x0040;
        const NORMAL                = 0x0080;
        const TEMPORARY             = 0x0100;
        const SPARSE_FILE           = 0x0200;
        const REPARSE_POINT         = 0x0400;
        const COMPRESSED            = 0x0800;
        const OFFLINE               = 0x1000;
        const NOT_CONTENT_INDEXED   = 0x2000;
        const ENCRYPTED             = 0x4000;
    }
}

mod standard_information {
    pub const CREATION_TIME: usize = 0x00;
    pub const MODIFIED_TIME: usize = 0x08;
    pub const CHANGED_TIME: usize = 0x10;
    pub const READ_TIME: usize = 0x18;
    pub const FLAGS: usize = 0x20;
}

mod file_name {
    pub const PARENT_REFERENCE: usize = 0x00;
    pub const NAME_LENGTH: usize = 0x40;
    pub const NAME: usize = 0x42;
}

/// Mask isolating the 48-bit MFT index out of an 8-byte file reference
/// (the high 16 bits are a sequence number this decoder does not track).
const FILE_REFERENCE_INDEX_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

/// A decoded file: its record plus the stitched-together view NTFS callers
/// actually want.
pub struct File<'a> {
    pub volume: &'a Volume,
    pub record: MftRecord<'a>,
    pub creation_time: u64,
    pub modified_time: u64,
    pub changed_time: u64,
    pub read_time: u64,
    pub flags: FileFlags,
    pub parent_index: u64,
    pub name: Vec<u16>,
    pub size: u64,
    pub aligned_size: u64,
}

impl<'a> File<'a> {
    /// Decodes the file at `index`. `arena` backs the record, its
    /// attributes, and the copied name — callers own the arena and drop it
    /// once done with the file, releasing everything at once.
    pub fn open(volume: &'a Volume, arena: &'a Arena, index: u64) -> Result<Self, NtfsError> {
        let record = volume.decode_record(arena, index)?;

        let std_info = record
            .find_unnamed(AttrType::StandardInformation)
            .ok_or(NtfsError::FileFailedInfoValidation { index })?;
        let file_name_attr = record
            .find_unnamed(AttrType::FileName)
            .ok_or(NtfsError::FileFailedInfoValidation { index })?;

        let std_data = resident_bytes(std_info).ok_or(NtfsError::FileFailedInfoValidation { index })?;
        if std_data.len() < standard_information::FLAGS + 4 {
            return Err(NtfsError::FileFailedInfoValidation { index });
        }

        let creation_time = read_timestamp(std_data, standard_information::CREATION_TIME, index)?;
        let modified_time = read_timestamp(std_data, standard_information::MODIFIED_TIME, index)?;
        let changed_time = read_timestamp(std_data, standard_information::CHANGED_TIME, index)?;
        let read_time = read_timestamp(std_data, standard_information::READ_TIME, index)?;
        let flags_raw = LittleEndian::read_u32(&std_data[standard_information::FLAGS..]);
        let flags = FileFlags::from_bits_truncate(flags_raw);

        let name_data =
            resident_bytes(file_name_attr).ok_or(NtfsError::FileFailedInfoValidation { index })?;
        if name_data.len() <= file_name::NAME_LENGTH {
            return Err(NtfsError::FileFailedInfoValidation { index });
        }

        let parent_reference = LittleEndian::read_u64(&name_data[file_name::PARENT_REFERENCE..]);
        let parent_index = parent_reference & FILE_REFERENCE_INDEX_MASK;

        let name_length = name_data[file_name::NAME_LENGTH] as usize;
        let name_bytes_available = name_data.len().saturating_sub(file_name::NAME);
        if name_length * 2 > name_bytes_available {
            return Err(NtfsError::FileFailedInfoValidation { index });
        }
        let name_end = file_name::NAME + name_length * 2;
        let mut name: Vec<u16> = name_data[file_name::NAME..name_end]
            .chunks_exact(2)
            .map(|p| u16::from_le_bytes([p[0], p[1]]))
            .collect();
        name.push(0);

        let (size, aligned_size) = match record.find_unnamed(AttrType::Data) {
            Some(data_attr) => match &data_attr.body {
                AttrBody::Resident { data } => {
                    let size = data.len() as u64;
                    (size, align_up(size, volume.bytes_per_cluster))
                }
                AttrBody::NonResident {
                    real_size,
                    allocated_size,
                    ..
                } => (*real_size, *allocated_size),
            },
            None => (0, 0),
        };

        Ok(Self {
            volume,
            record,
            creation_time,
            modified_time,
            changed_time,
            read_time,
            flags,
            parent_index,
            name,
            size,
            aligned_size,
        })
    }

    /// Reads up to `buf.len()` bytes of file content starting at `offset`.
    /// Returns the number of bytes copied.
    ///
    /// `offset` and `buf.len()` must be multiples of the volume's cluster
    /// size, matching the source's restriction on non-resident reads.
    pub fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize, NtfsError> {
        let data_attr = self
            .record
            .find_unnamed(AttrType::Data)
            .ok_or(NtfsError::FileReadDataAttrNotFound {
                index: self.record.index,
            })?;

        if buf.is_empty() {
            return Ok(0);
        }

        match &data_attr.body {
            AttrBody::Resident { data } => {
                let start = (offset as usize).min(data.len());
                let available = data.len() - start;
                let copy_len = buf.len().min(available);
                buf[..copy_len].copy_from_slice(&data[start..start + copy_len]);
                Ok(copy_len)
            }
            AttrBody::NonResident { runs, .. } => self.read_non_resident(runs.as_slice(), offset, buf),
        }
    }

    fn read_non_resident(
        &self,
        runs: &[crate::runlist::DataRun],
        offset: u64,
        buf: &mut [u8],
    ) -> Result<usize, NtfsError> {
        let bytes_per_cluster = self.volume.bytes_per_cluster;
        let mut file_offset: u64 = 0;
        let mut buffer_offset: usize = 0;
        let mut remaining = buf.len() as u64;
        let mut requested_offset = offset;

        for run in runs {
            if remaining == 0 {
                break;
            }

            // The run's own byte length, tracked separately from whatever
            // portion of it we actually read — unlike the source, which
            // reuses the clamped read size to advance its file-position
            // cursor and can misalign later runs after a partial read.
            let run_len = run.count * bytes_per_cluster;
            let run_start = file_offset;
            let run_end = run_start + run_len;

            let window_start = requested_offset.max(run_start);
            let window_end = (requested_offset + remaining).min(run_end);

            if window_start < window_end {
                let read_len = window_end - window_start;
                let read_offset = run.lcn * bytes_per_cluster + (window_start - run_start);

                let dest_end = buffer_offset + read_len as usize;
                self.volume
                    .read(read_offset, &mut buf[buffer_offset..dest_end])
                    .map_err(|_| NtfsError::FileReadFailed {
                        index: self.record.index,
                        source: std::io::Error::new(std::io::ErrorKind::Other, "volume read failed"),
                    })?;

                buffer_offset += read_len as usize;
                requested_offset += read_len;
                remaining -= read_len;
            }

            file_offset += run_len;
        }

        Ok(buffer_offset)
    }
}

fn resident_bytes<'a>(attr: &'a Attr<'a>) -> Option<&'a [u8]> {
    match &attr.body {
        AttrBody::Resident { data } => Some(data),
        AttrBody::NonResident { .. } => None,
    }
}

fn read_timestamp(data: &[u8], offset: usize, index: u64) -> Result<u64, NtfsError> {
    let value = LittleEndian::read_u64(&data[offset..]);
    if value & (1 << 63) != 0 {
        return Err(NtfsError::FileFailedInfoValidation { index });
    }
    Ok(value)
}

fn align_up(value: u64, power_of_two: u64) -> u64 {
    (value + power_of_two - 1) & !(power_of_two - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_matches_formula() {
        assert_eq!(align_up(0, 4096), 0);
        assert_eq!(align_up(1, 4096), 4096);
        assert_eq!(align_up(4096, 4096), 4096);
        assert_eq!(align_up(4097, 4096), 8192);
        assert_eq!(align_up(123, 4096), 4096);
    }
}
