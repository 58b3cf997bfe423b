//! Boot sector / MBR discovery, volume geometry, and the `$Volume` /
//! `$UpCase` metadata load.

use byteorder::{ByteOrder, LittleEndian};

use crate::arena::Arena;
use crate::attr::{AttrBody, AttrType};
use crate::device::BlockReader;
use crate::error::NtfsError;
use crate::record::{self, MftRecord};

/// Well-known MFT indices, matching `NTFS_SystemFile_*` in the source.
pub mod system_files {
    pub const MFT: u64 = 0;
    pub const MFT_MIRROR: u64 = 1;
    pub const LOG_FILE: u64 = 2;
    pub const VOLUME: u64 = 3;
    pub const ATTR_DEF: u64 = 4;
    pub const ROOT_FOLDER: u64 = 5;
    pub const BITMAP: u64 = 6;
    pub const BOOT: u64 = 7;
    pub const BAD_CLUS: u64 = 8;
    pub const SECURE: u64 = 9;
    pub const UP_CASE: u64 = 10;
    pub const EXTEND: u64 = 11;
}

const BOOT_RECORD_SIZE: usize = 512;
const BOOT_RECORD_SIGNATURE_OFFSET: usize = 510;
const MBR_PARTITION_TABLE_OFFSET: usize = 0x1BE;
const MBR_PARTITION_ENTRY_SIZE: usize = 0x10;
const MBR_PARTITION_COUNT: usize = 4;
const UP_CASE_TABLE_UNITS: usize = 65_536;
const UP_CASE_TABLE_BYTES: u64 = (UP_CASE_TABLE_UNITS * 2) as u64;
const VOLUME_NAME_MAX_UNITS: usize = 127;

mod boot_sector {
    pub const BYTES_PER_SECTOR: usize = 0x0B;
    pub const SECTORS_PER_CLUSTER: usize = 0x0D;
    pub const MFT_CLUSTER: usize = 0x30;
    pub const CLUSTERS_PER_FILE_RECORD: usize = 0x40;
    pub const SERIAL_NUMBER: usize = 0x48;
}

/// NTFS volume version this decoder supports (3.1, the only version NTFS
/// has shipped since Windows XP).
const SUPPORTED_VERSION: (u8, u8) = (3, 1);

/// An opened NTFS volume: geometry plus the `$Volume` name and `$UpCase`
/// table loaded during open.
pub struct Volume {
    reader: Box<dyn BlockReader>,
    start_offset: u64,
    pub bytes_per_sector: u64,
    pub sectors_per_cluster: u64,
    pub bytes_per_cluster: u64,
    pub bytes_per_mft_entry: u64,
    pub mft_cluster: u64,
    pub serial_number: u64,
    pub name: Vec<u16>,
    pub up_case_table: Vec<u16>,
}

impl Volume {
    /// Opens a volume by drive letter (e.g. `'D'`), the source's
    /// `VolumeOpen` entry point. Realized as a positioned reader over the
    /// Win32 device path `\\.\D:`, matching the source's `CreateFileW` call
    /// (spec.md §9 "Platform I/O") — std's `File::open` resolves that path
    /// without any extra Windows-specific dependency.
    #[cfg(windows)]
    pub fn open_drive_letter(drive_letter: char) -> Result<Self, NtfsError> {
        let path = format!(r"\\.\{drive_letter}:");
        let reader =
            crate::device::FileBlockDevice::open(&path).map_err(NtfsError::VolumeOpen)?;
        Self::load(Box::new(reader), 0)
    }

    /// Opens a volume from a disk-image file, discovering the NTFS
    /// partition by walking the MBR partition table at the start of the
    /// medium.
    pub fn open_from_file(reader: Box<dyn BlockReader>) -> Result<Self, NtfsError> {
        let mut mbr = [0u8; BOOT_RECORD_SIZE];
        reader
            .read_at(0, &mut mbr)
            .map_err(|_| NtfsError::VolumeReadBootRecord)?;

        if !has_boot_signature(&mbr) {
            return Err(NtfsError::VolumeUnknownSignature);
        }

        let start_offset = find_partition_start(&mbr).ok_or(NtfsError::VolumePartitionNotFound)?;
        Self::load(reader, start_offset)
    }

    /// Opens a volume at an explicit byte offset, bypassing MBR discovery —
    /// for images that are a bare VBR with no partition table.
    pub fn open_from_file_with_offset(
        reader: Box<dyn BlockReader>,
        start_offset: u64,
    ) -> Result<Self, NtfsError> {
        Self::load(reader, start_offset)
    }

    fn load(reader: Box<dyn BlockReader>, start_offset: u64) -> Result<Self, NtfsError> {
        let mut boot = [0u8; BOOT_RECORD_SIZE];
        reader
            .read_at(start_offset, &mut boot)
            .map_err(|_| NtfsError::VolumeReadBootRecord)?;

        if !has_boot_signature(&boot) {
            return Err(NtfsError::VolumeUnknownSignature);
        }

        let bytes_per_sector = LittleEndian::read_u16(&boot[boot_sector::BYTES_PER_SECTOR..]) as u64;
        let sectors_per_cluster = boot[boot_sector::SECTORS_PER_CLUSTER] as u64;
        let mft_cluster = LittleEndian::read_u64(&boot[boot_sector::MFT_CLUSTER..]);
        let clusters_per_file_record = boot[boot_sector::CLUSTERS_PER_FILE_RECORD] as i8;
        let serial_number = LittleEndian::read_u64(&boot[boot_sector::SERIAL_NUMBER..]);

        let bytes_per_cluster = bytes_per_sector * sectors_per_cluster;
        let bytes_per_mft_entry = if clusters_per_file_record >= 0 {
            clusters_per_file_record as u64 * bytes_per_cluster
        } else {
            1u64 << (-(clusters_per_file_record as i64))
        };

        if !bytes_per_sector.is_power_of_two() {
            return Err(NtfsError::VolumeFailedValidation("bytes per sector is not a power of two"));
        }
        if !sectors_per_cluster.is_power_of_two() {
            return Err(NtfsError::VolumeFailedValidation(
                "sectors per cluster is not a power of two",
            ));
        }
        if bytes_per_mft_entry > bytes_per_cluster {
            return Err(NtfsError::VolumeFailedValidation(
                "MFT entry size exceeds cluster size",
            ));
        }

        let mut volume = Self {
            reader,
            start_offset,
            bytes_per_sector,
            sectors_per_cluster,
            bytes_per_cluster,
            bytes_per_mft_entry,
            mft_cluster,
            serial_number,
            name: Vec::new(),
            up_case_table: Vec::new(),
        };

        volume.load_information()?;
        tracing::debug!(
            bytes_per_cluster = volume.bytes_per_cluster,
            bytes_per_mft_entry = volume.bytes_per_mft_entry,
            mft_cluster = volume.mft_cluster,
            start_offset = volume.start_offset,
            "volume opened"
        );
        Ok(volume)
    }

    fn load_information(&mut self) -> Result<(), NtfsError> {
        let arena = Arena::new();

        let volume_record = self.decode_record(&arena, system_files::VOLUME).map_err(|_| {
            NtfsError::VolumeFailedLoadInfoFile {
                index: system_files::VOLUME,
            }
        })?;

        if let Some(name_attr) = volume_record.find_unnamed(AttrType::VolumeName) {
            if let AttrBody::Resident { data } = &name_attr.body {
                let units = data.len() / 2;
                if units > VOLUME_NAME_MAX_UNITS {
                    return Err(NtfsError::VolumeFailedLoadInfoFile {
                        index: system_files::VOLUME,
                    });
                }
                self.name = data
                    .chunks_exact(2)
                    .map(|p| u16::from_le_bytes([p[0], p[1]]))
                    .collect();
            }
        }

        if let Some(info_attr) = volume_record.find_unnamed(AttrType::VolumeInformation) {
            if let AttrBody::Resident { data } = &info_attr.body {
                if data.len() < 10 {
                    return Err(NtfsError::VolumeFailedLoadInfoFile {
                        index: system_files::VOLUME,
                    });
                }
                let major = data[0x08];
                let minor = data[0x09];
                if (major, minor) != SUPPORTED_VERSION {
                    return Err(NtfsError::VolumeUnsupportedVersion { major, minor });
                }
            }
        }

        let up_case_record = self.decode_record(&arena, system_files::UP_CASE).map_err(|_| {
            NtfsError::VolumeFailedLoadInfoFile {
                index: system_files::UP_CASE,
            }
        })?;

        let data_attr = up_case_record
            .find_unnamed(AttrType::Data)
            .ok_or(NtfsError::VolumeFailedLoadCaseTable)?;

        let AttrBody::NonResident {
            allocated_size,
            runs,
            ..
        } = &data_attr.body
        else {
            return Err(NtfsError::VolumeFailedLoadCaseTable);
        };

        if *allocated_size != UP_CASE_TABLE_BYTES || runs.len() != 1 {
            return Err(NtfsError::VolumeFailedLoadCaseTable);
        }

        let run = runs.as_slice()[0];
        let mut raw = vec![0u8; UP_CASE_TABLE_BYTES as usize];
        self.read(run.lcn * self.bytes_per_cluster, &mut raw)
            .map_err(|_| NtfsError::VolumeFailedLoadCaseTable)?;

        self.up_case_table = raw
            .chunks_exact(2)
            .map(|p| u16::from_le_bytes([p[0], p[1]]))
            .collect();

        Ok(())
    }

    /// Positioned read relative to the partition start. `from` and
    /// `buf.len()` must be multiples of `bytes_per_sector`.
    pub fn read(&self, from: u64, buf: &mut [u8]) -> Result<(), NtfsError> {
        if from % self.bytes_per_sector != 0 || buf.len() as u64 % self.bytes_per_sector != 0 {
            return Err(NtfsError::VolumeFailedValidation(
                "read offset/size must be a multiple of the sector size",
            ));
        }
        self.reader
            .read_at(self.start_offset + from, buf)
            .map_err(|_| NtfsError::VolumeFailedValidation("underlying device read failed"))
    }

    /// Reads and decodes the MFT record at `index` into `arena`.
    pub fn decode_record<'a>(
        &self,
        arena: &'a Arena,
        index: u64,
    ) -> Result<MftRecord<'a>, NtfsError> {
        let offset = self.mft_cluster * self.bytes_per_cluster + index * self.bytes_per_mft_entry;
        let mut raw = vec![0u8; self.bytes_per_mft_entry as usize];
        self.read(offset, &mut raw)
            .map_err(|_| NtfsError::RecordFailedRead {
                index,
                source: std::io::Error::new(std::io::ErrorKind::Other, "volume read failed"),
            })?;
        record::decode_record(arena, &raw, index, self.bytes_per_cluster)
    }
}

fn has_boot_signature(sector: &[u8]) -> bool {
    sector.len() >= BOOT_RECORD_SIZE
        && sector[BOOT_RECORD_SIGNATURE_OFFSET] == 0x55
        && sector[BOOT_RECORD_SIGNATURE_OFFSET + 1] == 0xAA
}

fn find_partition_start(mbr: &[u8]) -> Option<u64> {
    for i in 0..MBR_PARTITION_COUNT {
        let entry = MBR_PARTITION_TABLE_OFFSET + i * MBR_PARTITION_ENTRY_SIZE;
        let partition_type = mbr[entry + 0x04];
        if partition_type != 0 {
            let lba = LittleEndian::read_u32(&mbr[entry + 0x08..]) as u64;
            return Some(lba * 512);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FileBlockDevice;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn rejects_missing_boot_signature() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 512]).unwrap();
        file.flush().unwrap();

        let device = FileBlockDevice::open(file.path()).unwrap();
        let err = Volume::open_from_file(Box::new(device)).unwrap_err();
        assert!(matches!(err, NtfsError::VolumeUnknownSignature));
    }

    #[test]
    fn rejects_mbr_with_no_partitions() {
        let mut sector = vec![0u8; 512];
        sector[510] = 0x55;
        sector[511] = 0xAA;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&sector).unwrap();
        file.flush().unwrap();

        let device = FileBlockDevice::open(file.path()).unwrap();
        let err = Volume::open_from_file(Box::new(device)).unwrap_err();
        assert!(matches!(err, NtfsError::VolumePartitionNotFound));
    }
}
