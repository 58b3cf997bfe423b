//! MFT record validation and attribute walk.

use byteorder::{ByteOrder, LittleEndian};

use crate::arena::{Arena, DynList};
use crate::attr::{Attr, AttrBody, AttrFlags, AttrType};
use crate::error::NtfsError;
use crate::runlist::decode_run_list;

/// `"FILE"` read as a little-endian u32.
pub const RECORD_MAGIC: u32 = 0x454C_4946;
const ATTR_END_MARKER: u32 = 0xFFFF_FFFF;

const IN_USE_FLAG: u16 = 0x0001;
const IS_DIRECTORY_FLAG: u16 = 0x0002;

mod header {
    pub const MAGIC: usize = 0x00;
    pub const ATTRS_OFFSET: usize = 0x14;
    pub const FLAGS: usize = 0x16;
    pub const REAL_SIZE: usize = 0x18;
    pub const ALLOCATED_SIZE: usize = 0x1C;
    pub const RECORD_NUMBER: usize = 0x2C;
}

mod attr_header {
    pub const TYPE: usize = 0x00;
    pub const TOTAL_LENGTH: usize = 0x04;
    pub const NON_RESIDENT: usize = 0x08;
    pub const NAME_LENGTH: usize = 0x09;
    pub const NAME_OFFSET: usize = 0x0A;
    pub const FLAGS: usize = 0x0C;
    pub const ID: usize = 0x0E;
    pub const RESIDENT_SIZE: usize = 0x10;
    pub const RESIDENT_OFFSET: usize = 0x14;
    pub const RUN_LIST_OFFSET: usize = 0x20;
    pub const NON_RESIDENT_ALLOCATED_SIZE: usize = 0x28;
    pub const NON_RESIDENT_REAL_SIZE: usize = 0x30;
}

/// A decoded MFT record: its raw buffer (arena-owned) and parsed attributes
/// (borrowing into that same buffer).
pub struct MftRecord<'a> {
    pub index: u64,
    pub is_dir: bool,
    pub buffer: &'a [u8],
    pub attrs: DynList<'a, Attr<'a>>,
}

impl<'a> MftRecord<'a> {
    pub fn find_unnamed(&self, attr_type: AttrType) -> Option<&Attr<'a>> {
        self.attrs
            .iter()
            .find(|a| a.attr_type == attr_type && a.is_unnamed())
    }

    pub fn find(&self, attr_type: AttrType) -> Option<&Attr<'a>> {
        self.attrs.iter().find(|a| a.attr_type == attr_type)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attr<'a>> {
        self.attrs.iter()
    }
}

/// Decodes one MFT record from its raw bytes.
///
/// `raw` is copied into `arena`; every `Attr` subsequently borrows from that
/// copy. `index` is the MFT index this record was read for — it must match
/// the record's self-recorded number or decoding fails.
///
/// No fix-up (update sequence array) is applied: NTFS requires every
/// multi-sector structure to have its last two bytes per sector replaced by
/// values stashed in the USA, and this decoder does not reverse that, so the
/// last two bytes of each 512-byte sector inside the record should be
/// treated as unreliable.
pub fn decode_record<'a>(
    arena: &'a Arena,
    raw: &[u8],
    index: u64,
    bytes_per_cluster: u64,
) -> Result<MftRecord<'a>, NtfsError> {
    let buffer = arena.alloc_copy(raw);

    if buffer.len() < header::RECORD_NUMBER + 4 {
        return Err(NtfsError::RecordFailedValidation {
            index,
            reason: "record buffer shorter than the fixed header",
        });
    }

    let magic = LittleEndian::read_u32(&buffer[header::MAGIC..]);
    if magic != RECORD_MAGIC {
        return Err(NtfsError::RecordFailedValidation {
            index,
            reason: "bad record magic, expected 'FILE'",
        });
    }

    let attrs_offset = LittleEndian::read_u16(&buffer[header::ATTRS_OFFSET..]) as usize;
    let flags = LittleEndian::read_u16(&buffer[header::FLAGS..]);
    let real_size = LittleEndian::read_u32(&buffer[header::REAL_SIZE..]) as usize;
    let allocated_size = LittleEndian::read_u32(&buffer[header::ALLOCATED_SIZE..]) as usize;
    let self_index = LittleEndian::read_u32(&buffer[header::RECORD_NUMBER..]) as u64;

    if !(attrs_offset < real_size && real_size <= allocated_size && allocated_size == buffer.len())
    {
        return Err(NtfsError::RecordFailedValidation {
            index,
            reason: "attrs_offset < real_size <= allocated_size invariant violated",
        });
    }

    if self_index != index {
        return Err(NtfsError::RecordFailedValidation {
            index,
            reason: "record's self-recorded MFT index does not match the requested index",
        });
    }

    // The source raises the same error for a genuinely corrupt record and
    // for an unused (free) MFT slot; this port keeps that ambiguity rather
    // than invent a "not found" classification.
    if flags & IN_USE_FLAG == 0 {
        return Err(NtfsError::RecordFailedValidation {
            index,
            reason: "record in-use flag is clear",
        });
    }

    let is_dir = flags & IS_DIRECTORY_FLAG != 0;

    let mut attrs = DynList::new_in(arena);
    let mut pos = attrs_offset;

    while pos + 4 <= real_size {
        let attr_type_raw = LittleEndian::read_u32(&buffer[pos + attr_header::TYPE..]);
        if attr_type_raw == ATTR_END_MARKER {
            break;
        }

        if pos + attr_header::ID + 2 > real_size {
            return Err(NtfsError::RecordFailedValidation {
                index,
                reason: "attribute header runs past the record's real size",
            });
        }

        let total_length = LittleEndian::read_u32(&buffer[pos + attr_header::TOTAL_LENGTH..]) as usize;
        if total_length == 0 || pos + total_length > real_size {
            return Err(NtfsError::RecordFailedValidation {
                index,
                reason: "attribute total length overruns the record",
            });
        }

        let attr_type = AttrType::from_u32(attr_type_raw).ok_or(NtfsError::RecordFailedValidation {
            index,
            reason: "unrecognized attribute type code",
        })?;

        let non_resident = buffer[pos + attr_header::NON_RESIDENT] != 0;
        let name_length = buffer[pos + attr_header::NAME_LENGTH] as usize;
        let name_offset = LittleEndian::read_u16(&buffer[pos + attr_header::NAME_OFFSET..]) as usize;
        let flags_raw = LittleEndian::read_u16(&buffer[pos + attr_header::FLAGS..]);
        let id = LittleEndian::read_u16(&buffer[pos + attr_header::ID..]);

        let name = if name_length > 0 {
            let name_start = pos + name_offset;
            let name_end = name_start + name_length * 2;
            if name_end > pos + total_length {
                return Err(NtfsError::RecordFailedValidation {
                    index,
                    reason: "attribute name extends past its own total length",
                });
            }
            Some(&buffer[name_start..name_end])
        } else {
            None
        };

        let body = if non_resident {
            if total_length < attr_header::NON_RESIDENT_REAL_SIZE + 8 {
                return Err(NtfsError::RecordFailedValidation {
                    index,
                    reason: "non-resident attribute too short for its fixed header",
                });
            }

            let run_list_offset = LittleEndian::read_u16(&buffer[pos + attr_header::RUN_LIST_OFFSET..]) as usize;
            let allocated_size =
                LittleEndian::read_u64(&buffer[pos + attr_header::NON_RESIDENT_ALLOCATED_SIZE..]);
            let real_size =
                LittleEndian::read_u64(&buffer[pos + attr_header::NON_RESIDENT_REAL_SIZE..]);

            if real_size > allocated_size {
                return Err(NtfsError::RecordFailedValidation {
                    index,
                    reason: "non-resident real size exceeds allocated size",
                });
            }
            if allocated_size % bytes_per_cluster != 0 {
                return Err(NtfsError::RecordFailedValidation {
                    index,
                    reason: "non-resident allocated size is not cluster-aligned",
                });
            }

            let run_start = pos + run_list_offset;
            let run_end = pos + total_length;
            if run_start > run_end {
                return Err(NtfsError::RecordFailedValidation {
                    index,
                    reason: "data run offset past attribute end",
                });
            }
            let runs = decode_run_list(arena, &buffer[run_start..run_end]);

            AttrBody::NonResident {
                real_size,
                allocated_size,
                runs,
            }
        } else {
            if total_length < attr_header::RESIDENT_OFFSET + 2 {
                return Err(NtfsError::RecordFailedValidation {
                    index,
                    reason: "resident attribute too short for its fixed header",
                });
            }

            let size = LittleEndian::read_u32(&buffer[pos + attr_header::RESIDENT_SIZE..]) as usize;
            let offset = LittleEndian::read_u16(&buffer[pos + attr_header::RESIDENT_OFFSET..]) as usize;

            if offset + size > total_length {
                return Err(NtfsError::RecordFailedValidation {
                    index,
                    reason: "resident data extends past the attribute's total length",
                });
            }

            let data_start = pos + offset;
            let data_end = data_start + size;
            AttrBody::Resident {
                data: &buffer[data_start..data_end],
            }
        };

        attrs.push(Attr {
            attr_type,
            non_resident,
            flags: AttrFlags::from_bits_truncate(flags_raw),
            id,
            name,
            body,
        });

        pos += total_length;
    }

    tracing::trace!(index, attrs = attrs.len(), "decoded MFT record");

    Ok(MftRecord {
        index,
        is_dir,
        buffer,
        attrs,
    })
}
