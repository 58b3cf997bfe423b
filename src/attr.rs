//! Attribute types and the decoded `Attr` value itself.

use crate::arena::DynList;
use crate::runlist::DataRun;

/// The 17 NTFS attribute types the source enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AttrType {
    StandardInformation = 0x10,
    AttributeList = 0x20,
    FileName = 0x30,
    VolumeVersion = 0x40,
    SecurityDescriptor = 0x50,
    VolumeName = 0x60,
    VolumeInformation = 0x70,
    Data = 0x80,
    IndexRoot = 0x90,
    IndexAllocation = 0xA0,
    Bitmap = 0xB0,
    SymbolicLink = 0xC0,
    EaInformation = 0xD0,
    Ea = 0xE0,
    PropertySet = 0xF0,
    LoggedUtilityStream = 0x100,
}

impl AttrType {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0x10 => Self::StandardInformation,
            0x20 => Self::AttributeList,
            0x30 => Self::FileName,
            0x40 => Self::VolumeVersion,
            0x50 => Self::SecurityDescriptor,
            0x60 => Self::VolumeName,
            0x70 => Self::VolumeInformation,
            0x80 => Self::Data,
            0x90 => Self::IndexRoot,
            0xA0 => Self::IndexAllocation,
            0xB0 => Self::Bitmap,
            0xC0 => Self::SymbolicLink,
            0xD0 => Self::EaInformation,
            0xE0 => Self::Ea,
            0xF0 => Self::PropertySet,
            0x100 => Self::LoggedUtilityStream,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::StandardInformation => "Standard Information",
            Self::AttributeList => "Attribute List",
            Self::FileName => "File Name",
            Self::VolumeVersion => "Volume Version",
            Self::SecurityDescriptor => "Security Descriptor",
            Self::VolumeName => "Volume Name",
            Self::VolumeInformation => "Volume Information",
            Self::Data => "Data",
            Self::IndexRoot => "Index Root",
            Self::IndexAllocation => "Index Allocation",
            Self::Bitmap => "Bitmap",
            Self::SymbolicLink => "Symbolic Link",
            Self::EaInformation => "Ea Information",
            Self::Ea => "Ea",
            Self::PropertySet => "Property Set",
            Self::LoggedUtilityStream => "Logged Utility Stream",
        }
    }
}

bitflags::bitflags! {
    /// `Compressed | Encrypted | Sparse`, read from the common attribute
    /// header at offset 0x0C.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AttrFlags: u16 {
        const COMPRESSED = 0x0001;
        const ENCRYPTED  = 0x4000;
        const SPARSE     = 0x8000;
    }
}

/// Resident or non-resident attribute body.
///
/// Replaces the source's two-struct-in-one `ntfs_attr` layout with a tagged
/// variant, per the design notes on attribute bodies.
pub enum AttrBody<'a> {
    Resident { data: &'a [u8] },
    NonResident {
        real_size: u64,
        allocated_size: u64,
        runs: DynList<'a, DataRun>,
    },
}

/// One parsed MFT attribute.
///
/// `name` is a non-owning byte slice into the owning record's buffer
/// (`2 * name_length_in_utf16_units` bytes), materialized to UTF-16 units on
/// demand rather than stored pre-decoded, since the source bytes are not
/// guaranteed 2-byte aligned inside the record.
pub struct Attr<'a> {
    pub attr_type: AttrType,
    pub non_resident: bool,
    pub flags: AttrFlags,
    pub id: u16,
    pub name: Option<&'a [u8]>,
    pub body: AttrBody<'a>,
}

impl<'a> Attr<'a> {
    /// Decodes this attribute's raw name bytes into UTF-16 code units.
    pub fn name_utf16(&self) -> Option<Vec<u16>> {
        self.name.map(|bytes| {
            bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect()
        })
    }

    pub fn is_unnamed(&self) -> bool {
        self.name.is_none()
    }

    pub fn is_resident(&self) -> bool {
        !self.non_resident
    }
}
