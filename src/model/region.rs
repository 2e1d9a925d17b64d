//! A single contiguous address range observed at one sampling instant.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Access rights of a region, as printed in a `rwx` triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Permissions {
    /// No access at all (`---`).
    pub const NONE: Permissions = Permissions {
        read: false,
        write: false,
        execute: false,
    };

    /// Decodes a three-character triple such as `r-x`.
    ///
    /// Characters are positional: `r` in the first slot grants read, `w` in
    /// the second grants write, `x` in the third grants execute. Anything else
    /// is denied. Returns `None` unless the input is exactly three characters.
    pub fn from_triple(triple: &str) -> Option<Self> {
        let mut chars = triple.chars();
        let (r, w, x) = (chars.next()?, chars.next()?, chars.next()?);
        if chars.next().is_some() {
            return None;
        }
        Some(Self {
            read: r == 'r',
            write: w == 'w',
            execute: x == 'x',
        })
    }

    /// True when no access bit is set.
    pub fn is_none(&self) -> bool {
        !self.read && !self.write && !self.execute
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.read { 'r' } else { '-' },
            if self.write { 'w' } else { '-' },
            if self.execute { 'x' } else { '-' }
        )
    }
}

/// How a region's physical pages are shared with other processes.
///
/// Printed by the sampling utility as an `SM=<code>` marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SharingMode {
    /// `SM=COW`
    CopyOnWrite,
    /// `SM=PRV`, also used when the marker is absent or unknown.
    #[default]
    Private,
    /// `SM=SHM`
    Shared,
    /// `SM=NUL`: reserved address space with nothing mapped.
    Empty,
    /// `SM=ALI`
    Aliased,
    /// `SM=S/A`
    SharedAliased,
}

impl SharingMode {
    /// Every mode, in marker-table order.
    pub const ALL: [SharingMode; 6] = [
        SharingMode::CopyOnWrite,
        SharingMode::Private,
        SharingMode::Shared,
        SharingMode::Empty,
        SharingMode::Aliased,
        SharingMode::SharedAliased,
    ];

    /// Looks up the mode for a marker code (the text after `SM=`).
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.code() == code)
    }

    /// Marker code as printed after `SM=`.
    pub fn code(&self) -> &'static str {
        match self {
            SharingMode::CopyOnWrite => "COW",
            SharingMode::Private => "PRV",
            SharingMode::Shared => "SHM",
            SharingMode::Empty => "NUL",
            SharingMode::Aliased => "ALI",
            SharingMode::SharedAliased => "S/A",
        }
    }
}

impl fmt::Display for SharingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SharingMode::CopyOnWrite => "copy-on-write",
            SharingMode::Private => "private",
            SharingMode::Shared => "shared",
            SharingMode::Empty => "empty",
            SharingMode::Aliased => "aliased",
            SharingMode::SharedAliased => "shared-aliased",
        };
        f.write_str(name)
    }
}

/// One contiguous virtual address range with uniform attributes.
///
/// Regions are built by the parser and never modified afterwards, so the
/// fields are only reachable through accessors. `start_address < end_address`
/// always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RegionFields")]
pub struct Region {
    pub(crate) category: String,
    pub(crate) start_address: u64,
    pub(crate) end_address: u64,
    pub(crate) virtual_size: u64,
    pub(crate) resident_size: u64,
    pub(crate) dirty_size: u64,
    pub(crate) swap_size: u64,
    pub(crate) current_permissions: Permissions,
    pub(crate) max_permissions: Permissions,
    pub(crate) sharing_mode: SharingMode,
    pub(crate) detail: Option<String>,
}

impl Region {
    /// Label printed before the address range, e.g. `MALLOC_TINY` or
    /// `VM_ALLOCATE (reserved)`.
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn start_address(&self) -> u64 {
        self.start_address
    }

    pub fn end_address(&self) -> u64 {
        self.end_address
    }

    /// Length of the address range in bytes.
    pub fn span(&self) -> u64 {
        self.end_address - self.start_address
    }

    pub fn virtual_size(&self) -> u64 {
        self.virtual_size
    }

    pub fn resident_size(&self) -> u64 {
        self.resident_size
    }

    pub fn dirty_size(&self) -> u64 {
        self.dirty_size
    }

    pub fn swap_size(&self) -> u64 {
        self.swap_size
    }

    pub fn current_permissions(&self) -> Permissions {
        self.current_permissions
    }

    pub fn max_permissions(&self) -> Permissions {
        self.max_permissions
    }

    pub fn sharing_mode(&self) -> SharingMode {
        self.sharing_mode
    }

    /// Trailing free text: a mapped file path, zone name or thread label.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Whether `addr` falls inside `[start_address, end_address)`.
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start_address && addr < self.end_address
    }
}

/// Deserialized regions go through the same range check as parsed ones.
#[derive(Deserialize)]
struct RegionFields {
    category: String,
    start_address: u64,
    end_address: u64,
    virtual_size: u64,
    resident_size: u64,
    dirty_size: u64,
    swap_size: u64,
    current_permissions: Permissions,
    max_permissions: Permissions,
    sharing_mode: SharingMode,
    detail: Option<String>,
}

/// A stored region whose address range is empty or inverted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address range {start:#x}-{end:#x}")]
pub struct InvalidRange {
    pub start: u64,
    pub end: u64,
}

impl TryFrom<RegionFields> for Region {
    type Error = InvalidRange;

    fn try_from(f: RegionFields) -> Result<Self, Self::Error> {
        if f.start_address >= f.end_address {
            return Err(InvalidRange {
                start: f.start_address,
                end: f.end_address,
            });
        }
        Ok(Region {
            category: f.category,
            start_address: f.start_address,
            end_address: f.end_address,
            virtual_size: f.virtual_size,
            resident_size: f.resident_size,
            dirty_size: f.dirty_size,
            swap_size: f.swap_size,
            current_permissions: f.current_permissions,
            max_permissions: f.max_permissions,
            sharing_mode: f.sharing_mode,
            detail: f.detail,
        })
    }
}
