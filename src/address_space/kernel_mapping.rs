use super::memory_range::MemoryRange;
use crate::remote_ptr::RemotePtr;
use crate::util::page_size;
use libc::{dev_t, ino_t, stat, PROT_EXEC, PROT_READ, PROT_WRITE};
use libc::{MAP_ANONYMOUS, MAP_GROWSDOWN, MAP_NORESERVE, MAP_PRIVATE, MAP_SHARED, MAP_STACK};
use std::fmt::{Display, Formatter, Result};
use std::mem::zeroed;
use std::ops::Deref;

/// These are the flags we track internally to distinguish
/// between adjacent segments.  For example, the kernel
/// considers a NORESERVE anonymous mapping that's adjacent to
/// a non-NORESERVE mapping distinct, even if all other
/// metadata are the same.
pub const MAP_FLAGS_MASK: i32 =
    MAP_ANONYMOUS | MAP_NORESERVE | MAP_PRIVATE | MAP_SHARED | MAP_STACK | MAP_GROWSDOWN;
pub const NO_DEVICE: dev_t = 0;
pub const NO_INODE: ino_t = 0;

/// One mapping in a tracee's address space, in the shape the trace writer
/// and the VM bookkeeping consume: range, the kernel's name for it, identity
/// of the backing file if any, protection, flags, and file offset.
pub struct KernelMapping {
    mr: MemoryRange,
    /// The kernel's name for the mapping, as per /proc/<pid>/maps, or a
    /// pseudo-name like "scratch for thread <tid>".
    fsname_: String,
    device_: dev_t,
    inode_: ino_t,
    prot_: i32,
    flags_: i32,
    offset: u64,
}

impl KernelMapping {
    pub fn new() -> KernelMapping {
        KernelMapping {
            device_: NO_DEVICE,
            inode_: NO_INODE,
            prot_: 0,
            flags_: 0,
            offset: 0,
            fsname_: String::new(),
            mr: MemoryRange::new(),
        }
    }

    pub fn new_with_opts(
        start: RemotePtr<u8>,
        end: RemotePtr<u8>,
        fsname: &str,
        device: dev_t,
        inode: ino_t,
        prot: i32,
        flags: i32,
        offset: u64,
    ) -> KernelMapping {
        let result = KernelMapping {
            device_: device,
            inode_: inode,
            prot_: prot,
            flags_: flags,
            offset,
            fsname_: fsname.into(),
            mr: MemoryRange::from_range(start, end),
        };
        result.assert_valid();
        result
    }

    pub fn assert_valid(&self) {
        debug_assert!(self.end() >= self.start());
        debug_assert!(self.size() % page_size() == 0);
        debug_assert!(self.flags_ & !MAP_FLAGS_MASK == 0);
        debug_assert!(self.offset % page_size() as u64 == 0);
    }

    pub fn fsname(&self) -> String {
        self.fsname_.clone()
    }
    pub fn device(&self) -> dev_t {
        self.device_
    }
    pub fn inode(&self) -> ino_t {
        self.inode_
    }
    pub fn prot(&self) -> i32 {
        self.prot_
    }
    pub fn flags(&self) -> i32 {
        self.flags_
    }
    pub fn file_offset_bytes(&self) -> u64 {
        self.offset
    }

    /// Return true if this file is/was backed by an external
    /// device, as opposed to a transient RAM mapping.
    pub fn is_real_device(&self) -> bool {
        self.device() > NO_DEVICE
    }

    pub fn fake_stat(&self) -> stat {
        let mut fake_stat: stat = unsafe { zeroed() };
        fake_stat.st_dev = self.device();
        fake_stat.st_ino = self.inode();
        fake_stat.st_size = self.size() as libc::off_t;
        fake_stat
    }

    /// Dump a representation of |self| to a string in a format
    /// similar to the former part of /proc/[tid]/maps.
    pub fn str(&self) -> String {
        let map_shared = if MAP_SHARED & self.flags_ == MAP_SHARED {
            's'
        } else {
            'p'
        };

        let s = format!(
            "{:8x}-{:8x} {}{} {:08x} {:<10} ",
            self.start().as_usize(),
            self.end().as_usize(),
            self.prot_string(),
            map_shared,
            self.offset,
            self.inode()
        );
        s + &self.fsname()
    }

    fn prot_string(&self) -> String {
        let mut s = String::with_capacity(3);
        s += if PROT_READ & self.prot_ == PROT_READ {
            "r"
        } else {
            "-"
        };
        s += if PROT_WRITE & self.prot_ == PROT_WRITE {
            "w"
        } else {
            "-"
        };
        s += if PROT_EXEC & self.prot_ == PROT_EXEC {
            "x"
        } else {
            "-"
        };
        s
    }
}

impl Clone for KernelMapping {
    fn clone(&self) -> Self {
        let result = KernelMapping {
            device_: self.device_,
            inode_: self.inode_,
            prot_: self.prot_,
            flags_: self.flags_,
            offset: self.offset,
            fsname_: self.fsname_.clone(),
            mr: self.mr,
        };
        result.assert_valid();
        result
    }
}

impl Deref for KernelMapping {
    type Target = MemoryRange;
    fn deref(&self) -> &Self::Target {
        &self.mr
    }
}

impl Display for KernelMapping {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.str())
    }
}
