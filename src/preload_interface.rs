//! The slice of the in-tracee preload library's ABI that recording consumes:
//! the layout of one buffered-syscall record, and the magic fd the preload
//! library writes trace-worthy data to.

/// Tracee fd the preload library dups for data it wants recorded verbatim.
pub const RETRACE_MAGIC_SAVE_DATA_FD: i32 = 999;

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct syscallbuf_record {
    /// Return value from the syscall. This can be a memory address, so must
    /// be as big as a memory address can be. We use 64 bits rather than make
    /// syscallbuf_record arch-specific as that gets cumbersome.
    pub ret: i64,
    /// Syscall number.
    pub syscallno: u16,
    /// Did the tracee arm/disarm the desched notification for this syscall?
    pub desched: u8,
    pub _padding: u8,
    /// Size of entire record in bytes: this struct plus extra recorded data
    /// stored inline after the last field, not including padding.
    pub size: u32,
}

impl syscallbuf_record {
    /// Bytes of outparam data stored inline after the header.
    pub fn extra_data_size(&self) -> usize {
        self.size as usize - std::mem::size_of::<syscallbuf_record>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_header_is_16_bytes() {
        assert_eq!(16, std::mem::size_of::<syscallbuf_record>());
    }
}
