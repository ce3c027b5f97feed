use goblin::elf::header::{EI_CLASS, ELFMAG, SELFMAG};
use nix::unistd::{sysconf, SysconfVar};
use std::fs::File;
use std::io::Read;
use std::path::Path;

lazy_static! {
    static ref SYSTEM_PAGE_SIZE: usize = page_size_init();
}

fn page_size_init() -> usize {
    sysconf(SysconfVar::PAGE_SIZE).unwrap().unwrap() as usize
}

pub fn page_size() -> usize {
    *SYSTEM_PAGE_SIZE
}

pub fn floor_page_size(sz: usize) -> usize {
    sz & !(page_size() - 1)
}

pub fn ceil_page_size(sz: usize) -> usize {
    (sz + page_size() - 1) & !(page_size() - 1)
}

/// EI_CLASS of the file, or None when it isn't readable as ELF at all.
/// Unreadable or corrupt files will make execve fail on its own.
pub fn read_elf_class<P: AsRef<Path>>(file_name: P) -> Option<u8> {
    let mut f = File::open(file_name).ok()?;
    let mut ident = [0u8; EI_CLASS + 1];
    f.read_exact(&mut ident).ok()?;
    if &ident[0..SELFMAG] != ELFMAG {
        return None;
    }
    Some(ident[EI_CLASS])
}

/// Files we refuse to let tracees open, because doing so would give the
/// kernel license to mutate state behind our back (DRI/nvidia open device
/// nodes on the callee's behalf) or hand out system configuration we can't
/// replay.
pub fn is_blacklisted_filename<P: AsRef<Path>>(filename: P) -> bool {
    let p = filename.as_ref();
    p.starts_with("/dev/dri/")
        || p == Path::new("/dev/nvidiactl")
        || p == Path::new("/usr/share/alsa/alsa.conf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_arithmetic() {
        let ps = page_size();
        assert_eq!(0, floor_page_size(ps - 1));
        assert_eq!(ps, ceil_page_size(1));
        assert_eq!(ps, ceil_page_size(ps));
        assert_eq!(ps, floor_page_size(ps + 1));
    }

    #[test]
    fn blacklist() {
        assert!(is_blacklisted_filename("/dev/dri/card0"));
        assert!(is_blacklisted_filename("/dev/nvidiactl"));
        assert!(!is_blacklisted_filename("/dev/null"));
    }

    #[test]
    fn elf_class_of_garbage_is_none() {
        assert_eq!(None, read_elf_class("/dev/null"));
    }
}
