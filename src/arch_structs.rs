#![allow(non_camel_case_types)]

//! Kernel structure layouts, parameterized by tracee architecture. Only the
//! fields the recording core reads are given real types; explicit padding
//! keeps the offsets and sizes equal to what the kernel uses for that
//! architecture. Sizes of the 64-bit-host instantiations are checked against
//! libc below where libc has the corresponding type.

use crate::arch::Architecture;
use crate::arch::NativeArch;
use crate::kernel_abi::common::socklen_t;
use crate::remote_ptr::Void;

#[repr(C)]
#[derive(Copy, Clone)]
pub struct iovec<Arch: Architecture> {
    pub iov_base: Arch::ptr<Void>,
    pub iov_len: Arch::size_t,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct msghdr<Arch: Architecture> {
    pub msg_name: Arch::ptr<Void>,
    pub msg_namelen: socklen_t,
    pub _padding: Arch::msghdr_pad,
    pub msg_iov: Arch::ptr<iovec<Arch>>,
    pub msg_iovlen: Arch::size_t,
    pub msg_control: Arch::ptr<Void>,
    pub msg_controllen: Arch::size_t,
    pub msg_flags: i32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct cmsghdr<Arch: Architecture> {
    pub cmsg_len: Arch::size_t,
    pub cmsg_level: i32,
    pub cmsg_type: i32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct mmsghdr<Arch: Architecture> {
    pub msg_hdr: msghdr<Arch>,
    pub msg_len: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct timeval<Arch: Architecture> {
    pub tv_sec: Arch::signed_long,
    pub tv_usec: Arch::signed_long,
}

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct timespec<Arch: Architecture> {
    pub tv_sec: Arch::signed_long,
    pub tv_nsec: Arch::signed_long,
}

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct pollfd {
    pub fd: i32,
    pub events: i16,
    pub revents: i16,
}

/// x86-64 packs this structure to make the x86 and x86-64 layouts identical,
/// so one definition serves both recorded architectures.
/// See <linux/eventpoll.h>.
#[repr(C, packed)]
#[derive(Copy, Clone, Default)]
pub struct epoll_event {
    pub events: u32,
    pub data: u64,
}

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct rusage<Arch: Architecture> {
    pub ru_utime: timeval<Arch>,
    pub ru_stime: timeval<Arch>,
    pub ru_maxrss: Arch::signed_long,
    pub ru_ixrss: Arch::signed_long,
    pub ru_idrss: Arch::signed_long,
    pub ru_isrss: Arch::signed_long,
    pub ru_minflt: Arch::signed_long,
    pub ru_majflt: Arch::signed_long,
    pub ru_nswap: Arch::signed_long,
    pub ru_inblock: Arch::signed_long,
    pub ru_oublock: Arch::signed_long,
    pub ru_msgsnd: Arch::signed_long,
    pub ru_msgrcv: Arch::signed_long,
    pub ru_nsignals: Arch::signed_long,
    pub ru_nvcsw: Arch::signed_long,
    pub ru_nivcsw: Arch::signed_long,
}

/// 128 bytes on both recorded architectures. The core never looks inside,
/// it only records the kernel-written bytes.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct siginfo_t {
    _bytes: [u8; 128],
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct _flock<Arch: Architecture> {
    pub l_type: i16,
    pub l_whence: i16,
    pub __pad: Arch::std_pad,
    pub l_start: Arch::off_t,
    pub l_len: Arch::off_t,
    pub l_pid: i32,
}

/// Only reachable for 32-bit tracees (fcntl64). packed(4) keeps the 64-bit
/// members at the i386 ABI offsets even though we build on a 64-bit host.
#[repr(C, packed(4))]
#[derive(Copy, Clone)]
pub struct flock64<Arch: Architecture> {
    pub l_type: i16,
    pub l_whence: i16,
    pub l_start: i64,
    pub l_len: i64,
    pub l_pid: i32,
    phantom: std::marker::PhantomData<Arch>,
}

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct f_owner_ex {
    pub type_: i32,
    pub pid: i32,
}

/// 1024 fd bits; 128 bytes on both recorded architectures.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct fd_set {
    pub fds_bits: [u64; 16],
}

/// The struct-argument form of select(2) used by i386's syscall 82.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct select_args<Arch: Architecture> {
    pub n_fds: Arch::unsigned_word,
    pub read_fds: Arch::ptr<fd_set>,
    pub write_fds: Arch::ptr<fd_set>,
    pub except_fds: Arch::ptr<fd_set>,
    pub timeout: Arch::ptr<timeval<Arch>>,
}

/// The struct-argument form of mmap(2) used by i386's syscall 90.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct mmap_args<Arch: Architecture> {
    pub addr: Arch::ptr<Void>,
    pub len: Arch::size_t,
    pub prot: Arch::signed_word,
    pub flags: Arch::signed_word,
    pub fd: Arch::signed_word,
    pub offset: Arch::off_t,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ifreq<Arch: Architecture> {
    pub ifr_name: [u8; 16],
    /// First member of the ifr_ifru union; the rest of the union is padding
    /// from our point of view.
    pub ifru_data: Arch::ptr<Void>,
    pub __union_pad: Arch::ifreq_union_pad,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ifconf<Arch: Architecture> {
    pub ifc_len: i32,
    pub __pad: Arch::std_pad,
    pub ifcu_buf: Arch::ptr<Void>,
}

/// struct iwreq: 16 bytes of interface name plus a 16-byte data union,
/// identical on both recorded architectures.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct iwreq {
    pub ifr_name: [u8; 16],
    pub u: [u8; 16],
}

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct ethtool_cmd {
    pub cmd: u32,
    pub supported: u32,
    pub advertising: u32,
    pub speed: u16,
    pub duplex: u8,
    pub port: u8,
    pub phy_address: u8,
    pub transceiver: u8,
    pub autoneg: u8,
    pub mdio_support: u8,
    pub maxtxpkt: u32,
    pub maxrxpkt: u32,
    pub speed_hi: u16,
    pub eth_tp_mdix: u8,
    pub eth_tp_mdix_ctrl: u8,
    pub lp_advertising: u32,
    pub reserved: [u32; 2],
}

pub type cc_t = u8;
pub type speed_t = u32;
pub type tcflag_t = u32;

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct termios {
    pub c_iflag: tcflag_t,
    pub c_oflag: tcflag_t,
    pub c_cflag: tcflag_t,
    pub c_lflag: tcflag_t,
    pub c_line: cc_t,
    pub c_cc: [cc_t; 32],
    pub _padding: [u8; 3],
    pub c_ispeed: speed_t,
    pub c_ospeed: speed_t,
}

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct winsize {
    pub ws_row: u16,
    pub ws_col: u16,
    pub ws_xpixel: u16,
    pub ws_ypixel: u16,
}

// This structure uses fixed-size fields, but the padding rules
// for 32-bit vs. 64-bit architectures dictate the trailing u32.
#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct dqblk {
    pub dqb_bhardlimit: u64,
    pub dqb_bsoftlimit: u64,
    pub dqb_curspace: u64,
    pub dqb_ihardlimit: u64,
    pub dqb_isoftlimit: u64,
    pub dqb_curinodes: u64,
    pub dqb_btime: u64,
    pub dqb_itime: u64,
    pub dqb_valid: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct dqinfo {
    pub dqi_bgrace: u64,
    pub dqi_igrace: u64,
    pub dqi_flags: u32,
    pub dqi_valid: u32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ipc64_perm<Arch: Architecture> {
    pub key: i32,
    pub uid: i32,
    pub gid: i32,
    pub cuid: i32,
    pub cgid: i32,
    pub mode: u32,
    pub seq: u16,
    pub __pad2: u16,
    pub __pad3: Arch::std_pad,
    pub unused1: Arch::unsigned_long,
    pub unused2: Arch::unsigned_long,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct msqid64_ds<Arch: Architecture> {
    pub msg_perm: ipc64_perm<Arch>,
    /// These msg*time fields are really __kernel_time_t plus
    /// appropriate padding. We don't touch the fields, though.
    pub msg_stime_only_little_endian: u64,
    pub msg_rtime_only_little_endian: u64,
    pub msg_ctime_only_little_endian: u64,
    pub msg_cbytes: Arch::unsigned_long,
    pub msg_qnum: Arch::unsigned_long,
    pub msg_qbytes: Arch::unsigned_long,
    pub msg_lspid: i32,
    pub msg_lrpid: i32,
    pub unused1: Arch::unsigned_long,
    pub unused2: Arch::unsigned_long,
}

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct msginfo {
    pub msgpool: i32,
    pub msgmap: i32,
    pub msgmax: i32,
    pub msgmnb: i32,
    pub msgmni: i32,
    pub msgssz: i32,
    pub msgtql: i32,
    pub msgseg: u16,
}

/// Some ipc calls require 7 params, so two of them are stashed into
/// one of these structs and a pointer to this is passed instead.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct ipc_kludge_args<Arch: Architecture> {
    pub msgbuf: Arch::ptr<Void>,
    pub msgtype: Arch::signed_long,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct __sysctl_args<Arch: Architecture> {
    pub name: Arch::ptr<i32>,
    pub nlen: i32,
    pub __pad: Arch::std_pad,
    pub oldval: Arch::ptr<Void>,
    pub oldlenp: Arch::ptr<Arch::size_t>,
    pub newval: Arch::ptr<Void>,
    pub newlen: Arch::size_t,
    pub __unused: [Arch::unsigned_long; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct user_desc {
    pub entry_number: u32,
    pub base_addr: u32,
    pub limit: u32,
    /// There are bitfields here; we never inspect them.
    pub flags: u32,
}

// socketcall(2) passes a pointer to an array of words; these structs give
// the per-call view of that array.

#[repr(C)]
#[derive(Copy, Clone)]
pub struct recv_args<Arch: Architecture> {
    pub sockfd: Arch::signed_word,
    pub buf: Arch::ptr<Void>,
    pub len: Arch::size_t,
    pub flags: Arch::signed_word,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct accept_args<Arch: Architecture> {
    pub sockfd: Arch::signed_word,
    pub addr: Arch::ptr<Void>,
    pub addrlen: Arch::ptr<socklen_t>,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct accept4_args<Arch: Architecture> {
    pub sockfd: Arch::signed_word,
    pub addr: Arch::ptr<Void>,
    pub addrlen: Arch::ptr<socklen_t>,
    pub flags: Arch::signed_word,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct getsockname_args<Arch: Architecture> {
    pub sockfd: Arch::signed_word,
    pub addr: Arch::ptr<Void>,
    pub addrlen: Arch::ptr<socklen_t>,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct getsockopt_args<Arch: Architecture> {
    pub sockfd: Arch::signed_word,
    pub level: Arch::signed_word,
    pub optname: Arch::signed_word,
    pub optval: Arch::ptr<Void>,
    pub optlen: Arch::ptr<socklen_t>,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct socketpair_args<Arch: Architecture> {
    pub domain: Arch::signed_word,
    pub type_: Arch::signed_word,
    pub protocol: Arch::signed_word,
    pub sv: Arch::ptr<i32>,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct recvfrom_args<Arch: Architecture> {
    pub sockfd: Arch::signed_word,
    pub buf: Arch::ptr<Void>,
    pub len: Arch::size_t,
    pub flags: Arch::signed_word,
    pub src_addr: Arch::ptr<Void>,
    pub addrlen: Arch::ptr<socklen_t>,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct recvmsg_args<Arch: Architecture> {
    pub fd: Arch::signed_word,
    pub msg: Arch::ptr<msghdr<Arch>>,
    pub flags: Arch::signed_word,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct recvmmsg_args<Arch: Architecture> {
    pub sockfd: Arch::signed_word,
    pub msgvec: Arch::ptr<mmsghdr<Arch>>,
    pub vlen: Arch::unsigned_word,
    pub flags: Arch::unsigned_word,
    pub timeout: Arch::ptr<timespec<Arch>>,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct sendmsg_args<Arch: Architecture> {
    pub fd: Arch::signed_word,
    pub msg: Arch::ptr<msghdr<Arch>>,
    pub flags: Arch::signed_word,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct sendmmsg_args<Arch: Architecture> {
    pub sockfd: Arch::signed_word,
    pub msgvec: Arch::ptr<mmsghdr<Arch>>,
    pub vlen: Arch::unsigned_word,
    pub flags: Arch::unsigned_word,
}

#[cfg(target_arch = "x86_64")]
mod layout_checks {
    use super::*;

    assert_eq_size!(msghdr<NativeArch>, libc::msghdr);
    assert_eq_size!(cmsghdr<NativeArch>, libc::cmsghdr);
    assert_eq_size!(iovec<NativeArch>, libc::iovec);
    assert_eq_size!(timeval<NativeArch>, libc::timeval);
    assert_eq_size!(timespec<NativeArch>, libc::timespec);
    assert_eq_size!(pollfd, libc::pollfd);
    assert_eq_size!(epoll_event, libc::epoll_event);
    assert_eq_size!(rusage<NativeArch>, libc::rusage);
    assert_eq_size!(siginfo_t, libc::siginfo_t);
    assert_eq_size!(_flock<NativeArch>, libc::flock);
    assert_eq_size!(termios, libc::termios);
    assert_eq_size!(winsize, libc::winsize);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{X64Arch, X86Arch};

    #[test]
    fn msghdr_layout() {
        assert_eq!(28, std::mem::size_of::<msghdr<X86Arch>>());
        assert_eq!(56, std::mem::size_of::<msghdr<X64Arch>>());
        assert_eq!(8, offset_of!(msghdr<X86Arch>, msg_iov));
        assert_eq!(16, offset_of!(msghdr<X64Arch>, msg_iov));
        assert_eq!(12, offset_of!(msghdr<X86Arch>, msg_iovlen));
        assert_eq!(24, offset_of!(msghdr<X64Arch>, msg_iovlen));
    }

    #[test]
    fn mmsghdr_layout() {
        assert_eq!(32, std::mem::size_of::<mmsghdr<X86Arch>>());
        assert_eq!(64, std::mem::size_of::<mmsghdr<X64Arch>>());
        assert_eq!(28, offset_of!(mmsghdr<X86Arch>, msg_len));
        assert_eq!(56, offset_of!(mmsghdr<X64Arch>, msg_len));
    }

    #[test]
    fn ifreq_layout() {
        assert_eq!(32, std::mem::size_of::<ifreq<X86Arch>>());
        assert_eq!(40, std::mem::size_of::<ifreq<X64Arch>>());
        assert_eq!(16, offset_of!(ifreq<X64Arch>, ifru_data));
    }

    #[test]
    fn fcntl_struct_sizes() {
        assert_eq!(16, std::mem::size_of::<_flock<X86Arch>>());
        assert_eq!(32, std::mem::size_of::<_flock<X64Arch>>());
        assert_eq!(24, std::mem::size_of::<flock64<X86Arch>>());
    }

    #[test]
    fn sysv_ipc_sizes() {
        assert_eq!(48, std::mem::size_of::<ipc64_perm<X64Arch>>());
        assert_eq!(120, std::mem::size_of::<msqid64_ds<X64Arch>>());
    }

    #[test]
    fn sysctl_args_size() {
        assert_eq!(80, std::mem::size_of::<__sysctl_args<X64Arch>>());
        assert_eq!(40, std::mem::size_of::<__sysctl_args<X86Arch>>());
    }
}
